//! Recursive-descent parser over the token stream.
//!
//! Statements are dispatched on their leading keyword. Expression precedence,
//! loosest first: conditional expression, `or`, `and`, `not`, comparisons,
//! `+ -`, `* / // %`, unary `- +`, `**`, then calls, subscripts and method
//! calls.

use std::rc::Rc;

use crate::ast::{BinOp, Branch, CmpOp, Expr, FStringPart, FunctionDef, Handler, Param, Program, Stmt, StmtKind, Target, UnaryOp};
use crate::error::{Result, ScriptError};
use crate::lexer::{Keyword, Token, TokenKind, tokenize};

/// Parse a complete script.
///
/// # Errors
///
/// Returns a [`ScriptError`] describing the first syntax or indentation
/// problem found.
pub fn parse(source: &str) -> Result<Program>
{
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens);
    let mut body = Vec::new();
    while !parser.at(&TokenKind::Eof) {
        if parser.at(&TokenKind::Newline) {
            parser.advance();
            continue;
        }
        body.extend(parser.statement()?);
    }
    Ok(Program { body })
}

/// Parse a standalone expression, reporting errors against `line`.
fn parse_expression(source: &str, line: u32) -> Result<Expr>
{
    let mut tokens = tokenize(source).map_err(|err| ScriptError::syntax(line, format!("f-string: {err}")))?;
    for token in &mut tokens {
        token.line = line;
    }
    let mut parser = Parser::new(&tokens);
    let expr = parser.exprlist()?;
    while parser.at(&TokenKind::Newline) {
        parser.advance();
    }
    if !parser.at(&TokenKind::Eof) {
        return Err(parser.error("f-string: invalid syntax"));
    }
    Ok(expr)
}

/// Cursor over a token slice, plus the nesting the statement rules depend on
struct Parser<'t>
{
    tokens: &'t [Token],
    pos: usize,
    loop_depth: usize,
    function_depth: usize,
}

impl<'t> Parser<'t>
{
    const fn new(tokens: &'t [Token]) -> Self
    {
        Self {
            tokens,
            pos: 0,
            loop_depth: 0,
            function_depth: 0,
        }
    }

    fn peek(&self) -> &TokenKind
    {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind
    {
        self.tokens
            .get(self.pos + offset)
            .or_else(|| self.tokens.last())
            .map_or(&TokenKind::Eof, |token| &token.kind)
    }

    fn line(&self) -> u32
    {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |token| token.line)
    }

    fn advance(&mut self) -> TokenKind
    {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn at(&self, kind: &TokenKind) -> bool
    {
        self.peek() == kind
    }

    fn at_op(&self, op: &str) -> bool
    {
        matches!(self.peek(), TokenKind::Op(found) if *found == op)
    }

    fn at_keyword(&self, keyword: Keyword) -> bool
    {
        *self.peek() == TokenKind::Keyword(keyword)
    }

    fn eat_op(&mut self, op: &str) -> bool
    {
        if self.at_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool
    {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<()>
    {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{op}'")))
        }
    }

    fn expect_name(&mut self) -> Result<String>
    {
        match self.peek().clone() {
            TokenKind::Name(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn error(&self, message: impl Into<String>) -> ScriptError
    {
        let message = message.into();
        match self.peek() {
            TokenKind::Eof if message == "invalid syntax" => ScriptError::syntax(self.line(), "unexpected EOF while parsing"),
            TokenKind::Indent => ScriptError::indentation(self.line(), "unexpected indent"),
            _ => ScriptError::syntax(self.line(), message),
        }
    }

    fn starts_expression(&self) -> bool
    {
        match self.peek() {
            TokenKind::Name(_) | TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::Str(_) | TokenKind::FString(_) => true,
            TokenKind::Keyword(keyword) => matches!(keyword, Keyword::Not | Keyword::True | Keyword::False | Keyword::None),
            TokenKind::Op(op) => matches!(*op, "(" | "[" | "{" | "-" | "+"),
            _ => false,
        }
    }

    // ---- statements ----

    fn statement(&mut self) -> Result<Vec<Stmt>>
    {
        let stmt = match self.peek() {
            TokenKind::Keyword(Keyword::If) => self.if_statement()?,
            TokenKind::Keyword(Keyword::While) => self.while_statement()?,
            TokenKind::Keyword(Keyword::For) => self.for_statement()?,
            TokenKind::Keyword(Keyword::Def) => self.function_def()?,
            TokenKind::Keyword(Keyword::Try) => self.try_statement()?,
            TokenKind::Indent => return Err(self.error("unexpected indent")),
            _ => return self.simple_statements(),
        };
        Ok(vec![stmt])
    }

    fn simple_statements(&mut self) -> Result<Vec<Stmt>>
    {
        let mut stmts = vec![self.small_statement()?];
        while self.eat_op(";") {
            if self.at(&TokenKind::Newline) || self.at(&TokenKind::Eof) {
                break;
            }
            stmts.push(self.small_statement()?);
        }
        match self.peek() {
            TokenKind::Newline => {
                self.advance();
                Ok(stmts)
            }
            TokenKind::Eof => Ok(stmts),
            _ => Err(self.error("invalid syntax")),
        }
    }

    fn at_simple_end(&self) -> bool
    {
        matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) || self.at_op(";")
    }

    fn small_statement(&mut self) -> Result<Stmt>
    {
        let line = self.line();
        let kind = match self.peek() {
            TokenKind::Keyword(Keyword::Pass) => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Keyword(Keyword::Break) => {
                if self.loop_depth == 0 {
                    return Err(self.error("'break' outside loop"));
                }
                self.advance();
                StmtKind::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                if self.loop_depth == 0 {
                    return Err(self.error("'continue' not properly in loop"));
                }
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Keyword(Keyword::Return) => {
                if self.function_depth == 0 {
                    return Err(self.error("'return' outside function"));
                }
                self.advance();
                let value = if self.at_simple_end() { None } else { Some(self.exprlist()?) };
                StmtKind::Return(value)
            }
            TokenKind::Keyword(Keyword::Raise) => {
                self.advance();
                let value = if self.at_simple_end() { None } else { Some(self.expr()?) };
                StmtKind::Raise(value)
            }
            _ => self.expression_statement()?,
        };
        Ok(Stmt { line, kind })
    }

    fn augmented_op(&self) -> Option<BinOp>
    {
        let TokenKind::Op(op) = self.peek() else {
            return None;
        };
        let op = match *op {
            "+=" => BinOp::Add,
            "-=" => BinOp::Sub,
            "*=" => BinOp::Mul,
            "/=" => BinOp::Div,
            "//=" => BinOp::FloorDiv,
            "%=" => BinOp::Mod,
            "**=" => BinOp::Pow,
            _ => return None,
        };
        Some(op)
    }

    fn expression_statement(&mut self) -> Result<StmtKind>
    {
        let first = self.exprlist()?;

        if let Some(op) = self.augmented_op() {
            let target = self.target(first)?;
            if matches!(target, Target::Unpack(_)) {
                return Err(self.error("illegal expression for augmented assignment"));
            }
            self.advance();
            let value = self.exprlist()?;
            return Ok(StmtKind::AugAssign { target, op, value });
        }

        if !self.at_op("=") {
            return Ok(StmtKind::Expr(first));
        }

        let mut exprs = vec![first];
        while self.eat_op("=") {
            exprs.push(self.exprlist()?);
        }
        let value = exprs.pop().ok_or_else(|| self.error("invalid syntax"))?;
        let targets = exprs
            .into_iter()
            .map(|expr| self.target(expr))
            .collect::<Result<Vec<_>>>()?;
        Ok(StmtKind::Assign { targets, value })
    }

    fn target(&self, expr: Expr) -> Result<Target>
    {
        match expr {
            Expr::Name(name) => Ok(Target::Name(name)),
            Expr::Subscript(object, index) => Ok(Target::Subscript {
                object: *object,
                index: *index,
            }),
            Expr::Tuple(items) | Expr::List(items) => items
                .into_iter()
                .map(|item| self.target(item))
                .collect::<Result<Vec<_>>>()
                .map(Target::Unpack),
            Expr::Call(..) | Expr::Method(..) => Err(self.error("cannot assign to function call")),
            _ => Err(self.error("cannot assign to expression")),
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>>
    {
        self.expect_op(":")?;
        if !self.at(&TokenKind::Newline) {
            return self.simple_statements();
        }
        self.advance();
        if !self.at(&TokenKind::Indent) {
            return Err(ScriptError::indentation(self.line(), "expected an indented block"));
        }
        self.advance();

        let mut body = Vec::new();
        while !self.at(&TokenKind::Dedent) && !self.at(&TokenKind::Eof) {
            body.extend(self.statement()?);
        }
        if self.at(&TokenKind::Dedent) {
            self.advance();
        }
        Ok(body)
    }

    fn loop_body(&mut self) -> Result<Vec<Stmt>>
    {
        self.loop_depth += 1;
        let body = self.block();
        self.loop_depth -= 1;
        body
    }

    fn if_statement(&mut self) -> Result<Stmt>
    {
        let line = self.line();
        self.advance();
        let cond = self.expr()?;
        let body = self.block()?;
        let mut branches = vec![Branch { line, cond, body }];

        while self.at_keyword(Keyword::Elif) {
            let line = self.line();
            self.advance();
            let cond = self.expr()?;
            let body = self.block()?;
            branches.push(Branch { line, cond, body });
        }

        let orelse = if self.eat_keyword(Keyword::Else) { Some(self.block()?) } else { None };
        Ok(Stmt {
            line,
            kind: StmtKind::If { branches, orelse },
        })
    }

    fn while_statement(&mut self) -> Result<Stmt>
    {
        let line = self.line();
        self.advance();
        let cond = self.expr()?;
        let body = self.loop_body()?;
        Ok(Stmt {
            line,
            kind: StmtKind::While { cond, body },
        })
    }

    fn for_statement(&mut self) -> Result<Stmt>
    {
        let line = self.line();
        self.advance();

        let first = self.postfix()?;
        let target = if self.at_op(",") {
            let mut items = vec![first];
            while self.eat_op(",") {
                if self.at_keyword(Keyword::In) {
                    break;
                }
                items.push(self.postfix()?);
            }
            self.target(Expr::Tuple(items))?
        } else {
            self.target(first)?
        };

        if !self.eat_keyword(Keyword::In) {
            return Err(self.error("expected 'in'"));
        }
        let iter = self.exprlist()?;
        let body = self.loop_body()?;
        Ok(Stmt {
            line,
            kind: StmtKind::For { target, iter, body },
        })
    }

    fn function_def(&mut self) -> Result<Stmt>
    {
        let line = self.line();
        self.advance();
        let name = self.expect_name()?;
        self.expect_op("(")?;

        let mut params: Vec<Param> = Vec::new();
        while !self.at_op(")") {
            let param = self.expect_name()?;
            if params.iter().any(|existing| existing.name == param) {
                return Err(self.error(format!("duplicate argument '{param}' in function definition")));
            }
            let default = if self.eat_op("=") { Some(self.expr()?) } else { None };
            if default.is_none() && params.iter().any(|existing| existing.default.is_some()) {
                return Err(self.error("non-default argument follows default argument"));
            }
            params.push(Param { name: param, default });
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        if self.eat_op("->") {
            self.expr()?;
        }

        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.block();
        self.function_depth -= 1;
        self.loop_depth = saved_loops;

        Ok(Stmt {
            line,
            kind: StmtKind::FunctionDef(Rc::new(FunctionDef {
                name,
                line,
                params,
                body: body?,
            })),
        })
    }

    fn try_statement(&mut self) -> Result<Stmt>
    {
        let line = self.line();
        self.advance();
        let body = self.block()?;

        let mut handlers: Vec<Handler> = Vec::new();
        while self.at_keyword(Keyword::Except) {
            if handlers.last().is_some_and(|handler| handler.kind.is_none()) {
                return Err(self.error("default 'except:' must be last"));
            }
            let line = self.line();
            self.advance();
            let kind = if self.at_op(":") { None } else { Some(self.expr()?) };
            let name = if self.eat_keyword(Keyword::As) { Some(self.expect_name()?) } else { None };
            let body = self.block()?;
            handlers.push(Handler { line, kind, name, body });
        }

        if handlers.is_empty() {
            return Err(self.error("expected 'except' block"));
        }
        Ok(Stmt {
            line,
            kind: StmtKind::Try { body, handlers },
        })
    }

    // ---- expressions ----

    /// One expression, or a bare tuple if commas follow.
    fn exprlist(&mut self) -> Result<Expr>
    {
        let first = self.expr()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if !self.starts_expression() {
                break;
            }
            items.push(self.expr()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn expr(&mut self) -> Result<Expr>
    {
        let body = self.or_expr()?;
        if !self.eat_keyword(Keyword::If) {
            return Ok(body);
        }
        let cond = self.or_expr()?;
        if !self.eat_keyword(Keyword::Else) {
            return Err(self.error("expected 'else' after 'if' expression"));
        }
        let orelse = self.expr()?;
        Ok(Expr::IfExp {
            cond: Box::new(cond),
            body: Box::new(body),
            orelse: Box::new(orelse),
        })
    }

    fn or_expr(&mut self) -> Result<Expr>
    {
        let mut left = self.and_expr()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr>
    {
        let mut left = self.not_expr()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr>
    {
        if self.eat_keyword(Keyword::Not) {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOp>
    {
        let op = match self.peek() {
            TokenKind::Op("==") => CmpOp::Eq,
            TokenKind::Op("!=") => CmpOp::NotEq,
            TokenKind::Op("<") => CmpOp::Lt,
            TokenKind::Op("<=") => CmpOp::LtE,
            TokenKind::Op(">") => CmpOp::Gt,
            TokenKind::Op(">=") => CmpOp::GtE,
            TokenKind::Keyword(Keyword::In) => CmpOp::In,
            TokenKind::Keyword(Keyword::Not) if *self.peek_at(1) == TokenKind::Keyword(Keyword::In) => {
                self.advance();
                CmpOp::NotIn
            }
            TokenKind::Keyword(Keyword::Is) if *self.peek_at(1) == TokenKind::Keyword(Keyword::Not) => {
                self.advance();
                CmpOp::IsNot
            }
            TokenKind::Keyword(Keyword::Is) => CmpOp::Is,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn comparison(&mut self) -> Result<Expr>
    {
        let left = self.arith()?;
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_op() {
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare(Box::new(left), rest))
        }
    }

    fn arith(&mut self) -> Result<Expr>
    {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Op("+") => BinOp::Add,
                TokenKind::Op("-") => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr>
    {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Op("*") => BinOp::Mul,
                TokenKind::Op("/") => BinOp::Div,
                TokenKind::Op("//") => BinOp::FloorDiv,
                TokenKind::Op("%") => BinOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.factor()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
    }

    fn factor(&mut self) -> Result<Expr>
    {
        let op = match self.peek() {
            TokenKind::Op("-") => UnaryOp::Neg,
            TokenKind::Op("+") => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.factor()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn power(&mut self) -> Result<Expr>
    {
        let base = self.postfix()?;
        if self.eat_op("**") {
            let exponent = self.factor()?;
            return Ok(Expr::Binary(Box::new(base), BinOp::Pow, Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr>
    {
        let mut expr = self.atom()?;
        loop {
            if self.eat_op("(") {
                let args = self.call_args()?;
                expr = Expr::Call(Box::new(expr), args);
            } else if self.eat_op("[") {
                expr = self.subscript(expr)?;
            } else if self.eat_op(".") {
                let name = self.expect_name()?;
                if !self.eat_op("(") {
                    return Err(self.error("attribute access is only supported for method calls"));
                }
                let args = self.call_args()?;
                expr = Expr::Method(Box::new(expr), name, args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>>
    {
        let mut args = Vec::new();
        while !self.at_op(")") {
            if matches!(self.peek(), TokenKind::Name(_)) && *self.peek_at(1) == TokenKind::Op("=") {
                return Err(self.error("keyword arguments are not supported"));
            }
            args.push(self.expr()?);
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok(args)
    }

    fn subscript(&mut self, object: Expr) -> Result<Expr>
    {
        let lower = if self.at_op(":") { None } else { Some(self.expr()?) };
        let expr = if self.eat_op(":") {
            let upper = if self.at_op("]") { None } else { Some(Box::new(self.expr()?)) };
            Expr::Slice {
                object: Box::new(object),
                lower: lower.map(Box::new),
                upper,
            }
        } else {
            let index = lower.ok_or_else(|| self.error("invalid syntax"))?;
            Expr::Subscript(Box::new(object), Box::new(index))
        };
        self.expect_op("]")?;
        Ok(expr)
    }

    fn atom(&mut self) -> Result<Expr>
    {
        let line = self.line();
        let expr = match self.peek().clone() {
            TokenKind::Name(name) => {
                self.advance();
                Expr::Name(name)
            }
            TokenKind::Int(value) => {
                self.advance();
                Expr::Int(value)
            }
            TokenKind::Float(value) => {
                self.advance();
                Expr::Float(value)
            }
            TokenKind::Str(_) | TokenKind::FString(_) => self.strings(line)?,
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Expr::Bool(true)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Expr::Bool(false)
            }
            TokenKind::Keyword(Keyword::None) => {
                self.advance();
                Expr::None
            }
            TokenKind::Op("(") => {
                self.advance();
                self.parenthesized()?
            }
            TokenKind::Op("[") => {
                self.advance();
                let mut items = Vec::new();
                while !self.at_op("]") {
                    items.push(self.expr()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("]")?;
                Expr::List(items)
            }
            TokenKind::Op("{") => {
                self.advance();
                self.dict()?
            }
            _ => return Err(self.error("invalid syntax")),
        };
        Ok(expr)
    }

    fn parenthesized(&mut self) -> Result<Expr>
    {
        if self.eat_op(")") {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.expr()?;
        if !self.at_op(",") {
            self.expect_op(")")?;
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op(")") {
                break;
            }
            items.push(self.expr()?);
        }
        self.expect_op(")")?;
        Ok(Expr::Tuple(items))
    }

    fn dict(&mut self) -> Result<Expr>
    {
        let mut entries = Vec::new();
        while !self.at_op("}") {
            let key = self.expr()?;
            if !self.eat_op(":") {
                return Err(self.error("set literals are not supported"));
            }
            let value = self.expr()?;
            entries.push((key, value));
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op("}")?;
        Ok(Expr::Dict(entries))
    }

    /// Adjacent string literals concatenate, f-strings included.
    fn strings(&mut self, line: u32) -> Result<Expr>
    {
        let mut parts = Vec::new();
        let mut interpolated = false;
        loop {
            match self.peek().clone() {
                TokenKind::Str(text) => {
                    self.advance();
                    parts.push(FStringPart::Literal(text));
                }
                TokenKind::FString(raw) => {
                    self.advance();
                    interpolated = true;
                    parts.extend(fstring_parts(&raw, line)?);
                }
                _ => break,
            }
        }

        if interpolated {
            return Ok(Expr::FString(parts));
        }
        let text: String = parts
            .into_iter()
            .filter_map(|part| match part {
                FStringPart::Literal(text) => Some(text),
                FStringPart::Field { .. } => None,
            })
            .collect();
        Ok(Expr::Str(Rc::from(text)))
    }
}

/// Split an f-string body into literal text and replacement fields.
fn fstring_parts(raw: &str, line: u32) -> Result<Vec<FStringPart>>
{
    let chars: Vec<char> = raw.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                literal.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                literal.push('}');
                i += 2;
            }
            '}' => return Err(ScriptError::syntax(line, "f-string: single '}' is not allowed")),
            '{' => {
                if !literal.is_empty() {
                    parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
                }
                let (field, end) = replacement_field(&chars, i + 1, line)?;
                parts.push(field);
                i = end + 1;
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        parts.push(FStringPart::Literal(literal));
    }
    Ok(parts)
}

/// Parse one `{expr[!r|!s][:spec]}` field starting after the `{`.
///
/// Returns the field and the index of its closing `}`.
fn replacement_field(chars: &[char], start: usize, line: u32) -> Result<(FStringPart, usize)>
{
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut conversion_at = None;
    let mut spec_at = None;
    let mut end = start;

    loop {
        let Some(&c) = chars.get(end) else {
            return Err(ScriptError::syntax(line, "f-string: expecting '}'"));
        };
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
        } else if spec_at.is_none() {
            match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '}' if depth > 0 => depth -= 1,
                '}' => break,
                '!' if depth == 0 && chars.get(end + 1) != Some(&'=') => conversion_at = Some(end),
                ':' if depth == 0 => spec_at = Some(end),
                _ => {}
            }
        } else if c == '}' {
            break;
        }
        end += 1;
    }

    let expr_end = conversion_at.or(spec_at).unwrap_or(end);
    let source: String = chars[start..expr_end].iter().collect();
    if source.trim().is_empty() {
        return Err(ScriptError::syntax(line, "f-string: empty expression not allowed"));
    }

    let repr = match conversion_at {
        Some(at) => {
            let conversion: String = chars[at + 1..spec_at.unwrap_or(end)].iter().collect();
            match conversion.as_str() {
                "r" => true,
                "s" => false,
                other => {
                    return Err(ScriptError::syntax(
                        line,
                        format!("f-string: invalid conversion character '{other}'"),
                    ));
                }
            }
        }
        None => false,
    };
    let spec = spec_at.map(|at| chars[at + 1..end].iter().collect::<String>());

    let expr = parse_expression(source.trim(), line)?;
    Ok((FStringPart::Field { expr, repr, spec }, end))
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn body(source: &str) -> Vec<Stmt>
    {
        parse(source).unwrap().body
    }

    #[test]
    fn test_statement_lines()
    {
        let stmts = body("x = 1\n\ndef f(a):\n    return a\n\nf(x)\n");
        let lines: Vec<u32> = stmts.iter().map(|stmt| stmt.line).collect();
        assert_eq!(lines, vec![1, 3, 6]);
        let StmtKind::FunctionDef(def) = &stmts[1].kind else {
            panic!("expected a function definition");
        };
        assert_eq!(def.name, "f");
        assert_eq!(def.body[0].line, 4);
    }

    #[test]
    fn test_precedence()
    {
        let stmts = body("1 + 2 * 3 ** 2\n");
        let StmtKind::Expr(Expr::Binary(left, BinOp::Add, right)) = &stmts[0].kind else {
            panic!("expected addition at the top");
        };
        assert_eq!(**left, Expr::Int(1));
        assert!(matches!(**right, Expr::Binary(_, BinOp::Mul, _)));
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power()
    {
        let stmts = body("-2 ** 2\n");
        assert!(matches!(&stmts[0].kind, StmtKind::Expr(Expr::Unary(UnaryOp::Neg, _))));
    }

    #[test]
    fn test_for_with_tuple_target()
    {
        let stmts = body("for key, value in data.items():\n    pass\n");
        let StmtKind::For { target, iter, .. } = &stmts[0].kind else {
            panic!("expected a for loop");
        };
        assert_eq!(
            *target,
            Target::Unpack(vec![Target::Name("key".into()), Target::Name("value".into())])
        );
        assert!(matches!(iter, Expr::Method(_, name, _) if name == "items"));
    }

    #[test]
    fn test_if_elif_else_branches()
    {
        let stmts = body("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        let StmtKind::If { branches, orelse } = &stmts[0].kind else {
            panic!("expected an if statement");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[1].line, 3);
        assert_eq!(orelse.as_ref().unwrap()[0].line, 6);
    }

    #[test]
    fn test_fstring_fields()
    {
        let stmts = body("f\"Hello, {name}! {{literal}} {value!r:>5}\"\n");
        let StmtKind::Expr(Expr::FString(parts)) = &stmts[0].kind else {
            panic!("expected an f-string");
        };
        assert_eq!(parts[0], FStringPart::Literal("Hello, ".into()));
        assert!(matches!(&parts[1], FStringPart::Field { expr: Expr::Name(n), repr: false, spec: None } if n == "name"));
        assert_eq!(parts[2], FStringPart::Literal("! {literal} ".into()));
        assert!(matches!(&parts[3], FStringPart::Field { repr: true, spec: Some(s), .. } if s == ">5"));
    }

    #[test]
    fn test_fstring_with_subscript_and_comparison()
    {
        let stmts = body("f\"{d['x']} {a != b}\"\n");
        let StmtKind::Expr(Expr::FString(parts)) = &stmts[0].kind else {
            panic!("expected an f-string");
        };
        assert!(matches!(&parts[0], FStringPart::Field { expr: Expr::Subscript(..), .. }));
        assert!(matches!(&parts[2], FStringPart::Field { expr: Expr::Compare(..), .. }));
    }

    #[test]
    fn test_try_except_as()
    {
        let stmts = body("try:\n    f()\nexcept ValueError as e:\n    pass\nexcept:\n    pass\n");
        let StmtKind::Try { handlers, .. } = &stmts[0].kind else {
            panic!("expected a try statement");
        };
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].name.as_deref(), Some("e"));
        assert_eq!(handlers[0].line, 3);
        assert!(handlers[1].kind.is_none());
    }

    #[test]
    fn test_chained_assignment_and_unpacking()
    {
        let stmts = body("a = b = 1\nx, y = y, x\n");
        assert!(matches!(&stmts[0].kind, StmtKind::Assign { targets, .. } if targets.len() == 2));
        assert!(matches!(&stmts[1].kind, StmtKind::Assign { targets, value: Expr::Tuple(_) } if matches!(targets[0], Target::Unpack(_))));
    }

    #[test]
    fn test_syntax_errors()
    {
        assert!(parse("break\n").unwrap_err().to_string().contains("'break' outside loop"));
        assert!(parse("return 1\n").unwrap_err().to_string().contains("'return' outside function"));
        assert!(parse("f() = 1\n").unwrap_err().to_string().contains("cannot assign"));
        assert!(parse("x = (1,\n").is_err());
        assert!(matches!(parse("  x = 1\n"), Err(ScriptError::Indentation { .. })));
        assert!(matches!(parse("if x:\npass\n"), Err(ScriptError::Indentation { .. })));
    }

    #[test]
    fn test_function_and_handler_rules()
    {
        let err = parse("def f(a, a):\n    pass\n").unwrap_err();
        assert!(err.to_string().contains("duplicate argument 'a' in function definition"));
        let err = parse("def f(a=1, b):\n    pass\n").unwrap_err();
        assert!(err.to_string().contains("non-default argument follows default argument"));
        let err = parse("try:\n    f()\nexcept:\n    pass\nexcept ValueError:\n    pass\n").unwrap_err();
        assert!(matches!(&err, ScriptError::Syntax { line: 5, message } if message == "default 'except:' must be last"));
    }

    #[test]
    fn test_continued_line_keeps_statement_line()
    {
        let stmts = body("total = 1 + \\\n    2\nprint(total)\n");
        let lines: Vec<u32> = stmts.iter().map(|stmt| stmt.line).collect();
        assert_eq!(lines, vec![1, 3]);
        assert!(matches!(&stmts[0].kind, StmtKind::Assign { value: Expr::Binary(..), .. }));
    }

    #[test]
    fn test_break_inside_function_inside_loop_is_rejected()
    {
        let source = "while True:\n    def f():\n        break\n";
        assert!(parse(source).is_err());
    }
}
