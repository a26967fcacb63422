//! Tokenizer.
//!
//! Raw tokens come from a [`logos`] lexer. A layout pass over them tracks
//! bracket depth and turns line starts into `Newline`, `Indent` and `Dedent`
//! the way Python does: blank and comment-only lines are ignored, and line
//! breaks inside brackets do not end a logical line. Line numbers are
//! derived from token spans.

use std::ops::Range;

use logos::{Lexer, Logos};
use thiserror::Error;

use crate::error::{Result, ScriptError};

const TAB_WIDTH: usize = 8;

/// Reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword
{
    And,
    As,
    Break,
    Continue,
    Def,
    Elif,
    Else,
    Except,
    False,
    For,
    If,
    In,
    Is,
    None,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    True,
    Try,
    While,
}

/// Token payload
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind
{
    Name(String),
    Keyword(Keyword),
    Int(i64),
    Float(f64),
    Str(String),
    /// Raw body of an f-string; interpolations are parsed later.
    FString(String),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

/// A token and the 1-based line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Token
{
    pub kind: TokenKind,
    pub line: u32,
}

/// Failure inside a single raw token
#[derive(Error, Debug, Clone, PartialEq, Default)]
enum LexError
{
    #[default]
    #[error("invalid character")]
    InvalidCharacter,

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated triple-quoted string literal")]
    UnterminatedTripleString,

    #[error("integer literal too large: {0}")]
    IntegerTooLarge(String),

    #[error("invalid float literal '{0}'")]
    InvalidFloat(String),
}

/// Alias so the `Logos` derive does not rewrite the `'static` lifetime
/// to the source lifetime.
type StaticStr = &'static str;

/// Tokens as the source spells them, before layout
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\x0c]+")]
#[logos(error = LexError)]
enum Raw
{
    #[regex(r"#[^\n]*", logos::skip, allow_greedy = true)]
    #[regex(r"\\\r?\n", logos::skip)]
    Skipped,

    #[regex(r"\r?\n")]
    Newline,

    #[token("and", |_| Keyword::And)]
    #[token("as", |_| Keyword::As)]
    #[token("break", |_| Keyword::Break)]
    #[token("continue", |_| Keyword::Continue)]
    #[token("def", |_| Keyword::Def)]
    #[token("elif", |_| Keyword::Elif)]
    #[token("else", |_| Keyword::Else)]
    #[token("except", |_| Keyword::Except)]
    #[token("False", |_| Keyword::False)]
    #[token("for", |_| Keyword::For)]
    #[token("if", |_| Keyword::If)]
    #[token("in", |_| Keyword::In)]
    #[token("is", |_| Keyword::Is)]
    #[token("None", |_| Keyword::None)]
    #[token("not", |_| Keyword::Not)]
    #[token("or", |_| Keyword::Or)]
    #[token("pass", |_| Keyword::Pass)]
    #[token("raise", |_| Keyword::Raise)]
    #[token("return", |_| Keyword::Return)]
    #[token("True", |_| Keyword::True)]
    #[token("try", |_| Keyword::Try)]
    #[token("while", |_| Keyword::While)]
    Keyword(Keyword),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),

    #[regex(r"[0-9][0-9_]*", int)]
    Int(i64),

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?", float)]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", float)]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", float)]
    Float(f64),

    #[regex(r#""""|'''|"|'"#, string)]
    Str(String),

    #[regex(r#"[fF]("""|'''|"|')"#, string)]
    FString(String),

    #[regex(r#"([rRbB]|[rR][bB]|[bB][rR])["']"#, |lex| lex.slice().to_string())]
    UnsupportedPrefix(String),

    #[token("**=", |_| "**=")]
    #[token("//=", |_| "//=")]
    #[token("**", |_| "**")]
    #[token("//", |_| "//")]
    #[token("==", |_| "==")]
    #[token("!=", |_| "!=")]
    #[token("<=", |_| "<=")]
    #[token(">=", |_| ">=")]
    #[token("+=", |_| "+=")]
    #[token("-=", |_| "-=")]
    #[token("*=", |_| "*=")]
    #[token("/=", |_| "/=")]
    #[token("%=", |_| "%=")]
    #[token("->", |_| "->")]
    #[token("+", |_| "+")]
    #[token("-", |_| "-")]
    #[token("*", |_| "*")]
    #[token("/", |_| "/")]
    #[token("%", |_| "%")]
    #[token("<", |_| "<")]
    #[token(">", |_| ">")]
    #[token("=", |_| "=")]
    #[token("(", |_| "(")]
    #[token(")", |_| ")")]
    #[token("[", |_| "[")]
    #[token("]", |_| "]")]
    #[token("{", |_| "{")]
    #[token("}", |_| "}")]
    #[token(",", |_| ",")]
    #[token(":", |_| ":")]
    #[token(".", |_| ".")]
    #[token(";", |_| ";")]
    Op(StaticStr),
}

fn int(lex: &mut Lexer<'_, Raw>) -> std::result::Result<i64, LexError>
{
    let digits = lex.slice().replace('_', "");
    digits.parse().map_err(|_| LexError::IntegerTooLarge(digits))
}

fn float(lex: &mut Lexer<'_, Raw>) -> std::result::Result<f64, LexError>
{
    let digits = lex.slice().replace('_', "");
    digits.parse().map_err(|_| LexError::InvalidFloat(digits))
}

/// Read the rest of a string whose opening quote (and prefix) was matched.
fn string(lex: &mut Lexer<'_, Raw>) -> std::result::Result<String, LexError>
{
    let opening = lex.slice().trim_start_matches(['f', 'F']);
    let triple = opening.len() == 3;
    let quote = if opening.starts_with('\'') { '\'' } else { '"' };
    let (text, consumed) = scan_string(lex.remainder(), quote, triple)?;
    lex.bump(consumed);
    Ok(text)
}

/// Decode a string body up to its closing quote.
///
/// Returns the text and the number of bytes consumed, closing quote included.
fn scan_string(body: &str, quote: char, triple: bool) -> std::result::Result<(String, usize), LexError>
{
    let unterminated = if triple {
        LexError::UnterminatedTripleString
    } else {
        LexError::UnterminatedString
    };
    let closing: String = [quote; 3].iter().collect();

    let mut text = String::new();
    let mut chars = body.char_indices();
    while let Some((at, c)) = chars.next() {
        match c {
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    return Err(unterminated);
                };
                push_escape(&mut text, escaped);
            }
            '\n' if !triple => return Err(unterminated),
            c if c == quote && !triple => return Ok((text, at + 1)),
            c if c == quote && body[at..].starts_with(&closing) => return Ok((text, at + closing.len())),
            c => text.push(c),
        }
    }
    Err(unterminated)
}

fn push_escape(text: &mut String, escaped: char)
{
    match escaped {
        'n' => text.push('\n'),
        't' => text.push('\t'),
        'r' => text.push('\r'),
        '0' => text.push('\0'),
        '\\' => text.push('\\'),
        '\'' => text.push('\''),
        '"' => text.push('"'),
        // line continuation inside the literal
        '\n' => {}
        other => {
            text.push('\\');
            text.push(other);
        }
    }
}

/// Byte offsets where each line starts
struct LineIndex
{
    starts: Vec<usize>,
}

impl LineIndex
{
    fn new(source: &str) -> Self
    {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(at, _)| at + 1))
            .collect();
        Self { starts }
    }

    /// 1-based line containing `offset`, and the offset that line starts at.
    fn locate(&self, offset: usize) -> (u32, usize)
    {
        let count = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[count.saturating_sub(1)];
        (u32::try_from(count).unwrap_or(u32::MAX), start)
    }
}

/// Turn source text into tokens.
///
/// # Errors
///
/// Returns [`ScriptError::Syntax`] for malformed literals or stray characters
/// and [`ScriptError::Indentation`] for inconsistent dedents.
pub fn tokenize(source: &str) -> Result<Vec<Token>>
{
    let mut layout = Layout::new(source);
    let mut lexer = Raw::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(raw) => layout.push(raw, span)?,
            Err(err) => {
                let (line, _) = layout.lines.locate(span.start);
                let message = match err {
                    LexError::InvalidCharacter => format!("invalid character '{}'", lexer.slice()),
                    other => other.to_string(),
                };
                return Err(ScriptError::syntax(line, message));
            }
        }
    }

    Ok(layout.finish())
}

/// Indentation and logical-line tracking over raw tokens
struct Layout<'s>
{
    source: &'s str,
    lines: LineIndex,
    indents: Vec<usize>,
    depth: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl<'s> Layout<'s>
{
    fn new(source: &'s str) -> Self
    {
        Self {
            source,
            lines: LineIndex::new(source),
            indents: vec![0],
            depth: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn push(&mut self, raw: Raw, span: Range<usize>) -> Result<()>
    {
        let (line, line_start) = self.lines.locate(span.start);
        let kind = match raw {
            Raw::Skipped => return Ok(()),
            Raw::Newline => {
                if self.depth == 0 {
                    self.end_logical_line(line);
                    self.at_line_start = true;
                }
                return Ok(());
            }
            Raw::UnsupportedPrefix(opening) => {
                let prefix = opening.trim_end_matches(['"', '\'']);
                return Err(ScriptError::syntax(line, format!("unsupported string prefix '{prefix}'")));
            }
            Raw::Keyword(keyword) => TokenKind::Keyword(keyword),
            Raw::Name(name) => TokenKind::Name(name),
            Raw::Int(value) => TokenKind::Int(value),
            Raw::Float(value) => TokenKind::Float(value),
            Raw::Str(text) => TokenKind::Str(text),
            Raw::FString(body) => TokenKind::FString(body),
            Raw::Op(symbol) => TokenKind::Op(symbol),
        };

        if self.at_line_start && self.depth == 0 {
            let source = self.source;
            self.indent(&source[line_start..span.start], line)?;
        }
        self.at_line_start = false;

        if let TokenKind::Op(symbol) = kind {
            match symbol {
                "(" | "[" | "{" => self.depth += 1,
                ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
        }
        self.tokens.push(Token { kind, line });
        Ok(())
    }

    /// Compare the leading whitespace of a new logical line with the
    /// enclosing blocks.
    fn indent(&mut self, leading: &str, line: u32) -> Result<()>
    {
        let width = leading.chars().fold(0, |width, c| match c {
            ' ' => width + 1,
            '\t' => (width / TAB_WIDTH + 1) * TAB_WIDTH,
            '\x0c' => 0,
            _ => width,
        });

        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.tokens.push(Token {
                kind: TokenKind::Indent,
                line,
            });
        } else if width < current {
            while self.indents.last().is_some_and(|&level| level > width) {
                self.indents.pop();
                self.tokens.push(Token {
                    kind: TokenKind::Dedent,
                    line,
                });
            }
            if self.indents.last().copied().unwrap_or(0) != width {
                return Err(ScriptError::indentation(
                    line,
                    "unindent does not match any outer indentation level",
                ));
            }
        }
        Ok(())
    }

    fn end_logical_line(&mut self, line: u32)
    {
        let ended = matches!(
            self.tokens.last().map(|token| &token.kind),
            None | Some(TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
        );
        if !ended {
            self.tokens.push(Token {
                kind: TokenKind::Newline,
                line,
            });
        }
    }

    fn finish(mut self) -> Vec<Token>
    {
        let (line, _) = self.lines.locate(self.source.len());
        self.end_logical_line(line);
        while self.indents.len() > 1 {
            self.indents.pop();
            self.tokens.push(Token {
                kind: TokenKind::Dedent,
                line,
            });
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            line,
        });
        self.tokens
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind>
    {
        tokenize(source).unwrap().into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn test_indent_and_dedent()
    {
        let kinds = kinds("if x:\n    y = 1\nz\n");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword(Keyword::If),
                TokenKind::Name("x".into()),
                TokenKind::Op(":"),
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Name("y".into()),
                TokenKind::Op("="),
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Name("z".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_blank_lines_and_comments_are_skipped()
    {
        let tokens = tokenize("# header\n\nx = 1  # trailing\n\n   \ny = 2").unwrap();
        let lines: Vec<u32> = tokens
            .iter()
            .filter(|token| matches!(token.kind, TokenKind::Name(_)))
            .map(|token| token.line)
            .collect();
        assert_eq!(lines, vec![3, 6]);
        assert!(!tokens.iter().any(|token| token.kind == TokenKind::Indent));
    }

    #[test]
    fn test_brackets_join_lines()
    {
        let kinds = kinds("x = [1,\n     2]\n");
        assert_eq!(kinds.iter().filter(|kind| **kind == TokenKind::Newline).count(), 1);
        assert!(!kinds.contains(&TokenKind::Indent));
    }

    #[test]
    fn test_backslash_continues_the_line()
    {
        let tokens = tokenize("total = 1 + \\\n        2\nprint(total)\n").unwrap();
        assert!(!tokens.iter().any(|token| token.kind == TokenKind::Indent));
        assert_eq!(tokens.iter().filter(|token| token.kind == TokenKind::Newline).count(), 2);
        let print = tokens.iter().find(|token| token.kind == TokenKind::Name("print".into())).unwrap();
        assert_eq!(print.line, 3);
    }

    #[test]
    fn test_strings_and_fstrings()
    {
        let kinds = kinds(r#"a = 'it\'s' + "tab\t" + f"Hello, {name}!""#);
        assert!(kinds.contains(&TokenKind::Str("it's".into())));
        assert!(kinds.contains(&TokenKind::Str("tab\t".into())));
        assert!(kinds.contains(&TokenKind::FString("Hello, {name}!".into())));
        assert!(kinds.contains(&TokenKind::Name("a".into())));
    }

    #[test]
    fn test_empty_string_and_keyword_prefixed_names()
    {
        let kinds = kinds("format = ''\nifs = \"\"\n");
        assert!(kinds.contains(&TokenKind::Name("format".into())));
        assert!(kinds.contains(&TokenKind::Name("ifs".into())));
        assert_eq!(kinds.iter().filter(|kind| **kind == TokenKind::Str(String::new())).count(), 2);
    }

    #[test]
    fn test_triple_quoted_docstring_spans_lines()
    {
        let tokens = tokenize("\"\"\"Doc\nstring.\"\"\"\nx = 1\n").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str("Doc\nstring.".into()));
        assert_eq!(tokens[2].line, 3);
    }

    #[test]
    fn test_numbers()
    {
        let kinds = kinds("1_000 2.5 1e3 .5");
        assert_eq!(kinds[0], TokenKind::Int(1000));
        assert_eq!(kinds[1], TokenKind::Float(2.5));
        assert_eq!(kinds[2], TokenKind::Float(1000.0));
        assert_eq!(kinds[3], TokenKind::Float(0.5));
    }

    #[test]
    fn test_longest_operator_wins()
    {
        let kinds = kinds("a //= b ** c");
        assert!(kinds.contains(&TokenKind::Op("//=")));
        assert!(kinds.contains(&TokenKind::Op("**")));
    }

    #[test]
    fn test_bad_dedent_is_an_indentation_error()
    {
        let err = tokenize("if x:\n        y\n    z\n").unwrap_err();
        assert!(matches!(err, ScriptError::Indentation { line: 3, .. }));
    }

    #[test]
    fn test_unterminated_string()
    {
        let err = tokenize("x = 'oops\n").unwrap_err();
        assert!(err.to_string().contains("unterminated string"));
        let err = tokenize("x = \"\"\"never closed\n").unwrap_err();
        assert!(err.to_string().contains("unterminated triple-quoted string"));
    }

    #[test]
    fn test_rejected_input_reports_its_line()
    {
        let err = tokenize("x = 1\ny = $\n").unwrap_err();
        assert!(matches!(&err, ScriptError::Syntax { line: 2, message } if message == "invalid character '$'"));
        let err = tokenize("path = r'C:\\temp'\n").unwrap_err();
        assert!(err.to_string().contains("unsupported string prefix 'r'"));
        assert!(tokenize("n = 99999999999999999999\n").unwrap_err().to_string().contains("too large"));
    }
}
