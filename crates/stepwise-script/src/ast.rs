//! Syntax tree.

use std::rc::Rc;

/// A parsed script
#[derive(Debug, Clone, PartialEq)]
pub struct Program
{
    pub body: Vec<Stmt>,
}

/// A statement and the line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt
{
    pub line: u32,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind
{
    Expr(Expr),
    /// `a = b = value`
    Assign
    {
        targets: Vec<Target>,
        value: Expr,
    },
    AugAssign
    {
        target: Target,
        op: BinOp,
        value: Expr,
    },
    /// `if`/`elif` branches in order, then the optional `else` body.
    If
    {
        branches: Vec<Branch>,
        orelse: Option<Vec<Stmt>>,
    },
    While
    {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For
    {
        target: Target,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    Pass,
    FunctionDef(Rc<FunctionDef>),
    Return(Option<Expr>),
    Raise(Option<Expr>),
    Try
    {
        body: Vec<Stmt>,
        handlers: Vec<Handler>,
    },
}

/// One `if` or `elif` arm
#[derive(Debug, Clone, PartialEq)]
pub struct Branch
{
    pub line: u32,
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

/// `except [Type [as name]]:`
#[derive(Debug, Clone, PartialEq)]
pub struct Handler
{
    pub line: u32,
    pub kind: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef
{
    pub name: String,
    pub line: u32,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param
{
    pub name: String,
    pub default: Option<Expr>,
}

/// Left-hand side of an assignment or a `for` loop
#[derive(Debug, Clone, PartialEq)]
pub enum Target
{
    Name(String),
    Subscript
    {
        object: Expr,
        index: Expr,
    },
    Unpack(Vec<Target>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr
{
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    FString(Vec<FStringPart>),
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    /// `a < b <= c`
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    /// `body if cond else orelse`
    IfExp
    {
        cond: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Call(Box<Expr>, Vec<Expr>),
    /// `receiver.name(args)`
    Method(Box<Expr>, String, Vec<Expr>),
    Subscript(Box<Expr>, Box<Expr>),
    /// `object[lower:upper]`
    Slice
    {
        object: Box<Expr>,
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart
{
    Literal(String),
    Field
    {
        expr: Expr,
        repr: bool,
        spec: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp
{
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp
{
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp
{
    /// Operator text as written in source.
    #[must_use]
    pub const fn symbol(self) -> &'static str
    {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp
{
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp
{
    #[must_use]
    pub const fn symbol(self) -> &'static str
    {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Is => "is",
            Self::IsNot => "is not",
        }
    }
}
