//! Abstract syntax tree: every node carries a [`Span`] and kind-specific
//! fields. Kinds are closed tagged unions matched exhaustively by the
//! printer and evaluator.

use crate::tokens::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Expression(ExpressionStmt),
    Local(LocalStmt),
    Assignment(AssignmentStmt),
    FunctionDeclaration(FunctionDeclarationStmt),
    If(IfStmt),
    While(WhileStmt),
    Repeat(RepeatStmt),
    ForNumeric(ForNumericStmt),
    ForGeneric(ForGenericStmt),
    Return(ReturnStmt),
    Break(Span),
    Do(DoStmt),
    Goto(GotoStmt),
    Label(LabelStmt),
    /// A bare `;` with no statement attached.
    Empty(Span),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Expression(s) => s.span,
            Statement::Local(s) => s.span,
            Statement::Assignment(s) => s.span,
            Statement::FunctionDeclaration(s) => s.span,
            Statement::If(s) => s.span,
            Statement::While(s) => s.span,
            Statement::Repeat(s) => s.span,
            Statement::ForNumeric(s) => s.span,
            Statement::ForGeneric(s) => s.span,
            Statement::Return(s) => s.span,
            Statement::Break(s) => *s,
            Statement::Do(s) => s.span,
            Statement::Goto(s) => s.span,
            Statement::Label(s) => s.span,
            Statement::Empty(s) => *s,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionStmt {
    pub expression: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStmt {
    pub variables: Vec<Identifier>,
    pub init: Vec<Expression>,
    pub span: Span,
}

/// An assignment target: only `Identifier` or `Member` expressions are legal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentStmt {
    pub targets: Vec<Expression>,
    pub init: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclarationStmt {
    /// Identifier or a dotted `Member` chain (`a.b.c`); method declarations
    /// (`function a:b(...)`) are represented as a `Member` chain whose final
    /// segment was parsed with `:` and an implicit leading `self` parameter.
    pub name: Expression,
    pub params: Vec<Identifier>,
    pub is_vararg: bool,
    pub body: Vec<Statement>,
    pub is_local: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfClause {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStmt {
    /// First entry is the `if` clause, the rest are `elseif` clauses.
    pub clauses: Vec<IfClause>,
    pub else_body: Option<Vec<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhileStmt {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatStmt {
    pub body: Vec<Statement>,
    pub condition: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForNumericStmt {
    pub variable: Identifier,
    pub start: Expression,
    pub end: Expression,
    pub step: Option<Expression>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForGenericStmt {
    pub variables: Vec<Identifier>,
    pub iterators: Vec<Expression>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub arguments: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoStmt {
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GotoStmt {
    pub label: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelStmt {
    pub name: String,
    pub span: Span,
}

// ── Expressions ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LiteralValue {
    Integer(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    /// The exact source lexeme this literal was parsed from, preserved for
    /// round-trip printing.
    pub raw: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Concat => "..",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "~=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    Len,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
            UnaryOp::Len => "#",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TableField {
    Array(Expression),
    Named(Identifier, Expression),
    Computed(Expression, Expression),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    Literal(Literal),
    Identifier(Identifier),
    Binary {
        operator: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },
    Unary {
        operator: UnaryOp,
        argument: Box<Expression>,
        span: Span,
    },
    Function {
        params: Vec<Identifier>,
        is_vararg: bool,
        body: Vec<Statement>,
        span: Span,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        is_method: bool,
        span: Span,
    },
    Member {
        base: Box<Expression>,
        /// The field name for non-computed access; unused (empty) when
        /// `computed` is true, in which case the key expression lives in a
        /// sibling `Call`-style construction via `MemberKey`.
        name: String,
        computed_key: Option<Box<Expression>>,
        computed: bool,
        span: Span,
    },
    TableConstructor {
        fields: Vec<TableField>,
        span: Span,
    },
    /// The `...` vararg expression, legal only inside a vararg function body.
    Vararg(Span),
    /// A parenthesized expression, `(inner)`. Kept as its own node rather than
    /// collapsed into `inner` because parentheses adjust arity: a
    /// parenthesized call or vararg truncates to exactly one value even in a
    /// tail position, where an unparenthesized one would expand.
    Paren {
        inner: Box<Expression>,
        span: Span,
    },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal(l) => l.span,
            Expression::Identifier(i) => i.span,
            Expression::Binary { span, .. }
            | Expression::Unary { span, .. }
            | Expression::Function { span, .. }
            | Expression::Call { span, .. }
            | Expression::Member { span, .. }
            | Expression::TableConstructor { span, .. }
            | Expression::Paren { span, .. } => *span,
            Expression::Vararg(span) => *span,
        }
    }

    /// Whether this expression is a legal assignment/`local function` name
    /// target: an `Identifier` or a `Member` chain.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Expression::Identifier(_) | Expression::Member { .. })
    }
}
