use serde::Serialize;

use crate::lexer::Span;
use crate::typechecker::scope::ScopeId;
use crate::typechecker::types::TypeId;
use crate::vm::value::Value;

use super::statement::{DeclRef, Statement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Less
                | BinaryOperator::Greater
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterEqual
        )
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOperator::Equal | BinaryOperator::NotEqual)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    Negate,
    Not,
    AddressOf,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::AddressOf => "&",
        }
    }
}

/// An expression node: the variant payload plus the common header filled
/// in by the type checker (`ty`, constant-ness, folded value).
#[derive(Debug, Clone, Serialize)]
pub struct Expression {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: TypeId,
    pub is_constant: bool,
    pub constant: Value,
}

impl Expression {
    pub fn new(kind: ExprKind, span: Span) -> Expression {
        Expression {
            kind,
            span,
            ty: TypeId::INVALID,
            is_constant: false,
            constant: Value::nil(),
        }
    }

    /// Sentinel produced on parse errors; the checker types it `invalid`
    /// without further diagnostics.
    pub fn bad(span: Span) -> Expression {
        Expression::new(ExprKind::Bad, span)
    }

    pub fn is_bad(&self) -> bool {
        matches!(self.kind, ExprKind::Bad)
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum ExprKind {
    /// Integer, float or bool literal; the parser fills `constant`/`ty`.
    Literal,
    Identifier(String),
    Grouping(Box<Expression>),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// `as(T) e`; also synthesized by the checker for implicit casts.
    Cast {
        target: Box<Expression>,
        operand: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
    Selector {
        target: Box<Expression>,
        select: Selector,
    },
    /// Postfix `e^`.
    Dereference(Box<Expression>),
    Assignment {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    FunctionType(FunctionType),
    Function(FunctionLiteral),
    Structure(Structure),
    StructLiteral {
        /// Type expression the literal was written against; `None` when
        /// the type has to come from an inference hint.
        target: Option<Box<Expression>>,
        members: Vec<Expression>,
        /// All members are `field = value` assignments. Set by the checker.
        designated: bool,
    },
    ArrayLiteral {
        element: Option<Box<Expression>>,
        elements: Vec<Expression>,
    },
    ArrayType {
        dimension: Box<Expression>,
        element: Box<Expression>,
    },
    /// `^T`.
    PointerType(Box<Expression>),
    /// Raw type value synthesized by the checker (implicit cast targets).
    /// Never produced by the parser.
    TypeLiteral,
    Bad,
}

#[derive(Debug, Clone, Serialize)]
pub enum Selector {
    /// `target.field`
    Field(String),
    /// `target[index]`
    Index(Box<Expression>),
}

/// Parameter of a function type: either a bare type (`func (i32)`) or a
/// full declaration (`func (n: i32)`). Named parameters share the
/// declaration payload used by statements.
#[derive(Debug, Clone, Serialize)]
pub enum Param {
    Anonymous(Expression),
    Named(DeclRef),
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionType {
    pub params: Vec<Param>,
    pub return_type: Option<Box<Expression>>,
    /// Scope holding the named parameters, assigned by the collector for
    /// standalone function types. Function literals keep their parameters
    /// in the function's own scope instead.
    pub scope: ScopeId,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionLiteral {
    /// Always an `ExprKind::FunctionType` node.
    pub func_type: Box<Expression>,
    /// Always a `Statement::Block`.
    pub body: Box<Statement>,
    pub scope: ScopeId,
    /// Name of the constant this literal initializes, if any. Lets the
    /// checker resolve the entity before the body for recursion, and
    /// names the compiled function.
    pub declared_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Structure {
    /// Member declarations (plus any stray statements, which the checker
    /// rejects as imperative code in a data scope).
    pub members: Vec<Statement>,
    pub scope: ScopeId,
    /// Name of the declaration this struct initializes; becomes the
    /// nominal type name.
    pub declared_name: Option<String>,
    pub end_span: Span,
}
