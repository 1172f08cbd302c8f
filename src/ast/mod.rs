//! The expression/statement tree produced by the parser.
//!
//! Identifiers appear as the dense integer IDs the lexer interned; the tree
//! never stores names. Function and procedure definitions live inside the
//! statement that declared them, and the environment's function table
//! borrows them for the lifetime of the run.

use crate::fraction::Fraction;
use crate::interpreter::Date;
use crate::types::Primitive;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit(i64),
    RealLit(Fraction),
    StrLit(String),
    CharLit(u8),
    BoolLit(bool),
    DateLit(Date),
    LValue(LValue),
    /// A function used as a value: `fact(5)`.
    Call { func: i64, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// An addressable expression: a plain identifier, or an array identifier
/// with one index expression per declared dimension. `indexes` is empty for
/// the plain form.
#[derive(Debug, Clone, PartialEq)]
pub struct LValue {
    pub id: i64,
    pub indexes: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq
                | BinOp::NotEq
                | BinOp::Less
                | BinOp::LessEq
                | BinOp::Greater
                | BinOp::GreaterEq
        )
    }
}

/// A type as written in the source: a primitive name, or an ARRAY with
/// bound expressions that are evaluated when the type is instantiated.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    Prim(Primitive),
    Array {
        start: Box<Expr>,
        end: Box<Expr>,
        elem: Box<TypeDesc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Declare { id: i64, typ: TypeDesc },
    Constant { id: i64, expr: Expr },
    Procedure(FuncDef),
    Function(FuncDef),
    Assign { lvalue: LValue, expr: Expr },
    Input { lvalue: LValue },
    Output { exprs: Vec<Expr> },
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    Case {
        subject: LValue,
        arms: Vec<(Expr, Block)>,
        otherwise: Option<Block>,
    },
    For {
        id: i64,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
    },
    Repeat { body: Block, until: Expr },
    While { cond: Expr, body: Block },
    /// A procedure invocation; any returned value is discarded.
    CallProc { id: i64, args: Vec<Expr> },
    /// Handled by the enclosing [`Block`], never dispatched directly.
    Return { expr: Expr },
}

/// An ordered statement sequence. `is_func` marks blocks inside a FUNCTION
/// body, the only blocks a return signal propagates out of.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub is_func: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: i64,
    pub typ: TypeDesc,
    pub byref: bool,
}

/// A procedure or function definition. `ret` is present exactly for
/// functions.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub id: i64,
    pub params: Vec<Param>,
    pub ret: Option<TypeDesc>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}
