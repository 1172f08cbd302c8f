//! Error kinds surfaced by the evaluation pipeline.
//!
//! Nothing inside the core catches these: a run either completes or aborts
//! with exactly one of them. The umbrella [`Error`] is what the driver and
//! the end-to-end tests match on.

use thiserror::Error;

use crate::fraction::ArithError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::types::EType;

/// A violated type rule, from the checker or from a runtime type assertion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("bad type {found}, expected {expected}")]
    Mismatch { expected: EType, found: EType },

    #[error("bad type {found}, expected INTEGER or REAL")]
    NotNumeric { found: EType },

    #[error("invalid type applied to math expression")]
    BadArith,

    #[error("cannot compare two different types")]
    CompareMismatch,

    #[error("cannot compare array values")]
    ArrayCompare,

    #[error("cannot use the result of a procedure call")]
    ProcedureAsValue,

    #[error("function didn't return")]
    MissingReturn,

    #[error("cannot use array in CASE OF")]
    ArrayInCase,

    #[error("use of unassigned type within CASE statement")]
    UnassignedCase,

    #[error("cannot convert condition to REAL")]
    CaseRealConversion,

    #[error("cannot have array with larger start index than end")]
    BadBounds,

    #[error("array bounds must be INTEGERs")]
    BadBoundsType,

    #[error("wrong number of indexes: got {got}, expected {expected}")]
    IndexArity { expected: usize, got: usize },

    #[error("cannot OUTPUT an array value")]
    OutputArray,
}

/// A failure during execution that no type rule rules out.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("undefined variable")]
    UndefinedVariable,

    #[error("call to undefined function")]
    UndefinedFunction,

    #[error("out-of-bounds index {0}")]
    IndexOutOfBounds(i64),

    #[error("invalid number of parameters for function")]
    BadArity,

    #[error("BYREF is not supported")]
    ByRefUnsupported,

    #[error("inputting not implemented yet")]
    InputUnsupported,

    #[error(transparent)]
    Arith(#[from] ArithError),

    #[error("invalid start of statement (INTERNAL ERROR)")]
    MisplacedStatement,

    #[error("{0} (INTERNAL ERROR)")]
    Internal(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl From<ArithError> for Error {
    fn from(err: ArithError) -> Self {
        Error::Runtime(RuntimeError::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Runtime(RuntimeError::from(err))
    }
}

/// Result type threaded through the checker, the evaluator and the
/// statement executor.
pub type ExecResult<T> = Result<T, Error>;
