//! Tree-walking execution of a parsed program.
//!
//! The driver owns nothing: it walks a borrowed program tree against an
//! environment whose function table borrows definitions out of that same
//! tree. Execution is single-threaded and synchronous, and the first error
//! of any kind aborts the run.

pub mod env;
pub mod value;

mod eval;
mod exec;
mod typecheck;

pub use env::Env;
pub use value::{Date, Value};

use std::io::Write;

use tracing::debug;

use crate::ast::{Program, Stmt};
use crate::error::ExecResult;

use eval::init_value;

/// Run the top-level statement sequence.
///
/// DECLARE, CONSTANT, PROCEDURE and FUNCTION take effect here directly;
/// every other form goes through the block-level dispatch.
pub fn run<'a, W: Write>(program: &'a Program, env: &mut Env<'a, W>) -> ExecResult<()> {
    debug!(statements = program.stmts.len(), "running program");
    for stmt in &program.stmts {
        match stmt {
            Stmt::Declare { id, typ } => {
                let etype = typ.to_etype(env)?;
                env.set_type(*id, etype.clone());
                env.set_level(*id, 0);
                *env.value_mut(*id) = init_value(&etype)?;
            }
            Stmt::Constant { id, expr } => {
                let etype = expr.etype(env)?;
                env.set_type(*id, etype);
                *env.value_mut(*id) = expr.eval(env)?;
            }
            Stmt::Procedure(def) | Stmt::Function(def) => env.def_func(def.id, def),
            other => {
                other.exec(env)?;
            }
        }
    }
    Ok(())
}
