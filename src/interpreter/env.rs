//! The runtime store.
//!
//! One flat table maps identifier IDs to `(type, value, scope level)`.
//! There is no frame stack: FOR loops and function calls shadow the entries
//! they need and restore them on exit, and the scope level is advisory
//! metadata recording the call depth at the point of binding. The function
//! table borrows definitions straight out of the program tree, which the
//! driver keeps alive for the whole run.

use std::collections::HashMap;
use std::io::Write;

use crate::ast::FuncDef;
use crate::error::{ExecResult, RuntimeError, TypeError};
use crate::types::EType;

use super::value::Value;

#[derive(Debug, Default)]
struct VarEntry {
    etype: EType,
    value: Value,
    level: i32,
}

/// The environment: variable table, function table, call-depth counter and
/// the output sink the OUTPUT statement renders into.
pub struct Env<'a, W> {
    vars: HashMap<i64, VarEntry>,
    funcs: HashMap<i64, &'a FuncDef>,
    pub call_number: i32,
    out: W,
}

impl<'a, W: Write> Env<'a, W> {
    pub fn new(out: W) -> Self {
        Self {
            vars: HashMap::new(),
            funcs: HashMap::new(),
            call_number: 0,
            out,
        }
    }

    /// The type bound to `id`; INVALID if it was never set.
    pub fn get_type(&self, id: i64) -> EType {
        self.vars
            .get(&id)
            .map(|entry| entry.etype.clone())
            .unwrap_or_default()
    }

    pub fn set_type(&mut self, id: i64, etype: EType) {
        self.vars.entry(id).or_default().etype = etype;
    }

    /// Read access to a bound value. Callers type-check first, so a missing
    /// entry means the program used a variable it never declared.
    pub fn get_value(&self, id: i64) -> ExecResult<&Value> {
        self.vars
            .get(&id)
            .map(|entry| &entry.value)
            .ok_or_else(|| RuntimeError::UndefinedVariable.into())
    }

    /// Mutable access, creating a default entry on first touch.
    pub fn value_mut(&mut self, id: i64) -> &mut Value {
        &mut self.vars.entry(id).or_default().value
    }

    pub fn get_level(&self, id: i64) -> i32 {
        self.vars.get(&id).map(|entry| entry.level).unwrap_or(0)
    }

    pub fn set_level(&mut self, id: i64, level: i32) {
        self.vars.entry(id).or_default().level = level;
    }

    /// Drop type, value and level; the identifier reads as INVALID again.
    pub fn delete_var(&mut self, id: i64) {
        self.vars.remove(&id);
    }

    pub fn get_func(&self, id: i64) -> Option<&'a FuncDef> {
        self.funcs.get(&id).copied()
    }

    pub fn def_func(&mut self, id: i64, def: &'a FuncDef) {
        self.funcs.insert(id, def);
    }

    /// Render one value into the sink.
    ///
    /// INTEGER prints as signed decimal, REAL as a reduced fraction with
    /// the `/1` suppressed, BOOLEAN as TRUE or FALSE, CHAR and STRING as
    /// their raw contents, DATE in ISO order.
    pub fn output(&mut self, value: &Value, etype: &EType) -> ExecResult<()> {
        if etype.is_array {
            return Err(TypeError::OutputArray.into());
        }
        match value {
            Value::Integer(i) => write!(self.out, "{i}")?,
            Value::Real(r) => write!(self.out, "{r}")?,
            Value::Char(c) => write!(self.out, "{}", *c as char)?,
            Value::Boolean(true) => write!(self.out, "TRUE")?,
            Value::Boolean(false) => write!(self.out, "FALSE")?,
            Value::String(s) => write!(self.out, "{s}")?,
            Value::Date(d) => write!(self.out, "{d}")?,
            Value::Array(_) => return Err(TypeError::OutputArray.into()),
        }
        Ok(())
    }

    /// Terminate the current OUTPUT statement.
    pub fn newline(&mut self) -> ExecResult<()> {
        writeln!(self.out)?;
        Ok(())
    }

    /// Hand back the sink, e.g. to inspect a test buffer.
    pub fn into_output(self) -> W {
        self.out
    }
}
