//! Expression evaluation and the function-call protocol.
//!
//! Evaluation presumes the type rules already passed; the value matches
//! below that cannot be reached through a well-typed tree fail with an
//! internal RuntimeError rather than a panic. Mixed INTEGER/REAL
//! arithmetic widens the integer side to a fraction at the operation
//! site.

use std::cmp::Ordering;
use std::io::Write;

use tracing::debug;

use crate::ast::{BinOp, Expr, FuncDef, LValue, UnaryOp};
use crate::error::{ExecResult, RuntimeError, TypeError};
use crate::fraction::Fraction;
use crate::types::{EType, Primitive};

use super::env::Env;
use super::typecheck::expect_type;
use super::value::Value;

pub(crate) fn int_value(value: Value) -> ExecResult<i64> {
    match value {
        Value::Integer(i) => Ok(i),
        _ => Err(RuntimeError::Internal("expected an INTEGER value").into()),
    }
}

/// Widen into the rational domain; INTEGERs are converted, REALs pass.
pub(crate) fn frac_value(value: Value) -> ExecResult<Fraction> {
    match value {
        Value::Integer(i) => Ok(Fraction::from(i)),
        Value::Real(r) => Ok(r),
        _ => Err(RuntimeError::Internal("expected a numeric value").into()),
    }
}

fn bool_value(value: Value) -> ExecResult<bool> {
    match value {
        Value::Boolean(b) => Ok(b),
        _ => Err(RuntimeError::Internal("expected a BOOLEAN value").into()),
    }
}

/// The default contents for a freshly declared variable: zero-like scalars,
/// and arrays recursively filled with them. Rejects bounds with a larger
/// start than end.
pub(crate) fn init_value(etype: &EType) -> ExecResult<Value> {
    if etype.is_array {
        build_array(etype.primtype, &etype.bounds)
    } else {
        Ok(scalar_default(etype.primtype))
    }
}

fn build_array(primtype: Primitive, bounds: &[(i64, i64)]) -> ExecResult<Value> {
    match bounds.split_first() {
        None => Ok(scalar_default(primtype)),
        Some((&(lo, hi), rest)) => {
            if lo > hi {
                return Err(TypeError::BadBounds.into());
            }
            let len = (hi - lo + 1) as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(build_array(primtype, rest)?);
            }
            Ok(Value::Array(items))
        }
    }
}

fn scalar_default(primtype: Primitive) -> Value {
    match primtype {
        Primitive::Integer | Primitive::Invalid => Value::Integer(0),
        Primitive::Real => Value::Real(Fraction::from(0)),
        Primitive::Char => Value::Char(b' '),
        Primitive::Boolean => Value::Boolean(false),
        Primitive::String => Value::String(String::new()),
        Primitive::Date => Value::Date(super::value::Date::default()),
    }
}

impl Expr {
    pub fn eval<W: Write>(&self, env: &mut Env<'_, W>) -> ExecResult<Value> {
        match self {
            Expr::IntLit(i) => Ok(Value::Integer(*i)),
            Expr::RealLit(r) => Ok(Value::Real(*r)),
            Expr::StrLit(s) => Ok(Value::String(s.clone())),
            Expr::CharLit(c) => Ok(Value::Char(*c)),
            Expr::BoolLit(b) => Ok(Value::Boolean(*b)),
            Expr::DateLit(d) => Ok(Value::Date(*d)),
            Expr::LValue(lvalue) => lvalue.eval(env),
            Expr::Call { func, args } => {
                // Type-checked already, so a missing value is a procedure.
                call_func(env, *func, args)?
                    .ok_or_else(|| TypeError::ProcedureAsValue.into())
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let b = bool_value(operand.eval(env)?)?;
                Ok(Value::Boolean(!b))
            }
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => match operand.eval(env)? {
                Value::Integer(i) => Ok(Value::Integer(i.wrapping_neg())),
                Value::Real(r) => Ok(Value::Real(-r)),
                _ => Err(RuntimeError::Internal("negating a non-numeric value").into()),
            },
            Expr::Binary { op, left, right } => {
                let lval = left.eval(env)?;
                let rval = right.eval(env)?;
                match op {
                    BinOp::Or => Ok(Value::Boolean(bool_value(lval)? | bool_value(rval)?)),
                    BinOp::And => Ok(Value::Boolean(bool_value(lval)? & bool_value(rval)?)),
                    op if op.is_comparison() => compare(*op, lval, rval),
                    BinOp::Add | BinOp::Sub | BinOp::Mul => arith(*op, lval, rval),
                    BinOp::Div => {
                        let dividend = frac_value(lval)?;
                        let divisor = frac_value(rval)?;
                        Ok(Value::Real(dividend.checked_div(divisor)?))
                    }
                    BinOp::IntDiv | BinOp::Mod => {
                        let a = int_value(lval)?;
                        let b = int_value(rval)?;
                        if b == 0 {
                            return Err(crate::fraction::ArithError::DivisionByZero.into());
                        }
                        Ok(Value::Integer(if *op == BinOp::IntDiv {
                            a.wrapping_div(b)
                        } else {
                            a.wrapping_rem(b)
                        }))
                    }
                    _ => Err(RuntimeError::Internal("invalid binary operator").into()),
                }
            }
        }
    }
}

fn compare(op: BinOp, lval: Value, rval: Value) -> ExecResult<Value> {
    let ordering = match (lval, rval) {
        (Value::Real(a), Value::Integer(b)) => a.cmp(&Fraction::from(b)),
        (Value::Integer(a), Value::Real(b)) => Fraction::from(a).cmp(&b),
        (Value::Integer(a), Value::Integer(b)) => a.cmp(&b),
        (Value::Real(a), Value::Real(b)) => a.cmp(&b),
        (Value::Char(a), Value::Char(b)) => a.cmp(&b),
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(&b),
        (Value::String(a), Value::String(b)) => a.cmp(&b),
        (Value::Date(a), Value::Date(b)) => a.cmp(&b),
        _ => return Err(RuntimeError::Internal("invalid comparison operands").into()),
    };
    let result = match op {
        BinOp::Eq => ordering == Ordering::Equal,
        BinOp::NotEq => ordering != Ordering::Equal,
        BinOp::Less => ordering == Ordering::Less,
        BinOp::LessEq => ordering != Ordering::Greater,
        BinOp::Greater => ordering == Ordering::Greater,
        BinOp::GreaterEq => ordering != Ordering::Less,
        _ => return Err(RuntimeError::Internal("invalid comparison operator").into()),
    };
    Ok(Value::Boolean(result))
}

fn arith(op: BinOp, lval: Value, rval: Value) -> ExecResult<Value> {
    match (lval, rval) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            _ => return Err(RuntimeError::Internal("invalid arithmetic operator").into()),
        })),
        (lval, rval) => {
            let a = frac_value(lval)?;
            let b = frac_value(rval)?;
            Ok(Value::Real(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                _ => return Err(RuntimeError::Internal("invalid arithmetic operator").into()),
            }))
        }
    }
}

impl LValue {
    /// Evaluate the index expressions (left to right, each required to be
    /// INTEGER) and check them against the declared bounds.
    fn resolve_indexes<W: Write>(&self, env: &mut Env<'_, W>) -> ExecResult<Vec<i64>> {
        let etype = env.get_type(self.id);
        if self.indexes.len() != etype.bounds.len() {
            return Err(TypeError::IndexArity {
                expected: etype.bounds.len(),
                got: self.indexes.len(),
            }
            .into());
        }
        let mut resolved = Vec::with_capacity(self.indexes.len());
        for index in &self.indexes {
            let t = index.etype(env)?;
            expect_type(&t, &EType::scalar(Primitive::Integer))?;
            resolved.push(int_value(index.eval(env)?)?);
        }
        Ok(resolved)
    }

    /// Read the addressed value. Indexing out of the declared bounds of any
    /// dimension is a RuntimeError.
    pub fn eval<W: Write>(&self, env: &mut Env<'_, W>) -> ExecResult<Value> {
        if self.indexes.is_empty() {
            return Ok(env.get_value(self.id)?.clone());
        }
        let bounds = env.get_type(self.id).bounds;
        let indexes = self.resolve_indexes(env)?;
        let mut value = env.get_value(self.id)?;
        for (&index, &(lo, hi)) in indexes.iter().zip(&bounds) {
            if index < lo || index > hi {
                return Err(RuntimeError::IndexOutOfBounds(index).into());
            }
            value = match value {
                Value::Array(items) => &items[(index - lo) as usize],
                _ => return Err(RuntimeError::Internal("indexing a non-array value").into()),
            };
        }
        Ok(value.clone())
    }

    /// A mutable handle on the addressed slot, for assignment.
    pub fn place<'e, W: Write>(&self, env: &'e mut Env<'_, W>) -> ExecResult<&'e mut Value> {
        if self.indexes.is_empty() {
            return Ok(env.value_mut(self.id));
        }
        let bounds = env.get_type(self.id).bounds;
        let indexes = self.resolve_indexes(env)?;
        let mut value = env.value_mut(self.id);
        for (&index, &(lo, hi)) in indexes.iter().zip(&bounds) {
            if index < lo || index > hi {
                return Err(RuntimeError::IndexOutOfBounds(index).into());
            }
            value = match value {
                Value::Array(items) => &mut items[(index - lo) as usize],
                _ => return Err(RuntimeError::Internal("indexing a non-array value").into()),
            };
        }
        Ok(value)
    }
}

/// Invoke a function or procedure.
///
/// Actual arguments are typed, checked against the declared parameter types
/// (no implicit conversions here) and evaluated left to right. Existing
/// bindings of the formal names are snapshotted, the formals are bound at
/// the new call depth, the body runs, and the snapshot is restored whether
/// or not a value was returned. Returns the produced value, or `None` for a
/// procedure.
pub(crate) fn call_func<'a, W: Write>(
    env: &mut Env<'a, W>,
    id: i64,
    args: &[Expr],
) -> ExecResult<Option<Value>> {
    let func: &'a FuncDef = env.get_func(id).ok_or(RuntimeError::UndefinedFunction)?;
    if args.len() != func.params.len() {
        return Err(RuntimeError::BadArity.into());
    }

    let mut argtypes = Vec::with_capacity(args.len());
    let mut argvals = Vec::with_capacity(args.len());
    for (arg, param) in args.iter().zip(&func.params) {
        let t = arg.etype(env)?;
        let declared = param.typ.to_etype(env)?;
        expect_type(&t, &declared)?;
        argvals.push(arg.eval(env)?);
        argtypes.push(t);
    }

    // Snapshot whatever the formal names were bound to before the call.
    let mut saved = Vec::with_capacity(func.params.len());
    for param in &func.params {
        if param.byref {
            return Err(RuntimeError::ByRefUnsupported.into());
        }
        let old_type = env.get_type(param.id);
        let old = if old_type.is_invalid() {
            None
        } else {
            let old_value = env.get_value(param.id)?.clone();
            Some((old_type, old_value, env.get_level(param.id)))
        };
        saved.push((param.id, old));
    }

    env.call_number += 1;
    debug!(call_number = env.call_number, "entering call frame");
    for ((param, etype), value) in func.params.iter().zip(argtypes).zip(argvals) {
        env.delete_var(param.id);
        env.set_type(param.id, etype.clone());
        env.set_level(param.id, env.call_number);
        *env.value_mut(param.id) = value;
        if etype.is_array {
            *env.value_mut(param.id) = init_value(&etype)?;
        }
    }

    let returned = func.body.exec(env)?;
    if returned.is_none() && func.ret.is_some() {
        return Err(TypeError::MissingReturn.into());
    }
    let mut retval = None;
    if let Some(expr) = returned {
        let ret = func
            .ret
            .as_ref()
            .ok_or(RuntimeError::Internal("procedure produced a return value"))?;
        let t = expr.etype(env)?;
        let declared = ret.to_etype(env)?;
        expect_type(&t, &declared)?;
        retval = Some(expr.eval(env)?);
    }

    env.call_number -= 1;
    for (param_id, old) in saved {
        env.delete_var(param_id);
        if let Some((etype, value, level)) = old {
            env.set_type(param_id, etype);
            env.set_level(param_id, level);
            *env.value_mut(param_id) = value;
        }
    }
    Ok(retval)
}
