//! Statement and block execution.
//!
//! Blocks surface RETURN as a signal rather than a value: the block hands
//! the return expression back to its caller unevaluated, and only the
//! function-call protocol types and evaluates it. Loops and conditionals
//! forward the signal unchanged; blocks outside a function body do not.

use std::io::Write;

use crate::ast::{Block, Expr, Stmt};
use crate::error::{ExecResult, RuntimeError, TypeError};
use crate::fraction::Fraction;
use crate::types::{EType, Primitive};

use super::env::Env;
use super::eval::{call_func, frac_value, int_value};
use super::typecheck::expect_type;
use super::value::Value;

impl Stmt {
    /// Execute one block-level statement. `Some(expr)` means a RETURN
    /// signal is travelling upward.
    pub fn exec<'a, W: Write>(&'a self, env: &mut Env<'a, W>) -> ExecResult<Option<&'a Expr>> {
        match self {
            // Only meaningful at the top level; the driver handles them
            // there, so reaching them here is a malformed program.
            Stmt::Declare { .. }
            | Stmt::Constant { .. }
            | Stmt::Procedure(_)
            | Stmt::Function(_)
            | Stmt::Return { .. } => Err(RuntimeError::MisplacedStatement.into()),

            Stmt::Assign { lvalue, expr } => {
                let target = lvalue.etype(env)?;
                if target.is_invalid() {
                    return Err(RuntimeError::UndefinedVariable.into());
                }
                let source = expr.etype(env)?;
                if target == EType::scalar(Primitive::Real)
                    && source == EType::scalar(Primitive::Integer)
                {
                    let value = int_value(expr.eval(env)?)?;
                    *lvalue.place(env)? = Value::Real(Fraction::from(value));
                } else {
                    expect_type(&source, &target)?;
                    let value = expr.eval(env)?;
                    *lvalue.place(env)? = value;
                }
                Ok(None)
            }

            Stmt::Input { .. } => Err(RuntimeError::InputUnsupported.into()),

            Stmt::Output { exprs } => {
                for expr in exprs {
                    let etype = expr.etype(env)?;
                    let value = expr.eval(env)?;
                    env.output(&value, &etype)?;
                }
                env.newline()?;
                Ok(None)
            }

            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                expect_boolean(cond, env)?;
                if truth(cond.eval(env)?)? {
                    then_block.exec(env)
                } else if let Some(else_block) = else_block {
                    else_block.exec(env)
                } else {
                    Ok(None)
                }
            }

            Stmt::Case {
                subject,
                arms,
                otherwise,
            } => exec_case(env, subject, arms, otherwise.as_ref()),

            Stmt::For {
                id,
                start,
                end,
                step,
                body,
            } => exec_for(env, *id, start, end, step.as_ref(), body),

            Stmt::Repeat { body, until } => {
                expect_boolean(until, env)?;
                loop {
                    if let Some(ret) = body.exec(env)? {
                        return Ok(Some(ret));
                    }
                    if truth(until.eval(env)?)? {
                        return Ok(None);
                    }
                }
            }

            Stmt::While { cond, body } => {
                expect_boolean(cond, env)?;
                while truth(cond.eval(env)?)? {
                    if let Some(ret) = body.exec(env)? {
                        return Ok(Some(ret));
                    }
                }
                Ok(None)
            }

            Stmt::CallProc { id, args } => {
                call_func(env, *id, args)?;
                Ok(None)
            }
        }
    }
}

impl Block {
    /// Run the statements in order. A RETURN statement stops the block and
    /// lifts its expression out unevaluated; a signal arriving from a
    /// nested statement is forwarded only when this block belongs to a
    /// function body.
    pub fn exec<'a, W: Write>(&'a self, env: &mut Env<'a, W>) -> ExecResult<Option<&'a Expr>> {
        for stmt in &self.stmts {
            if let Stmt::Return { expr } = stmt {
                return Ok(Some(expr));
            }
            let ret = stmt.exec(env)?;
            if self.is_func && ret.is_some() {
                return Ok(ret);
            }
        }
        Ok(None)
    }
}

fn expect_boolean<W: Write>(expr: &Expr, env: &mut Env<'_, W>) -> ExecResult<()> {
    let t = expr.etype(env)?;
    expect_type(&t, &EType::scalar(Primitive::Boolean))
}

fn truth(value: Value) -> ExecResult<bool> {
    match value {
        Value::Boolean(b) => Ok(b),
        _ => Err(RuntimeError::Internal("condition is not a BOOLEAN").into()),
    }
}

fn exec_case<'a, W: Write>(
    env: &mut Env<'a, W>,
    subject: &'a crate::ast::LValue,
    arms: &'a [(Expr, Block)],
    otherwise: Option<&'a Block>,
) -> ExecResult<Option<&'a Expr>> {
    let subject_type = subject.etype(env)?;
    if subject_type.is_array {
        return Err(TypeError::ArrayInCase.into());
    }
    let subject_value = subject.eval(env)?;

    for (label, block) in arms {
        let label_type = label.etype(env)?;
        if label_type.is_array {
            return Err(TypeError::ArrayInCase.into());
        }
        let crossed = subject_type.primtype != label_type.primtype
            && (subject_type.primtype == Primitive::Real
                || label_type.primtype == Primitive::Real);
        let matched = if crossed {
            // INTEGER and REAL cross-promote; nothing else converts.
            if subject_type.primtype == Primitive::Integer {
                let label_value = frac_value(label.eval(env)?)?;
                match &subject_value {
                    Value::Integer(i) => label_value == Fraction::from(*i),
                    _ => return Err(RuntimeError::Internal("CASE selector shape").into()),
                }
            } else if label_type.primtype == Primitive::Integer {
                let label_value = Fraction::from(int_value(label.eval(env)?)?);
                match &subject_value {
                    Value::Real(r) => *r == label_value,
                    _ => return Err(RuntimeError::Internal("CASE selector shape").into()),
                }
            } else {
                return Err(TypeError::CaseRealConversion.into());
            }
        } else {
            expect_type(&label_type, &subject_type)?;
            if subject_type.is_invalid() {
                return Err(TypeError::UnassignedCase.into());
            }
            let label_value = label.eval(env)?;
            label_value == subject_value
        };
        if matched {
            return block.exec(env);
        }
    }
    match otherwise {
        Some(block) => block.exec(env),
        None => Ok(None),
    }
}

fn exec_for<'a, W: Write>(
    env: &mut Env<'a, W>,
    id: i64,
    start: &'a Expr,
    end: &'a Expr,
    step: Option<&'a Expr>,
    body: &'a Block,
) -> ExecResult<Option<&'a Expr>> {
    let mut parts: Vec<&Expr> = vec![start, end];
    if let Some(step) = step {
        parts.push(step);
    }
    let mut is_frac = false;
    for part in &parts {
        let t = part.etype(env)?;
        if t != EType::scalar(Primitive::Integer) && t != EType::scalar(Primitive::Real) {
            return Err(TypeError::NotNumeric { found: t }.into());
        }
        is_frac |= t.primtype == Primitive::Real;
    }
    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        values.push(part.eval(env)?);
    }

    // Shadow the loop variable; whatever was bound to the name before is
    // restored on every exit path.
    let old_type = env.get_type(id);
    let old = if old_type.is_invalid() {
        None
    } else {
        let old_value = env.get_value(id)?.clone();
        Some((old_type, old_value, env.get_level(id)))
    };
    env.delete_var(id);
    env.set_type(
        id,
        EType::scalar(if is_frac {
            Primitive::Real
        } else {
            Primitive::Integer
        }),
    );
    env.set_level(id, env.call_number);

    // Direction comes from the endpoints, not from the sign of the step.
    let mut returned = None;
    if is_frac {
        let from = frac_value(values[0].clone())?;
        let to = frac_value(values[1].clone())?;
        let step = match values.get(2) {
            Some(v) => frac_value(v.clone())?,
            None => Fraction::from(1),
        };
        let mut i = from;
        while if from <= to { i <= to } else { i >= to } {
            *env.value_mut(id) = Value::Real(i);
            if let Some(ret) = body.exec(env)? {
                returned = Some(ret);
                break;
            }
            i = i + step;
        }
    } else {
        let from = int_value(values[0].clone())?;
        let to = int_value(values[1].clone())?;
        let step = match values.get(2) {
            Some(v) => int_value(v.clone())?,
            None => 1,
        };
        let mut i = from;
        while if from <= to { i <= to } else { i >= to } {
            *env.value_mut(id) = Value::Integer(i);
            if let Some(ret) = body.exec(env)? {
                returned = Some(ret);
                break;
            }
            i = i.wrapping_add(step);
        }
    }

    env.delete_var(id);
    if let Some((etype, value, level)) = old {
        env.set_type(id, etype);
        env.set_level(id, level);
        *env.value_mut(id) = value;
    }
    Ok(returned)
}
