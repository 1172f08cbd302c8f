//! Static type rules, computed over the expression tree.
//!
//! `etype` is pure with respect to the variable table: it reads declared
//! types but never writes them. It still takes the environment mutably
//! because resolving an ARRAY type descriptor evaluates its bound
//! expressions, and those may call functions.

use std::io::Write;

use crate::ast::{BinOp, Expr, LValue, TypeDesc, UnaryOp};
use crate::error::{ExecResult, RuntimeError, TypeError};
use crate::types::{EType, Primitive};

use super::env::Env;
use super::eval::int_value;

pub(super) fn expect_type(found: &EType, expected: &EType) -> ExecResult<()> {
    if found != expected {
        return Err(TypeError::Mismatch {
            expected: expected.clone(),
            found: found.clone(),
        }
        .into());
    }
    Ok(())
}

fn expect_numeric(found: &EType) -> ExecResult<()> {
    if *found != EType::scalar(Primitive::Integer) && *found != EType::scalar(Primitive::Real) {
        return Err(TypeError::NotNumeric {
            found: found.clone(),
        }
        .into());
    }
    Ok(())
}

impl Expr {
    /// The effective type of this expression under the current bindings.
    pub fn etype<W: Write>(&self, env: &mut Env<'_, W>) -> ExecResult<EType> {
        match self {
            Expr::IntLit(_) => Ok(EType::scalar(Primitive::Integer)),
            Expr::RealLit(_) => Ok(EType::scalar(Primitive::Real)),
            Expr::StrLit(_) => Ok(EType::scalar(Primitive::String)),
            Expr::CharLit(_) => Ok(EType::scalar(Primitive::Char)),
            Expr::BoolLit(_) => Ok(EType::scalar(Primitive::Boolean)),
            Expr::DateLit(_) => Ok(EType::scalar(Primitive::Date)),
            Expr::LValue(lvalue) => lvalue.etype(env),
            Expr::Call { func, .. } => {
                let def = env
                    .get_func(*func)
                    .ok_or(RuntimeError::UndefinedFunction)?;
                match &def.ret {
                    Some(ret) => ret.to_etype(env),
                    None => Err(TypeError::ProcedureAsValue.into()),
                }
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let t = operand.etype(env)?;
                expect_type(&t, &EType::scalar(Primitive::Boolean))?;
                Ok(t)
            }
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                let t = operand.etype(env)?;
                expect_numeric(&t)?;
                Ok(t)
            }
            Expr::Binary { op, left, right } => {
                let ltype = left.etype(env)?;
                let rtype = right.etype(env)?;
                match op {
                    BinOp::Or | BinOp::And => {
                        expect_type(&ltype, &EType::scalar(Primitive::Boolean))?;
                        expect_type(&rtype, &EType::scalar(Primitive::Boolean))?;
                        Ok(EType::scalar(Primitive::Boolean))
                    }
                    BinOp::Eq
                    | BinOp::NotEq
                    | BinOp::Less
                    | BinOp::LessEq
                    | BinOp::Greater
                    | BinOp::GreaterEq => {
                        if ltype.is_array || rtype.is_array {
                            return Err(TypeError::ArrayCompare.into());
                        }
                        if ltype.is_invalid() || rtype.is_invalid() {
                            return Err(TypeError::CompareMismatch.into());
                        }
                        let cross = matches!(
                            (ltype.primtype, rtype.primtype),
                            (Primitive::Real, Primitive::Integer)
                                | (Primitive::Integer, Primitive::Real)
                        );
                        if !cross && ltype.primtype != rtype.primtype {
                            return Err(TypeError::CompareMismatch.into());
                        }
                        Ok(EType::scalar(Primitive::Boolean))
                    }
                    BinOp::Add | BinOp::Sub | BinOp::Mul => {
                        if !is_numeric(&ltype) || !is_numeric(&rtype) {
                            return Err(TypeError::BadArith.into());
                        }
                        if ltype.primtype == Primitive::Real || rtype.primtype == Primitive::Real {
                            Ok(EType::scalar(Primitive::Real))
                        } else {
                            Ok(EType::scalar(Primitive::Integer))
                        }
                    }
                    BinOp::Div => {
                        if !is_numeric(&ltype) || !is_numeric(&rtype) {
                            return Err(TypeError::BadArith.into());
                        }
                        Ok(EType::scalar(Primitive::Real))
                    }
                    BinOp::IntDiv | BinOp::Mod => {
                        expect_type(&ltype, &EType::scalar(Primitive::Integer))?;
                        expect_type(&rtype, &EType::scalar(Primitive::Integer))?;
                        Ok(EType::scalar(Primitive::Integer))
                    }
                }
            }
        }
    }
}

fn is_numeric(etype: &EType) -> bool {
    !etype.is_array
        && matches!(etype.primtype, Primitive::Integer | Primitive::Real)
}

impl LValue {
    /// The type this lvalue reads or writes: the variable's declared type,
    /// or its scalar element type once every dimension is indexed.
    pub fn etype<W: Write>(&self, env: &mut Env<'_, W>) -> ExecResult<EType> {
        let etype = env.get_type(self.id);
        if self.indexes.is_empty() {
            return Ok(etype);
        }
        if !etype.is_array || self.indexes.len() != etype.bounds.len() {
            return Err(TypeError::IndexArity {
                expected: etype.bounds.len(),
                got: self.indexes.len(),
            }
            .into());
        }
        for index in &self.indexes {
            let t = index.etype(env)?;
            expect_type(&t, &EType::scalar(Primitive::Integer))?;
        }
        Ok(etype.element_type())
    }
}

impl TypeDesc {
    /// Instantiate this descriptor, evaluating array bounds once. Bound
    /// expressions must be INTEGER.
    pub fn to_etype<W: Write>(&self, env: &mut Env<'_, W>) -> ExecResult<EType> {
        self.resolve(env, true)
    }

    fn resolve<W: Write>(&self, env: &mut Env<'_, W>, is_top: bool) -> ExecResult<EType> {
        match self {
            TypeDesc::Prim(primtype) => Ok(EType::scalar(*primtype)),
            TypeDesc::Array { start, end, elem } => {
                let mut etype = elem.resolve(env, false)?;
                let start_type = start.etype(env)?;
                let end_type = end.etype(env)?;
                if start_type != EType::scalar(Primitive::Integer)
                    || end_type != EType::scalar(Primitive::Integer)
                {
                    return Err(TypeError::BadBoundsType.into());
                }
                let lo = int_value(start.eval(env)?)?;
                let hi = int_value(end.eval(env)?)?;
                etype.is_array = true;
                etype.bounds.push((lo, hi));
                if is_top {
                    // Bounds were collected innermost-first on the way out.
                    etype.bounds.reverse();
                }
                Ok(etype)
            }
        }
    }
}
