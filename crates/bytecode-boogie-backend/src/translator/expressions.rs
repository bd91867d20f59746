// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Lowering of operands and right-hand sides.
//!
//! Reading through a reference other than the receiver raises a non-null obligation,
//! and array accesses raise an index obligation unless bounds checks are disabled.
//! Allocation and calls are not operands; they are handled by the assignment lowering.

use super::StatementTranslator;
use crate::error_model::ViolationKind;
use crate::prelude::{
    BIT_AND, BIT_OR, BIT_XOR, CMPG_REAL, CMPL_REAL, CMP_INT, REM_INT, REM_REAL, SHL, SHR, USHR,
};
use anyhow::{anyhow, bail, Result};
use boogie_ast::{BinOp, BoogieType, Expression, Ident, Statement, UnOp};
use class_bytecode::{BinaryOp, Constant, UnaryOp, Value};
use class_model::Type;

impl<'a, 'env> StatementTranslator<'a, 'env> {
    pub(super) fn translate_value(&mut self, value: &Value) -> Result<Expression> {
        match value {
            Value::Local(idx) => Ok(self.locals.local(*idx)?.expr()),
            Value::Constant(constant) => self.translate_constant(constant),
            Value::ParameterRef(idx) => match self.info.params.get(*idx) {
                Some(param) => Ok(param.expr()),
                None => bail!("reference to missing parameter {}", idx),
            },
            Value::ThisRef => match &self.info.this_param {
                Some(this) => Ok(this.expr()),
                None => bail!("`this` referenced in a static method"),
            },
            Value::CaughtExceptionRef => Ok(self.info.exception_var.expr()),
            Value::InstanceField { base, field } => {
                let base = self.dereference(base)?;
                let field = self.ctx.field(*field)?;
                if !matches!(field.ty, BoogieType::Field(_)) {
                    bail!("static field `{}` accessed through an instance", field.name);
                }
                Ok(self.ctx.prelude.heap_read(base, &field))
            }
            Value::StaticField(field) => {
                let field = self.ctx.field(*field)?;
                if matches!(field.ty, BoogieType::Field(_)) {
                    bail!("instance field `{}` accessed statically", field.name);
                }
                Ok(field.expr())
            }
            Value::ArrayElement { base, index } => self.translate_array_element(base, index),
            Value::ArrayLength(base) => {
                let base = self.dereference(base)?;
                Ok(Expression::select(self.ctx.prelude.array_size.expr(), vec![base]))
            }
            Value::Binary { op, lhs, rhs } => self.translate_binary(*op, lhs, rhs),
            Value::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                let operand = self.translate_value(operand)?;
                Ok(Expression::Unary {
                    op: UnOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Value::Cast { value, ty } => self.translate_cast(value, ty),
            Value::InstanceOf { value, ty } => {
                let value = self.translate_value(value)?;
                Ok(self.instance_of(value, ty))
            }
            Value::New(_)
            | Value::NewArray { .. }
            | Value::NewMultiArray { .. }
            | Value::Invoke(_) => bail!("`{}` cannot appear as an operand", value),
        }
    }

    /// Lowers `base` and raises a non-null obligation unless it is the receiver.
    pub(super) fn dereference(&mut self, base: &Value) -> Result<Expression> {
        let expr = self.translate_value(base)?;
        if !self.is_receiver(base) {
            let policy = self.policy;
            policy.non_null_guard(&mut self.sink(), expr.clone());
        }
        Ok(expr)
    }

    fn is_receiver(&self, value: &Value) -> bool {
        match value {
            Value::ThisRef => true,
            Value::Local(idx) => self.this_locals.contains(idx),
            _ => false,
        }
    }

    pub(super) fn coerce(&self, expr: Expression, to: &BoogieType) -> Result<Expression> {
        let from = expr.ty();
        self.ctx
            .prelude
            .coerce(expr, to)
            .ok_or_else(|| anyhow!("cannot convert a value of type `{}` to `{}`", from, to))
    }

    /// `value != $null && $heap[value, $type] <: tag(ty)`
    pub(super) fn instance_of(&self, value: Expression, ty: &Type) -> Expression {
        let prelude = &self.ctx.prelude;
        Expression::and(
            prelude.is_non_null(value.clone()),
            Expression::subtype(prelude.type_of(value), self.ctx.type_tag(ty).expr()),
        )
    }

    /// Emits the allocation sequence for a fresh local of type `ty` and returns it.
    pub(super) fn allocate(&mut self, ty: &Type) -> Ident {
        let fresh = self.locals.fresh(BoogieType::Ref);
        self.allocate_into(&fresh, ty);
        fresh
    }

    /// `havoc r; assume !allocated(r); allocated(r) := true; assume r != null; type(r) := ty`
    pub(super) fn allocate_into(&mut self, target: &Ident, ty: &Type) {
        let prelude = &self.ctx.prelude;
        let r = target.expr();
        let tag = self.ctx.type_tag(ty);
        let statements = [
            Statement::Havoc(vec![target.clone()]),
            Statement::Assume(Expression::not(prelude.heap_read(r.clone(), &prelude.alloc))),
            prelude.heap_write(r.clone(), &prelude.alloc, Expression::BoolLit(true)),
            Statement::Assume(prelude.is_non_null(r.clone())),
            prelude.heap_write(r, &prelude.type_field, tag.expr()),
        ];
        self.out.extend(statements);
    }

    fn translate_constant(&mut self, constant: &Constant) -> Result<Expression> {
        Ok(match constant {
            Constant::Int(v) => Expression::IntLit(i64::from(*v)),
            Constant::Long(v) => Expression::IntLit(*v),
            Constant::Float(v) => {
                if !v.is_finite() {
                    bail!("non-finite float constant {}", v);
                }
                let text = v.to_string();
                Expression::RealLit(if text.contains('.') { text } else { format!("{}.0", text) })
            }
            Constant::Bool(v) => Expression::BoolLit(*v),
            Constant::Null => self.ctx.prelude.null.expr(),
            Constant::String(s) => {
                // contents are abstracted, only the length is tracked
                let string = Type::Class(self.ctx.env.string_class());
                let r = self.allocate(&string);
                let length = Expression::IntLit(s.encode_utf16().count() as i64);
                let ctx = self.ctx;
                let string_size = &ctx.prelude.string_size;
                self.emit(Statement::assign(
                    string_size,
                    Expression::store(string_size.expr(), vec![r.expr()], length),
                ));
                r.expr()
            }
        })
    }

    fn translate_array_element(&mut self, base: &Value, index: &Value) -> Result<Expression> {
        let env = self.ctx.env;
        let elem_type = base
            .get_type(env, self.body)
            .and_then(|ty| ty.element_type().cloned())
            .ok_or_else(|| anyhow!("cannot determine the element type of `{}`", base))?;
        let elem_type = self.ctx.boogie_type(&elem_type)?;
        let heap = self
            .ctx
            .prelude
            .array_heap(&elem_type)
            .ok_or_else(|| anyhow!("no element heap for `{}`", elem_type))?
            .clone();

        let base = self.dereference(base)?;
        let index = self.translate_value(index)?;
        let index = self.coerce(index, &BoogieType::Int)?;
        if !self.ctx.options.no_array_bounds_checks {
            let length = Expression::select(self.ctx.prelude.array_size.expr(), vec![base.clone()]);
            let guard = Expression::and(
                Expression::binary(BinOp::Le, Expression::IntLit(0), index.clone()),
                Expression::binary(BinOp::Lt, index.clone(), length),
            );
            let policy = self.policy;
            policy.report(&mut self.sink(), ViolationKind::ArrayBounds, Some(guard));
        }
        Ok(Expression::select(
            Expression::select(heap.expr(), vec![base]),
            vec![index],
        ))
    }

    fn translate_cast(&mut self, value: &Value, ty: &Type) -> Result<Expression> {
        let expr = self.translate_value(value)?;
        if !ty.is_reference() {
            return self.coerce(expr, &self.ctx.boogie_type(ty)?);
        }
        let guard = Expression::or(
            Expression::eq(expr.clone(), self.ctx.prelude.null.expr()),
            Expression::subtype(self.ctx.prelude.type_of(expr.clone()), self.ctx.type_tag(ty).expr()),
        );
        let policy = self.policy;
        policy.report(&mut self.sink(), ViolationKind::ClassCast, Some(guard));
        Ok(expr)
    }

    fn translate_binary(&mut self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Expression> {
        let lhs = self.translate_value(lhs)?;
        let rhs = self.translate_value(rhs)?;
        let int_function = |name: &str, lhs: Expression, rhs: Expression| {
            Expression::call(name, vec![lhs, rhs], BoogieType::Int)
        };
        Ok(match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
                let (lhs, rhs) = self.align(lhs, rhs)?;
                let op = match op {
                    BinaryOp::Add => BinOp::Add,
                    BinaryOp::Sub => BinOp::Sub,
                    _ => BinOp::Mul,
                };
                Expression::binary(op, lhs, rhs)
            }
            BinaryOp::Rem => {
                let (lhs, rhs) = self.align(lhs, rhs)?;
                if lhs.ty() == BoogieType::Real {
                    Expression::call(REM_REAL, vec![lhs, rhs], BoogieType::Real)
                } else {
                    let lhs = self.coerce(lhs, &BoogieType::Int)?;
                    let rhs = self.coerce(rhs, &BoogieType::Int)?;
                    int_function(REM_INT, lhs, rhs)
                }
            }
            BinaryOp::Div => {
                let (lhs, rhs) = self.align(lhs, rhs)?;
                let op = if lhs.ty() == BoogieType::Real {
                    BinOp::RealDiv
                } else {
                    BinOp::Div
                };
                Expression::binary(op, lhs, rhs)
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor
                if lhs.ty() == BoogieType::Bool && rhs.ty() == BoogieType::Bool =>
            {
                let op = match op {
                    BinaryOp::And => BinOp::And,
                    BinaryOp::Or => BinOp::Or,
                    _ => BinOp::Neq,
                };
                Expression::binary(op, lhs, rhs)
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr => {
                let name = match op {
                    BinaryOp::And => BIT_AND,
                    BinaryOp::Or => BIT_OR,
                    BinaryOp::Xor => BIT_XOR,
                    BinaryOp::Shl => SHL,
                    BinaryOp::Shr => SHR,
                    _ => USHR,
                };
                let lhs = self.coerce(lhs, &BoogieType::Int)?;
                let rhs = self.coerce(rhs, &BoogieType::Int)?;
                int_function(name, lhs, rhs)
            }
            BinaryOp::Cmp => {
                let lhs = self.coerce(lhs, &BoogieType::Int)?;
                let rhs = self.coerce(rhs, &BoogieType::Int)?;
                int_function(CMP_INT, lhs, rhs)
            }
            BinaryOp::Cmpl | BinaryOp::Cmpg => {
                let lhs = self.coerce(lhs, &BoogieType::Real)?;
                let rhs = self.coerce(rhs, &BoogieType::Real)?;
                let name = if op == BinaryOp::Cmpl { CMPL_REAL } else { CMPG_REAL };
                int_function(name, lhs, rhs)
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let (lhs, rhs) = self.align(lhs, rhs)?;
                let op = match op {
                    BinaryOp::Eq => BinOp::Eq,
                    BinaryOp::Ne => BinOp::Neq,
                    BinaryOp::Lt => BinOp::Lt,
                    BinaryOp::Le => BinOp::Le,
                    BinaryOp::Gt => BinOp::Gt,
                    _ => BinOp::Ge,
                };
                Expression::binary(op, lhs, rhs)
            }
        })
    }

    /// Brings both operands to a common type, converting the right one first.
    fn align(&self, lhs: Expression, rhs: Expression) -> Result<(Expression, Expression)> {
        let (lhs_ty, rhs_ty) = (lhs.ty(), rhs.ty());
        if lhs_ty == rhs_ty {
            return Ok((lhs, rhs));
        }
        let prelude = &self.ctx.prelude;
        if let Some(rhs) = prelude.coerce(rhs.clone(), &lhs_ty) {
            return Ok((lhs, rhs));
        }
        match prelude.coerce(lhs, &rhs_ty) {
            Some(lhs) => Ok((lhs, rhs)),
            None => bail!("incompatible operand types `{}` and `{}`", lhs_ty, rhs_ty),
        }
    }
}
