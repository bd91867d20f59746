// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use super::StatementTranslator;
use crate::error_model::ViolationKind;
use anyhow::{bail, Result};
use boogie_ast::{BoogieType, Expression, Ident, Statement};
use class_bytecode::{Body, NodeId, Stmt, Value};
use class_model::{ClassId, Type};
use codespan_reporting::diagnostic::Severity;
use itertools::Itertools;
use log::debug;

impl<'a, 'env> StatementTranslator<'a, 'env> {
    pub(super) fn translate_node(&mut self, node: NodeId) -> Result<()> {
        if self.branch_targets.contains(&node) {
            let label = self.label_of(node);
            self.emit(Statement::Label(label));
        }
        let body: &'a Body = self.body;
        let stmt = &body.get_node(node).stmt;
        match stmt {
            Stmt::Assign { lhs, rhs } => self.translate_assign(node, lhs, rhs),
            Stmt::Identity { local, rhs } => {
                let target = self.locals.local(*local)?.clone();
                match rhs {
                    Value::ThisRef => {
                        self.this_locals.insert(*local);
                    }
                    Value::ParameterRef(_) => {}
                    Value::CaughtExceptionRef => {
                        // the exception is no longer in flight once bound
                        let exception = self.info.exception_var.clone();
                        self.emit(Statement::assign(&target, exception.expr()));
                        self.emit(Statement::assign(&exception, self.ctx.prelude.null.expr()));
                        return Ok(());
                    }
                    other => bail!("unsupported identity binding `{}`", other),
                }
                let value = self.translate_value(rhs)?;
                let value = self.coerce(value, &target.ty)?;
                self.emit(Statement::assign(&target, value));
                Ok(())
            }
            Stmt::Invoke(invoke) => self.translate_invoke(node, invoke, None),
            Stmt::Goto(target) => {
                let label = self.label_of(*target);
                self.emit(Statement::goto(label));
                Ok(())
            }
            Stmt::If { cond, target } => {
                let cond = self.translate_value(cond)?;
                let cond = self.coerce(cond, &BoogieType::Bool)?;
                let jump = Statement::goto(self.label_of(*target));
                self.emit(Statement::if_then(cond, vec![jump]));
                Ok(())
            }
            Stmt::LookupSwitch { key, cases, default } => {
                self.translate_switch(node, key, cases.clone(), *default)
            }
            Stmt::TableSwitch {
                key,
                low,
                targets,
                default,
            } => {
                let cases = targets
                    .iter()
                    .enumerate()
                    .map(|(offset, target)| (low + offset as i32, *target))
                    .collect_vec();
                self.translate_switch(node, key, cases, *default)
            }
            Stmt::Return(value) => {
                let Some(result) = self.info.return_var.clone() else {
                    bail!("value returned from a void method");
                };
                let value = self.translate_value(value)?;
                let value = self.coerce(value, &result.ty)?;
                self.emit(Statement::assign(&result, value));
                self.enforce_postconditions();
                self.emit(Statement::Return);
                Ok(())
            }
            Stmt::ReturnVoid => {
                self.enforce_postconditions();
                self.emit(Statement::Return);
                Ok(())
            }
            Stmt::Throw(value) => self.translate_throw(node, value),
            Stmt::Nop | Stmt::Breakpoint => {
                debug!("skipping `{:?}` at node {}", stmt, node);
                Ok(())
            }
            Stmt::EnterMonitor(value) | Stmt::ExitMonitor(value) => {
                // locking is not modeled, only the null check of the monitor
                self.dereference(value)?;
                Ok(())
            }
            Stmt::Ret(_) => {
                let msg = format!(
                    "deprecated subroutine return in `{}` treated as an unexpected violation",
                    self.method.get_full_name_str()
                );
                self.ctx.diag(Severity::Warning, &body.get_node(node).loc, &msg);
                let policy = self.policy;
                policy.report(&mut self.sink(), ViolationKind::Unexpected, None);
                Ok(())
            }
        }
    }

    fn translate_assign(&mut self, node: NodeId, lhs: &Value, rhs: &Value) -> Result<()> {
        match rhs {
            Value::Invoke(invoke) => self.translate_invoke(node, invoke, Some(lhs)),
            Value::New(class) => {
                let fresh = self.allocate(&Type::Class(*class));
                self.assign_to(lhs, fresh.expr())
            }
            Value::NewArray { elem, size } => {
                let size = self.translate_value(size)?;
                let size = self.coerce(size, &BoogieType::Int)?;
                let fresh = self.allocate(&Type::array_of(elem.clone()));
                let ctx = self.ctx;
                let array_size = &ctx.prelude.array_size;
                self.emit(Statement::assign(
                    array_size,
                    Expression::store(array_size.expr(), vec![fresh.expr()], size),
                ));
                self.assign_to(lhs, fresh.expr())
            }
            Value::NewMultiArray { ty, sizes } => {
                // dimension sizes are evaluated for their checks but not recorded
                for size in sizes {
                    let size = self.translate_value(size)?;
                    debug!("dropping dimension size `{}` of multi-array allocation", size);
                }
                let fresh = self.ctx.fresh_global(BoogieType::Ref);
                self.allocate_into(&fresh, ty);
                self.assign_to(lhs, fresh.expr())
            }
            _ => {
                let value = self.translate_value(rhs)?;
                self.assign_to(lhs, value)
            }
        }
    }

    /// Stores an already lowered `value` into the location denoted by `lhs`.
    pub(super) fn assign_to(&mut self, lhs: &Value, value: Expression) -> Result<()> {
        match lhs {
            Value::Local(idx) => {
                let target = self.locals.local(*idx)?.clone();
                let value = self.coerce(value, &target.ty)?;
                self.emit(Statement::assign(&target, value));
                Ok(())
            }
            Value::InstanceField { field, .. } | Value::StaticField(field) => {
                let target = self.translate_value(lhs)?;
                let value = self.coerce(value, &target.ty())?;
                if self.ctx.env.get_field(*field).is_non_null() {
                    let policy = self.policy;
                    policy.non_null_guard(&mut self.sink(), value.clone());
                }
                self.assign_location(target, value)
            }
            Value::ArrayElement { .. } => {
                let target = self.translate_value(lhs)?;
                let value = self.coerce(value, &target.ty())?;
                self.assign_location(target, value)
            }
            other => bail!("unsupported left-hand side `{}`", other),
        }
    }

    /// `a[i] := v` becomes `a := a[i := v]`, recursively for nested maps.
    fn assign_location(&mut self, target: Expression, value: Expression) -> Result<()> {
        match target {
            Expression::Ident(ident) => {
                self.emit(Statement::assign(&ident, value));
                Ok(())
            }
            Expression::ArrayAccess { array, indices } => {
                let store = Expression::ArrayStore {
                    array: array.clone(),
                    indices,
                    value: Box::new(value),
                };
                self.assign_location(*array, store)
            }
            other => bail!("cannot assign to `{}`", other),
        }
    }

    /// Lowers a switch into nested one-armed ifs; the outermost test is the last case.
    fn translate_switch(
        &mut self,
        node: NodeId,
        key: &Value,
        cases: Vec<(i32, NodeId)>,
        default: NodeId,
    ) -> Result<()> {
        let default_jump = Statement::goto(self.label_of(default));
        if cases.is_empty() {
            let msg = format!(
                "switch without cases in `{}` reduced to its default branch",
                self.method.get_full_name_str()
            );
            self.ctx.diag(Severity::Note, &self.body.get_node(node).loc, &msg);
            self.emit(default_jump);
            return Ok(());
        }
        let key = self.translate_value(key)?;
        let key = self.coerce(key, &BoogieType::Int)?;
        let mut cascade = vec![default_jump];
        for (value, target) in cases {
            cascade = vec![Statement::If {
                condition: Expression::eq(key.clone(), Expression::IntLit(i64::from(value))),
                then_branch: vec![Statement::goto(self.label_of(target))],
                else_branch: cascade,
            }];
        }
        self.out.extend(cascade);
        Ok(())
    }

    fn translate_throw(&mut self, node: NodeId, value: &Value) -> Result<()> {
        let body = self.body;
        let exception = self.info.exception_var.clone();
        let thrown = self.translate_value(value)?;
        let thrown = self.coerce(thrown, &BoogieType::Ref)?;
        self.emit(Statement::assign(&exception, thrown));

        let succs = body.exceptional_succs(node);
        if let Some(bad) = succs
            .iter()
            .find(|succ| !body.get_node(**succ).stmt.is_caught_exception_binding())
        {
            bail!("exceptional successor {} of throw is not an exception handler", bad);
        }
        match succs.as_slice() {
            [] => {
                self.enforce_postconditions();
                self.emit(Statement::Return);
            }
            [handler] => {
                let label = self.label_of(*handler);
                self.emit(Statement::goto(label));
            }
            _ => {
                // a multi-catch handler is the target of one trap per caught type
                for succ in succs {
                    let catch_types = body
                        .traps_covering(node)
                        .filter(|trap| trap.handler == succ)
                        .map(|trap| trap.exception)
                        .collect_vec();
                    for catch_type in catch_types {
                        let guard = self.catches(&exception, catch_type);
                        let jump = Statement::goto(self.label_of(succ));
                        self.emit(Statement::if_then(guard, vec![jump]));
                    }
                }
                // unmatched exceptions leave the procedure
                self.emit(Statement::Return);
            }
        }
        Ok(())
    }

    /// `$heap[exception, $type] <: tag(catch_type)`
    pub(super) fn catches(&self, exception: &Ident, catch_type: ClassId) -> Expression {
        Expression::subtype(
            self.ctx.prelude.type_of(exception.expr()),
            self.ctx.class_tag(catch_type).expr(),
        )
    }
}

