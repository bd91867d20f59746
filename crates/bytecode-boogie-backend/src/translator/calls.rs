// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Call lowering.
//!
//! Every call writes the callee's exception into the caller's own exception slot, so a
//! call is followed by its exception continuation: one guarded jump per trap covering the
//! call site, then one guarded return per escaping exception type, most specific first.

use super::intrinsics::{self, Intrinsic};
use super::StatementTranslator;
use crate::dispatch::DispatchResolver;
use anyhow::{bail, Result};
use boogie_ast::{Expression, Ident, Statement};
use class_bytecode::{InvokeExpr, NodeId, Value};
use class_model::{ClassId, MethodEnv, ProgramEnv, Type};
use codespan_reporting::diagnostic::Severity;
use itertools::Itertools;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

impl<'a, 'env> StatementTranslator<'a, 'env> {
    /// Lowers a call; `lhs` is the location receiving the result, if any.
    pub(super) fn translate_invoke(
        &mut self,
        node: NodeId,
        invoke: &InvokeExpr,
        lhs: Option<&Value>,
    ) -> Result<()> {
        let env = self.ctx.env;
        let callee = env.get_method(invoke.method);
        if let Some(intrinsic) = intrinsics::lookup(&callee) {
            return self.translate_intrinsic(intrinsic, invoke, lhs);
        }
        if callee.is_static() != invoke.base.is_none() {
            bail!(
                "receiver of call to `{}` does not match its static-ness",
                callee.get_full_name_str()
            );
        }
        if invoke.args.len() != callee.get_parameter_count() {
            bail!(
                "call to `{}` passes {} arguments, expected {}",
                callee.get_full_name_str(),
                invoke.args.len(),
                callee.get_parameter_count()
            );
        }

        let base = match invoke.base.as_deref() {
            Some(base) if invoke.kind.is_dynamic() => Some(self.dereference(base)?),
            Some(base) => Some(self.translate_value(base)?),
            None => None,
        };
        let mut args = vec![];
        for (arg, ty) in invoke.args.iter().zip(callee.get_parameter_types()) {
            let arg = self.translate_value(arg)?;
            args.push(self.coerce(arg, &self.ctx.boogie_type(ty)?)?);
        }

        let return_type = callee.get_return_type();
        let mut write_back = None;
        let result = if return_type.is_void() {
            if let Some(lhs) = lhs {
                bail!(
                    "result of void method `{}` assigned to `{}`",
                    callee.get_full_name_str(),
                    lhs
                );
            }
            None
        } else {
            let ty = self.ctx.boogie_type(return_type)?;
            let direct_target = match lhs {
                Some(Value::Local(idx)) => Some(self.locals.local(*idx)?.clone()),
                _ => None,
            };
            match lhs {
                Some(_) if direct_target.as_ref().map_or(false, |local| local.ty == ty) => direct_target,
                Some(other) => {
                    let stub = self.locals.fresh(ty);
                    write_back = Some((other, stub.clone()));
                    Some(stub)
                }
                None => Some(self.locals.fresh(ty)),
            }
        };
        let captured = lhs.is_some();

        let mut thrown: BTreeSet<ClassId> = BTreeSet::new();
        if invoke.kind.is_dynamic() {
            let Some(receiver) = base.clone() else {
                bail!("dynamic call to `{}` without receiver", callee.get_full_name_str());
            };
            let receiver_class = match invoke.base.as_deref().and_then(|b| b.get_type(env, self.body)) {
                Some(Type::Class(class)) => class,
                _ => callee.get_class_id(),
            };
            let targets = DispatchResolver::new(env).resolve(receiver_class, &callee);
            if targets.is_empty() {
                let msg = format!(
                    "no concrete override of `{}` found, calling the declared method",
                    callee.get_full_name_str()
                );
                self.ctx.diag(Severity::Warning, &self.body.get_node(node).loc, &msg);
                self.emit_direct_call(&callee, base, &args, result.as_ref(), captured)?;
                thrown.extend(callee.get_throws());
            } else {
                debug!(
                    "devirtualized `{}` into {} targets",
                    callee.get_full_name_str(),
                    targets.len()
                );
                for target in targets {
                    let target_method = env.get_method(target.method);
                    let branch = self.capture(|this| {
                        this.emit_direct_call(
                            &target_method,
                            base.clone(),
                            &args,
                            result.as_ref(),
                            captured,
                        )
                    })?;
                    let guard = Expression::eq(
                        self.ctx.prelude.type_of(receiver.clone()),
                        self.ctx.class_tag(target.class).expr(),
                    );
                    self.emit(Statement::if_then(guard, branch));
                    thrown.extend(target_method.get_throws());
                }
            }
        } else {
            self.emit_direct_call(&callee, base, &args, result.as_ref(), captured)?;
            thrown.extend(callee.get_throws());
        }

        self.translate_exception_continuation(node, &thrown)?;
        if let Some((lhs, stub)) = write_back {
            self.assign_to(lhs, stub.expr())?;
        }
        Ok(())
    }

    /// Emits the call of `callee` together with its precondition obligations and the
    /// assumptions about its result.
    fn emit_direct_call(
        &mut self,
        callee: &MethodEnv,
        base: Option<Expression>,
        args: &[Expression],
        result: Option<&Ident>,
        captured: bool,
    ) -> Result<()> {
        let info = self.ctx.procedure_info(callee.get_id())?;
        let actuals = base.into_iter().chain(args.iter().cloned()).collect_vec();
        if actuals.len() != info.declaration.in_params.len() {
            bail!(
                "procedure `{}` expects {} arguments, got {}",
                info.name(),
                info.declaration.in_params.len(),
                actuals.len()
            );
        }
        let substitution: BTreeMap<Ident, Expression> = info
            .in_params()
            .cloned()
            .zip(actuals.iter().cloned())
            .collect();
        let policy = self.policy;
        for pre in info.declaration.checked_preconditions() {
            policy.precondition_violation(&mut self.sink(), pre.substitute(&substitution));
        }

        let outs = result
            .into_iter()
            .chain(std::iter::once(&self.info.exception_var))
            .cloned()
            .collect_vec();
        if outs.len() != info.declaration.out_params.len() {
            bail!(
                "procedure `{}` returns {} values, call site expects {}",
                info.name(),
                info.declaration.out_params.len(),
                outs.len()
            );
        }
        self.emit(Statement::Call {
            procedure: info.name().to_string(),
            args: actuals,
            outs,
        });

        let return_type = callee.get_return_type();
        if let (Some(result), true) = (result, captured) {
            if return_type.is_reference() && callee.is_return_non_null() {
                let prelude = &self.ctx.prelude;
                let tag = self.ctx.type_tag(return_type).expr();
                let mut assumptions = vec![
                    Statement::Assume(prelude.is_non_null(result.expr())),
                    Statement::Assume(Expression::subtype(prelude.type_of(result.expr()), tag.clone())),
                ];
                if callee.is_return_exact() {
                    assumptions.push(Statement::Assume(Expression::eq(
                        prelude.type_of(result.expr()),
                        tag,
                    )));
                }
                self.out.extend(assumptions);
            }
        }
        Ok(())
    }

    fn translate_exception_continuation(&mut self, node: NodeId, thrown: &BTreeSet<ClassId>) -> Result<()> {
        let env = self.ctx.env;
        let body = self.body;
        let exception = self.info.exception_var.clone();
        let in_flight = self.ctx.prelude.is_non_null(exception.expr());

        let mut catch_types = vec![];
        for trap in body.traps_covering(node) {
            catch_types.push(trap.exception);
            let guard = Expression::and(in_flight.clone(), self.catches(&exception, trap.exception));
            let jump = Statement::goto(self.label_of(trap.handler));
            self.emit(Statement::if_then(guard, vec![jump]));
        }

        let mut remaining: Vec<ClassId> = thrown
            .iter()
            .copied()
            .filter(|ty| !catch_types.iter().any(|c| env.is_subtype_or_equal(*ty, *c)))
            .collect();
        while let Some(current) = most_specific(&remaining, env) {
            remaining.retain(|ty| *ty != current);
            if !self.method.get_throws().iter().any(|t| env.is_subtype_or_equal(current, *t)) {
                let msg = format!(
                    "`{}` may escape `{}` without being declared",
                    env.get_class(current).get_name(),
                    self.method.get_full_name_str()
                );
                self.ctx.diag(Severity::Warning, &body.get_node(node).loc, &msg);
            }
            let guard = Expression::and(in_flight.clone(), self.catches(&exception, current));
            let exit = self.capture(|this| {
                this.enforce_postconditions();
                this.emit(Statement::Return);
                Ok(())
            })?;
            self.emit(Statement::if_then(guard, exit));
        }
        Ok(())
    }

    fn translate_intrinsic(
        &mut self,
        intrinsic: Intrinsic,
        invoke: &InvokeExpr,
        lhs: Option<&Value>,
    ) -> Result<()> {
        match intrinsic {
            Intrinsic::Exit => {
                info!(
                    "call to process exit in `{}` ends the procedure",
                    self.method.get_full_name_str()
                );
                self.enforce_postconditions();
                self.emit(Statement::Return);
            }
            Intrinsic::StringLength => {
                let Some(base) = invoke.base.as_deref() else {
                    bail!("string length without receiver");
                };
                let base = self.dereference(base)?;
                if let Some(lhs) = lhs {
                    let length = Expression::select(self.ctx.prelude.string_size.expr(), vec![base]);
                    self.assign_to(lhs, length)?;
                }
            }
        }
        Ok(())
    }
}

/// First type in `types` with no strict subtype among the others.
fn most_specific(types: &[ClassId], env: &ProgramEnv) -> Option<ClassId> {
    types
        .iter()
        .copied()
        .find(|ty| !types.iter().any(|other| other != ty && env.is_subtype_or_equal(*other, *ty)))
}

