// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translation of one method body into a Boogie implementation.
//!
//! The translator visits the nodes of the body in order (unreachable ones included),
//! injects a label in front of every branch target and lowers each statement on its
//! own. Expression lowering, call lowering and the structural statements live in the
//! submodules; this module owns the per-procedure state and the procedure prologue.
//!
//! Every procedure clears its exception slot on entry. Instance procedures first assume
//! a non-null receiver, and procedures that raise modeled exceptions also reset their
//! exceptional-return flag.

mod calls;
mod expressions;
mod intrinsics;
mod statements;

use crate::context::TranslationContext;
use crate::error_model::{ViolationPolicy, ViolationSink};
use crate::procedure_info::{LocalPool, ProcedureInfo};
use anyhow::{Context, Result};
use boogie_ast::{Expression, Implementation, Statement};
use class_bytecode::{Body, LocalIdx, NodeId};
use class_model::MethodEnv;
use log::debug;
use std::collections::BTreeSet;
use std::mem;
use std::sync::Arc;

/// Translates `body` into an implementation of its method's procedure.
pub fn translate_body(ctx: &TranslationContext, body: &Body) -> Result<Implementation> {
    StatementTranslator::new(ctx, body)?.translate()
}

pub struct StatementTranslator<'a, 'env> {
    ctx: &'a TranslationContext<'env>,
    policy: &'a dyn ViolationPolicy,
    method: MethodEnv<'env>,
    body: &'a Body,
    info: Arc<ProcedureInfo>,
    locals: LocalPool,
    out: Vec<Statement>,
    branch_targets: BTreeSet<NodeId>,
    /// Locals bound to the receiver; dereferencing them needs no null check.
    this_locals: BTreeSet<LocalIdx>,
}

impl<'a, 'env> StatementTranslator<'a, 'env> {
    pub fn new(ctx: &'a TranslationContext<'env>, body: &'a Body) -> Result<Self> {
        let method = ctx.env.get_method(body.method);
        let info = ctx.procedure_info(body.method)?;
        let locals = LocalPool::new(ctx, body)
            .with_context(|| format!("in locals of `{}`", method.get_full_name_str()))?;
        Ok(Self {
            ctx,
            policy: ctx.policy(),
            method,
            body,
            info,
            locals,
            out: vec![],
            branch_targets: body.branch_targets(),
            this_locals: BTreeSet::new(),
        })
    }

    pub fn translate(mut self) -> Result<Implementation> {
        debug!("translating body of `{}`", self.method.get_full_name_str());
        for node in 0..self.body.node_count() {
            self.translate_node(node).with_context(|| {
                format!(
                    "while translating `{}` at node {} ({})",
                    self.method.get_full_name_str(),
                    node,
                    self.ctx.env.describe_loc(&self.body.get_node(node).loc)
                )
            })?;
        }

        let prelude = &self.ctx.prelude;
        let mut body = vec![];
        if let Some(this) = &self.info.this_param {
            body.push(Statement::Assume(prelude.is_non_null(this.expr())));
        }
        body.push(Statement::assign(&self.info.exception_var, prelude.null.expr()));
        if self.locals.has_ex_return_flag() {
            let flag = self.locals.ex_return_flag();
            body.push(Statement::assign(&flag, Expression::BoolLit(false)));
        }
        body.append(&mut self.out);

        debug!(
            "translated `{}` into {} statements",
            self.method.get_full_name_str(),
            body.len()
        );
        Ok(Implementation {
            declaration: self.info.declaration.clone(),
            locals: self.locals.declarations(),
            body,
        })
    }

    fn emit(&mut self, statement: Statement) {
        self.out.push(statement);
    }

    /// Runs `f` against an empty statement buffer and returns what it emitted.
    fn capture<F>(&mut self, f: F) -> Result<Vec<Statement>>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let saved = mem::take(&mut self.out);
        let result = f(self);
        let captured = mem::replace(&mut self.out, saved);
        result.map(|_| captured)
    }

    fn sink(&mut self) -> ViolationSink<'_> {
        ViolationSink {
            prelude: &self.ctx.prelude,
            exception: &self.info.exception_var,
            locals: &mut self.locals,
            out: &mut self.out,
        }
    }

    fn label_of(&self, node: NodeId) -> String {
        self.ctx.label(self.method.get_id(), node)
    }

    /// Turns every checked postcondition of this procedure into an obligation.
    fn enforce_postconditions(&mut self) {
        let info = self.info.clone();
        let policy = self.policy;
        for post in info.declaration.checked_postconditions() {
            policy.postcondition_violation(&mut self.sink(), post.clone());
        }
    }
}
