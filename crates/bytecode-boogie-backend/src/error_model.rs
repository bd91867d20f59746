// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Encodings of violated obligations.
//!
//! A `ViolationPolicy` is chosen once per translation run from
//! `TranslationOptions::error_model` and shared by every procedure. It never fails:
//! violations of the source program become statements of the target program.

use crate::options::ErrorModel;
use crate::prelude::BoogiePrelude;
use crate::procedure_info::LocalPool;
use boogie_ast::{Expression, Ident, Statement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViolationKind {
    NullPointer,
    ArrayBounds,
    ClassCast,
    Precondition,
    Postcondition,
    /// A violation with no condition to check.
    Unexpected,
}

impl ViolationKind {
    pub const ALL: &'static [ViolationKind] = &[
        ViolationKind::NullPointer,
        ViolationKind::ArrayBounds,
        ViolationKind::ClassCast,
        ViolationKind::Precondition,
        ViolationKind::Postcondition,
        ViolationKind::Unexpected,
    ];
}

/// Where a policy writes its statements: the procedure's exception slot, its local
/// pool (for the exceptional-return flag) and the current statement buffer.
pub struct ViolationSink<'a> {
    pub prelude: &'a BoogiePrelude,
    pub exception: &'a Ident,
    pub locals: &'a mut LocalPool,
    pub out: &'a mut Vec<Statement>,
}

pub trait ViolationPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Record that `guard` must hold. Without a guard the violation is unconditional.
    fn report(&self, sink: &mut ViolationSink, kind: ViolationKind, guard: Option<Expression>);

    fn non_null_guard(&self, sink: &mut ViolationSink, value: Expression) {
        let guard = sink.prelude.is_non_null(value);
        self.report(sink, ViolationKind::NullPointer, Some(guard))
    }

    fn precondition_violation(&self, sink: &mut ViolationSink, guard: Expression) {
        self.report(sink, ViolationKind::Precondition, Some(guard))
    }

    fn postcondition_violation(&self, sink: &mut ViolationSink, guard: Expression) {
        self.report(sink, ViolationKind::Postcondition, Some(guard))
    }
}

/// Violations raise a modeled exception: the witness goes into the exception slot,
/// the exceptional-return flag is set and the procedure returns.
pub struct ExceptionSlotPolicy;

impl ViolationPolicy for ExceptionSlotPolicy {
    fn name(&self) -> &'static str {
        "exception"
    }

    fn report(&self, sink: &mut ViolationSink, kind: ViolationKind, guard: Option<Expression>) {
        let flag = sink.locals.ex_return_flag();
        let raise = vec![
            Statement::assign(&flag, Expression::BoolLit(true)),
            Statement::assign(sink.exception, sink.prelude.witness(kind).expr()),
            Statement::Return,
        ];
        match guard {
            Some(guard) => sink.out.push(Statement::if_then(Expression::not(guard), raise)),
            None => sink.out.extend(raise),
        }
    }
}

/// Violations become assertions. An unconditional violation has nothing to assert and
/// ends the procedure instead.
pub struct AssertionPolicy;

impl ViolationPolicy for AssertionPolicy {
    fn name(&self) -> &'static str {
        "assertion"
    }

    fn report(&self, sink: &mut ViolationSink, _kind: ViolationKind, guard: Option<Expression>) {
        match guard {
            Some(guard) => sink.out.push(Statement::Assert(guard)),
            None => sink.out.push(Statement::Return),
        }
    }
}

pub fn make_policy(model: ErrorModel) -> Box<dyn ViolationPolicy> {
    match model {
        ErrorModel::Exception => Box::new(ExceptionSlotPolicy),
        ErrorModel::Assertion => Box::new(AssertionPolicy),
    }
}
