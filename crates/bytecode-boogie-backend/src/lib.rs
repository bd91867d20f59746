// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translation of exception-aware method bodies into Boogie procedures.
//!
//! A `TranslationContext` holds the whole-program state (type tags, field constants,
//! signatures, labels and diagnostics). Each body is lowered by its own
//! `StatementTranslator`, which writes violated obligations through the
//! `ViolationPolicy` selected by the options.

#![forbid(unsafe_code)]

pub mod context;
pub mod dispatch;
pub mod error_model;
pub mod generator;
pub mod naming;
pub mod options;
pub mod prelude;
pub mod procedure_info;
mod translator;

pub use context::TranslationContext;
pub use dispatch::{DispatchResolver, DispatchTarget};
pub use error_model::{make_policy, AssertionPolicy, ExceptionSlotPolicy, ViolationKind, ViolationPolicy};
pub use generator::{run_boogie_gen, BoogieGenerator};
pub use options::{ErrorModel, TranslationOptions};
pub use prelude::BoogiePrelude;
pub use procedure_info::{LocalPool, ProcedureInfo, SignatureBuilder};
pub use translator::{translate_body, StatementTranslator};
