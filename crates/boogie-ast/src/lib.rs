// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Boogie syntax tree
//!
//! Typed expressions, unstructured statements and top-level declarations of the Boogie
//! intermediate verification language, with substitution and a plain-text renderer.
//! Identifiers compare structurally (name and type) so they can be used as map keys and
//! deduplicated in local declarations.

mod declarations;
mod expressions;
mod statements;
mod types;
mod writer;

pub use declarations::{Declaration, Implementation, ProcedureDeclaration, Program, Specification};
pub use expressions::{BinOp, Expression, Ident, UnOp};
pub use statements::{Statement, StatementIter};
pub use types::BoogieType;
pub use writer::BoogieWriter;
