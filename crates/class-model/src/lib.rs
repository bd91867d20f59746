// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Class Model
//!
//! Read-only view of a loaded class-based program: classes and interfaces, their
//! methods and fields, declared types, annotations and the subtype hierarchy.
//! Loading the program from class files is done by the front end; this crate only
//! holds the result and answers the queries the verification backends need.

mod builder;
mod hierarchy;
pub mod model;
pub mod ty;
pub mod well_known;

pub use builder::{MethodDecl, ProgramBuilder};
pub use hierarchy::ClassHierarchy;
pub use model::{
    ClassData, ClassEnv, ClassId, FieldData, FieldEnv, FieldId, Loc, MethodData, MethodEnv,
    MethodId, ProgramEnv,
};
pub use ty::{Annotation, Type};
