// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Program environment and the `*Env` views over its classes, methods and fields.
//!
//! The environment is immutable once built. Views are cheap `Copy` handles that borrow
//! the environment, in the same way `FunctionEnv` borrows a `GlobalEnv`.

use crate::hierarchy::ClassHierarchy;
use crate::ty::{Annotation, Type};
use crate::well_known;
use codespan::Span;
use codespan_reporting::files::{Files, SimpleFiles};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(usize);

        impl $name {
            pub fn new(idx: usize) -> Self {
                Self(idx)
            }

            pub fn as_usize(self) -> usize {
                self.0
            }
        }
    };
}

define_id!(ClassId);
define_id!(MethodId);
define_id!(FieldId);

/// Source location. `file_id` refers to a file registered with the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loc {
    pub file_id: Option<usize>,
    pub span: Span,
}

impl Loc {
    pub fn new(file_id: usize, span: Span) -> Self {
        Self {
            file_id: Some(file_id),
            span,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.file_id.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ClassData {
    pub name: String,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub super_class: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub methods: Vec<MethodId>,
    pub fields: Vec<FieldId>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct MethodData {
    pub name: String,
    pub class: ClassId,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_static: bool,
    pub is_abstract: bool,
    pub throws: Vec<ClassId>,
    pub annotations: Vec<Annotation>,
    pub param_annotations: Vec<Vec<Annotation>>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct FieldData {
    pub name: String,
    pub class: ClassId,
    pub ty: Type,
    pub is_static: bool,
    pub annotations: Vec<Annotation>,
}

pub struct ProgramEnv {
    pub(crate) classes: Vec<ClassData>,
    pub(crate) methods: Vec<MethodData>,
    pub(crate) fields: Vec<FieldData>,
    pub(crate) class_index: BTreeMap<String, ClassId>,
    pub(crate) hierarchy: ClassHierarchy,
    pub(crate) files: SimpleFiles<String, String>,
}

impl ProgramEnv {
    pub fn get_class(&self, id: ClassId) -> ClassEnv<'_> {
        ClassEnv {
            env: self,
            id,
            data: &self.classes[id.as_usize()],
        }
    }

    pub fn get_method(&self, id: MethodId) -> MethodEnv<'_> {
        MethodEnv {
            env: self,
            id,
            data: &self.methods[id.as_usize()],
        }
    }

    pub fn get_field(&self, id: FieldId) -> FieldEnv<'_> {
        FieldEnv {
            env: self,
            id,
            data: &self.fields[id.as_usize()],
        }
    }

    pub fn find_class(&self, name: &str) -> Option<ClassEnv<'_>> {
        self.class_index.get(name).map(|id| self.get_class(*id))
    }

    pub fn get_classes(&self) -> impl Iterator<Item = ClassEnv<'_>> {
        (0..self.classes.len()).map(|idx| self.get_class(ClassId::new(idx)))
    }

    pub fn get_methods(&self) -> impl Iterator<Item = MethodEnv<'_>> {
        (0..self.methods.len()).map(|idx| self.get_method(MethodId::new(idx)))
    }

    pub fn get_fields(&self) -> impl Iterator<Item = FieldEnv<'_>> {
        (0..self.fields.len()).map(|idx| self.get_field(FieldId::new(idx)))
    }

    pub fn hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    pub fn is_subtype_or_equal(&self, sub: ClassId, sup: ClassId) -> bool {
        self.hierarchy.is_subtype_or_equal(sub, sup)
    }

    pub fn object_class(&self) -> ClassId {
        self.class_index[well_known::OBJECT]
    }

    pub fn string_class(&self) -> ClassId {
        self.class_index[well_known::STRING]
    }

    pub fn throwable_class(&self) -> ClassId {
        self.class_index[well_known::THROWABLE]
    }

    pub fn files(&self) -> &SimpleFiles<String, String> {
        &self.files
    }

    /// Renders a location as `file:line`, or `<unknown>` if it has no file.
    pub fn describe_loc(&self, loc: &Loc) -> String {
        let Some(file_id) = loc.file_id else {
            return "<unknown>".to_string();
        };
        let name = self
            .files
            .name(file_id)
            .unwrap_or_else(|_| format!("<file {}>", file_id));
        match self
            .files
            .line_index(file_id, loc.span.start().to_usize())
        {
            Ok(line) => format!("{}:{}", name, line + 1),
            Err(_) => name,
        }
    }
}

#[derive(Clone, Copy)]
pub struct ClassEnv<'env> {
    pub env: &'env ProgramEnv,
    id: ClassId,
    data: &'env ClassData,
}

impl<'env> ClassEnv<'env> {
    pub fn get_id(&self) -> ClassId {
        self.id
    }

    pub fn get_name(&self) -> &'env str {
        &self.data.name
    }

    pub fn is_interface(&self) -> bool {
        self.data.is_interface
    }

    pub fn is_abstract(&self) -> bool {
        self.data.is_abstract
    }

    pub fn get_super_class(&self) -> Option<ClassEnv<'env>> {
        self.data.super_class.map(|id| self.env.get_class(id))
    }

    pub fn get_interfaces(&self) -> impl Iterator<Item = ClassEnv<'env>> + 'env {
        let env = self.env;
        self.data.interfaces.iter().map(move |id| env.get_class(*id))
    }

    pub fn get_methods(&self) -> impl Iterator<Item = MethodEnv<'env>> + 'env {
        let env = self.env;
        self.data.methods.iter().map(move |id| env.get_method(*id))
    }

    pub fn get_fields(&self) -> impl Iterator<Item = FieldEnv<'env>> + 'env {
        let env = self.env;
        self.data.fields.iter().map(move |id| env.get_field(*id))
    }

    /// Finds a method declared in this class itself (not inherited) with the given
    /// name and parameter types.
    pub fn find_declared_method(&self, name: &str, params: &[Type]) -> Option<MethodEnv<'env>> {
        self.get_methods()
            .find(|m| m.get_name_str() == name && m.get_parameter_types() == params)
    }

    pub fn get_loc(&self) -> Loc {
        self.data.loc
    }
}

#[derive(Clone, Copy)]
pub struct MethodEnv<'env> {
    pub env: &'env ProgramEnv,
    id: MethodId,
    data: &'env MethodData,
}

impl<'env> MethodEnv<'env> {
    pub fn get_id(&self) -> MethodId {
        self.id
    }

    pub fn get_name_str(&self) -> &'env str {
        &self.data.name
    }

    /// `Class.method`, used in diagnostics and logs.
    pub fn get_full_name_str(&self) -> String {
        format!("{}.{}", self.get_class().get_name(), self.data.name)
    }

    pub fn get_class(&self) -> ClassEnv<'env> {
        self.env.get_class(self.data.class)
    }

    pub fn get_class_id(&self) -> ClassId {
        self.data.class
    }

    pub fn get_parameter_types(&self) -> &'env [Type] {
        &self.data.params
    }

    pub fn get_parameter_count(&self) -> usize {
        self.data.params.len()
    }

    pub fn get_return_type(&self) -> &'env Type {
        &self.data.return_type
    }

    pub fn is_static(&self) -> bool {
        self.data.is_static
    }

    pub fn is_abstract(&self) -> bool {
        self.data.is_abstract
    }

    pub fn is_constructor(&self) -> bool {
        self.data.name == well_known::CONSTRUCTOR_NAME
    }

    /// A method that has a body and can be the target of a virtual call.
    pub fn is_concrete_instance_method(&self) -> bool {
        !self.data.is_abstract && !self.data.is_static
    }

    pub fn get_throws(&self) -> &'env [ClassId] {
        &self.data.throws
    }

    pub fn has_annotation(&self, annotation: &Annotation) -> bool {
        self.data.annotations.contains(annotation)
    }

    pub fn parameter_has_annotation(&self, idx: usize, annotation: &Annotation) -> bool {
        self.data
            .param_annotations
            .get(idx)
            .map_or(false, |annotations| annotations.contains(annotation))
    }

    pub fn is_return_non_null(&self) -> bool {
        self.has_annotation(&Annotation::NonNull)
    }

    pub fn is_return_exact(&self) -> bool {
        self.has_annotation(&Annotation::ExactType)
    }

    pub fn get_loc(&self) -> Loc {
        self.data.loc
    }
}

#[derive(Clone, Copy)]
pub struct FieldEnv<'env> {
    pub env: &'env ProgramEnv,
    id: FieldId,
    data: &'env FieldData,
}

impl<'env> FieldEnv<'env> {
    pub fn get_id(&self) -> FieldId {
        self.id
    }

    pub fn get_name_str(&self) -> &'env str {
        &self.data.name
    }

    pub fn get_full_name_str(&self) -> String {
        format!("{}.{}", self.get_class().get_name(), self.data.name)
    }

    pub fn get_class(&self) -> ClassEnv<'env> {
        self.env.get_class(self.data.class)
    }

    pub fn get_type(&self) -> &'env Type {
        &self.data.ty
    }

    pub fn is_static(&self) -> bool {
        self.data.is_static
    }

    pub fn is_non_null(&self) -> bool {
        self.data.annotations.contains(&Annotation::NonNull)
    }
}
