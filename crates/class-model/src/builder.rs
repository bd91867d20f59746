// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::hierarchy::ClassHierarchy;
use crate::model::{ClassData, ClassId, FieldData, FieldId, Loc, MethodData, MethodId, ProgramEnv};
use crate::ty::{Annotation, Type};
use crate::well_known;
use anyhow::{bail, Result};
use codespan_reporting::files::SimpleFiles;
use itertools::Itertools;
use log::debug;
use std::collections::BTreeMap;

/// Method declaration as handed to `ProgramBuilder::add_method`.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_static: bool,
    pub is_abstract: bool,
    pub throws: Vec<ClassId>,
    pub annotations: Vec<Annotation>,
    pub param_annotations: Vec<Vec<Annotation>>,
    pub loc: Loc,
}

impl MethodDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: vec![],
            return_type: Type::Void,
            is_static: false,
            is_abstract: false,
            throws: vec![],
            annotations: vec![],
            param_annotations: vec![],
            loc: Loc::default(),
        }
    }

    pub fn param(mut self, ty: Type) -> Self {
        self.params.push(ty);
        self.param_annotations.push(vec![]);
        self
    }

    pub fn non_null_param(mut self, ty: Type) -> Self {
        self.params.push(ty);
        self.param_annotations.push(vec![Annotation::NonNull]);
        self
    }

    pub fn returns(mut self, ty: Type) -> Self {
        self.return_type = ty;
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn make_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn make_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn throws(mut self, class: ClassId) -> Self {
        self.throws.push(class);
        self
    }

    pub fn at(mut self, loc: Loc) -> Self {
        self.loc = loc;
        self
    }
}

/// Incrementally assembles a `ProgramEnv`. The classes listed in
/// `well_known::PREDEFINED_CLASSES` are registered up front.
pub struct ProgramBuilder {
    classes: Vec<ClassData>,
    methods: Vec<MethodData>,
    fields: Vec<FieldData>,
    class_index: BTreeMap<String, ClassId>,
    files: SimpleFiles<String, String>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            classes: vec![],
            methods: vec![],
            fields: vec![],
            class_index: BTreeMap::new(),
            files: SimpleFiles::new(),
        };
        for name in well_known::PREDEFINED_CLASSES {
            let super_class = if *name == well_known::OBJECT {
                None
            } else {
                Some(builder.object())
            };
            builder.register(name, false, super_class, vec![]);
        }
        builder
    }

    pub fn object(&self) -> ClassId {
        self.class_index[well_known::OBJECT]
    }

    pub fn string(&self) -> ClassId {
        self.class_index[well_known::STRING]
    }

    pub fn throwable(&self) -> ClassId {
        self.class_index[well_known::THROWABLE]
    }

    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.class_index.get(name).copied()
    }

    /// Adds a class. A missing superclass defaults to `java.lang.Object`.
    pub fn add_class(
        &mut self,
        name: &str,
        super_class: Option<ClassId>,
        interfaces: &[ClassId],
    ) -> ClassId {
        let super_class = super_class.or_else(|| Some(self.object()));
        self.register(name, false, super_class, interfaces.to_vec())
    }

    pub fn add_abstract_class(
        &mut self,
        name: &str,
        super_class: Option<ClassId>,
        interfaces: &[ClassId],
    ) -> ClassId {
        let id = self.add_class(name, super_class, interfaces);
        self.classes[id.as_usize()].is_abstract = true;
        id
    }

    pub fn add_interface(&mut self, name: &str, extends: &[ClassId]) -> ClassId {
        let id = self.register(name, true, None, extends.to_vec());
        self.classes[id.as_usize()].is_abstract = true;
        id
    }

    pub fn add_method(&mut self, class: ClassId, decl: MethodDecl) -> MethodId {
        let id = MethodId::new(self.methods.len());
        let is_abstract =
            decl.is_abstract || (self.classes[class.as_usize()].is_interface && !decl.is_static);
        self.methods.push(MethodData {
            name: decl.name,
            class,
            params: decl.params,
            return_type: decl.return_type,
            is_static: decl.is_static,
            is_abstract,
            throws: decl.throws,
            annotations: decl.annotations,
            param_annotations: decl.param_annotations,
            loc: decl.loc,
        });
        self.classes[class.as_usize()].methods.push(id);
        id
    }

    /// Declares a concrete instance method that overrides `overridden` in `class`.
    pub fn add_override(&mut self, class: ClassId, overridden: MethodId) -> MethodId {
        let base = &self.methods[overridden.as_usize()];
        let decl = MethodDecl {
            name: base.name.clone(),
            params: base.params.clone(),
            return_type: base.return_type.clone(),
            is_static: false,
            is_abstract: false,
            throws: base.throws.clone(),
            annotations: base.annotations.clone(),
            param_annotations: base.param_annotations.clone(),
            loc: Loc::default(),
        };
        self.add_method(class, decl)
    }

    pub fn add_field(
        &mut self,
        class: ClassId,
        name: &str,
        ty: Type,
        is_static: bool,
        annotations: Vec<Annotation>,
    ) -> FieldId {
        let id = FieldId::new(self.fields.len());
        self.fields.push(FieldData {
            name: name.to_string(),
            class,
            ty,
            is_static,
            annotations,
        });
        self.classes[class.as_usize()].fields.push(id);
        id
    }

    /// Registers a source file for diagnostics and returns its file id.
    pub fn add_source(&mut self, name: &str, content: &str) -> usize {
        self.files.add(name.to_string(), content.to_string())
    }

    pub fn build(self) -> Result<ProgramEnv> {
        let edges = self
            .classes
            .iter()
            .enumerate()
            .flat_map(|(idx, class)| {
                class
                    .super_class
                    .iter()
                    .chain(class.interfaces.iter())
                    .map(move |sup| (ClassId::new(idx), *sup))
            })
            .collect_vec();
        let hierarchy = ClassHierarchy::new(self.classes.len(), edges);
        if hierarchy.is_cyclic() {
            bail!("class hierarchy contains a cycle");
        }
        debug!(
            "built program model with {} classes, {} methods, {} fields",
            self.classes.len(),
            self.methods.len(),
            self.fields.len()
        );
        Ok(ProgramEnv {
            classes: self.classes,
            methods: self.methods,
            fields: self.fields,
            class_index: self.class_index,
            hierarchy,
            files: self.files,
        })
    }

    fn register(
        &mut self,
        name: &str,
        is_interface: bool,
        super_class: Option<ClassId>,
        interfaces: Vec<ClassId>,
    ) -> ClassId {
        if let Some(id) = self.class_index.get(name) {
            return *id;
        }
        let id = ClassId::new(self.classes.len());
        self.classes.push(ClassData {
            name: name.to_string(),
            is_interface,
            is_abstract: false,
            super_class,
            interfaces,
            methods: vec![],
            fields: vec![],
            loc: Loc::default(),
        });
        self.class_index.insert(name.to_string(), id);
        id
    }
}
