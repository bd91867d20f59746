// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Whole-program translation state shared by all procedure translations.
//!
//! The context is created once per run, before any procedure is translated, and then
//! passed by shared reference. Type tags, field constants, signatures, labels and fresh
//! globals are created on first use; each lazily filled table sits behind its own lock
//! and insertion keeps the first value, so concurrent first use yields a single entry.

use crate::error_model::{make_policy, ViolationPolicy};
use crate::naming::{field_name, label_name, type_tag_name};
use crate::options::TranslationOptions;
use crate::prelude::BoogiePrelude;
use crate::procedure_info::{ProcedureInfo, SignatureBuilder};
use anyhow::{bail, Result};
use bimap::BiBTreeMap;
use boogie_ast::{BoogieType, Ident};
use class_bytecode::NodeId;
use class_model::{ClassId, FieldId, Loc, MethodId, ProgramEnv, Type};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::term::termcolor::WriteColor;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct TranslationContext<'env> {
    pub env: &'env ProgramEnv,
    pub options: TranslationOptions,
    pub prelude: BoogiePrelude,
    policy: Box<dyn ViolationPolicy>,
    type_tags: RwLock<BTreeMap<Type, Ident>>,
    fields: RwLock<BTreeMap<FieldId, Ident>>,
    procedures: RwLock<BTreeMap<MethodId, Arc<ProcedureInfo>>>,
    labels: RwLock<BiBTreeMap<(MethodId, NodeId), String>>,
    fresh_globals: RwLock<Vec<Ident>>,
    diags: Mutex<Vec<Diagnostic<usize>>>,
}

impl<'env> TranslationContext<'env> {
    pub fn new(env: &'env ProgramEnv, options: TranslationOptions) -> Self {
        Self::with_prelude(env, options, BoogiePrelude::new())
    }

    pub fn with_prelude(env: &'env ProgramEnv, options: TranslationOptions, prelude: BoogiePrelude) -> Self {
        let policy = make_policy(options.error_model);
        info!("using the {} error model", policy.name());
        Self {
            env,
            options,
            prelude,
            policy,
            type_tags: RwLock::new(BTreeMap::new()),
            fields: RwLock::new(BTreeMap::new()),
            procedures: RwLock::new(BTreeMap::new()),
            labels: RwLock::new(BiBTreeMap::new()),
            fresh_globals: RwLock::new(vec![]),
            diags: Mutex::new(vec![]),
        }
    }

    pub fn policy(&self) -> &dyn ViolationPolicy {
        self.policy.as_ref()
    }

    pub fn boogie_type(&self, ty: &Type) -> Result<BoogieType> {
        Ok(match ty {
            Type::Bool => BoogieType::Bool,
            Type::Byte | Type::Char | Type::Short | Type::Int | Type::Long => BoogieType::Int,
            Type::Float | Type::Double => BoogieType::Real,
            Type::Class(_) | Type::Array(_) | Type::Null => BoogieType::Ref,
            Type::Void => bail!("void has no value representation"),
        })
    }

    // ------------------------------------------------------------------------
    // Type tags

    /// Tag constant of a class or array type.
    pub fn type_tag(&self, ty: &Type) -> Ident {
        if let Some(tag) = read(&self.type_tags).get(ty) {
            return tag.clone();
        }
        let tag = Ident::new(type_tag_name(self.env, ty), BoogieType::TypeTag);
        write(&self.type_tags)
            .entry(ty.clone())
            .or_insert(tag)
            .clone()
    }

    pub fn class_tag(&self, class: ClassId) -> Ident {
        self.type_tag(&Type::Class(class))
    }

    /// Tags created so far, ordered by type.
    pub fn type_tags(&self) -> Vec<(Type, Ident)> {
        read(&self.type_tags)
            .iter()
            .map(|(ty, tag)| (ty.clone(), tag.clone()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Fields

    /// Heap field constant of an instance field, or global variable of a static one.
    pub fn field(&self, field: FieldId) -> Result<Ident> {
        if let Some(ident) = read(&self.fields).get(&field) {
            return Ok(ident.clone());
        }
        let field_env = self.env.get_field(field);
        let value_type = self.boogie_type(field_env.get_type())?;
        let ty = if field_env.is_static() {
            value_type
        } else {
            BoogieType::field(value_type)
        };
        let ident = Ident::new(field_name(&field_env), ty);
        Ok(write(&self.fields).entry(field).or_insert(ident).clone())
    }

    pub fn fields(&self) -> Vec<(FieldId, Ident)> {
        read(&self.fields)
            .iter()
            .map(|(id, ident)| (*id, ident.clone()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Signatures

    /// Signature of `method`, built on first request.
    pub fn procedure_info(&self, method: MethodId) -> Result<Arc<ProcedureInfo>> {
        if let Some(info) = read(&self.procedures).get(&method) {
            return Ok(info.clone());
        }
        let info = SignatureBuilder::new(self).build(&self.env.get_method(method))?;
        Ok(write(&self.procedures)
            .entry(method)
            .or_insert_with(|| Arc::new(info))
            .clone())
    }

    pub fn procedures(&self) -> Vec<Arc<ProcedureInfo>> {
        read(&self.procedures).values().cloned().collect()
    }

    // ------------------------------------------------------------------------
    // Labels and fresh globals

    pub fn label(&self, method: MethodId, node: NodeId) -> String {
        if let Some(label) = read(&self.labels).get_by_left(&(method, node)) {
            return label.clone();
        }
        let label = label_name(method, node);
        let mut labels = write(&self.labels);
        if let Some(existing) = labels.get_by_left(&(method, node)) {
            return existing.clone();
        }
        labels.insert((method, node), label.clone());
        label
    }

    pub fn node_of_label(&self, label: &str) -> Option<(MethodId, NodeId)> {
        read(&self.labels).get_by_right(label).copied()
    }

    pub fn fresh_global(&self, ty: BoogieType) -> Ident {
        let mut globals = write(&self.fresh_globals);
        let ident = Ident::new(format!("$freshglobal_{}", globals.len()), ty);
        globals.push(ident.clone());
        ident
    }

    pub fn fresh_globals(&self) -> Vec<Ident> {
        read(&self.fresh_globals).clone()
    }

    // ------------------------------------------------------------------------
    // Diagnostics

    /// Records a diagnostic and mirrors it to the log.
    pub fn diag(&self, severity: Severity, loc: &Loc, msg: &str) {
        let location = self.env.describe_loc(loc);
        match severity {
            Severity::Bug | Severity::Error => error!("{} ({})", msg, location),
            Severity::Warning => warn!("{} ({})", msg, location),
            Severity::Note | Severity::Help => info!("{} ({})", msg, location),
        }
        let mut diagnostic = Diagnostic::new(severity).with_message(msg);
        if let Some(file_id) = loc.file_id {
            let range = loc.span.start().to_usize()..loc.span.end().to_usize();
            diagnostic = diagnostic.with_labels(vec![Label::primary(file_id, range)]);
        }
        lock(&self.diags).push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        lock(&self.diags).iter().any(|d| d.severity >= Severity::Error)
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic<usize>> {
        lock(&self.diags).clone()
    }

    /// Writes all diagnostics of at least `min_severity` to `writer`.
    pub fn report_diag<W: WriteColor>(&self, writer: &mut W, min_severity: Severity) -> Result<()> {
        let config = codespan_reporting::term::Config::default();
        for diag in lock(&self.diags).iter().filter(|d| d.severity >= min_severity) {
            codespan_reporting::term::emit(writer, &config, self.env.files(), diag)?;
        }
        Ok(())
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
