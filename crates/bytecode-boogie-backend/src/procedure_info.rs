// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Procedure signatures and per-procedure local variables.
//!
//! `SignatureBuilder` turns a method declaration into a `ProcedureInfo`: the Boogie
//! procedure declaration plus the identifiers of its receiver, formals, result and
//! exception slot. Signatures are built once per method by the `TranslationContext` and
//! shared by every call site and by the method's own body translation.

use crate::context::TranslationContext;
use crate::naming::{procedure_name, sanitize};
use crate::prelude::NEVER_SYNTHESIZE;
use anyhow::{bail, Result};
use boogie_ast::{BoogieType, Expression, Ident, ProcedureDeclaration, Specification};
use class_bytecode::{Body, LocalIdx};
use class_model::{MethodEnv, MethodId};
use log::debug;
use std::collections::BTreeSet;

pub const THIS_NAME: &str = "$this";
pub const RETURN_NAME: &str = "$return";
pub const EXCEPTION_NAME: &str = "$exception";
pub const EX_RETURN_NAME: &str = "$ex_return";
const IN_PARAMETER_PREFIX: &str = "$in_parameter__";
const FAKE_LOCAL_PREFIX: &str = "$fakelocal_";

#[derive(Debug, Clone)]
pub struct ProcedureInfo {
    pub method: MethodId,
    pub declaration: ProcedureDeclaration,
    pub this_param: Option<Ident>,
    /// One per formal parameter, receiver excluded.
    pub params: Vec<Ident>,
    pub return_var: Option<Ident>,
    pub exception_var: Ident,
    /// Whether the declaration was taken verbatim from the prelude.
    pub from_prelude: bool,
}

impl ProcedureInfo {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn is_void(&self) -> bool {
        self.return_var.is_none()
    }

    /// Receiver (if any) followed by the formals, in call order.
    pub fn in_params(&self) -> impl Iterator<Item = &Ident> {
        self.this_param.iter().chain(self.params.iter())
    }
}

pub struct SignatureBuilder<'a, 'env> {
    ctx: &'a TranslationContext<'env>,
}

impl<'a, 'env> SignatureBuilder<'a, 'env> {
    pub fn new(ctx: &'a TranslationContext<'env>) -> Self {
        Self { ctx }
    }

    pub fn build(&self, method: &MethodEnv) -> Result<ProcedureInfo> {
        let name = procedure_name(method);
        if let Some(declaration) = self.ctx.prelude.find_procedure(&name) {
            debug!("reusing prelude signature for `{}`", name);
            return self.from_prelude(method, declaration);
        }
        if NEVER_SYNTHESIZE.contains(&name.as_str()) {
            bail!(
                "signature of `{}` must be declared by the prelude",
                method.get_full_name_str()
            );
        }

        let null = self.ctx.prelude.null.expr();
        let mut specification = vec![];

        let this_param = (!method.is_static()).then(|| Ident::new(THIS_NAME, BoogieType::Ref));
        let mut params = vec![];
        for (idx, ty) in method.get_parameter_types().iter().enumerate() {
            let param = Ident::new(
                format!("{}{}", IN_PARAMETER_PREFIX, idx),
                self.ctx.boogie_type(ty)?,
            );
            if ty.is_reference() && method.parameter_has_annotation(idx, &class_model::Annotation::NonNull) {
                specification.push(Specification::requires(Expression::neq(param.expr(), null.clone())));
            }
            params.push(param);
        }

        let return_type = method.get_return_type();
        let return_var = if return_type.is_void() {
            None
        } else {
            let var = Ident::new(RETURN_NAME, self.ctx.boogie_type(return_type)?);
            if return_type.is_reference() && method.is_return_non_null() {
                specification.push(Specification::ensures(Expression::neq(var.expr(), null.clone())));
            }
            Some(var)
        };
        let exception_var = Ident::new(EXCEPTION_NAME, BoogieType::Ref);

        // callees may write any global, so every procedure lists all of them
        let mut modifies = self.ctx.prelude.mutable_globals();
        for field in self.ctx.env.get_fields().filter(|field| field.is_static()) {
            modifies.push(self.ctx.field(field.get_id())?);
        }

        let declaration = ProcedureDeclaration {
            name,
            in_params: this_param.iter().chain(params.iter()).cloned().collect(),
            out_params: return_var
                .iter()
                .chain(std::iter::once(&exception_var))
                .cloned()
                .collect(),
            modifies,
            specification,
        };
        Ok(ProcedureInfo {
            method: method.get_id(),
            declaration,
            this_param,
            params,
            return_var,
            exception_var,
            from_prelude: false,
        })
    }

    fn from_prelude(&self, method: &MethodEnv, declaration: &ProcedureDeclaration) -> Result<ProcedureInfo> {
        let Some((exception_var, results)) = declaration.out_params.split_last() else {
            bail!("prelude procedure `{}` has no exception slot", declaration.name);
        };
        if exception_var.ty != BoogieType::Ref || results.len() > 1 {
            bail!("prelude procedure `{}` has no exception slot", declaration.name);
        }
        let receiver_count = usize::from(!method.is_static());
        if declaration.in_params.len() != receiver_count + method.get_parameter_count() {
            bail!(
                "prelude procedure `{}` does not match the parameters of `{}`",
                declaration.name,
                method.get_full_name_str()
            );
        }
        if results.is_empty() != method.get_return_type().is_void() {
            bail!(
                "prelude procedure `{}` does not match the result of `{}`",
                declaration.name,
                method.get_full_name_str()
            );
        }
        let (this_param, params) = if method.is_static() {
            (None, declaration.in_params.clone())
        } else {
            (
                declaration.in_params.first().cloned(),
                declaration.in_params[1..].to_vec(),
            )
        };
        Ok(ProcedureInfo {
            method: method.get_id(),
            declaration: declaration.clone(),
            this_param,
            params,
            return_var: results.first().cloned(),
            exception_var: exception_var.clone(),
            from_prelude: true,
        })
    }
}

/// Locals of one procedure: one per source local plus synthesized ones.
#[derive(Debug, Default)]
pub struct LocalPool {
    locals: Vec<Ident>,
    fake: Vec<Ident>,
    ex_return: Option<Ident>,
}

impl LocalPool {
    pub fn new(ctx: &TranslationContext, body: &Body) -> Result<Self> {
        let mut used = BTreeSet::new();
        let mut locals = vec![];
        for (idx, local) in body.locals.iter().enumerate() {
            let name = unique_local_name(&local.name, idx, &mut used);
            locals.push(Ident::new(name, ctx.boogie_type(&local.ty)?));
        }
        Ok(Self {
            locals,
            fake: vec![],
            ex_return: None,
        })
    }

    pub fn local(&self, idx: LocalIdx) -> Result<&Ident> {
        match self.locals.get(idx) {
            Some(ident) => Ok(ident),
            None => bail!("reference to undeclared local {}", idx),
        }
    }

    /// A fresh synthesized local of type `ty`.
    pub fn fresh(&mut self, ty: BoogieType) -> Ident {
        let ident = Ident::new(format!("{}{}", FAKE_LOCAL_PREFIX, self.fake.len()), ty);
        self.fake.push(ident.clone());
        ident
    }

    /// The boolean flag marking an exceptional return, created on first use.
    pub fn ex_return_flag(&mut self) -> Ident {
        self.ex_return
            .get_or_insert_with(|| Ident::new(EX_RETURN_NAME, BoogieType::Bool))
            .clone()
    }

    pub fn has_ex_return_flag(&self) -> bool {
        self.ex_return.is_some()
    }

    /// All locals to declare in the implementation.
    pub fn declarations(&self) -> Vec<Ident> {
        self.locals
            .iter()
            .chain(self.fake.iter())
            .chain(self.ex_return.iter())
            .cloned()
            .collect()
    }
}

/// Boogie name of a source local, distinct from every name in `used`.
///
/// Receiver, parameters, result, exception slot, fake locals and all prelude globals
/// start with `$`, so leading `$` are dropped from source names; suffixes only ever
/// append.
fn unique_local_name(source: &str, idx: LocalIdx, used: &mut BTreeSet<String>) -> String {
    let base = match sanitize(source).trim_start_matches('$') {
        "" => "local".to_string(),
        stripped => stripped.to_string(),
    };
    let mut name = base.clone();
    let mut suffix = idx;
    while used.contains(&name) {
        name = format!("{}${}", base, suffix);
        suffix += 1;
    }
    used.insert(name.clone());
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TranslationOptions;
    use crate::prelude::{BoogiePrelude, OBJECT_CLONE};
    use class_bytecode::BodyBuilder;
    use class_model::{Annotation, MethodDecl, ProgramBuilder, Type};
    use itertools::Itertools;

    #[test]
    fn test_synthesized_signature() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_class("A", None, &[]);
        let object = Type::Class(builder.object());
        let m = builder.add_method(
            a,
            MethodDecl::new("m")
                .non_null_param(object.clone())
                .param(Type::Int)
                .returns(object)
                .annotate(Annotation::NonNull),
        );
        let env = builder.build().unwrap();
        let ctx = TranslationContext::new(&env, TranslationOptions::default());
        let info = ctx.procedure_info(m).unwrap();

        assert!(!info.from_prelude);
        assert_eq!(info.name(), "A$java.lang.Object$m$java.lang.Object$int");
        assert_eq!(
            info.in_params().map(|p| p.name.as_str()).collect_vec(),
            vec!["$this", "$in_parameter__0", "$in_parameter__1"]
        );
        assert_eq!(
            info.declaration.out_params.iter().map(|p| p.name.as_str()).collect_vec(),
            vec!["$return", "$exception"]
        );
        assert_eq!(
            info.declaration
                .checked_preconditions()
                .map(|e| e.display_top())
                .collect_vec(),
            vec!["$in_parameter__0 != $null"]
        );
        assert_eq!(
            info.declaration
                .checked_postconditions()
                .map(|e| e.display_top())
                .collect_vec(),
            vec!["$return != $null"]
        );
    }

    #[test]
    fn test_static_void_signature_has_only_exception_slot() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_class("A", None, &[]);
        let m = builder.add_method(a, MethodDecl::new("m").make_static());
        let env = builder.build().unwrap();
        let ctx = TranslationContext::new(&env, TranslationOptions::default());
        let info = ctx.procedure_info(m).unwrap();

        assert!(info.this_param.is_none());
        assert!(info.is_void());
        assert_eq!(info.declaration.out_params, vec![info.exception_var.clone()]);
        assert!(info.declaration.specification.is_empty());
    }

    #[test]
    fn test_prelude_signature_is_reused() {
        let mut builder = ProgramBuilder::new();
        let object = builder.object();
        let clone = builder.add_method(object, MethodDecl::new("clone").returns(Type::Class(object)));
        let env = builder.build().unwrap();

        let ctx = TranslationContext::new(&env, TranslationOptions::default());
        let info = ctx.procedure_info(clone).unwrap();
        assert!(info.from_prelude);
        assert_eq!(info.name(), OBJECT_CLONE);
        assert_eq!(Some(&info.declaration), ctx.prelude.find_procedure(OBJECT_CLONE));
        // free clauses of the prelude are not obligations
        assert_eq!(info.declaration.checked_preconditions().count(), 0);

        let ctx = TranslationContext::with_prelude(
            &env,
            TranslationOptions::default(),
            BoogiePrelude::without_procedures(),
        );
        let err = ctx.procedure_info(clone).unwrap_err();
        assert!(err.to_string().contains("must be declared by the prelude"));
    }

    #[test]
    fn test_inconsistent_prelude_signature_is_rejected() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_class("A", None, &[]);
        let m = builder.add_method(a, MethodDecl::new("m").make_static().returns(Type::Int));
        let env = builder.build().unwrap();

        let bad = ProcedureDeclaration {
            name: "A$int$m".to_string(),
            in_params: vec![],
            out_params: vec![Ident::new("$return", BoogieType::Int)],
            modifies: vec![],
            specification: vec![],
        };
        let ctx = TranslationContext::with_prelude(
            &env,
            TranslationOptions::default(),
            BoogiePrelude::without_procedures().with_procedure(bad),
        );
        let err = ctx.procedure_info(m).unwrap_err();
        assert!(err.to_string().contains("has no exception slot"));
    }

    #[test]
    fn test_local_pool_names() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_class("A", None, &[]);
        let m = builder.add_method(a, MethodDecl::new("m").make_static());
        let env = builder.build().unwrap();
        let ctx = TranslationContext::new(&env, TranslationOptions::default());

        let mut body = BodyBuilder::new(m);
        body.add_local("i", Type::Int);
        body.add_local("i", Type::Bool);
        body.add_local("s<1>", Type::Class(env.string_class()));
        let body = body.build().unwrap();

        let mut pool = LocalPool::new(&ctx, &body).unwrap();
        assert_eq!(pool.local(1).unwrap().name, "i$1");
        assert_eq!(pool.local(2).unwrap().name, "s_1_");
        assert!(pool.local(3).is_err());

        let fresh = pool.fresh(BoogieType::Ref);
        assert_eq!(fresh.name, "$fakelocal_0");
        assert!(!pool.has_ex_return_flag());
        pool.ex_return_flag();
        pool.ex_return_flag();
        assert_eq!(
            pool.declarations().iter().map(|i| i.name.as_str()).collect_vec(),
            vec!["i", "i$1", "s_1_", "$fakelocal_0", "$ex_return"]
        );
    }

    #[test]
    fn test_local_names_never_collide() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_class("A", None, &[]);
        let m = builder.add_method(a, MethodDecl::new("m").make_static());
        let env = builder.build().unwrap();
        let ctx = TranslationContext::new(&env, TranslationOptions::default());

        let mut body = BodyBuilder::new(m);
        for name in ["i", "i", "i$1", "$exception", "$fakelocal_0", "exception", "$"] {
            body.add_local(name, Type::Int);
        }
        let body = body.build().unwrap();

        let mut pool = LocalPool::new(&ctx, &body).unwrap();
        pool.fresh(BoogieType::Int);
        pool.ex_return_flag();
        let names = pool.declarations().iter().map(|i| i.name.clone()).collect_vec();
        assert_eq!(
            names,
            vec![
                "i",
                "i$1",
                "i$1$2",
                "exception",
                "fakelocal_0",
                "exception$5",
                "local",
                "$fakelocal_0",
                "$ex_return",
            ]
        );
        assert_eq!(names.iter().unique().count(), names.len());
    }
}
