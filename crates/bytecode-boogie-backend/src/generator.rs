// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Whole-program generation.
//!
//! Generation runs in two phases over one `TranslationContext`: every signature is
//! built first, so that any call site finds its callee registered, then every body of a
//! class in scope is translated. A failure in either phase is reported as a diagnostic
//! against the method and only drops that method's procedure.

use crate::context::TranslationContext;
use crate::options::TranslationOptions;
use crate::translator::translate_body;
use anyhow::{anyhow, Result};
use boogie_ast::{Declaration, Implementation, Program};
use class_bytecode::BodyHolder;
use class_model::{ProgramEnv, Type};
use codespan_reporting::diagnostic::Severity;
use codespan_reporting::term::termcolor::WriteColor;
use itertools::Itertools;
use log::{debug, error, info};
use std::time::Instant;

pub struct BoogieGenerator<'env> {
    ctx: TranslationContext<'env>,
    bodies: &'env BodyHolder,
}

impl<'env> BoogieGenerator<'env> {
    pub fn new(env: &'env ProgramEnv, bodies: &'env BodyHolder, options: TranslationOptions) -> Self {
        Self::with_context(TranslationContext::new(env, options), bodies)
    }

    pub fn with_context(ctx: TranslationContext<'env>, bodies: &'env BodyHolder) -> Self {
        Self { ctx, bodies }
    }

    pub fn context(&self) -> &TranslationContext<'env> {
        &self.ctx
    }

    pub fn generate(&self) -> Program {
        let env = self.ctx.env;

        for class in env.get_classes() {
            self.ctx.class_tag(class.get_id());
        }
        for field in env.get_fields() {
            if let Err(err) = self.ctx.field(field.get_id()) {
                let msg = format!("cannot translate field `{}`: {:#}", field.get_full_name_str(), err);
                self.ctx.diag(Severity::Error, &field.get_class().get_loc(), &msg);
            }
        }
        for method in env.get_methods() {
            if let Err(err) = self.ctx.procedure_info(method.get_id()) {
                let msg = format!("cannot build signature of `{}`: {:#}", method.get_full_name_str(), err);
                self.ctx.diag(Severity::Error, &method.get_loc(), &msg);
            }
        }

        let mut implementations = vec![];
        for body in self.bodies.bodies() {
            let method = env.get_method(body.method);
            if !self.ctx.options.is_in_scope(&method.get_class()) {
                debug!("skipping `{}`: out of scope", method.get_full_name_str());
                continue;
            }
            match translate_body(&self.ctx, body) {
                Ok(implementation) => implementations.push(implementation),
                Err(err) => {
                    let msg = format!("cannot translate `{}`: {:#}", method.get_full_name_str(), err);
                    self.ctx.diag(Severity::Error, &method.get_loc(), &msg);
                }
            }
        }
        info!("translated {} procedure bodies", implementations.len());

        self.assemble(implementations)
    }

    fn assemble(&self, implementations: Vec<Implementation>) -> Program {
        let env = self.ctx.env;
        let mut declarations = self.ctx.prelude.declarations();

        for (ty, tag) in self.ctx.type_tags() {
            let extends = match &ty {
                Type::Class(class) => env
                    .hierarchy()
                    .direct_supertypes(*class)
                    .into_iter()
                    .map(|sup| self.ctx.class_tag(sup).name)
                    .collect_vec(),
                Type::Array(_) => vec![self.ctx.class_tag(env.object_class()).name],
                _ => vec![],
            };
            declarations.push(Declaration::Constant {
                ident: tag,
                unique: true,
                extends,
            });
        }
        for (field, ident) in self.ctx.fields() {
            if env.get_field(field).is_static() {
                declarations.push(Declaration::Variable(ident));
            } else {
                declarations.push(Declaration::Constant {
                    ident,
                    unique: true,
                    extends: vec![],
                });
            }
        }
        // fresh globals only exist once all bodies are translated
        let fresh_globals = self.ctx.fresh_globals();
        declarations.extend(fresh_globals.iter().cloned().map(Declaration::Variable));
        for info in self.ctx.procedures().iter().filter(|info| !info.from_prelude) {
            let mut declaration = info.declaration.clone();
            declaration.modifies.extend(fresh_globals.iter().cloned());
            declarations.push(Declaration::Procedure(declaration));
        }
        declarations.extend(implementations.into_iter().map(Declaration::Implementation));
        Program { declarations }
    }
}

/// Generates the Boogie text of `env`, reporting diagnostics to `error_writer`.
pub fn run_boogie_gen<W: WriteColor>(
    env: &ProgramEnv,
    bodies: &BodyHolder,
    options: TranslationOptions,
    error_writer: &mut W,
) -> Result<String> {
    let now = Instant::now();
    let generator = BoogieGenerator::new(env, bodies, options);
    let program = generator.generate();
    let ctx = generator.context();
    ctx.report_diag(error_writer, Severity::Warning)?;
    if ctx.has_errors() {
        error!("boogie generation finished with errors");
        return Err(anyhow!("exiting with translation errors"));
    }
    info!("{:.3}s translation", now.elapsed().as_secs_f64());
    Ok(program.to_string())
}
