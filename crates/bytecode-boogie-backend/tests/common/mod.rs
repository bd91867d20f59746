// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use boogie_ast::{BinOp, Expression, Implementation, Statement};
use bytecode_boogie_backend::{translate_body, TranslationContext, TranslationOptions};
use class_bytecode::Body;
use class_model::ProgramEnv;
use log::LevelFilter;
use simplelog::{Config, TestLogger};

pub fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

/// Translates `body` with a fresh context and the given options.
pub fn translate_with(env: &ProgramEnv, body: &Body, options: TranslationOptions) -> Implementation {
    init_logger();
    let ctx = TranslationContext::new(env, options);
    translate_body(&ctx, body).unwrap()
}

pub fn translate(env: &ProgramEnv, body: &Body) -> Implementation {
    translate_with(env, body, TranslationOptions::default())
}

pub fn render(implementation: &Implementation) -> String {
    Statement::render_all(&implementation.body)
}

/// All statements of `statements`, nested ones included, in emission order.
pub fn flatten(statements: &[Statement]) -> Vec<&Statement> {
    statements.iter().flat_map(|s| s.iter()).collect()
}

pub fn calls(statements: &[Statement]) -> Vec<(&str, usize)> {
    flatten(statements)
        .into_iter()
        .filter_map(|s| match s {
            Statement::Call { procedure, outs, .. } => Some((procedure.as_str(), outs.len())),
            _ => None,
        })
        .collect()
}

/// Top-level `if` statements whose condition is an equality test.
pub fn equality_branches(statements: &[Statement]) -> Vec<&Statement> {
    statements
        .iter()
        .filter(|s| {
            matches!(
                s,
                Statement::If {
                    condition: Expression::Binary { op: BinOp::Eq, .. },
                    ..
                }
            )
        })
        .collect()
}
