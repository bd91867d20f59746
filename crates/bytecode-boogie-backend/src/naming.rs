// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Boogie names for procedures, type tags, fields and labels.

use class_bytecode::NodeId;
use class_model::{FieldEnv, MethodEnv, MethodId, ProgramEnv, Type};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

static INVALID_IDENT_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.$#'~^?]").expect("valid regex"));

/// Replaces characters Boogie does not accept in identifiers.
pub fn sanitize(name: &str) -> String {
    INVALID_IDENT_CHARS.replace_all(name, "_").into_owned()
}

/// Name fragment of a type, `elem$arr` for arrays.
pub fn type_fragment(env: &ProgramEnv, ty: &Type) -> String {
    match ty {
        Type::Array(elem) => format!("{}$arr", type_fragment(env, elem)),
        _ => ty.display(env).to_string(),
    }
}

/// `Class$ReturnType$name$Param1$Param2...`
pub fn procedure_name(method: &MethodEnv) -> String {
    let env = method.env;
    let parts = [
        method.get_class().get_name().to_string(),
        type_fragment(env, method.get_return_type()),
        method.get_name_str().to_string(),
    ]
    .into_iter()
    .chain(method.get_parameter_types().iter().map(|ty| type_fragment(env, ty)))
    .collect_vec();
    sanitize(&parts.join("$"))
}

pub fn type_tag_name(env: &ProgramEnv, ty: &Type) -> String {
    format!("$type_{}", sanitize(&type_fragment(env, ty)))
}

pub fn field_name(field: &FieldEnv) -> String {
    sanitize(&field.get_full_name_str())
}

pub fn label_name(method: MethodId, node: NodeId) -> String {
    format!("block_{}_{}", method.as_usize(), node)
}
