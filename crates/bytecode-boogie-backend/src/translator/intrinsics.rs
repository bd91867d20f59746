// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use class_model::{well_known, MethodEnv, Type};

/// Library methods whose calls are replaced by a fixed encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    /// `static void java.lang.System.exit(int)`: the procedure ends here.
    Exit,
    /// `int java.lang.String.length()`, read from the string length map.
    StringLength,
}

/// Matches on the full signature, so overloads sharing a name are called normally.
pub fn lookup(method: &MethodEnv) -> Option<Intrinsic> {
    let params = method.get_parameter_types();
    let ret = method.get_return_type();
    match (method.get_class().get_name(), method.get_name_str()) {
        (well_known::SYSTEM, "exit")
            if method.is_static() && matches!(params, [Type::Int]) && ret.is_void() =>
        {
            Some(Intrinsic::Exit)
        }
        (well_known::STRING, "length")
            if !method.is_static() && params.is_empty() && *ret == Type::Int =>
        {
            Some(Intrinsic::StringLength)
        }
        _ => None,
    }
}
