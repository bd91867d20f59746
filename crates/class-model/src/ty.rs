// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::model::{ClassId, ProgramEnv};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a local, parameter, field or return value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Type {
    Bool,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    /// Type of the `null` literal.
    Null,
    Class(ClassId),
    Array(Box<Type>),
}

impl Type {
    pub fn array_of(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Class(_) | Type::Array(_) | Type::Null)
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Type::Byte | Type::Char | Type::Short | Type::Int | Type::Long
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Type::Float | Type::Double)
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Number of array dimensions, zero for non-array types.
    pub fn dimensions(&self) -> usize {
        match self {
            Type::Array(elem) => 1 + elem.dimensions(),
            _ => 0,
        }
    }

    pub fn display<'a>(&'a self, env: &'a ProgramEnv) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, env }
    }
}

pub struct TypeDisplay<'a> {
    ty: &'a Type,
    env: &'a ProgramEnv,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Type::Bool => f.write_str("boolean"),
            Type::Byte => f.write_str("byte"),
            Type::Char => f.write_str("char"),
            Type::Short => f.write_str("short"),
            Type::Int => f.write_str("int"),
            Type::Long => f.write_str("long"),
            Type::Float => f.write_str("float"),
            Type::Double => f.write_str("double"),
            Type::Void => f.write_str("void"),
            Type::Null => f.write_str("null_type"),
            Type::Class(id) => f.write_str(self.env.get_class(*id).get_name()),
            Type::Array(elem) => write!(f, "{}[]", elem.display(self.env)),
        }
    }
}

/// Annotations the verifier understands. Anything else is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Annotation {
    NonNull,
    Nullable,
    /// The annotated return value has exactly the declared type; no override narrows it.
    ExactType,
    Other(String),
}
