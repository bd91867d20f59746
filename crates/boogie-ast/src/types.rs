// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoogieType {
    Int,
    Bool,
    Real,
    Ref,
    /// Runtime type discriminator (`javaType`).
    TypeTag,
    /// Heap field holding values of the given type.
    Field(Box<BoogieType>),
    Map(Vec<BoogieType>, Box<BoogieType>),
    /// The polymorphic object heap `<x>[ref, Field x]x`.
    Heap,
}

impl BoogieType {
    pub fn field(ty: BoogieType) -> Self {
        BoogieType::Field(Box::new(ty))
    }

    pub fn map(domain: Vec<BoogieType>, range: BoogieType) -> Self {
        BoogieType::Map(domain, Box::new(range))
    }
}

impl fmt::Display for BoogieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoogieType::Int => f.write_str("int"),
            BoogieType::Bool => f.write_str("bool"),
            BoogieType::Real => f.write_str("real"),
            BoogieType::Ref => f.write_str("ref"),
            BoogieType::TypeTag => f.write_str("javaType"),
            BoogieType::Field(ty) => write!(f, "Field {}", ty),
            BoogieType::Map(domain, range) => write!(f, "[{}]{}", domain.iter().join(", "), range),
            BoogieType::Heap => f.write_str("<x>[ref, Field x]x"),
        }
    }
}
