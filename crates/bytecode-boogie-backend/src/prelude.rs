// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Heap model and standard declarations emitted in front of every generated program.
//!
//! Objects live in a single polymorphic heap `$heap: <x>[ref, Field x]x`. Every reference
//! carries an allocation flag (`$alloc`) and a runtime type tag (`$type`). Array lengths
//! and string literal lengths are kept in separate maps, and array contents in one map
//! per element kind.

use crate::error_model::ViolationKind;
use boogie_ast::{BoogieType, Declaration, Expression, Ident, ProcedureDeclaration, Specification, Statement};
use std::collections::BTreeMap;

/// Name of the prelude procedure for `java.lang.Object.clone()`.
pub const OBJECT_CLONE: &str = "java.lang.Object$java.lang.Object$clone";

/// Procedures whose signature must come from the prelude and never be synthesized.
pub const NEVER_SYNTHESIZE: &[&str] = &[OBJECT_CLONE];

pub const INT_TO_BOOL: &str = "$intToBool";
pub const BOOL_TO_INT: &str = "$boolToInt";
pub const INT_TO_REAL: &str = "$intToReal";
pub const REAL_TO_INT: &str = "$realToInt";

/// Uninterpreted integer operators, `(int, int) returns (int)`.
pub const BIT_AND: &str = "$bitAnd";
pub const BIT_OR: &str = "$bitOr";
pub const BIT_XOR: &str = "$bitXor";
pub const SHL: &str = "$shl";
pub const SHR: &str = "$shr";
pub const USHR: &str = "$ushr";
pub const CMP_INT: &str = "$cmpInt";
/// Truncating remainder; Boogie's `mod` is Euclidean.
pub const REM_INT: &str = "$remInt";

/// Truncating floating remainder, `(real, real) returns (real)`.
pub const REM_REAL: &str = "$remReal";

/// Uninterpreted float comparisons, `(real, real) returns (int)`.
pub const CMPL_REAL: &str = "$cmplReal";
pub const CMPG_REAL: &str = "$cmpgReal";

const INT_BINARY_FUNCTIONS: &[&str] = &[BIT_AND, BIT_OR, BIT_XOR, SHL, SHR, USHR, CMP_INT, REM_INT];
const REAL_COMPARE_FUNCTIONS: &[&str] = &[CMPL_REAL, CMPG_REAL];

pub struct BoogiePrelude {
    pub null: Ident,
    pub heap: Ident,
    pub alloc: Ident,
    pub type_field: Ident,
    pub array_size: Ident,
    pub string_size: Ident,
    pub int_array_heap: Ident,
    pub real_array_heap: Ident,
    pub bool_array_heap: Ident,
    pub ref_array_heap: Ident,
    procedures: BTreeMap<String, ProcedureDeclaration>,
}

impl Default for BoogiePrelude {
    fn default() -> Self {
        Self::new()
    }
}

impl BoogiePrelude {
    /// The standard prelude, including the standard library procedure declarations.
    pub fn new() -> Self {
        let prelude = Self::without_procedures();
        let clone = prelude.object_clone_declaration();
        prelude.with_procedure(clone)
    }

    pub fn without_procedures() -> Self {
        let element_heap = |name: &str, ty: BoogieType| {
            Ident::new(
                name,
                BoogieType::map(vec![BoogieType::Ref], BoogieType::map(vec![BoogieType::Int], ty)),
            )
        };
        Self {
            null: Ident::new("$null", BoogieType::Ref),
            heap: Ident::new("$heap", BoogieType::Heap),
            alloc: Ident::new("$alloc", BoogieType::field(BoogieType::Bool)),
            type_field: Ident::new("$type", BoogieType::field(BoogieType::TypeTag)),
            array_size: Ident::new("$arrSizeHeap", BoogieType::map(vec![BoogieType::Ref], BoogieType::Int)),
            string_size: Ident::new("$stringSizeHeap", BoogieType::map(vec![BoogieType::Ref], BoogieType::Int)),
            int_array_heap: element_heap("$intArrHeap", BoogieType::Int),
            real_array_heap: element_heap("$realArrHeap", BoogieType::Real),
            bool_array_heap: element_heap("$boolArrHeap", BoogieType::Bool),
            ref_array_heap: element_heap("$refArrHeap", BoogieType::Ref),
            procedures: BTreeMap::new(),
        }
    }

    pub fn with_procedure(mut self, declaration: ProcedureDeclaration) -> Self {
        self.procedures.insert(declaration.name.clone(), declaration);
        self
    }

    pub fn find_procedure(&self, name: &str) -> Option<&ProcedureDeclaration> {
        self.procedures.get(name)
    }

    /// Constant stored in the exception slot when an obligation of `kind` is violated.
    pub fn witness(&self, kind: ViolationKind) -> Ident {
        let name = match kind {
            ViolationKind::NullPointer => "$exNullPointer",
            ViolationKind::ArrayBounds => "$exArrayIndex",
            ViolationKind::ClassCast => "$exClassCast",
            ViolationKind::Precondition => "$exPrecondition",
            ViolationKind::Postcondition => "$exPostcondition",
            ViolationKind::Unexpected => "$exUnexpected",
        };
        Ident::new(name, BoogieType::Ref)
    }

    /// Global variables assigned by translated code.
    pub fn mutable_globals(&self) -> Vec<Ident> {
        vec![
            self.heap.clone(),
            self.array_size.clone(),
            self.string_size.clone(),
            self.int_array_heap.clone(),
            self.real_array_heap.clone(),
            self.bool_array_heap.clone(),
            self.ref_array_heap.clone(),
        ]
    }

    /// Element map for arrays whose elements have boogie type `elem`.
    pub fn array_heap(&self, elem: &BoogieType) -> Option<&Ident> {
        match elem {
            BoogieType::Int => Some(&self.int_array_heap),
            BoogieType::Real => Some(&self.real_array_heap),
            BoogieType::Bool => Some(&self.bool_array_heap),
            BoogieType::Ref => Some(&self.ref_array_heap),
            _ => None,
        }
    }

    pub fn heap_read(&self, obj: Expression, field: &Ident) -> Expression {
        Expression::select(self.heap.expr(), vec![obj, field.expr()])
    }

    pub fn heap_write(&self, obj: Expression, field: &Ident, value: Expression) -> Statement {
        Statement::assign(
            &self.heap,
            Expression::store(self.heap.expr(), vec![obj, field.expr()], value),
        )
    }

    /// `$heap[obj, $type]`
    pub fn type_of(&self, obj: Expression) -> Expression {
        self.heap_read(obj, &self.type_field)
    }

    pub fn is_non_null(&self, e: Expression) -> Expression {
        Expression::neq(e, self.null.expr())
    }

    /// `e` converted to `to`, or `None` if there is no conversion between the two types.
    pub fn coerce(&self, e: Expression, to: &BoogieType) -> Option<Expression> {
        let from = e.ty();
        if &from == to {
            return Some(e);
        }
        let apply = |name: &str, arg: Expression, ty: BoogieType| Expression::call(name, vec![arg], ty);
        match (from, to) {
            (BoogieType::Int, BoogieType::Bool) => Some(apply(INT_TO_BOOL, e, BoogieType::Bool)),
            (BoogieType::Bool, BoogieType::Int) => Some(apply(BOOL_TO_INT, e, BoogieType::Int)),
            (BoogieType::Int, BoogieType::Real) => Some(apply(INT_TO_REAL, e, BoogieType::Real)),
            (BoogieType::Real, BoogieType::Int) => Some(apply(REAL_TO_INT, e, BoogieType::Int)),
            (BoogieType::Bool, BoogieType::Real) => Some(apply(
                INT_TO_REAL,
                apply(BOOL_TO_INT, e, BoogieType::Int),
                BoogieType::Real,
            )),
            (BoogieType::Real, BoogieType::Bool) => Some(apply(
                INT_TO_BOOL,
                apply(REAL_TO_INT, e, BoogieType::Int),
                BoogieType::Bool,
            )),
            _ => None,
        }
    }

    fn object_clone_declaration(&self) -> ProcedureDeclaration {
        let this = Ident::new("$this", BoogieType::Ref);
        let ret = Ident::new("$return", BoogieType::Ref);
        ProcedureDeclaration {
            name: OBJECT_CLONE.to_string(),
            in_params: vec![this.clone()],
            out_params: vec![ret.clone(), Ident::new("$exception", BoogieType::Ref)],
            modifies: vec![self.heap.clone()],
            specification: vec![
                Specification::Requires {
                    free: true,
                    formula: self.is_non_null(this.expr()),
                },
                Specification::Ensures {
                    free: true,
                    formula: self.is_non_null(ret.expr()),
                },
            ],
        }
    }

    /// Type, constant, variable, function and procedure declarations of the prelude.
    pub fn declarations(&self) -> Vec<Declaration> {
        let mut decls = vec![
            Declaration::TypeDecl {
                name: "ref".to_string(),
                params: vec![],
            },
            Declaration::TypeDecl {
                name: "javaType".to_string(),
                params: vec![],
            },
            Declaration::TypeDecl {
                name: "Field".to_string(),
                params: vec!["x".to_string()],
            },
            Declaration::Constant {
                ident: self.null.clone(),
                unique: true,
                extends: vec![],
            },
            Declaration::Variable(self.heap.clone()),
            Declaration::Constant {
                ident: self.alloc.clone(),
                unique: true,
                extends: vec![],
            },
            Declaration::Constant {
                ident: self.type_field.clone(),
                unique: true,
                extends: vec![],
            },
            Declaration::Variable(self.array_size.clone()),
            Declaration::Variable(self.string_size.clone()),
            Declaration::Variable(self.int_array_heap.clone()),
            Declaration::Variable(self.real_array_heap.clone()),
            Declaration::Variable(self.bool_array_heap.clone()),
            Declaration::Variable(self.ref_array_heap.clone()),
        ];
        let conversions = [
            (INT_TO_BOOL, BoogieType::Int, BoogieType::Bool),
            (BOOL_TO_INT, BoogieType::Bool, BoogieType::Int),
            (INT_TO_REAL, BoogieType::Int, BoogieType::Real),
            (REAL_TO_INT, BoogieType::Real, BoogieType::Int),
        ];
        for (name, from, to) in conversions {
            decls.push(Declaration::Function {
                name: name.to_string(),
                params: vec![from],
                result: to,
            });
        }
        for name in INT_BINARY_FUNCTIONS {
            decls.push(Declaration::Function {
                name: name.to_string(),
                params: vec![BoogieType::Int, BoogieType::Int],
                result: BoogieType::Int,
            });
        }
        decls.push(Declaration::Function {
            name: REM_REAL.to_string(),
            params: vec![BoogieType::Real, BoogieType::Real],
            result: BoogieType::Real,
        });
        for name in REAL_COMPARE_FUNCTIONS {
            decls.push(Declaration::Function {
                name: name.to_string(),
                params: vec![BoogieType::Real, BoogieType::Real],
                result: BoogieType::Int,
            });
        }
        for kind in ViolationKind::ALL {
            let witness = self.witness(*kind);
            decls.push(Declaration::Constant {
                ident: witness.clone(),
                unique: true,
                extends: vec![],
            });
            decls.push(Declaration::Axiom(self.is_non_null(witness.expr())));
        }
        decls.extend(self.procedures.values().cloned().map(Declaration::Procedure));
        decls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_procedures() {
        let prelude = BoogiePrelude::new();
        let clone = prelude.find_procedure(OBJECT_CLONE).unwrap();
        assert_eq!(clone.out_params.last().unwrap().name, "$exception");
        assert!(BoogiePrelude::without_procedures().find_procedure(OBJECT_CLONE).is_none());
    }

    #[test]
    fn test_coercions() {
        let prelude = BoogiePrelude::new();
        let i = Ident::new("i", BoogieType::Int);
        let coerced = prelude.coerce(i.expr(), &BoogieType::Bool).unwrap();
        assert_eq!(coerced.to_string(), "$intToBool(i)");
        assert_eq!(coerced.ty(), BoogieType::Bool);
        assert_eq!(prelude.coerce(i.expr(), &BoogieType::Int), Some(i.expr()));
        assert!(prelude.coerce(i.expr(), &BoogieType::Ref).is_none());
    }

    #[test]
    fn test_element_heap_access_type() {
        // $refArrHeap[a][i] has type ref
        let prelude = BoogiePrelude::new();
        let a = Ident::new("a", BoogieType::Ref);
        let i = Ident::new("i", BoogieType::Int);
        let heap = prelude.array_heap(&BoogieType::Ref).unwrap();
        let read = Expression::select(Expression::select(heap.expr(), vec![a.expr()]), vec![i.expr()]);
        assert_eq!(read.ty(), BoogieType::Ref);
        assert_eq!(read.to_string(), "$refArrHeap[a][i]");
    }

    #[test]
    fn test_declarations_contain_witnesses() {
        let decls = BoogiePrelude::new().declarations();
        let witnesses = decls
            .iter()
            .filter(|d| matches!(d, Declaration::Axiom(_)))
            .count();
        assert_eq!(witnesses, ViolationKind::ALL.len());
        assert!(decls
            .iter()
            .any(|d| matches!(d, Declaration::Procedure(p) if p.name == OBJECT_CLONE)));
    }
}
