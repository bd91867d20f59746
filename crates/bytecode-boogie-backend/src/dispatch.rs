// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Devirtualization of dynamically dispatched calls.
//!
//! The resolver walks the subtype hierarchy below the receiver's declared class and
//! collects every class that declares its own concrete override of the called method.
//! The statement translator guards each candidate with an exact type tag comparison, so
//! the resulting branches are mutually exclusive. The walk relies on the hierarchy being
//! acyclic, which `ProgramBuilder::build` guarantees.

use class_model::{ClassId, MethodEnv, MethodId, ProgramEnv};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTarget {
    pub class: ClassId,
    pub method: MethodId,
}

pub struct DispatchResolver<'env> {
    env: &'env ProgramEnv,
}

impl<'env> DispatchResolver<'env> {
    pub fn new(env: &'env ProgramEnv) -> Self {
        Self { env }
    }

    /// Concrete overrides of `method` declared by `receiver`, the static type of the
    /// call's receiver, or by any of its subtypes, in pre-order of the hierarchy walk.
    /// Empty if none of them has a body.
    pub fn resolve(&self, receiver: ClassId, method: &MethodEnv) -> Vec<DispatchTarget> {
        let mut visited = BTreeSet::new();
        let mut targets = vec![];
        self.collect(method, receiver, &mut visited, &mut targets);
        targets
    }

    fn collect(
        &self,
        method: &MethodEnv,
        class: ClassId,
        visited: &mut BTreeSet<ClassId>,
        targets: &mut Vec<DispatchTarget>,
    ) {
        if !visited.insert(class) {
            // reachable through more than one interface
            return;
        }
        let class_env = self.env.get_class(class);
        if !class_env.is_interface() {
            if let Some(candidate) =
                class_env.find_declared_method(method.get_name_str(), method.get_parameter_types())
            {
                if candidate.is_concrete_instance_method() {
                    targets.push(DispatchTarget {
                        class,
                        method: candidate.get_id(),
                    });
                }
            }
        }
        for sub in self.env.hierarchy().direct_subtypes(class) {
            self.collect(method, sub, visited, targets);
        }
    }
}
