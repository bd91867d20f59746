// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Subtype graph over classes and interfaces.
//!
//! Nodes are indexed by `ClassId`; an edge `a -> b` means `a` directly extends or
//! implements `b`. The graph must be acyclic; `ProgramBuilder::build` rejects cyclic
//! hierarchies so the recursive walks here never need cycle detection.

use crate::model::ClassId;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    graph: DiGraph<ClassId, ()>,
}

impl ClassHierarchy {
    pub(crate) fn new(class_count: usize, edges: impl IntoIterator<Item = (ClassId, ClassId)>) -> Self {
        let mut graph = DiGraph::new();
        for idx in 0..class_count {
            graph.add_node(ClassId::new(idx));
        }
        for (sub, sup) in edges {
            graph.add_edge(node(sub), node(sup), ());
        }
        Self { graph }
    }

    pub(crate) fn is_cyclic(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Classes and interfaces that directly extend or implement `id`, in id order.
    pub fn direct_subtypes(&self, id: ClassId) -> Vec<ClassId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct superclass and superinterfaces of `id`, in id order.
    pub fn direct_supertypes(&self, id: ClassId) -> Vec<ClassId> {
        self.neighbors(id, Direction::Outgoing)
    }

    pub fn is_subtype_or_equal(&self, sub: ClassId, sup: ClassId) -> bool {
        sub == sup || has_path_connecting(&self.graph, node(sub), node(sup), None)
    }

    pub fn is_strict_subtype(&self, sub: ClassId, sup: ClassId) -> bool {
        sub != sup && self.is_subtype_or_equal(sub, sup)
    }

    fn neighbors(&self, id: ClassId, direction: Direction) -> Vec<ClassId> {
        let mut result = self
            .graph
            .neighbors_directed(node(id), direction)
            .map(|idx| self.graph[idx])
            .collect::<Vec<_>>();
        result.sort();
        result.dedup();
        result
    }
}

fn node(id: ClassId) -> NodeIndex {
    NodeIndex::new(id.as_usize())
}
