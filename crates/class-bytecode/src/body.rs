// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::bytecode::{LocalIdx, NodeId, Stmt};
use anyhow::{bail, Result};
use class_model::{ClassId, Loc, MethodId, Type};
use itertools::Itertools;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub stmt: Stmt,
    pub loc: Loc,
}

/// Exception handler covering the nodes `begin..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trap {
    pub begin: NodeId,
    pub end: NodeId,
    pub exception: ClassId,
    pub handler: NodeId,
}

impl Trap {
    pub fn covers(&self, node: NodeId) -> bool {
        self.begin <= node && node < self.end
    }
}

/// Body of one method: typed locals, statements in graph order and the trap table.
#[derive(Debug, Clone)]
pub struct Body {
    pub method: MethodId,
    pub locals: Vec<Local>,
    pub nodes: Vec<Node>,
    pub traps: Vec<Trap>,
}

impl Body {
    pub fn get_node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes that are the target of a jump, a switch or an exception handler.
    pub fn branch_targets(&self) -> BTreeSet<NodeId> {
        self.nodes
            .iter()
            .flat_map(|node| node.stmt.branch_targets())
            .chain(self.traps.iter().map(|trap| trap.handler))
            .collect()
    }

    /// Traps covering `node`, in trap table order. The first matching trap wins at run time.
    pub fn traps_covering(&self, node: NodeId) -> impl Iterator<Item = &Trap> {
        self.traps.iter().filter(move |trap| trap.covers(node))
    }

    /// Distinct handler nodes reachable exceptionally from `node`, in trap table order.
    pub fn exceptional_succs(&self, node: NodeId) -> Vec<NodeId> {
        self.traps_covering(node)
            .map(|trap| trap.handler)
            .unique()
            .collect()
    }

    /// Normal (non-exceptional) successors of `node`.
    pub fn successors(&self, node: NodeId) -> Vec<NodeId> {
        let stmt = &self.nodes[node].stmt;
        let mut result = stmt.branch_targets();
        if stmt.falls_through() && node + 1 < self.nodes.len() {
            result.push(node + 1);
        }
        result.into_iter().unique().collect()
    }
}

/// Builds a `Body` statement by statement. Forward jumps can be patched with `set`.
pub struct BodyBuilder {
    method: MethodId,
    locals: Vec<Local>,
    nodes: Vec<Node>,
    traps: Vec<Trap>,
}

impl BodyBuilder {
    pub fn new(method: MethodId) -> Self {
        Self {
            method,
            locals: vec![],
            nodes: vec![],
            traps: vec![],
        }
    }

    pub fn add_local(&mut self, name: &str, ty: Type) -> LocalIdx {
        self.locals.push(Local {
            name: name.to_string(),
            ty,
        });
        self.locals.len() - 1
    }

    pub fn next_node(&self) -> NodeId {
        self.nodes.len()
    }

    pub fn push(&mut self, stmt: Stmt) -> NodeId {
        self.push_at(stmt, Loc::default())
    }

    pub fn push_at(&mut self, stmt: Stmt, loc: Loc) -> NodeId {
        self.nodes.push(Node { stmt, loc });
        self.nodes.len() - 1
    }

    pub fn set(&mut self, node: NodeId, stmt: Stmt) {
        self.nodes[node].stmt = stmt;
    }

    pub fn add_trap(&mut self, begin: NodeId, end: NodeId, exception: ClassId, handler: NodeId) {
        self.traps.push(Trap {
            begin,
            end,
            exception,
            handler,
        });
    }

    /// Checks that every jump target, handler and local index is in range.
    pub fn build(self) -> Result<Body> {
        let node_count = self.nodes.len();
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(target) = node.stmt.branch_targets().into_iter().find(|t| *t >= node_count) {
                bail!("node {} jumps to missing node {}", id, target);
            }
            match &node.stmt {
                Stmt::Identity { local, .. } | Stmt::Ret(local) if *local >= self.locals.len() => {
                    bail!("node {} refers to missing local {}", id, local)
                }
                _ => {}
            }
        }
        for trap in &self.traps {
            if trap.begin > trap.end || trap.end > node_count || trap.handler >= node_count {
                bail!("malformed trap {:?}", trap);
            }
        }
        Ok(Body {
            method: self.method,
            locals: self.locals,
            nodes: self.nodes,
            traps: self.traps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Value;

    #[test]
    fn test_branch_targets_and_successors() {
        // 0: if l0 goto 3
        // 1: goto 4
        // 2: nop          (unreachable)
        // 3: return-void
        // 4: return-void
        let mut builder = BodyBuilder::new(MethodId::new(0));
        let flag = builder.add_local("flag", Type::Bool);
        builder.push(Stmt::If {
            cond: Value::Local(flag),
            target: 3,
        });
        builder.push(Stmt::Goto(4));
        builder.push(Stmt::Nop);
        builder.push(Stmt::ReturnVoid);
        builder.push(Stmt::ReturnVoid);
        let body = builder.build().unwrap();

        assert_eq!(body.branch_targets(), BTreeSet::from([3, 4]));
        assert_eq!(body.successors(0), vec![3, 1]);
        assert_eq!(body.successors(1), vec![4]);
        assert!(body.successors(3).is_empty());
    }

    #[test]
    fn test_exceptional_successors() {
        let mut builder = BodyBuilder::new(MethodId::new(0));
        let e = builder.add_local("e", Type::Class(ClassId::new(2)));
        builder.push(Stmt::Nop);
        builder.push(Stmt::Nop);
        builder.push(Stmt::ReturnVoid);
        builder.push(Stmt::Identity {
            local: e,
            rhs: Value::CaughtExceptionRef,
        });
        builder.push(Stmt::ReturnVoid);
        builder.add_trap(0, 2, ClassId::new(5), 3);
        builder.add_trap(1, 2, ClassId::new(6), 3);
        builder.add_trap(1, 2, ClassId::new(2), 4);
        let body = builder.build().unwrap();

        assert_eq!(body.exceptional_succs(0), vec![3]);
        assert_eq!(body.exceptional_succs(1), vec![3, 4]);
        assert!(body.exceptional_succs(2).is_empty());
        assert_eq!(body.traps_covering(1).count(), 3);
        assert!(body.branch_targets().contains(&4));
        assert!(body.get_node(3).stmt.is_caught_exception_binding());
    }

    #[test]
    fn test_build_rejects_dangling_jump() {
        let mut builder = BodyBuilder::new(MethodId::new(0));
        builder.push(Stmt::Goto(7));
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("missing node 7"));
    }
}
