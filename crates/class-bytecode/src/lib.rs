// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Stackless bytecode for class-based programs.
//!
//! Each method body is a flat list of three-address statements (`Stmt`) over typed
//! locals, together with a trap table describing which statements are covered by which
//! exception handler. Control flow is explicit: every jump names its target node, and
//! exceptional successors are derived from the trap table.

pub mod body;
pub mod bytecode;
pub mod holder;

pub use body::{Body, BodyBuilder, Local, Node, Trap};
pub use bytecode::{BinaryOp, Constant, InvokeExpr, InvokeKind, LocalIdx, NodeId, Stmt, UnaryOp, Value};
pub use holder::BodyHolder;
