// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use class_model::{ClassId, FieldId, MethodId, ProgramEnv, Type};
use itertools::Itertools;
use std::fmt;

pub type LocalIdx = usize;
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f64),
    Bool(bool),
    Null,
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
    /// Three-way comparison of longs.
    Cmp,
    /// Three-way comparison of floats, `-1` on NaN.
    Cmpl,
    /// Three-way comparison of floats, `1` on NaN.
    Cmpg,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Static,
    /// Constructors, private methods and `super` calls.
    Special,
    Virtual,
    Interface,
}

impl InvokeKind {
    pub fn is_dynamic(self) -> bool {
        matches!(self, InvokeKind::Virtual | InvokeKind::Interface)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvokeExpr {
    pub kind: InvokeKind,
    /// Statically resolved target.
    pub method: MethodId,
    pub base: Option<Box<Value>>,
    pub args: Vec<Value>,
}

/// Operand or right-hand side of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Local(LocalIdx),
    Constant(Constant),
    ParameterRef(usize),
    ThisRef,
    CaughtExceptionRef,
    InstanceField { base: Box<Value>, field: FieldId },
    StaticField(FieldId),
    ArrayElement { base: Box<Value>, index: Box<Value> },
    ArrayLength(Box<Value>),
    Binary { op: BinaryOp, lhs: Box<Value>, rhs: Box<Value> },
    Unary { op: UnaryOp, operand: Box<Value> },
    Cast { value: Box<Value>, ty: Type },
    InstanceOf { value: Box<Value>, ty: Type },
    New(ClassId),
    NewArray { elem: Type, size: Box<Value> },
    /// `ty` is the full array type, `sizes` one entry per allocated dimension.
    NewMultiArray { ty: Type, sizes: Vec<Value> },
    Invoke(InvokeExpr),
}

impl Value {
    pub fn int(value: i32) -> Value {
        Value::Constant(Constant::Int(value))
    }

    pub fn null() -> Value {
        Value::Constant(Constant::Null)
    }

    pub fn string(value: &str) -> Value {
        Value::Constant(Constant::String(value.to_string()))
    }

    pub fn field(base: Value, field: FieldId) -> Value {
        Value::InstanceField {
            base: Box::new(base),
            field,
        }
    }

    pub fn element(base: Value, index: Value) -> Value {
        Value::ArrayElement {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        Value::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Declared type of the value, where it can be determined from the model.
    pub fn get_type(&self, env: &ProgramEnv, body: &crate::Body) -> Option<Type> {
        match self {
            Value::Local(idx) => body.locals.get(*idx).map(|l| l.ty.clone()),
            Value::Constant(c) => Some(match c {
                Constant::Int(_) => Type::Int,
                Constant::Long(_) => Type::Long,
                Constant::Float(_) => Type::Double,
                Constant::Bool(_) => Type::Bool,
                Constant::Null => Type::Null,
                Constant::String(_) => Type::Class(env.string_class()),
            }),
            Value::ParameterRef(idx) => env
                .get_method(body.method)
                .get_parameter_types()
                .get(*idx)
                .cloned(),
            Value::ThisRef => Some(Type::Class(env.get_method(body.method).get_class_id())),
            Value::CaughtExceptionRef => Some(Type::Class(env.throwable_class())),
            Value::InstanceField { field, .. } | Value::StaticField(field) => {
                Some(env.get_field(*field).get_type().clone())
            }
            Value::ArrayElement { base, .. } => base
                .get_type(env, body)
                .and_then(|ty| ty.element_type().cloned()),
            Value::ArrayLength(_) => Some(Type::Int),
            Value::Binary { op, lhs, .. } => match op {
                _ if op.is_comparison() => Some(Type::Bool),
                BinaryOp::Cmp | BinaryOp::Cmpl | BinaryOp::Cmpg => Some(Type::Int),
                _ => lhs.get_type(env, body),
            },
            Value::Unary { operand, .. } => operand.get_type(env, body),
            Value::Cast { ty, .. } => Some(ty.clone()),
            Value::InstanceOf { .. } => Some(Type::Bool),
            Value::New(class) => Some(Type::Class(*class)),
            Value::NewArray { elem, .. } => Some(Type::array_of(elem.clone())),
            Value::NewMultiArray { ty, .. } => Some(ty.clone()),
            Value::Invoke(invoke) => Some(env.get_method(invoke.method).get_return_type().clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Local(idx) => write!(f, "l{}", idx),
            Value::Constant(Constant::String(s)) => write!(f, "{:?}", s),
            Value::Constant(Constant::Null) => f.write_str("null"),
            Value::Constant(Constant::Int(v)) => write!(f, "{}", v),
            Value::Constant(Constant::Long(v)) => write!(f, "{}L", v),
            Value::Constant(Constant::Float(v)) => write!(f, "{:?}", v),
            Value::Constant(Constant::Bool(v)) => write!(f, "{}", v),
            Value::ParameterRef(idx) => write!(f, "@parameter{}", idx),
            Value::ThisRef => f.write_str("@this"),
            Value::CaughtExceptionRef => f.write_str("@caughtexception"),
            Value::InstanceField { base, field } => write!(f, "{}.<f{}>", base, field.as_usize()),
            Value::StaticField(field) => write!(f, "<f{}>", field.as_usize()),
            Value::ArrayElement { base, index } => write!(f, "{}[{}]", base, index),
            Value::ArrayLength(base) => write!(f, "lengthof {}", base),
            Value::Binary { op, lhs, rhs } => write!(f, "{} {:?} {}", lhs, op, rhs),
            Value::Unary { operand, .. } => write!(f, "neg {}", operand),
            Value::Cast { value, ty } => write!(f, "({:?}) {}", ty, value),
            Value::InstanceOf { value, ty } => write!(f, "{} instanceof {:?}", value, ty),
            Value::New(class) => write!(f, "new c{}", class.as_usize()),
            Value::NewArray { elem, size } => write!(f, "newarray ({:?})[{}]", elem, size),
            Value::NewMultiArray { ty, sizes } => {
                write!(f, "newmultiarray ({:?})[{}]", ty, sizes.iter().join("]["))
            }
            Value::Invoke(invoke) => write!(
                f,
                "{:?}invoke m{}({})",
                invoke.kind,
                invoke.method.as_usize(),
                invoke.args.iter().join(", ")
            ),
        }
    }
}

/// A single stackless statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { lhs: Value, rhs: Value },
    /// Binds `this`, a parameter or the caught exception to a local.
    Identity { local: LocalIdx, rhs: Value },
    Invoke(InvokeExpr),
    Goto(NodeId),
    If { cond: Value, target: NodeId },
    LookupSwitch { key: Value, cases: Vec<(i32, NodeId)>, default: NodeId },
    TableSwitch { key: Value, low: i32, targets: Vec<NodeId>, default: NodeId },
    Return(Value),
    ReturnVoid,
    Throw(Value),
    Nop,
    Breakpoint,
    EnterMonitor(Value),
    ExitMonitor(Value),
    /// Subroutine return from old-style `jsr` code.
    Ret(LocalIdx),
}

impl Stmt {
    /// Explicit branch targets of this statement, in source order.
    pub fn branch_targets(&self) -> Vec<NodeId> {
        match self {
            Stmt::Goto(target) | Stmt::If { target, .. } => vec![*target],
            Stmt::LookupSwitch { cases, default, .. } => cases
                .iter()
                .map(|(_, target)| *target)
                .chain(std::iter::once(*default))
                .collect(),
            Stmt::TableSwitch { targets, default, .. } => targets
                .iter()
                .copied()
                .chain(std::iter::once(*default))
                .collect(),
            _ => vec![],
        }
    }

    /// Whether control can continue with the next node.
    pub fn falls_through(&self) -> bool {
        !matches!(
            self,
            Stmt::Goto(_)
                | Stmt::LookupSwitch { .. }
                | Stmt::TableSwitch { .. }
                | Stmt::Return(_)
                | Stmt::ReturnVoid
                | Stmt::Throw(_)
                | Stmt::Ret(_)
        )
    }

    pub fn is_caught_exception_binding(&self) -> bool {
        matches!(
            self,
            Stmt::Identity {
                rhs: Value::CaughtExceptionRef,
                ..
            }
        )
    }
}
