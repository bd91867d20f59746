// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::types::BoogieType;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;

/// Typed identifier of a variable, constant or parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident {
    pub name: String,
    pub ty: BoogieType,
}

impl Ident {
    pub fn new(name: impl Into<String>, ty: BoogieType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn expr(&self) -> Expression {
        Expression::Ident(self.clone())
    }

    /// `name: type`, as used in parameter and variable declarations.
    pub fn typed(&self) -> String {
        format!("{}: {}", self.name, self.ty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BinOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    /// Integer division.
    Div,
    Mod,
    RealDiv,
    And,
    Or,
    Implies,
    Subtype,
}

impl BinOp {
    pub fn is_boolean(self) -> bool {
        !matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::RealDiv
        )
    }

    fn symbol(self) -> &'static str {
        match self {
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "div",
            BinOp::Mod => "mod",
            BinOp::RealDiv => "/",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Implies => "==>",
            BinOp::Subtype => "<:",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expression {
    Ident(Ident),
    BoolLit(bool),
    IntLit(i64),
    /// Decimal literal, kept textual so expressions stay `Eq`.
    RealLit(String),
    Binary {
        op: BinOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expression>,
    },
    /// `array[i1, ..., in]`
    ArrayAccess {
        array: Box<Expression>,
        indices: Vec<Expression>,
    },
    /// `array[i1, ..., in := value]`
    ArrayStore {
        array: Box<Expression>,
        indices: Vec<Expression>,
        value: Box<Expression>,
    },
    FunctionApp {
        name: String,
        args: Vec<Expression>,
        ty: BoogieType,
    },
}

impl Expression {
    pub fn binary(op: BinOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn eq(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Eq, lhs, rhs)
    }

    pub fn neq(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Neq, lhs, rhs)
    }

    pub fn and(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::And, lhs, rhs)
    }

    pub fn or(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Or, lhs, rhs)
    }

    pub fn subtype(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Subtype, lhs, rhs)
    }

    pub fn not(operand: Expression) -> Self {
        Expression::Unary {
            op: UnOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn select(array: Expression, indices: Vec<Expression>) -> Self {
        Expression::ArrayAccess {
            array: Box::new(array),
            indices,
        }
    }

    pub fn store(array: Expression, indices: Vec<Expression>, value: Expression) -> Self {
        Expression::ArrayStore {
            array: Box::new(array),
            indices,
            value: Box::new(value),
        }
    }

    pub fn call(name: &str, args: Vec<Expression>, ty: BoogieType) -> Self {
        Expression::FunctionApp {
            name: name.to_string(),
            args,
            ty,
        }
    }

    pub fn ty(&self) -> BoogieType {
        match self {
            Expression::Ident(ident) => ident.ty.clone(),
            Expression::BoolLit(_) => BoogieType::Bool,
            Expression::IntLit(_) => BoogieType::Int,
            Expression::RealLit(_) => BoogieType::Real,
            Expression::Binary { op, lhs, .. } => match op {
                BinOp::RealDiv => BoogieType::Real,
                op if op.is_boolean() => BoogieType::Bool,
                _ => lhs.ty(),
            },
            Expression::Unary { op, operand } => match op {
                UnOp::Not => BoogieType::Bool,
                UnOp::Neg => operand.ty(),
            },
            Expression::ArrayAccess { array, indices } => match array.ty() {
                BoogieType::Map(_, range) => *range,
                BoogieType::Heap => match indices.get(1).map(Expression::ty) {
                    Some(BoogieType::Field(ty)) => *ty,
                    other => panic!("BUG: heap accessed with non-field index of type {:?}", other),
                },
                other => panic!("BUG: indexing into non-map expression of type {}", other),
            },
            Expression::ArrayStore { array, .. } => array.ty(),
            Expression::FunctionApp { ty, .. } => ty.clone(),
        }
    }

    /// Replaces free identifiers according to `map`.
    pub fn substitute(&self, map: &BTreeMap<Ident, Expression>) -> Expression {
        let sub = |e: &Expression| Box::new(e.substitute(map));
        let sub_all = |es: &[Expression]| es.iter().map(|e| e.substitute(map)).collect_vec();
        match self {
            Expression::Ident(ident) => map.get(ident).cloned().unwrap_or_else(|| self.clone()),
            Expression::BoolLit(_) | Expression::IntLit(_) | Expression::RealLit(_) => self.clone(),
            Expression::Binary { op, lhs, rhs } => Expression::Binary {
                op: *op,
                lhs: sub(lhs),
                rhs: sub(rhs),
            },
            Expression::Unary { op, operand } => Expression::Unary {
                op: *op,
                operand: sub(operand),
            },
            Expression::ArrayAccess { array, indices } => Expression::ArrayAccess {
                array: sub(array),
                indices: sub_all(indices),
            },
            Expression::ArrayStore {
                array,
                indices,
                value,
            } => Expression::ArrayStore {
                array: sub(array),
                indices: sub_all(indices),
                value: sub(value),
            },
            Expression::FunctionApp { name, args, ty } => Expression::FunctionApp {
                name: name.clone(),
                args: sub_all(args),
                ty: ty.clone(),
            },
        }
    }

    /// Renders without the outermost parentheses of a binary expression.
    pub fn display_top(&self) -> String {
        match self {
            Expression::Binary { op, lhs, rhs } => format!("{} {} {}", lhs, op.symbol(), rhs),
            _ => self.to_string(),
        }
    }
}

impl From<&Ident> for Expression {
    fn from(ident: &Ident) -> Self {
        Expression::Ident(ident.clone())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Ident(ident) => f.write_str(&ident.name),
            Expression::BoolLit(b) => write!(f, "{}", b),
            Expression::IntLit(i) => write!(f, "{}", i),
            Expression::RealLit(r) => f.write_str(r),
            Expression::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expression::Unary { op: UnOp::Not, operand } => write!(f, "!{}", operand),
            Expression::Unary { op: UnOp::Neg, operand } => write!(f, "-{}", operand),
            Expression::ArrayAccess { array, indices } => {
                write!(f, "{}[{}]", array, indices.iter().join(", "))
            }
            Expression::ArrayStore {
                array,
                indices,
                value,
            } => write!(f, "{}[{} := {}]", array, indices.iter().join(", "), value),
            Expression::FunctionApp { name, args, .. } => {
                write!(f, "{}({})", name, args.iter().join(", "))
            }
        }
    }
}
