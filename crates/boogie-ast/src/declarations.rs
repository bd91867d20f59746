// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::expressions::{Expression, Ident};
use crate::statements::Statement;
use crate::types::BoogieType;
use crate::writer::BoogieWriter;
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Specification {
    Requires { free: bool, formula: Expression },
    Ensures { free: bool, formula: Expression },
}

impl Specification {
    pub fn requires(formula: Expression) -> Self {
        Specification::Requires {
            free: false,
            formula,
        }
    }

    pub fn ensures(formula: Expression) -> Self {
        Specification::Ensures {
            free: false,
            formula,
        }
    }

    fn render(&self) -> String {
        let (keyword, free, formula) = match self {
            Specification::Requires { free, formula } => ("requires", free, formula),
            Specification::Ensures { free, formula } => ("ensures", free, formula),
        };
        format!(
            "{}{} {};",
            if *free { "free " } else { "" },
            keyword,
            formula.display_top()
        )
    }
}

/// Procedure signature with its contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcedureDeclaration {
    pub name: String,
    pub in_params: Vec<Ident>,
    pub out_params: Vec<Ident>,
    /// Global variables the procedure and its callees may assign.
    pub modifies: Vec<Ident>,
    pub specification: Vec<Specification>,
}

impl ProcedureDeclaration {
    /// Preconditions a caller has to establish (free ones are only assumed).
    pub fn checked_preconditions(&self) -> impl Iterator<Item = &Expression> {
        self.specification.iter().filter_map(|spec| match spec {
            Specification::Requires { free: false, formula } => Some(formula),
            _ => None,
        })
    }

    /// Postconditions the implementation has to establish before returning.
    pub fn checked_postconditions(&self) -> impl Iterator<Item = &Expression> {
        self.specification.iter().filter_map(|spec| match spec {
            Specification::Ensures { free: false, formula } => Some(formula),
            _ => None,
        })
    }

    fn header(&self) -> String {
        let ins = self.in_params.iter().map(Ident::typed).join(", ");
        if self.out_params.is_empty() {
            format!("{}({})", self.name, ins)
        } else {
            let outs = self.out_params.iter().map(Ident::typed).join(", ");
            format!("{}({}) returns ({})", self.name, ins, outs)
        }
    }

    pub fn write(&self, writer: &mut BoogieWriter) {
        writer.line(&format!("procedure {};", self.header()));
        writer.indent();
        if !self.modifies.is_empty() {
            let vars = self.modifies.iter().map(|v| v.name.as_str()).join(", ");
            writer.line(&format!("modifies {};", vars));
        }
        for spec in &self.specification {
            writer.line(&spec.render());
        }
        writer.dedent();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Implementation {
    pub declaration: ProcedureDeclaration,
    pub locals: Vec<Ident>,
    pub body: Vec<Statement>,
}

impl Implementation {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn write(&self, writer: &mut BoogieWriter) {
        writer.line(&format!("implementation {}", self.declaration.header()));
        writer.line("{");
        writer.indent();
        for local in &self.locals {
            writer.line(&format!("var {};", local.typed()));
        }
        if !self.locals.is_empty() {
            writer.blank();
        }
        writer.dedent();
        writer.block(&self.body);
        writer.line("}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Declaration {
    TypeDecl { name: String, params: Vec<String> },
    Constant { ident: Ident, unique: bool, extends: Vec<String> },
    Variable(Ident),
    Function { name: String, params: Vec<BoogieType>, result: BoogieType },
    Axiom(Expression),
    Procedure(ProcedureDeclaration),
    Implementation(Implementation),
}

impl Declaration {
    pub fn write(&self, writer: &mut BoogieWriter) {
        match self {
            Declaration::TypeDecl { name, params } => {
                if params.is_empty() {
                    writer.line(&format!("type {};", name))
                } else {
                    writer.line(&format!("type {} {};", name, params.join(" ")))
                }
            }
            Declaration::Constant {
                ident,
                unique,
                extends,
            } => {
                let mut text = format!(
                    "const {}{}",
                    if *unique { "unique " } else { "" },
                    ident.typed()
                );
                if !extends.is_empty() {
                    text.push_str(&format!(" extends {}", extends.join(", ")));
                }
                text.push(';');
                writer.line(&text)
            }
            Declaration::Variable(ident) => writer.line(&format!("var {};", ident.typed())),
            Declaration::Function {
                name,
                params,
                result,
            } => writer.line(&format!(
                "function {}({}) returns ({});",
                name,
                params.iter().join(", "),
                result
            )),
            Declaration::Axiom(formula) => writer.line(&format!("axiom {};", formula.display_top())),
            Declaration::Procedure(procedure) => {
                writer.blank();
                procedure.write(writer)
            }
            Declaration::Implementation(implementation) => {
                writer.blank();
                implementation.write(writer)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

impl Program {
    pub fn procedures(&self) -> impl Iterator<Item = &ProcedureDeclaration> {
        self.declarations.iter().filter_map(|decl| match decl {
            Declaration::Procedure(procedure) => Some(procedure),
            _ => None,
        })
    }

    pub fn implementations(&self) -> impl Iterator<Item = &Implementation> {
        self.declarations.iter().filter_map(|decl| match decl {
            Declaration::Implementation(implementation) => Some(implementation),
            _ => None,
        })
    }

    pub fn find_implementation(&self, name: &str) -> Option<&Implementation> {
        self.implementations().find(|i| i.name() == name)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = BoogieWriter::new();
        for decl in &self.declarations {
            decl.write(&mut writer);
        }
        f.write_str(&writer.finish())
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = BoogieWriter::new();
        self.write(&mut writer);
        f.write_str(&writer.finish())
    }
}

impl fmt::Display for ProcedureDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = BoogieWriter::new();
        self.write(&mut writer);
        f.write_str(&writer.finish())
    }
}
