// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::expressions::{Expression, Ident};
use crate::writer::BoogieWriter;
use itertools::Itertools;
use std::fmt;

/// Unstructured Boogie statement. Only `If` nests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Statement {
    Assign {
        target: Ident,
        value: Expression,
    },
    Assert(Expression),
    Assume(Expression),
    Havoc(Vec<Ident>),
    Label(String),
    Goto(Vec<String>),
    /// An empty `else_branch` renders as a one-armed `if`.
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
    },
    Call {
        procedure: String,
        args: Vec<Expression>,
        outs: Vec<Ident>,
    },
    Return,
}

impl Statement {
    pub fn assign(target: &Ident, value: Expression) -> Self {
        Statement::Assign {
            target: target.clone(),
            value,
        }
    }

    pub fn goto(label: impl Into<String>) -> Self {
        Statement::Goto(vec![label.into()])
    }

    pub fn if_then(condition: Expression, then_branch: Vec<Statement>) -> Self {
        Statement::If {
            condition,
            then_branch,
            else_branch: vec![],
        }
    }

    /// Iterate over this statement and all nested statements (depth-first, pre-order).
    pub fn iter(&self) -> StatementIter<'_> {
        StatementIter { stack: vec![self] }
    }

    /// Expressions that appear directly in this statement (not in nested statements).
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            Statement::Assign { value, .. } => vec![value],
            Statement::Assert(e) | Statement::Assume(e) => vec![e],
            Statement::If { condition, .. } => vec![condition],
            Statement::Call { args, .. } => args.iter().collect(),
            Statement::Havoc(_) | Statement::Label(_) | Statement::Goto(_) | Statement::Return => {
                vec![]
            }
        }
    }

    pub fn write(&self, writer: &mut BoogieWriter) {
        match self {
            Statement::Assign { target, value } => {
                writer.line(&format!("{} := {};", target.name, value))
            }
            Statement::Assert(e) => writer.line(&format!("assert {};", e.display_top())),
            Statement::Assume(e) => writer.line(&format!("assume {};", e.display_top())),
            Statement::Havoc(idents) => writer.line(&format!(
                "havoc {};",
                idents.iter().map(|i| &i.name).join(", ")
            )),
            Statement::Label(label) => writer.line(&format!("{}:", label)),
            Statement::Goto(labels) => writer.line(&format!("goto {};", labels.join(", "))),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                writer.line(&format!("if ({}) {{", condition.display_top()));
                writer.block(then_branch);
                if !else_branch.is_empty() {
                    writer.line("} else {");
                    writer.block(else_branch);
                }
                writer.line("}");
            }
            Statement::Call {
                procedure,
                args,
                outs,
            } => {
                let args = args.iter().join(", ");
                if outs.is_empty() {
                    writer.line(&format!("call {}({});", procedure, args))
                } else {
                    writer.line(&format!(
                        "call {} := {}({});",
                        outs.iter().map(|i| &i.name).join(", "),
                        procedure,
                        args
                    ))
                }
            }
            Statement::Return => writer.line("return;"),
        }
    }

    /// Renders a statement list, one statement per line, without a trailing newline.
    pub fn render_all(statements: &[Statement]) -> String {
        let mut writer = BoogieWriter::new();
        for statement in statements {
            statement.write(&mut writer);
        }
        writer.finish()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Statement::render_all(std::slice::from_ref(self)))
    }
}

pub struct StatementIter<'a> {
    stack: Vec<&'a Statement>,
}

impl<'a> Iterator for StatementIter<'a> {
    type Item = &'a Statement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        if let Statement::If {
            then_branch,
            else_branch,
            ..
        } = next
        {
            self.stack.extend(else_branch.iter().rev());
            self.stack.extend(then_branch.iter().rev());
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoogieType;

    #[test]
    fn test_nested_if_rendering() {
        let k = Ident::new("k", BoogieType::Int);
        let stmt = Statement::If {
            condition: Expression::eq(k.expr(), Expression::IntLit(1)),
            then_branch: vec![Statement::goto("L1")],
            else_branch: vec![Statement::if_then(
                Expression::eq(k.expr(), Expression::IntLit(5)),
                vec![Statement::goto("L2")],
            )],
        };
        insta::assert_snapshot!(stmt.to_string(), @r###"
        if (k == 1) {
            goto L1;
        } else {
            if (k == 5) {
                goto L2;
            }
        }
        "###);
    }

    #[test]
    fn test_iter_is_preorder() {
        // if (c) { a := 1; } else { return; } ; label visited order: if, assign, return
        let c = Ident::new("c", BoogieType::Bool);
        let a = Ident::new("a", BoogieType::Int);
        let stmt = Statement::If {
            condition: c.expr(),
            then_branch: vec![Statement::assign(&a, Expression::IntLit(1))],
            else_branch: vec![Statement::Return],
        };
        let kinds = stmt
            .iter()
            .map(|s| match s {
                Statement::If { .. } => "if",
                Statement::Assign { .. } => "assign",
                Statement::Return => "return",
                _ => "other",
            })
            .collect_vec();
        assert_eq!(kinds, vec!["if", "assign", "return"]);
    }

    #[test]
    fn test_call_rendering() {
        let r = Ident::new("r", BoogieType::Int);
        let ex = Ident::new("$exception", BoogieType::Ref);
        let call = Statement::Call {
            procedure: "A$int$f".to_string(),
            args: vec![Expression::IntLit(3)],
            outs: vec![r, ex],
        };
        assert_eq!(call.to_string(), "call r, $exception := A$int$f(3);");
    }
}
