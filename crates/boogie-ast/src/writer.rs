// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Line-based writer for Boogie text with block indentation.

use crate::statements::Statement;

const INDENT: &str = "    ";

#[derive(Default)]
pub struct BoogieWriter {
    lines: Vec<String>,
    indent: usize,
}

impl BoogieWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current indentation. Embedded newlines start new lines.
    pub fn line(&mut self, s: &str) {
        for part in s.split('\n') {
            if part.is_empty() {
                self.lines.push(String::new());
            } else {
                self.lines.push(format!("{}{}", INDENT.repeat(self.indent), part));
            }
        }
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write `statements` one level deeper than the current indentation.
    pub fn block(&mut self, statements: &[Statement]) {
        self.indent();
        for statement in statements {
            statement.write(self);
        }
        self.dedent();
    }

    /// The written text, without a trailing newline.
    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}
