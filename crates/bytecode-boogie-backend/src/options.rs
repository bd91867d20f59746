// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use class_model::ClassEnv;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How a violated obligation is encoded in the generated program.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ErrorModel {
    /// Store a witness in the exception slot and return.
    #[default]
    Exception,
    /// Emit `assert` statements.
    Assertion,
}

impl fmt::Display for ErrorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorModel::Exception => f.write_str("exception"),
            ErrorModel::Assertion => f.write_str("assertion"),
        }
    }
}

#[derive(clap::Args, Debug, Clone, Deserialize, Serialize, Default)]
#[clap(next_help_heading = "Translation Options")]
#[serde(default, deny_unknown_fields)]
pub struct TranslationOptions {
    /// Encoding of null dereferences and contract violations
    #[clap(long = "error-model", value_enum, default_value_t = ErrorModel::Exception)]
    pub error_model: ErrorModel,

    /// Do not emit index obligations for array accesses
    #[clap(long = "no-array-bounds-checks")]
    pub no_array_bounds_checks: bool,

    /// Only translate bodies of classes whose name starts with this prefix
    #[clap(long = "scope")]
    pub scope: Option<String>,
}

impl TranslationOptions {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid translation options")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read options from `{}`", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn is_in_scope(&self, class: &ClassEnv) -> bool {
        match &self.scope {
            Some(prefix) => class.get_name().starts_with(prefix.as_str()),
            None => true,
        }
    }
}
