// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::equivalence::StructuralEquivalence;

/// Options controlling reconstruction. Usually read from a toml source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconstructionOptions {
    /// Verbosity level for hosts that install a logger.
    pub verbosity_level: LevelFilter,
    /// Maximum depth compared when checking that entry points store the same
    /// expression. `None` compares whole trees.
    pub equivalence_depth: Option<usize>,
    /// Whether `x != null ? x : y` may become `x ?? y`.
    pub infer_null_coalescing: bool,
    /// Whether `x != null ? x.M : null` may become `x?.M`.
    pub infer_conditional_access: bool,
    /// Whether parameterless constructors the language would supply implicitly
    /// are dropped.
    pub elide_default_constructors: bool,
    /// Keep overloads that chain into the root with extra statements as explicit
    /// constructors next to a primary constructor, instead of rejecting synthesis.
    pub keep_bodied_overloads: bool,
    /// Whether `reconstruct_all` uses the thread pool.
    pub parallel: bool,
}

impl Default for ReconstructionOptions {
    fn default() -> Self {
        Self {
            verbosity_level: LevelFilter::Info,
            equivalence_depth: None,
            infer_null_coalescing: true,
            infer_conditional_access: true,
            elide_default_constructors: true,
            keep_bodied_overloads: false,
            parallel: true,
        }
    }
}

impl ReconstructionOptions {
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        toml::from_str(source).context("invalid reconstruction options")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read options from `{}`", path.display()))?;
        Self::from_toml_str(&source)
    }

    pub fn equivalence(&self) -> StructuralEquivalence {
        StructuralEquivalence::new(self.equivalence_depth)
    }
}
