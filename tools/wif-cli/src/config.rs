// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Request file accepted by `--request`.
//!
//! ```toml
//! provider = "oidc"
//! attribute_condition = "'admins' in google.groups"
//!
//! [attribute_mapping]
//! "google.subject" = "assertion.sub"
//! "google.groups" = "assertion.groups"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use wif_compiler::Input;

/// Everything of an [`Input`] except the payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestFile {
    /// Pinned provider name, detected from the payload when unset.
    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub attribute_mapping: BTreeMap<String, String>,

    #[serde(default)]
    pub attribute_condition: String,
}

impl RequestFile {
    /// Load a request from a TOML, JSON or YAML file, picked by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::load(config::File::from(path))
            .with_context(|| format!("failed to load request file {}", path.display()))
    }

    fn load<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let raw = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to build request loader")?;
        raw.try_deserialize().context("failed to parse request")
    }

    pub fn into_input(self, payload: String) -> Input {
        Input {
            payload,
            attribute_mapping: Some(self.attribute_mapping),
            attribute_condition: self.attribute_condition,
            provider: self.provider,
        }
    }
}
