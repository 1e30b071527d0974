// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Workload Identity Federation attribute mapping.
//!
//! Maps an external identity assertion, an OIDC token or a SAML response,
//! onto the bounded set of attributes consumed by an IAM trust policy, and
//! optionally gates the credential with a boolean attribute condition.
//!
//! ```no_run
//! use std::collections::BTreeMap;
//!
//! let input = wif_compiler::Input {
//!     payload: r#"{"sub": "1234567890"}"#.to_string(),
//!     attribute_mapping: Some(BTreeMap::from([(
//!         "google.subject".to_string(),
//!         "assertion.sub".to_string(),
//!     )])),
//!     ..Default::default()
//! };
//! let attributes = wif_compiler::run(&input)?;
//! # Ok::<(), wif_compiler::Error>(())
//! ```

pub mod attributes;
pub mod compiler;
pub mod error;
pub mod expression;
pub mod functions;
pub mod namespace;
pub mod provider;

pub use attributes::{AttributeValue, DerivedAttributes};
pub use compiler::{Compiler, Input};
pub use error::{Error, Result};

/// Run `input` through a compiler holding the default providers and
/// functions.
pub fn run(input: &Input) -> Result<DerivedAttributes> {
    Compiler::default().run(input)
}
