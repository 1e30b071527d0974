// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Identity providers turn a raw assertion into expression variables.
//!
//! The [`ProviderRegistry`] is filled once at start-up and is read-only
//! afterwards. Ambient resolution asks every registered provider, in
//! registration order, to parse the payload and keeps the first success.

use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::expression::{Bindings, VariableDecl};

pub mod attribute;
pub mod oidc;
pub mod saml;

pub use attribute::AttributeProvider;
pub use oidc::OidcProvider;
pub use saml::SamlProvider;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("error unmarshaling JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("error parsing XML: {0}")]
    Xml(String),

    #[error("unexpected root element {0}, expected a SAML 2.0 protocol Response")]
    UnexpectedRoot(String),

    #[error("missing {0} element")]
    MissingElement(&'static str),

    #[error("the assertion must be a JSON object")]
    NotAnObject,
}

/// Capability shared by every identity provider.
pub trait Provider: Send + Sync {
    /// Registry name, e.g. `oidc`.
    fn name(&self) -> &'static str;

    /// Variables bound by [`Provider::parse`] and their declared types.
    fn variables(&self) -> Vec<VariableDecl>;

    /// Parse the raw assertion into variable bindings.
    ///
    /// A failure doubles as the signal that the payload is not in this
    /// provider's format.
    fn parse(&self, raw: &str) -> std::result::Result<Bindings, ParseError>;
}

/// Name to provider map, kept in registration order.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `oidc` then `saml`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(OidcProvider));
        registry.register(Arc::new(SamlProvider));
        registry
    }

    /// Register a provider under its name.
    ///
    /// # Panics
    ///
    /// A name registered twice is a start-up bug and panics.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name();
        if self.get(name).is_some() {
            panic!("duplicate provider for name {name:?}");
        }
        self.providers.push(provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|provider| provider.name() == name)
            .cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// Find the first provider able to parse `raw`.
    pub fn resolve_ambient(&self, raw: &str) -> Result<(Arc<dyn Provider>, Bindings)> {
        for provider in &self.providers {
            match provider.parse(raw) {
                Ok(bindings) => {
                    debug!("payload resolved by the {} provider", provider.name());
                    return Ok((provider.clone(), bindings));
                }
                Err(err) => debug!("{} provider rejected the payload: {err}", provider.name()),
            }
        }
        Err(Error::NoProviderFound)
    }
}
