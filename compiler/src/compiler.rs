// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! # Attribute mapping compiler
//!
//! A run goes through the following stages, any failure is terminal:
//!
//! 1. validate the input and the mapping keys
//! 2. resolve the provider, pinned by name or found by trying each one
//! 3. check expression sizes, custom attribute names and forbidden constructs
//! 4. evaluate every mapping and enforce the result types
//! 5. check the derived attributes against the platform limits
//! 6. evaluate the attribute condition, if any, over the merged namespaces

use std::collections::BTreeMap;
use std::sync::Arc;

use cel_interpreter::Value;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::attributes::*;
use crate::error::{Error, Result};
use crate::expression::{value_kind, Bindings, Environment};
use crate::functions::FunctionLibrary;
use crate::namespace;
use crate::provider::{AttributeProvider, Provider, ProviderRegistry};

const CONDITION_TARGET: &str = "attribute condition";

lazy_static! {
    static ref TIMESTAMP_FROM_INT: Regex =
        Regex::new(r"timestamp\s*\(\s*int\s*\(").expect("timestamp guard pattern is valid");
}

/// A single mapping request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Input {
    /// Raw assertion, a JWT, a JSON claim set or a SAML response.
    pub payload: String,

    /// Target attribute name to mapping expression.
    pub attribute_mapping: Option<BTreeMap<String, String>>,

    /// Boolean expression gating the credential, empty for none.
    #[serde(default)]
    pub attribute_condition: String,

    /// Registered provider name. The payload format is detected when unset.
    #[serde(default)]
    pub provider: Option<String>,
}

pub struct Compiler {
    providers: Arc<ProviderRegistry>,
    functions: Arc<FunctionLibrary>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(
            Arc::new(ProviderRegistry::with_defaults()),
            Arc::new(FunctionLibrary::with_defaults()),
        )
    }
}

impl Compiler {
    pub fn new(providers: Arc<ProviderRegistry>, functions: Arc<FunctionLibrary>) -> Self {
        Self {
            providers,
            functions,
        }
    }

    /// Derive the attributes of `input`.
    pub fn run(&self, input: &Input) -> Result<DerivedAttributes> {
        let mapping = validate(input)?;

        let (provider, bindings) = self.resolve(input)?;
        debug!("payload parsed by the {} provider", provider.name());

        pre_validate(mapping, &input.attribute_condition)?;

        let env = Environment::new(provider.variables(), self.functions.clone());
        let derived = evaluate_mapping(&env, mapping, &bindings)?;
        debug!("derived attributes: {:?}", derived.keys().collect::<Vec<_>>());

        post_validate(&derived)?;

        if !input.attribute_condition.is_empty() {
            self.check_condition(&input.attribute_condition, &bindings, &derived)?;
            debug!("attribute condition accepted the credential");
        }

        Ok(derived)
    }

    fn resolve(&self, input: &Input) -> Result<(Arc<dyn Provider>, Bindings)> {
        let Some(name) = input.provider.as_deref() else {
            return self.providers.resolve_ambient(&input.payload);
        };
        let provider = self
            .providers
            .get(name)
            .ok_or_else(|| Error::UnknownProvider {
                name: name.to_string(),
            })?;
        let bindings = provider
            .parse(&input.payload)
            .map_err(|source| Error::Parse {
                provider: name.to_string(),
                source,
            })?;
        Ok((provider, bindings))
    }

    fn check_condition(
        &self,
        condition: &str,
        raw: &Bindings,
        derived: &DerivedAttributes,
    ) -> Result<()> {
        let merged = namespace::merge(raw, derived);
        let nested = namespace::nest(&merged)?;
        let document = serde_json::to_string(&nested).map_err(|err| Error::Environment {
            message: err.to_string(),
        })?;

        let provider = AttributeProvider;
        let bindings = provider.parse(&document).map_err(|source| Error::Parse {
            provider: provider.name().to_string(),
            source,
        })?;

        let env = Environment::new(provider.variables(), self.functions.clone());
        let program = env.compile(condition).map_err(|err| Error::Compile {
            target: CONDITION_TARGET.to_string(),
            message: err.to_string(),
        })?;

        match program.evaluate(&env, &bindings) {
            Ok(Value::Bool(true)) => Ok(()),
            Ok(other) => {
                debug!("attribute condition evaluated to a {}", value_kind(&other));
                Err(Error::ConditionRejected)
            }
            Err(err) => {
                debug!("attribute condition failed: {err}");
                Err(Error::ConditionRejected)
            }
        }
    }
}

fn validate(input: &Input) -> Result<&BTreeMap<String, String>> {
    if input.payload.is_empty() {
        return Err(Error::InvalidInput {
            reason: "payload is empty".to_string(),
        });
    }
    let mapping = match input.attribute_mapping.as_ref() {
        Some(mapping) if !mapping.is_empty() => mapping,
        Some(_) => {
            return Err(Error::InvalidInput {
                reason: "attribute mapping is empty".to_string(),
            })
        }
        None => {
            return Err(Error::InvalidInput {
                reason: "attribute mapping is missing".to_string(),
            })
        }
    };

    if let Some(key) = mapping.keys().find(|key| AttributeKey::parse(key).is_none()) {
        return Err(Error::InvalidMappingKey { key: key.clone() });
    }
    Ok(mapping)
}

fn pre_validate(mapping: &BTreeMap<String, String>, condition: &str) -> Result<()> {
    for (key, source) in mapping {
        if source.len() > MAX_MAPPING_EXPRESSION_BYTES {
            return Err(Error::ExpressionTooLong {
                target: key.clone(),
                length: source.len(),
                limit: MAX_MAPPING_EXPRESSION_BYTES,
            });
        }
    }
    if condition.len() > MAX_CONDITION_EXPRESSION_BYTES {
        return Err(Error::ExpressionTooLong {
            target: CONDITION_TARGET.to_string(),
            length: condition.len(),
            limit: MAX_CONDITION_EXPRESSION_BYTES,
        });
    }

    for key in mapping.keys() {
        if let Some(AttributeKey::Custom(name)) = AttributeKey::parse(key) {
            if !is_valid_custom_name(name) {
                return Err(Error::InvalidAttributeName {
                    name: name.to_string(),
                });
            }
        }
    }

    let timestamp_from_int = mapping
        .values()
        .map(String::as_str)
        .chain(std::iter::once(condition))
        .any(|source| TIMESTAMP_FROM_INT.is_match(source));
    if timestamp_from_int {
        return Err(Error::UnsupportedTimestampConstruction);
    }
    Ok(())
}

fn evaluate_mapping(
    env: &Environment,
    mapping: &BTreeMap<String, String>,
    bindings: &Bindings,
) -> Result<DerivedAttributes> {
    let mut derived = DerivedAttributes::new();
    for (key, source) in mapping {
        let program = env.compile(source).map_err(|err| Error::Compile {
            target: key.clone(),
            message: err.to_string(),
        })?;
        let value = program
            .evaluate(env, bindings)
            .map_err(|err| Error::Evaluate {
                target: key.clone(),
                message: err.to_string(),
            })?;
        debug!("evaluated {key} to a {}", value_kind(&value));

        let value = match AttributeKey::parse(key) {
            Some(AttributeKey::Groups) => string_list(key, value)?,
            _ => AttributeValue::String(string(key, value)?),
        };
        derived.insert(key.clone(), value);
    }
    Ok(derived)
}

fn string(key: &str, value: Value) -> Result<String> {
    match value {
        Value::String(value) => Ok(value.to_string()),
        other => Err(Error::WrongType {
            key: key.to_string(),
            expected: "string",
            actual: value_kind(&other).to_string(),
        }),
    }
}

fn string_list(key: &str, value: Value) -> Result<AttributeValue> {
    let items = match value {
        Value::List(items) => items,
        other => {
            return Err(Error::WrongType {
                key: key.to_string(),
                expected: "list<string>",
                actual: value_kind(&other).to_string(),
            })
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(item) => Ok(item.to_string()),
            other => Err(Error::WrongType {
                key: key.to_string(),
                expected: "list<string>",
                actual: format!("list with a {} at index {index}", value_kind(other)),
            }),
        })
        .collect::<Result<Vec<_>>>()
        .map(AttributeValue::List)
}

fn post_validate(derived: &DerivedAttributes) -> Result<()> {
    let subject = derived
        .get(GOOGLE_SUBJECT)
        .and_then(AttributeValue::as_str)
        .ok_or(Error::MissingSubject)?;
    if subject.len() > MAX_SUBJECT_BYTES {
        return Err(Error::SubjectTooLong {
            length: subject.len(),
            limit: MAX_SUBJECT_BYTES,
        });
    }

    let size = total_byte_len(derived);
    if size > MAX_ATTRIBUTES_BYTES {
        return Err(Error::AttributesTooLarge {
            size,
            limit: MAX_ATTRIBUTES_BYTES,
        });
    }

    let count = custom_attribute_count(derived.keys());
    if count > MAX_CUSTOM_ATTRIBUTES {
        return Err(Error::TooManyCustomAttributes {
            count,
            limit: MAX_CUSTOM_ATTRIBUTES,
        });
    }
    Ok(())
}
