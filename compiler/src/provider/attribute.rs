// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Provider of the attribute condition environment.
//!
//! Its payload is the JSON document produced by [`crate::namespace::nest`];
//! it exposes `google`, `attribute` and `assertion`. It is not part of the
//! ambient registry since no external assertion has this shape.

use serde_json::Value;

use super::{ParseError, Provider};
use crate::attributes::{ASSERTION, ATTRIBUTE_FAMILY, GOOGLE_FAMILY};
use crate::expression::{Bindings, VariableDecl};

pub struct AttributeProvider;

impl Provider for AttributeProvider {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn variables(&self) -> Vec<VariableDecl> {
        vec![
            VariableDecl::dynamic(ATTRIBUTE_FAMILY),
            VariableDecl::dynamic(GOOGLE_FAMILY),
            VariableDecl::dynamic(ASSERTION),
        ]
    }

    fn parse(&self, raw: &str) -> Result<Bindings, ParseError> {
        let Value::Object(document) = serde_json::from_str::<Value>(raw)? else {
            return Err(ParseError::NotAnObject);
        };
        Ok(document
            .into_iter()
            .filter(|(name, _)| {
                self.variables()
                    .iter()
                    .any(|decl| decl.name == name.as_str())
            })
            .collect())
    }
}
