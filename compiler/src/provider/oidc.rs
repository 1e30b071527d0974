// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! # OIDC provider
//!
//! Accepts either a JSON claim set or a compact JWS token. A token's claims
//! are read **without** verifying its signature, whatever its `alg`; trust
//! in the token must be established before it reaches the compiler.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::debug;
use serde_json::Value;

use super::{ParseError, Provider};
use crate::attributes::ASSERTION;
use crate::expression::{Bindings, VariableDecl};

pub struct OidcProvider;

impl OidcProvider {
    /// Claims of a compact JWS, `None` when `raw` is not a token.
    fn unverified_claims(raw: &str) -> Option<Bindings> {
        match decode_compact(raw.trim()) {
            Ok(claims) => Some(claims),
            Err(reason) => {
                debug!("payload is not a JWT: {reason}");
                None
            }
        }
    }
}

/// `header.claims.signature`, the header must name an `alg`.
fn decode_compact(token: &str) -> Result<Bindings, String> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, claims, _signature] = segments.as_slice() else {
        return Err(format!("expected 3 segments, got {}", segments.len()));
    };

    let header = decode_segment(header)?;
    if !header.get("alg").is_some_and(Value::is_string) {
        return Err("header has no alg".to_string());
    }
    match decode_segment(claims)? {
        Value::Object(claims) => Ok(claims),
        _ => Err("claims are not a JSON object".to_string()),
    }
}

fn decode_segment(segment: &str) -> Result<Value, String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|err| format!("invalid base64url segment: {err}"))?;
    serde_json::from_slice(&bytes).map_err(|err| format!("invalid JSON segment: {err}"))
}

impl Provider for OidcProvider {
    fn name(&self) -> &'static str {
        "oidc"
    }

    fn variables(&self) -> Vec<VariableDecl> {
        vec![VariableDecl::dynamic(ASSERTION)]
    }

    fn parse(&self, raw: &str) -> Result<Bindings, ParseError> {
        let claims = match Self::unverified_claims(raw) {
            Some(claims) => claims,
            None => match serde_json::from_str::<Value>(raw)? {
                Value::Object(claims) => claims,
                _ => return Err(ParseError::NotAnObject),
            },
        };

        let mut bindings = Bindings::new();
        bindings.insert(ASSERTION.to_string(), Value::Object(claims));
        Ok(bindings)
    }
}
