// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! # SAML provider
//!
//! Reads a SAML 2.0 `Response` and exposes its first `Assertion` as
//!
//! ```text
//! assertion.subject    // Subject/NameID
//! assertion.attributes // AttributeStatement, Name -> [AttributeValue]
//! ```
//!
//! Elements are matched on their local name, whatever prefix the issuer
//! picked. Signatures and encrypted assertions are ignored.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use serde::Serialize;

use super::{ParseError, Provider};
use crate::attributes::ASSERTION;
use crate::expression::{Bindings, VariableDecl};

const PROTOCOL_NAMESPACE: &[u8] = b"urn:oasis:names:tc:SAML:2.0:protocol";
const SCHEMA: &str = "wif.v1.SamlSchema";

const SUBJECT_PATH: &[&str] = &["Response", "Assertion", "Subject"];
const STATEMENT_PATH: &[&str] = &["Response", "Assertion", "AttributeStatement"];
const ATTRIBUTE_PATH: &[&str] = &["Response", "Assertion", "AttributeStatement", "Attribute"];

/// The part of an assertion visible to expressions.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct SamlAssertion {
    pub subject: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

pub struct SamlProvider;

impl Provider for SamlProvider {
    fn name(&self) -> &'static str {
        "saml"
    }

    fn variables(&self) -> Vec<VariableDecl> {
        vec![VariableDecl::object(ASSERTION, SCHEMA)]
    }

    fn parse(&self, raw: &str) -> Result<Bindings, ParseError> {
        let assertion = parse_response(raw)?;
        let mut bindings = Bindings::new();
        bindings.insert(ASSERTION.to_string(), serde_json::to_value(assertion)?);
        Ok(bindings)
    }
}

/// Parse a `Response` document into its first assertion.
pub fn parse_response(raw: &str) -> Result<SamlAssertion, ParseError> {
    let mut reader = NsReader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut parser = ResponseParser::default();
    loop {
        let (namespace, event) = reader
            .read_resolved_event()
            .map_err(|err| ParseError::Xml(err.to_string()))?;
        match event {
            Event::Start(ref e) => parser.start(&namespace, e)?,
            Event::Empty(ref e) => {
                parser.start(&namespace, e)?;
                parser.end();
            }
            Event::Text(ref e) => {
                let text = e.unescape().map_err(|err| ParseError::Xml(err.to_string()))?;
                parser.text.push_str(&text);
            }
            Event::CData(ref e) => parser.text.push_str(&String::from_utf8_lossy(e)),
            Event::End(_) => parser.end(),
            Event::Eof => break,
            _ => {}
        }
    }
    parser.finish()
}

#[derive(Default)]
struct ResponseParser {
    root_seen: bool,
    path: Vec<String>,
    assertions: usize,
    text: String,
    subject: Option<String>,
    attribute: Option<(String, Vec<String>)>,
    attributes: BTreeMap<String, Vec<String>>,
}

impl ResponseParser {
    fn start(
        &mut self,
        namespace: &ResolveResult,
        element: &BytesStart,
    ) -> Result<(), ParseError> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();

        if self.path.is_empty() {
            let is_protocol = matches!(
                namespace,
                ResolveResult::Bound(Namespace(ns)) if *ns == PROTOCOL_NAMESPACE
            );
            if name != "Response" || !is_protocol {
                return Err(ParseError::UnexpectedRoot(name));
            }
            self.root_seen = true;
        } else if self.path.len() == 1 && name == "Assertion" {
            self.assertions += 1;
        } else if self.in_first_assertion() && self.at(STATEMENT_PATH) && name == "Attribute" {
            self.attribute = Some((attribute_name(element)?, Vec::new()));
        }

        self.path.push(name);
        self.text.clear();
        Ok(())
    }

    fn end(&mut self) {
        let Some(name) = self.path.pop() else {
            return;
        };
        if !self.in_first_assertion() {
            self.text.clear();
            return;
        }

        let text = std::mem::take(&mut self.text);
        if name == "NameID" && self.at(SUBJECT_PATH) {
            self.subject = Some(text);
        } else if name == "AttributeValue" && self.at(ATTRIBUTE_PATH) {
            if let Some((_, values)) = self.attribute.as_mut() {
                values.push(text);
            }
        } else if name == "Attribute" && self.at(STATEMENT_PATH) {
            // a later statement of the same name replaces the earlier one
            if let Some((name, values)) = self.attribute.take() {
                self.attributes.insert(name, values);
            }
        }
    }

    fn finish(self) -> Result<SamlAssertion, ParseError> {
        if !self.root_seen {
            return Err(ParseError::MissingElement("Response"));
        }
        if !self.path.is_empty() {
            return Err(ParseError::Xml("unexpected end of document".to_string()));
        }
        if self.assertions == 0 {
            return Err(ParseError::MissingElement("Assertion"));
        }
        let subject = self.subject.ok_or(ParseError::MissingElement("NameID"))?;
        Ok(SamlAssertion {
            subject,
            attributes: self.attributes,
        })
    }

    /// Inside the first `Response/Assertion`.
    fn in_first_assertion(&self) -> bool {
        self.assertions == 1 && self.path.get(1).map(String::as_str) == Some("Assertion")
    }

    fn at(&self, expected: &[&str]) -> bool {
        self.path.len() == expected.len()
            && self
                .path
                .iter()
                .zip(expected)
                .all(|(name, expected)| name.as_str() == *expected)
    }
}

fn attribute_name(element: &BytesStart) -> Result<String, ParseError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|err| ParseError::Xml(err.to_string()))?;
        if attr.key.local_name().as_ref() == b"Name" {
            return attr
                .unescape_value()
                .map(|value| value.into_owned())
                .map_err(|err| ParseError::Xml(err.to_string()));
        }
    }
    Ok(String::new())
}
