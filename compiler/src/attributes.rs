// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Target attribute names, derived attribute values and platform limits.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Attribute holding the unique identifier of an identity.
pub const GOOGLE_SUBJECT: &str = "google.subject";
/// Attribute holding the groups the identity belongs to.
pub const GOOGLE_GROUPS: &str = "google.groups";

/// Family of the reserved attributes.
pub const GOOGLE_FAMILY: &str = "google";
/// Family of the custom attributes.
pub const ATTRIBUTE_FAMILY: &str = "attribute";
/// Variable exposing the raw assertion.
pub const ASSERTION: &str = "assertion";

/// `google.subject` can't exceed 127 bytes.
pub const MAX_SUBJECT_BYTES: usize = 127;
/// A custom attribute name can't exceed 100 characters.
pub const MAX_CUSTOM_ATTRIBUTE_NAME_LEN: usize = 100;
/// All mapped values together can't exceed 8192 bytes.
pub const MAX_ATTRIBUTES_BYTES: usize = 8192;
/// An attribute mapping expression can't exceed 2048 bytes.
pub const MAX_MAPPING_EXPRESSION_BYTES: usize = 2048;
/// An attribute condition expression can't exceed 4096 bytes.
pub const MAX_CONDITION_EXPRESSION_BYTES: usize = 4096;
/// At most 50 custom attributes can be mapped.
pub const MAX_CUSTOM_ATTRIBUTES: usize = 50;

lazy_static! {
    // Keep the repetition bound in sync with MAX_CUSTOM_ATTRIBUTE_NAME_LEN.
    static ref CUSTOM_ATTRIBUTE_NAME: Regex =
        Regex::new("^[a-z0-9_]{1,100}$").expect("custom attribute name pattern is valid");
}

/// A target attribute key of the attribute mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKey<'a> {
    Subject,
    Groups,
    /// `attribute.<name>`; the name is not validated yet.
    Custom(&'a str),
}

impl<'a> AttributeKey<'a> {
    /// Classify a mapping key, `None` when it is neither reserved nor custom.
    pub fn parse(key: &'a str) -> Option<Self> {
        match key {
            GOOGLE_SUBJECT => Some(Self::Subject),
            GOOGLE_GROUPS => Some(Self::Groups),
            _ => key
                .strip_prefix(ATTRIBUTE_FAMILY)
                .and_then(|rest| rest.strip_prefix('.'))
                .map(Self::Custom),
        }
    }
}

/// Whether `name` is acceptable after the `attribute.` prefix.
pub fn is_valid_custom_name(name: &str) -> bool {
    CUSTOM_ATTRIBUTE_NAME.is_match(name)
}

/// Whether `key` names a custom attribute.
pub fn is_custom_key(key: &str) -> bool {
    matches!(AttributeKey::parse(key), Some(AttributeKey::Custom(_)))
}

/// Builds `attribute.<name>`.
pub fn custom_key(name: &str) -> String {
    format!("{ATTRIBUTE_FAMILY}.{name}")
}

/// Value of a derived attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    List(Vec<String>),
}

impl AttributeValue {
    /// Sum of the UTF-8 lengths of the value or of every list element.
    pub fn byte_len(&self) -> usize {
        match self {
            AttributeValue::String(value) => value.len(),
            AttributeValue::List(values) => values.iter().map(String::len).sum(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value),
            AttributeValue::List(_) => None,
        }
    }
}

impl From<AttributeValue> for serde_json::Value {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::String(value) => serde_json::Value::String(value),
            AttributeValue::List(values) => {
                serde_json::Value::Array(values.into_iter().map(Into::into).collect())
            }
        }
    }
}

/// Attributes produced by a successful run, keyed by target attribute name.
pub type DerivedAttributes = BTreeMap<String, AttributeValue>;

/// Aggregate byte size of every derived value.
pub fn total_byte_len(attributes: &DerivedAttributes) -> usize {
    attributes.values().map(AttributeValue::byte_len).sum()
}

/// Number of `attribute.*` keys.
pub fn custom_attribute_count<'a, I>(keys: I) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    keys.into_iter().filter(|key| is_custom_key(key)).count()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("google.subject", Some(AttributeKey::Subject))]
    #[case("google.groups", Some(AttributeKey::Groups))]
    #[case("attribute.team", Some(AttributeKey::Custom("team")))]
    #[case("attribute.", Some(AttributeKey::Custom("")))]
    #[case("attribute", None)]
    #[case("attributes.team", None)]
    #[case("google.display_name", None)]
    #[case("invalid_key", None)]
    fn parse_keys(#[case] key: &str, #[case] expected: Option<AttributeKey>) {
        assert_eq!(AttributeKey::parse(key), expected);
    }

    #[rstest]
    #[case("team", true)]
    #[case("team_42", true)]
    #[case("Team", false)]
    #[case("team-a", false)]
    #[case("team.a", false)]
    #[case("", false)]
    fn custom_names(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(is_valid_custom_name(name), valid);
    }

    #[test]
    fn custom_name_length_limit() {
        assert!(is_valid_custom_name(&"a".repeat(MAX_CUSTOM_ATTRIBUTE_NAME_LEN)));
        assert!(!is_valid_custom_name(
            &"a".repeat(MAX_CUSTOM_ATTRIBUTE_NAME_LEN + 1)
        ));
    }

    #[test]
    fn byte_len_counts_utf8_bytes() {
        let mut attributes = DerivedAttributes::new();
        attributes.insert(
            GOOGLE_SUBJECT.to_string(),
            AttributeValue::String("é".to_string()),
        );
        attributes.insert(
            GOOGLE_GROUPS.to_string(),
            AttributeValue::List(vec!["ab".to_string(), "c".to_string()]),
        );
        assert_eq!(total_byte_len(&attributes), 5);
        assert_eq!(custom_attribute_count(attributes.keys()), 0);
    }

    #[test]
    fn untagged_serialization() {
        let value = serde_json::to_value(AttributeValue::List(vec!["a".into()])).unwrap();
        assert_eq!(value, serde_json::json!(["a"]));
        let value = serde_json::to_value(AttributeValue::String("a".into())).unwrap();
        assert_eq!(value, serde_json::json!("a"));
    }
}
