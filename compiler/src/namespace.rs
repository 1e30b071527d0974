// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Reshapes flat `family.name` attributes into per-family objects.
//!
//! ```text
//! {"google.subject": "1", "attribute.team": "a", "assertion": {..}}
//!   => {"google": {"subject": "1"}, "attribute": {"team": "a"}, "assertion": {..}}
//! ```

use serde_json::Value;

use crate::attributes::{DerivedAttributes, ASSERTION, ATTRIBUTE_FAMILY, GOOGLE_FAMILY};
use crate::error::{Error, Result};
use crate::expression::Bindings;

/// Families always present in a nested view.
pub const NAMESPACES: [&str; 3] = [ATTRIBUTE_FAMILY, GOOGLE_FAMILY, ASSERTION];

/// Overlay derived attributes on the raw provider variables.
///
/// On a key collision the derived value wins.
pub fn merge(raw: &Bindings, derived: &DerivedAttributes) -> Bindings {
    let mut merged = raw.clone();
    for (key, value) in derived {
        merged.insert(key.clone(), value.clone().into());
    }
    merged
}

/// Nest `google.*` and `attribute.*` keys under their family.
///
/// Any other key is copied as is and must hold an object.
pub fn nest(flat: &Bindings) -> Result<Bindings> {
    let mut nested = Bindings::new();
    for family in NAMESPACES {
        nested.insert(family.to_string(), Value::Object(Bindings::new()));
    }

    for (key, value) in flat {
        let derived = key
            .split_once('.')
            .filter(|(family, _)| *family == GOOGLE_FAMILY || *family == ATTRIBUTE_FAMILY);
        match derived {
            Some((family, name)) => {
                if let Some(Value::Object(members)) = nested.get_mut(family) {
                    members.insert(name.to_string(), value.clone());
                }
            }
            None if value.is_object() => {
                nested.insert(key.clone(), value.clone());
            }
            None => {
                return Err(Error::Environment {
                    message: format!("variable {key} must be an object to be namespaced"),
                })
            }
        }
    }
    Ok(nested)
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::attributes::AttributeValue;

    fn object(value: Value) -> Bindings {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[rstest]
    #[case(
        json!({"google.subject": "123456789"}),
        json!({"assertion": {}, "attribute": {}, "google": {"subject": "123456789"}})
    )]
    #[case(
        json!({"google.subject": "123456789", "attribute.sub": "123456789"}),
        json!({"assertion": {}, "attribute": {"sub": "123456789"}, "google": {"subject": "123456789"}})
    )]
    #[case(
        json!({"google.subject": "123456789", "attribute.sub": "123456789", "assertion": {"sub": "123456789"}}),
        json!({"assertion": {"sub": "123456789"}, "attribute": {"sub": "123456789"}, "google": {"subject": "123456789"}})
    )]
    #[case(
        json!({"google.groups": ["a", "b"]}),
        json!({"assertion": {}, "attribute": {}, "google": {"groups": ["a", "b"]}})
    )]
    fn nest_families(#[case] flat: Value, #[case] expected: Value) {
        let nested = nest(&object(flat)).unwrap();
        assert_json_eq!(Value::Object(nested), expected);
    }

    #[test]
    fn nest_rejects_scalar_variables() {
        let err = nest(&object(json!({"assertion": "flat"}))).unwrap_err();
        assert!(matches!(err, Error::Environment { .. }));
    }

    #[test]
    fn merge_prefers_derived_values() {
        let raw = object(json!({"assertion": {"sub": "raw"}, "google.subject": "raw"}));
        let mut derived = DerivedAttributes::new();
        derived.insert(
            "google.subject".to_string(),
            AttributeValue::String("derived".to_string()),
        );
        derived.insert(
            "google.groups".to_string(),
            AttributeValue::List(vec!["g".to_string()]),
        );

        let merged = merge(&raw, &derived);
        assert_json_eq!(
            Value::Object(merged),
            json!({
                "assertion": {"sub": "raw"},
                "google.subject": "derived",
                "google.groups": ["g"],
            })
        );
    }
}
