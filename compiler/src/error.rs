// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy of the attribute mapping compiler.
//!
//! Every failure is terminal for a run: the compiler never returns a partial
//! set of derived attributes alongside an error.

use strum::AsRefStr;
use thiserror::Error;

use crate::provider::ParseError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, AsRefStr, Debug)]
pub enum Error {
    #[error("input is invalid: {reason}")]
    InvalidInput { reason: String },

    #[error("invalid attribute mapping key: {key}. Only 'google.subject', 'google.groups' and 'attribute.<custom_attribute>' are accepted")]
    InvalidMappingKey { key: String },

    #[error("provider {name} is not registered")]
    UnknownProvider { name: String },

    #[error("no registered provider is able to parse the given payload")]
    NoProviderFound,

    #[error("{provider} provider failed to parse the payload")]
    Parse {
        provider: String,
        #[source]
        source: ParseError,
    },

    #[error("the maximum length of an {target} expression is {limit} bytes, got {length}")]
    ExpressionTooLong {
        target: String,
        length: usize,
        limit: usize,
    },

    #[error("invalid mapped attribute key: {name}. The maximum length of a mapped attribute key is 100 characters and may only contain the characters [a-z0-9_]")]
    InvalidAttributeName { name: String },

    #[error("creating a timestamp from a unix timestamp integer is not supported by the Workload Identity Federation expression implementation")]
    UnsupportedTimestampConstruction,

    #[error("error compiling expression for {target}: {message}")]
    Compile { target: String, message: String },

    #[error("error evaluating expression for {target}: {message}")]
    Evaluate { target: String, message: String },

    #[error("error preparing evaluation environment: {message}")]
    Environment { message: String },

    #[error("the mapped attribute '{key}' must be of type {expected}, got {actual}")]
    WrongType {
        key: String,
        expected: &'static str,
        actual: String,
    },

    #[error("missing 'google.subject' attribute")]
    MissingSubject,

    #[error("the size of mapped attribute 'google.subject' is {length} bytes and exceeds the {limit} bytes limit")]
    SubjectTooLong { length: usize, limit: usize },

    #[error("the size of mapped attributes is {size} bytes and exceeds the {limit} bytes limit")]
    AttributesTooLarge { size: usize, limit: usize },

    #[error("{count} custom attributes are mapped, custom attributes are limited to {limit}")]
    TooManyCustomAttributes { count: usize, limit: usize },

    #[error("the given credential is rejected by the attribute condition")]
    ConditionRejected,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::Error;

    #[rstest]
    #[case(Error::InvalidMappingKey { key: "foo".into() }, "InvalidMappingKey")]
    #[case(Error::NoProviderFound, "NoProviderFound")]
    #[case(Error::SubjectTooLong { length: 128, limit: 127 }, "SubjectTooLong")]
    #[case(Error::ConditionRejected, "ConditionRejected")]
    fn error_kind_names(#[case] err: Error, #[case] kind: &str) {
        assert_eq!(err.as_ref(), kind);
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn wrong_type_names_key_and_types() {
        let err = Error::WrongType {
            key: "google.subject".into(),
            expected: "string",
            actual: "bool".into(),
        };
        assert_eq!(
            err.to_string(),
            "the mapped attribute 'google.subject' must be of type string, got bool"
        );
    }
}
