// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! # Extract
//!
//! Returns the part of a string selected by an extraction template.
//!
//! ```text
//! <string>.extract(<string>) -> <string>
//!
//! 'id/123456789'.extract('id/{end}')      // '123456789'
//! 'id/123456789'.extract('{start}/')      // 'id'
//! 'id/123456789'.extract('{all}')         // 'id/123456789'
//! 'id/123456789'.extract('foo/{nothing}') // ''
//! ```
//!
//! The text around the placeholder is used as a regular expression as is, it
//! is not escaped.

use cel_interpreter::extractors::Arguments;
use cel_interpreter::{Context, FunctionContext, ResolveResult, Value};
use lazy_static::lazy_static;
use regex::Regex;

use super::{call_arguments, Function};

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{[A-Za-z0-9_-]+\}").expect("placeholder pattern is valid");
}

pub struct Extract;

impl Function for Extract {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn install(&self, ctx: &mut Context) {
        ctx.add_function(self.name(), extract_fn);
    }
}

fn extract_fn(ftx: &FunctionContext, Arguments(args): Arguments) -> ResolveResult {
    match call_arguments(ftx, &args).as_slice() {
        [Value::String(source), Value::String(template)] => Ok(extract(source, template).into()),
        _ => Err(ftx.error(
            "no matching overload, expected extract(string, string)",
        )),
    }
}

/// First `{identifier}` placeholder of the template, if any.
pub fn placeholder(template: &str) -> Option<&str> {
    PLACEHOLDER.find(template).map(|m| m.as_str())
}

pub fn extract(source: &str, template: &str) -> String {
    let Some(identifier) = placeholder(template) else {
        return String::new();
    };

    let has_prefix = !template.starts_with(identifier);
    let has_suffix = !template.ends_with(identifier);
    if !has_prefix && !has_suffix {
        return source.to_string();
    }

    let Ok(matcher) = Regex::new(&template.replace(identifier, "(.*)")) else {
        return String::new();
    };
    let Some(captured) = matcher
        .captures(source)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
    else {
        return String::new();
    };

    if has_suffix {
        let suffix = template
            .find('}')
            .map(|index| &template[index + 1..])
            .unwrap_or_default();
        match captured.find(suffix) {
            Some(index) if index > 0 => return captured[..index].to_string(),
            _ => {}
        }
    }
    captured.to_string()
}
