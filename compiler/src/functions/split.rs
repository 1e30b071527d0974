// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! # Split
//!
//! Returns the list of substrings separated by the given separator, with an
//! optional limit on the number of substrings produced.
//!
//! ```text
//! <string>.split(<string>) -> <list<string>>
//! <string>.split(<string>, <int>) -> <list<string>>
//!
//! 'hello hello hello'.split(' ')     // ['hello', 'hello', 'hello']
//! 'hello hello hello'.split(' ', 0)  // []
//! 'hello hello hello'.split(' ', 1)  // ['hello hello hello']
//! 'hello hello hello'.split(' ', 2)  // ['hello', 'hello hello']
//! 'hello hello hello'.split(' ', -1) // ['hello', 'hello', 'hello']
//! ```

use std::sync::Arc;

use cel_interpreter::extractors::Arguments;
use cel_interpreter::{Context, FunctionContext, ResolveResult, Value};

use super::{call_arguments, Function};

pub struct Split;

impl Function for Split {
    fn name(&self) -> &'static str {
        "split"
    }

    fn install(&self, ctx: &mut Context) {
        ctx.add_function(self.name(), split_fn);
    }
}

fn split_fn(ftx: &FunctionContext, Arguments(args): Arguments) -> ResolveResult {
    let parts = match call_arguments(ftx, &args).as_slice() {
        [Value::String(source), Value::String(separator)] => split(source, separator, -1),
        [Value::String(source), Value::String(separator), Value::Int(limit)] => {
            split(source, separator, *limit)
        }
        _ => {
            return Err(ftx.error(
                "no matching overload, expected split(string, string[, int])",
            ))
        }
    };
    Ok(Value::List(Arc::new(
        parts
            .into_iter()
            .map(|part| Value::String(Arc::new(part)))
            .collect(),
    )))
}

/// Splits `source` around `separator`.
///
/// A zero limit yields no substring, a positive limit yields at most that
/// many with the last one holding the remainder, a negative limit splits
/// everywhere. An empty separator splits after each character.
pub fn split(source: &str, separator: &str, limit: i64) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);

    if separator.is_empty() {
        return explode(source, limit);
    }
    source
        .splitn(limit, separator)
        .map(str::to_string)
        .collect()
}

fn explode(source: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = source;
    while !rest.is_empty() {
        if parts.len() + 1 == limit {
            parts.push(rest.to_string());
            break;
        }
        let width = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        parts.push(rest[..width].to_string());
        rest = &rest[width..];
    }
    parts
}
