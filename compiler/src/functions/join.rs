// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! # Join
//!
//! Concatenates a list of strings, with an optional separator placed between
//! elements.
//!
//! ```text
//! <list<string>>.join() -> <string>
//! <list<string>>.join(<string>) -> <string>
//!
//! ['hello', 'mellow'].join()    // 'hellomellow'
//! ['hello', 'mellow'].join(' ') // 'hello mellow'
//! [].join()                     // ''
//! [].join('/')                  // ''
//! ```

use std::sync::Arc;

use cel_interpreter::extractors::Arguments;
use cel_interpreter::{Context, FunctionContext, ResolveResult, Value};

use super::{call_arguments, Function};
use crate::expression::value_kind;

pub struct Join;

impl Function for Join {
    fn name(&self) -> &'static str {
        "join"
    }

    fn install(&self, ctx: &mut Context) {
        ctx.add_function(self.name(), join_fn);
    }
}

fn join_fn(ftx: &FunctionContext, Arguments(args): Arguments) -> ResolveResult {
    let (items, separator) = match call_arguments(ftx, &args).as_slice() {
        [Value::List(items)] => (items.clone(), String::new()),
        [Value::List(items), Value::String(separator)] => {
            (items.clone(), separator.to_string())
        }
        _ => {
            return Err(ftx.error(
                "no matching overload, expected join(list<string>[, string])",
            ))
        }
    };

    let mut parts = Vec::with_capacity(items.len());
    for item in items.iter() {
        match item {
            Value::String(part) => parts.push(part.as_str()),
            other => {
                return Err(ftx.error(format!(
                    "join: invalid element of type {}",
                    value_kind(other)
                )))
            }
        }
    }
    Ok(Value::String(Arc::new(join(&parts, &separator))))
}

pub fn join(parts: &[&str], separator: &str) -> String {
    parts.join(separator)
}
