// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Custom functions available inside mapping and condition expressions.

use std::collections::BTreeMap;

use cel_interpreter::{Context, FunctionContext, Value};

pub mod extract;
pub mod join;
pub mod split;

pub use extract::Extract;
pub use join::Join;
pub use split::Split;

/// A function that can be installed into an interpreter context.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;

    fn install(&self, ctx: &mut Context);
}

/// The receiver followed by the arguments, so `a.f(b)` and `f(a, b)` are
/// matched against the same overloads.
fn call_arguments(ftx: &FunctionContext, args: &[Value]) -> Vec<Value> {
    ftx.this.iter().chain(args).cloned().collect()
}

/// Append-only set of functions, filled once before any evaluation.
#[derive(Default)]
pub struct FunctionLibrary {
    functions: BTreeMap<&'static str, Box<dyn Function>>,
}

impl FunctionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library holding `extract`, `join` and `split`.
    pub fn with_defaults() -> Self {
        let mut library = Self::new();
        library.register(Box::new(Extract));
        library.register(Box::new(Join));
        library.register(Box::new(Split));
        library
    }

    /// Add a function to the library.
    ///
    /// # Panics
    ///
    /// Registering two functions under the same name is a programming error
    /// and panics.
    pub fn register(&mut self, function: Box<dyn Function>) {
        let name = function.name();
        if self.functions.contains_key(name) {
            panic!("duplicate function for name {name:?}");
        }
        self.functions.insert(name, function);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Function> {
        self.functions.get(name).map(|function| function.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    pub fn install_all(&self, ctx: &mut Context) {
        for function in self.functions.values() {
            function.install(ctx);
        }
    }
}
