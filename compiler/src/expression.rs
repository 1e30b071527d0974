// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Thin adapter over the CEL interpreter.
//!
//! An [`Environment`] is the closed set of variables a provider exposes plus
//! the function library. Expressions are compiled once and evaluated against
//! JSON bindings for exactly those variables.

use std::sync::Arc;

use cel_interpreter::{to_value, Context, Program, Value};
use thiserror::Error;

use crate::functions::FunctionLibrary;

/// Variable name to JSON value, as produced by a provider parse.
pub type Bindings = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug)]
pub enum ExpressionError {
    #[error("{0}")]
    Compile(String),

    #[error("{0}")]
    Bind(String),

    #[error("{0}")]
    Execute(String),
}

/// Declared type of an environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    /// Any JSON shaped value.
    Dyn,
    /// A structured value following the named schema.
    Object(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableDecl {
    pub name: &'static str,
    pub ty: VariableType,
}

impl VariableDecl {
    pub const fn dynamic(name: &'static str) -> Self {
        Self {
            name,
            ty: VariableType::Dyn,
        }
    }

    pub const fn object(name: &'static str, schema: &'static str) -> Self {
        Self {
            name,
            ty: VariableType::Object(schema),
        }
    }
}

pub struct Environment {
    declarations: Vec<VariableDecl>,
    functions: Arc<FunctionLibrary>,
}

impl Environment {
    pub fn new(declarations: Vec<VariableDecl>, functions: Arc<FunctionLibrary>) -> Self {
        Self {
            declarations,
            functions,
        }
    }

    pub fn compile(&self, source: &str) -> Result<CompiledExpression, ExpressionError> {
        let program =
            Program::compile(source).map_err(|err| ExpressionError::Compile(err.to_string()))?;
        Ok(CompiledExpression { program })
    }

    /// Build an interpreter context holding the library and the bindings.
    ///
    /// Declared variables missing from `bindings` are bound to `null`; a
    /// binding for an undeclared variable, or a non-object binding for an
    /// object variable, is rejected.
    fn context(&self, bindings: &Bindings) -> Result<Context, ExpressionError> {
        if let Some(name) = bindings
            .keys()
            .find(|name| !self.declarations.iter().any(|decl| decl.name == name.as_str()))
        {
            return Err(ExpressionError::Bind(format!(
                "variable {name} is not declared in the environment"
            )));
        }

        let mut ctx = Context::default();
        self.functions.install_all(&mut ctx);
        for decl in &self.declarations {
            let value = match bindings.get(decl.name) {
                Some(json) => {
                    if let VariableType::Object(schema) = decl.ty {
                        if !json.is_object() {
                            return Err(ExpressionError::Bind(format!(
                                "variable {} must be a {schema} object",
                                decl.name
                            )));
                        }
                    }
                    to_value(json).map_err(|err| {
                        ExpressionError::Bind(format!(
                            "cannot convert variable {}: {err}",
                            decl.name
                        ))
                    })?
                }
                None => Value::Null,
            };
            ctx.add_variable_from_value(decl.name, value);
        }
        Ok(ctx)
    }
}

pub struct CompiledExpression {
    program: Program,
}

impl CompiledExpression {
    pub fn evaluate(
        &self,
        env: &Environment,
        bindings: &Bindings,
    ) -> Result<Value, ExpressionError> {
        let ctx = env.context(bindings)?;
        self.program
            .execute(&ctx)
            .map_err(|err| ExpressionError::Execute(err.to_string()))
    }
}

/// Short type name of an evaluation result, used in error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::UInt(_) => "uint",
        Value::Float(_) => "double",
        Value::Bytes(_) => "bytes",
        Value::List(_) => "list",
        Value::Map(_) => "map",
        Value::Null => "null",
        _ => "dyn",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn env(names: &[&'static str]) -> Environment {
        Environment::new(
            names.iter().map(|name| VariableDecl::dynamic(*name)).collect(),
            Arc::new(FunctionLibrary::with_defaults()),
        )
    }

    fn bindings(value: serde_json::Value) -> Bindings {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("bindings must be an object"),
        }
    }

    #[test]
    fn evaluate_field_access() {
        let env = env(&["assertion"]);
        let expr = env.compile("assertion.sub").unwrap();
        let value = expr
            .evaluate(&env, &bindings(json!({"assertion": {"sub": "1234"}})))
            .unwrap();
        assert_eq!(value, Value::String(Arc::new("1234".to_string())));
    }

    #[test]
    fn compile_error_is_reported() {
        let env = env(&["assertion"]);
        assert!(matches!(
            env.compile("assertion.sub ==").err(),
            Some(ExpressionError::Compile(_))
        ));
    }

    #[test]
    fn undeclared_binding_is_rejected() {
        let env = env(&["assertion"]);
        let expr = env.compile("'a'").unwrap();
        let err = expr
            .evaluate(&env, &bindings(json!({"google": {}})))
            .unwrap_err();
        assert!(matches!(err, ExpressionError::Bind(_)));
    }

    #[test]
    fn undeclared_reference_fails_at_execution() {
        let env = env(&["assertion"]);
        let expr = env.compile("google.subject").unwrap();
        let err = expr
            .evaluate(&env, &bindings(json!({"assertion": {}})))
            .unwrap_err();
        assert!(matches!(err, ExpressionError::Execute(_)));
    }

    #[test]
    fn missing_declared_binding_is_null() {
        let env = env(&["assertion"]);
        let expr = env.compile("assertion == null").unwrap();
        let value = expr.evaluate(&env, &Bindings::new()).unwrap();
        assert_eq!(value, Value::Bool(true));
    }

    #[test]
    fn object_variable_requires_an_object() {
        let env = Environment::new(
            vec![VariableDecl::object("assertion", "wif.v1.SamlSchema")],
            Arc::new(FunctionLibrary::with_defaults()),
        );
        let expr = env.compile("assertion.subject").unwrap();

        let err = expr
            .evaluate(&env, &bindings(json!({"assertion": "flat"})))
            .unwrap_err();
        assert!(matches!(err, ExpressionError::Bind(_)));

        let value = expr
            .evaluate(&env, &bindings(json!({"assertion": {"subject": "1"}})))
            .unwrap();
        assert_eq!(value, Value::String(Arc::new("1".to_string())));
    }

    #[test]
    fn value_kinds() {
        assert_eq!(value_kind(&Value::Bool(true)), "bool");
        assert_eq!(value_kind(&Value::Int(1)), "int");
        assert_eq!(value_kind(&Value::Null), "null");
    }
}
