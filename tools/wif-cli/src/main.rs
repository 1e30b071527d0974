// Copyright (c) 2024 by Alibaba.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

mod config;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::{debug, info};

use crate::config::RequestFile;

/// Command-line switches of the mapping tool.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Map an OIDC or SAML assertion onto Workload Identity Federation attributes"
)]
struct Cli {
    /// File holding the assertion, `-` reads it from stdin.
    #[arg(short, long)]
    payload: String,

    /// Request file holding the mapping, condition and provider.
    #[arg(short, long)]
    request: Option<PathBuf>,

    /// Provider parsing the payload (`oidc`, `saml`), detected when unset.
    #[arg(long, env = "WIF_PROVIDER")]
    provider: Option<String>,

    /// Attribute mapping entry, `KEY=EXPRESSION`. Overrides the request file.
    #[arg(short, long = "mapping", value_parser = parse_mapping)]
    mappings: Vec<(String, String)>,

    /// Attribute condition. Overrides the request file.
    #[arg(short, long)]
    condition: Option<String>,
}

fn parse_mapping(raw: &str) -> Result<(String, String), String> {
    let (key, expression) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=EXPRESSION, got {raw:?}"))?;
    Ok((key.trim().to_string(), expression.trim().to_string()))
}

fn read_payload(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .context("failed to read payload from stdin")?;
        return Ok(payload);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read payload {path}"))
}

/// Merge the request file and the command line into a compiler input.
fn build_input(cli: Cli, payload: String) -> anyhow::Result<wif_compiler::Input> {
    let mut request = match &cli.request {
        Some(path) => RequestFile::from_file(path)?,
        None => RequestFile::default(),
    };

    let overrides: BTreeMap<String, String> = cli.mappings.into_iter().collect();
    if !overrides.is_empty() {
        debug!("{} mapping entries given on the command line", overrides.len());
    }
    request.attribute_mapping.extend(overrides);
    if let Some(condition) = cli.condition {
        request.attribute_condition = condition;
    }
    if cli.provider.is_some() {
        request.provider = cli.provider;
    }

    Ok(request.into_input(payload))
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    let payload = read_payload(&cli.payload)?;
    let input = build_input(cli, payload)?;

    match wif_compiler::run(&input) {
        Ok(attributes) => {
            info!("{} attributes mapped", attributes.len());
            println!("{}", serde_json::to_string_pretty(&attributes)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let mut message = err.to_string();
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                message.push_str(&format!(": {cause}"));
                source = cause.source();
            }
            eprintln!("error[{}]: {message}", err.as_ref());
            Ok(ExitCode::FAILURE)
        }
    }
}
