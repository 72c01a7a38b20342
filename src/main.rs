// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! spacey-load CLI - load a module and print its exports as JSON

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use spacey_modules::{LoaderConfig, ModuleFormat, ModuleLoader, ModuleState, VERSION, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "spacey-load",
    about = "Load a module with the Spacey module loader and print its exports",
    version = VERSION,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Module to load
    module: PathBuf,

    /// Config file to use instead of ./spacey-loader.json
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory relative module paths are taken from
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Format of files whose extension and package.json don't decide it
    #[arg(long, value_name = "commonjs|module")]
    format: Option<ModuleFormat>,

    /// Print the resolved path without loading the module
    #[arg(long)]
    resolve: bool,

    /// List every cached module and its state after loading
    #[arg(long)]
    cache: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// RUST_LOG wins over the --verbose default
fn init_logging(verbose: bool) {
    let default = if verbose {
        "spacey_modules=debug,spacey_load=debug"
    } else {
        "spacey_modules=warn,spacey_load=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config files and environment, then command line flags
fn load_config(cli: &Cli) -> anyhow::Result<LoaderConfig> {
    let mut config = LoaderConfig::load(cli.config.as_deref())?;

    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = base_dir.clone();
    }
    if let Some(format) = cli.format {
        config.default_format = format;
    }

    Ok(config)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let mut loader = ModuleLoader::with_config(config);

    if cli.resolve {
        let resolved = loader.resolve_path(&cli.module)?;
        println!("{}", resolved.display());
        return Ok(());
    }

    let result = loader.load(&cli.module);

    if cli.cache {
        print_cache(&loader);
    }

    let exports = result?;
    debug!("{} modules in cache", loader.cache().len());
    let json = serde_json::to_string_pretty(&Value::Object(exports).to_json())
        .context("failed to serialize exports")?;
    println!("{}", json);

    Ok(())
}

/// Cache listing goes to stderr so stdout stays valid JSON
fn print_cache(loader: &ModuleLoader) {
    eprintln!("{}", "Module cache:".white().bold());
    for record in loader.cache().iter() {
        let state = format!("{:8}", record.state.to_string());
        // A module left loading after the run failed while executing
        let state = match record.state {
            ModuleState::Loaded => state.green().to_string(),
            ModuleState::Loading => state.yellow().to_string(),
        };
        eprintln!(
            "  {} {:9} {}",
            state,
            record.format.to_string(),
            record.path.display().cyan()
        );
    }
}
