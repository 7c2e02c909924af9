//! CLI commands for event catalogs.
//!
//! `validate` loads a catalog the way the simulator does and reports the
//! number of events per privilege level; `lookup` shows which event the
//! simulator would serve for one input.

use crate::catalog::{Event, EventCatalog, OnOpenPhase};
use crate::exit_codes::ExitCode;
use clap::{Args, Subcommand};
use cr_common::{OutputFormat, SCHEMA_VERSION};
use std::path::{Path, PathBuf};

/// Arguments for the catalog command
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

/// Catalog subcommands
#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Load and validate a catalog file
    Validate {
        /// Catalog file (YAML)
        path: PathBuf,
    },
    /// Show the event served for an input
    Lookup {
        /// Catalog file (YAML)
        path: PathBuf,
        /// Privilege level the session is in
        #[arg(long)]
        privilege_level: String,
        /// Look up in the post-on-open phase
        #[arg(long)]
        post_on_open: bool,
        /// Input line as the client would send it
        input: String,
    },
}

pub fn run_catalog(format: &OutputFormat, args: &CatalogArgs) -> ExitCode {
    match &args.command {
        CatalogCommands::Validate { path } => run_catalog_validate(format, path),
        CatalogCommands::Lookup {
            path,
            privilege_level,
            post_on_open,
            input,
        } => {
            let phase = if *post_on_open {
                OnOpenPhase::PostOnOpen
            } else {
                OnOpenPhase::PreOnOpen
            };
            run_catalog_lookup(format, path, privilege_level, phase, input)
        }
    }
}

fn load(command: &str, path: &Path) -> Result<EventCatalog, ExitCode> {
    EventCatalog::load(path).map_err(|e| {
        eprintln!("chanreplay {}: {}", command, e);
        ExitCode::for_error(&e.into())
    })
}

fn run_catalog_validate(format: &OutputFormat, path: &Path) -> ExitCode {
    let catalog = match load("catalog validate", path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let counts = catalog.counts();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "command": "catalog validate",
                "path": path.display().to_string(),
                "valid": true,
                "initial_privilege_level": catalog.initial_privilege_level,
                "privilege_levels": catalog.privilege_level_prompts,
                "event_counts": counts,
                "on_open_inputs": catalog.on_open_inputs,
                "on_close_inputs": catalog.on_close_inputs,
            });
            crate::print_json(&output)
        }
        OutputFormat::Summary => {
            println!("# Catalog {} is valid", path.display());
            println!("  initial privilege level: {}", catalog.initial_privilege_level);
            for (level, count) in &counts {
                println!(
                    "  {} pre_on_open={} post_on_open={}",
                    level, count.pre_on_open, count.post_on_open
                );
            }
            ExitCode::Clean
        }
    }
}

fn run_catalog_lookup(
    format: &OutputFormat,
    path: &Path,
    privilege_level: &str,
    phase: OnOpenPhase,
    input: &str,
) -> ExitCode {
    let catalog = match load("catalog lookup", path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if catalog.prompt(privilege_level).is_none() {
        eprintln!(
            "chanreplay catalog lookup: unknown privilege level '{}'",
            privilege_level
        );
        return ExitCode::CatalogError;
    }

    let (matched, event) = match catalog.event(privilege_level, phase, input) {
        Some(event) => (true, event.clone()),
        None => match catalog.unknown_event(privilege_level, phase) {
            Some(unknown) => (false, Event::Standard(unknown.clone())),
            None => {
                eprintln!(
                    "chanreplay catalog lookup: no unknown-input response for {}/{}",
                    privilege_level, phase
                );
                return ExitCode::CatalogError;
            }
        },
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "command": "catalog lookup",
                "privilege_level": privilege_level,
                "phase": phase.as_str(),
                "input": input,
                "matched": matched,
                "event": event,
            });
            crate::print_json(&output)
        }
        OutputFormat::Summary => {
            let origin = if matched { "catalog" } else { "unknown input" };
            println!(
                "# {} event from {} -> {}",
                event.kind(),
                origin,
                event.result_privilege_level()
            );
            match &event {
                Event::Standard(e) => println!("{}", e.channel_output),
                Event::Interactive(e) => {
                    for (i, step) in e.event_steps.iter().enumerate() {
                        let hidden = if step.hidden_input { " (hidden)" } else { "" };
                        println!("  step {}: {}{}", i + 1, step.channel_input, hidden);
                    }
                }
            }
            ExitCode::Clean
        }
    }
}
