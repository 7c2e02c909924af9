//! CLI commands for recorded transcripts.

use crate::exit_codes::ExitCode;
use crate::transcript::{ReplaySession, Transcript};
use clap::{Args, Subcommand};
use cr_common::{InstanceId, OutputFormat, SCHEMA_VERSION};
use std::path::{Path, PathBuf};

/// Arguments for the transcript command
#[derive(Args, Debug)]
pub struct TranscriptArgs {
    #[command(subcommand)]
    pub command: TranscriptCommands,
}

/// Transcript subcommands
#[derive(Subcommand, Debug)]
pub enum TranscriptCommands {
    /// List recorded interactions
    Show {
        /// Transcript file (YAML)
        path: PathBuf,
        /// Only show this instance
        #[arg(long)]
        instance: Option<String>,
    },
    /// Confirm every recorded instance can be replayed
    Check {
        /// Transcript file (YAML)
        path: PathBuf,
    },
}

pub fn run_transcript(format: &OutputFormat, args: &TranscriptArgs) -> ExitCode {
    match &args.command {
        TranscriptCommands::Show { path, instance } => {
            run_transcript_show(format, path, instance.as_deref())
        }
        TranscriptCommands::Check { path } => run_transcript_check(format, path),
    }
}

fn load(command: &str, path: &Path) -> Result<Transcript, ExitCode> {
    Transcript::load(path).map_err(|e| {
        eprintln!("chanreplay {}: {}", command, e);
        ExitCode::for_error(&e.into())
    })
}

fn run_transcript_show(format: &OutputFormat, path: &Path, instance: Option<&str>) -> ExitCode {
    let transcript = match load("transcript show", path) {
        Ok(t) => t,
        Err(code) => return code,
    };

    let selected: Vec<(&InstanceId, &ReplaySession)> = match instance {
        Some(id) => match transcript.sessions.get_key_value(&InstanceId::from(id)) {
            Some(entry) => vec![entry],
            None => {
                eprintln!(
                    "chanreplay transcript show: no instance '{}' in {}",
                    id,
                    path.display()
                );
                return ExitCode::TranscriptError;
            }
        },
        None => transcript.sessions.iter().collect(),
    };

    match format {
        OutputFormat::Json => {
            let sessions: serde_json::Map<String, serde_json::Value> = selected
                .iter()
                .map(|(id, session)| {
                    (
                        id.to_string(),
                        serde_json::json!({
                            "connection_profile": session.connection_profile,
                            "interactions": session.interactions,
                        }),
                    )
                })
                .collect();
            let output = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "command": "transcript show",
                "path": path.display().to_string(),
                "sessions": sessions,
            });
            crate::print_json(&output)
        }
        OutputFormat::Summary => {
            for (id, session) in selected {
                let profile = &session.connection_profile;
                println!(
                    "# {} ({}@{}:{} via {}, {} interactions)",
                    id,
                    profile.auth_username,
                    profile.host,
                    profile.port,
                    profile.transport,
                    session.interactions.len()
                );
                for (i, interaction) in session.interactions.iter().enumerate() {
                    let input = match (
                        &interaction.expected_channel_input,
                        interaction.expected_channel_input_redacted,
                    ) {
                        (Some(_), true) => "<redacted>".to_string(),
                        (Some(input), false) => format!("{:?}", input),
                        (None, _) => "<end>".to_string(),
                    };
                    println!(
                        "  {:>3}: read {} bytes, then write {}",
                        i,
                        interaction.channel_output.len(),
                        input
                    );
                }
            }
            ExitCode::Clean
        }
    }
}

fn run_transcript_check(format: &OutputFormat, path: &Path) -> ExitCode {
    let transcript = match load("transcript check", path) {
        Ok(t) => t,
        Err(code) => return code,
    };

    let empty: Vec<&InstanceId> = transcript
        .sessions
        .iter()
        .filter(|(_, session)| !session.is_replayable())
        .map(|(id, _)| id)
        .collect();
    let replayable = !transcript.is_empty() && empty.is_empty();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "command": "transcript check",
                "path": path.display().to_string(),
                "instances": transcript.len(),
                "replayable": replayable,
                "empty_instances": empty,
            });
            let code = crate::print_json(&output);
            if code.is_success() && !replayable {
                return ExitCode::TranscriptError;
            }
            code
        }
        OutputFormat::Summary => {
            if replayable {
                println!("# {} instances, all replayable", transcript.len());
                ExitCode::Clean
            } else if transcript.is_empty() {
                println!("# transcript is empty; it will be recorded on next run");
                ExitCode::TranscriptError
            } else {
                println!("# {} instances without interactions:", empty.len());
                for id in empty {
                    println!("  {}", id);
                }
                ExitCode::TranscriptError
            }
        }
    }
}
