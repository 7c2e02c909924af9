//! Per-connection simulation state machine.
//!
//! Transport independent: each input line produces a list of [`Effect`]s for
//! the connection layer to apply. The catalog is shared read-only across
//! connections; everything mutable lives here.

use crate::catalog::{
    Event, EventCatalog, InteractiveEvent, OnOpenPhase, StandardEvent, AUTH_SECONDARY,
    REDACTED_STEP,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Something the transport must do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Write(String),
    /// Turn echo of client input on or off (hidden input).
    SetEcho(bool),
    Close,
}

#[derive(Debug)]
struct Dialog {
    event: InteractiveEvent,
    index: usize,
    retried: bool,
}

enum DialogOutcome {
    Continue,
    Completed,
    Aborted,
}

/// State of one simulated connection.
#[derive(Debug)]
pub struct SimulatedSession {
    catalog: Arc<EventCatalog>,
    secondary_credential: String,
    privilege_level: String,
    phase: OnOpenPhase,
    pending_on_open: Vec<String>,
    dialog: Option<Dialog>,
    hidden: bool,
}

impl SimulatedSession {
    pub fn new(catalog: Arc<EventCatalog>, secondary_credential: impl Into<String>) -> Self {
        let privilege_level = catalog.initial_privilege_level.clone();
        let pending_on_open = catalog.on_open_inputs.clone();
        Self {
            catalog,
            secondary_credential: secondary_credential.into(),
            privilege_level,
            phase: OnOpenPhase::PreOnOpen,
            pending_on_open,
            dialog: None,
            hidden: false,
        }
    }

    pub fn privilege_level(&self) -> &str {
        &self.privilege_level
    }

    pub fn phase(&self) -> OnOpenPhase {
        self.phase
    }

    pub fn in_dialog(&self) -> bool {
        self.dialog.is_some()
    }

    pub fn is_input_hidden(&self) -> bool {
        self.hidden
    }

    /// Effects for a freshly established session: paint the prompt.
    pub fn start(&self) -> Vec<Effect> {
        vec![self.prompt()]
    }

    fn prompt(&self) -> Effect {
        Effect::Write(
            self.catalog
                .prompt(&self.privilege_level)
                .unwrap_or_default()
                .to_string(),
        )
    }

    /// React to one line of client input.
    pub fn handle_input(&mut self, raw: &str) -> Vec<Effect> {
        let input = if raw == "\n" { raw } else { raw.trim_end() };
        debug!(input, level = %self.privilege_level, phase = %self.phase, "input received");

        let mut effects = Vec::new();
        if self.dialog.is_some() {
            self.interactive_step(input, &mut effects);
            return effects;
        }

        if input == "\n" {
            effects.push(self.prompt());
            return effects;
        }

        let catalog = Arc::clone(&self.catalog);
        match catalog.event(&self.privilege_level, self.phase, input) {
            Some(Event::Standard(event)) => self.standard_event(input, event, &mut effects),
            Some(Event::Interactive(event)) => {
                debug!(input, steps = event.event_steps.len(), "entering dialog");
                self.dialog = Some(Dialog {
                    event: event.clone(),
                    index: 0,
                    retried: false,
                });
                self.interactive_step(input, &mut effects);
            }
            None => self.unknown_event(&mut effects),
        }
        effects
    }

    fn standard_event(&mut self, input: &str, event: &StandardEvent, effects: &mut Vec<Effect>) {
        if event.closes() {
            debug!(input, "input closes the connection");
            effects.push(Effect::Close);
            self.reset();
            return;
        }

        effects.push(Effect::Write(event.channel_output.clone()));
        self.privilege_level = event.result_privilege_level.clone();

        if let Some(pos) = self.pending_on_open.iter().position(|p| p == input) {
            debug!(input, "on-open input received");
            self.pending_on_open.remove(pos);
        }
        if self.pending_on_open.is_empty() && self.phase == OnOpenPhase::PreOnOpen {
            debug!("on-open inputs complete");
            self.phase = OnOpenPhase::PostOnOpen;
        }
    }

    fn unknown_event(&mut self, effects: &mut Vec<Effect>) {
        let Some(event) = self
            .catalog
            .unknown_event(&self.privilege_level, self.phase)
            .cloned()
        else {
            warn!(level = %self.privilege_level, phase = %self.phase, "no unknown-input response");
            effects.push(self.prompt());
            return;
        };

        debug!(level = %self.privilege_level, phase = %self.phase, "unknown input");
        effects.push(Effect::Write(event.channel_output.clone()));
        if event.closes() {
            effects.push(Effect::Close);
            self.reset();
            return;
        }
        self.privilege_level = event.result_privilege_level;
    }

    fn interactive_step(&mut self, input: &str, effects: &mut Vec<Effect>) {
        if self.hidden {
            effects.push(Effect::SetEcho(true));
            self.hidden = false;
        }

        match self.advance_dialog(input, effects) {
            DialogOutcome::Continue => {}
            DialogOutcome::Completed => debug!(level = %self.privilege_level, "dialog complete"),
            DialogOutcome::Aborted => {
                warn!(input, "input does not match dialog step");
                self.dialog = None;
                self.unknown_event(effects);
            }
        }
    }

    fn advance_dialog(&mut self, input: &str, effects: &mut Vec<Effect>) -> DialogOutcome {
        let Some(dialog) = self.dialog.as_mut() else {
            return DialogOutcome::Aborted;
        };
        let Some(step) = dialog.event.event_steps.get(dialog.index) else {
            return DialogOutcome::Aborted;
        };

        if step.hidden_input {
            let expected = if step.channel_input == AUTH_SECONDARY
                || step.channel_input == REDACTED_STEP
            {
                self.secondary_credential.as_str()
            } else {
                step.channel_input.as_str()
            };
            if input != expected {
                if dialog.retried {
                    return DialogOutcome::Aborted;
                }
                warn!("hidden input rejected, prompting again");
                dialog.retried = true;
                // A dialog that opens with a hidden step has no prompt to repeat.
                if let Some(previous) = dialog
                    .index
                    .checked_sub(1)
                    .and_then(|i| dialog.event.event_steps.get(i))
                {
                    effects.push(Effect::Write(previous.channel_output.clone()));
                }
                effects.push(Effect::SetEcho(false));
                self.hidden = true;
                return DialogOutcome::Continue;
            }
        } else if input != step.channel_input {
            return DialogOutcome::Aborted;
        }

        dialog.retried = false;
        effects.push(Effect::Write(step.channel_output.clone()));

        if dialog.index + 1 == dialog.event.event_steps.len() {
            self.privilege_level = dialog.event.result_privilege_level.clone();
            self.dialog = None;
            return DialogOutcome::Completed;
        }

        dialog.index += 1;
        if dialog.event.event_steps[dialog.index].hidden_input {
            effects.push(Effect::SetEcho(false));
            self.hidden = true;
        }
        DialogOutcome::Continue
    }

    fn reset(&mut self) {
        self.privilege_level = self.catalog.initial_privilege_level.clone();
        self.phase = OnOpenPhase::PreOnOpen;
        self.pending_on_open = self.catalog.on_open_inputs.clone();
        self.dialog = None;
        self.hidden = false;
    }
}
