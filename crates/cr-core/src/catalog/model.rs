//! Event catalog model.
//!
//! The catalog is what the simulation server serves from. It is keyed by
//! privilege level, then onboarding phase, then exact input line:
//!
//! ```yaml
//! events:
//!   privilege_exec:
//!     pre_on_open:
//!       show version:
//!         type: standard
//!         channel_output: "Version 1.0\nrouter#"
//!         result_privilege_level: privilege_exec
//!         returns_prompt: true
//!         closes_connection: false
//!     post_on_open: {}
//! unknown_events:
//!   privilege_exec:
//!     pre_on_open: { channel_output: "% Invalid input\nrouter#", ... }
//!     post_on_open: { ... }
//! initial_privilege_level: privilege_exec
//! privilege_level_prompts:
//!   privilege_exec: "router#"
//! on_open_inputs:
//!   - terminal length 0
//! ```

use super::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Sent by the collector to harvest the unknown-input response.
pub const UNKNOWN_INPUT: &str = "__UNKNOWN_INPUT__";
/// Stored as the output of an input that dropped the connection.
pub const CLOSES_CONNECTION: &str = "__CLOSES_CONNECTION__";
/// Hidden step expecting the secondary (enable) credential.
pub const AUTH_SECONDARY: &str = "__AUTH_SECONDARY__";
/// Hidden step whose real input is not stored.
pub const REDACTED_STEP: &str = "__REDACTED__";

/// Whether the endpoint's on-open sequence has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnOpenPhase {
    PreOnOpen,
    PostOnOpen,
}

impl OnOpenPhase {
    pub const ALL: [OnOpenPhase; 2] = [OnOpenPhase::PreOnOpen, OnOpenPhase::PostOnOpen];

    pub fn as_str(&self) -> &'static str {
        match self {
            OnOpenPhase::PreOnOpen => "pre_on_open",
            OnOpenPhase::PostOnOpen => "post_on_open",
        }
    }
}

impl fmt::Display for OnOpenPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// Single input → output exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardEvent {
    pub channel_output: String,
    pub result_privilege_level: String,
    /// False when output stopped at a paging prompt.
    #[serde(default = "default_true")]
    pub returns_prompt: bool,
    #[serde(default)]
    pub closes_connection: bool,
}

impl StandardEvent {
    pub fn closes(&self) -> bool {
        self.closes_connection || self.channel_output == CLOSES_CONNECTION
    }
}

/// One step of an interactive dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractStep {
    pub channel_input: String,
    pub channel_output: String,
    #[serde(default)]
    pub hidden_input: bool,
    #[serde(default = "default_true")]
    pub returns_prompt: bool,
}

/// Multi-step exchange, consumed strictly in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveEvent {
    pub result_privilege_level: String,
    pub event_steps: Vec<InteractStep>,
}

/// Catalog entry for one input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Standard(StandardEvent),
    Interactive(InteractiveEvent),
}

impl Event {
    pub fn result_privilege_level(&self) -> &str {
        match self {
            Event::Standard(e) => &e.result_privilege_level,
            Event::Interactive(e) => &e.result_privilege_level,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Standard(_) => "standard",
            Event::Interactive(_) => "interactive",
        }
    }
}

/// One value per onboarding phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBuckets<T> {
    pub pre_on_open: T,
    pub post_on_open: T,
}

impl<T> PhaseBuckets<T> {
    pub fn get(&self, phase: OnOpenPhase) -> &T {
        match phase {
            OnOpenPhase::PreOnOpen => &self.pre_on_open,
            OnOpenPhase::PostOnOpen => &self.post_on_open,
        }
    }

    pub fn get_mut(&mut self, phase: OnOpenPhase) -> &mut T {
        match phase {
            OnOpenPhase::PreOnOpen => &mut self.pre_on_open,
            OnOpenPhase::PostOnOpen => &mut self.post_on_open,
        }
    }
}

pub type EventBucket = BTreeMap<String, Event>;

/// Immutable, validated catalog loaded once by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCatalog {
    pub events: BTreeMap<String, PhaseBuckets<EventBucket>>,
    pub unknown_events: BTreeMap<String, PhaseBuckets<StandardEvent>>,
    pub initial_privilege_level: String,
    pub privilege_level_prompts: BTreeMap<String, String>,
    #[serde(default)]
    pub on_open_inputs: Vec<String>,
    #[serde(default)]
    pub on_close_inputs: Vec<String>,
}

impl EventCatalog {
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        let catalog: EventCatalog = serde_yaml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_yaml_str(&content)?;
        debug!(
            path = %path.display(),
            levels = catalog.privilege_level_prompts.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn to_yaml_string(&self) -> Result<String, CatalogError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let yaml = self.to_yaml_string()?;
        std::fs::write(path, yaml).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check that every reachable (privilege level, phase) pair is served.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if !self
            .privilege_level_prompts
            .contains_key(&self.initial_privilege_level)
        {
            return Err(CatalogError::Invalid(format!(
                "initial privilege level '{}' has no prompt",
                self.initial_privilege_level
            )));
        }

        for level in self.privilege_level_prompts.keys() {
            if !self.events.contains_key(level) {
                return Err(CatalogError::Invalid(format!(
                    "privilege level '{}' has no events",
                    level
                )));
            }
            if !self.unknown_events.contains_key(level) {
                return Err(CatalogError::Invalid(format!(
                    "privilege level '{}' has no unknown-input events",
                    level
                )));
            }
        }

        for (level, buckets) in &self.events {
            if !self.privilege_level_prompts.contains_key(level) {
                return Err(CatalogError::Invalid(format!(
                    "events reference unknown privilege level '{}'",
                    level
                )));
            }
            for phase in OnOpenPhase::ALL {
                for (input, event) in buckets.get(phase) {
                    self.check_level(event.result_privilege_level(), level, phase, input)?;
                    if let Event::Interactive(interactive) = event {
                        if interactive.event_steps.is_empty() {
                            return Err(CatalogError::Invalid(format!(
                                "interactive event '{}' at {}/{} has no steps",
                                input, level, phase
                            )));
                        }
                    }
                }
            }
        }

        for (level, buckets) in &self.unknown_events {
            for phase in OnOpenPhase::ALL {
                let event = buckets.get(phase);
                self.check_level(&event.result_privilege_level, level, phase, UNKNOWN_INPUT)?;
            }
        }

        Ok(())
    }

    fn check_level(
        &self,
        result: &str,
        level: &str,
        phase: OnOpenPhase,
        input: &str,
    ) -> Result<(), CatalogError> {
        if self.privilege_level_prompts.contains_key(result) {
            Ok(())
        } else {
            Err(CatalogError::Invalid(format!(
                "event '{}' at {}/{} results in unknown privilege level '{}'",
                input, level, phase, result
            )))
        }
    }

    /// Exact-match event for `input`.
    pub fn event(&self, privilege_level: &str, phase: OnOpenPhase, input: &str) -> Option<&Event> {
        self.events
            .get(privilege_level)
            .and_then(|buckets| buckets.get(phase).get(input))
    }

    /// Fallback for inputs absent from the catalog.
    pub fn unknown_event(&self, privilege_level: &str, phase: OnOpenPhase) -> Option<&StandardEvent> {
        self.unknown_events
            .get(privilege_level)
            .map(|buckets| buckets.get(phase))
    }

    pub fn prompt(&self, privilege_level: &str) -> Option<&str> {
        self.privilege_level_prompts
            .get(privilege_level)
            .map(String::as_str)
    }

    /// Number of events per privilege level and phase.
    pub fn counts(&self) -> BTreeMap<String, PhaseBuckets<usize>> {
        self.events
            .iter()
            .map(|(level, buckets)| {
                (
                    level.clone(),
                    PhaseBuckets {
                        pre_on_open: buckets.pre_on_open.len(),
                        post_on_open: buckets.post_on_open.len(),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const CATALOG_YAML: &str = r#"
events:
  exec:
    pre_on_open:
      show version:
        type: standard
        channel_output: "Version 1.0\nrouter>"
        result_privilege_level: exec
      terminal length 0:
        type: standard
        channel_output: "router>"
        result_privilege_level: exec
      enable:
        type: interactive
        result_privilege_level: privilege_exec
        event_steps:
          - channel_input: enable
            channel_output: "Password: "
            hidden_input: false
          - channel_input: __AUTH_SECONDARY__
            channel_output: "router#"
            hidden_input: true
      exit:
        type: standard
        channel_output: __CLOSES_CONNECTION__
        result_privilege_level: exec
        returns_prompt: false
        closes_connection: true
    post_on_open:
      show version:
        type: standard
        channel_output: "Version 1.0 (no paging)\nrouter>"
        result_privilege_level: exec
      enable:
        type: interactive
        result_privilege_level: privilege_exec
        event_steps:
          - channel_input: enable
            channel_output: "Password: "
          - channel_input: __AUTH_SECONDARY__
            channel_output: "router#"
            hidden_input: true
  privilege_exec:
    pre_on_open:
      disable:
        type: standard
        channel_output: "router>"
        result_privilege_level: exec
    post_on_open:
      disable:
        type: standard
        channel_output: "router>"
        result_privilege_level: exec
unknown_events:
  exec:
    pre_on_open:
      channel_output: "% Unknown command (pre)\nrouter>"
      result_privilege_level: exec
    post_on_open:
      channel_output: "% Unknown command (post)\nrouter>"
      result_privilege_level: exec
  privilege_exec:
    pre_on_open:
      channel_output: "% Invalid input (pre)\nrouter#"
      result_privilege_level: privilege_exec
    post_on_open:
      channel_output: "% Invalid input (post)\nrouter#"
      result_privilege_level: privilege_exec
initial_privilege_level: exec
privilege_level_prompts:
  exec: "router>"
  privilege_exec: "router#"
on_open_inputs:
  - terminal length 0
"#;

    pub(crate) fn catalog() -> EventCatalog {
        EventCatalog::from_yaml_str(CATALOG_YAML).unwrap()
    }

    #[test]
    fn parses_tagged_events() {
        let catalog = catalog();
        match catalog.event("exec", OnOpenPhase::PreOnOpen, "enable") {
            Some(Event::Interactive(e)) => {
                assert_eq!(e.event_steps.len(), 2);
                assert!(e.event_steps[1].hidden_input);
                assert!(e.event_steps[0].returns_prompt);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match catalog.event("exec", OnOpenPhase::PreOnOpen, "exit") {
            Some(Event::Standard(e)) => assert!(e.closes()),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(catalog
            .event("exec", OnOpenPhase::PostOnOpen, "exit")
            .is_none());
    }

    #[test]
    fn unknown_events_are_per_level_and_phase() {
        let catalog = catalog();
        assert_eq!(
            catalog
                .unknown_event("privilege_exec", OnOpenPhase::PostOnOpen)
                .unwrap()
                .channel_output,
            "% Invalid input (post)\nrouter#"
        );
        assert_eq!(catalog.prompt("exec"), Some("router>"));
    }

    #[test]
    fn missing_phase_bucket_is_rejected_at_load() {
        let broken = CATALOG_YAML.replace(
            "    post_on_open:\n      disable:",
            "    other_phase:\n      disable:",
        );
        assert!(EventCatalog::from_yaml_str(&broken).is_err());
    }

    #[test]
    fn missing_unknown_event_level_is_invalid() {
        let mut catalog = catalog();
        catalog.unknown_events.remove("privilege_exec");
        let err = catalog.validate().unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(msg) if msg.contains("privilege_exec")));
    }

    #[test]
    fn result_level_must_exist() {
        let mut catalog = catalog();
        catalog
            .unknown_events
            .get_mut("exec")
            .unwrap()
            .pre_on_open
            .result_privilege_level = "configuration".into();
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::Invalid(msg)) if msg.contains("configuration")
        ));
    }

    #[test]
    fn yaml_round_trip_keeps_type_tag() {
        let catalog = catalog();
        let yaml = catalog.to_yaml_string().unwrap();
        assert!(yaml.contains("type: interactive"));
        assert!(yaml.contains("type: standard"));
        assert_eq!(EventCatalog::from_yaml_str(&yaml).unwrap(), catalog);
    }
}
