//! Transcript collector.
//!
//! Drives a real endpoint through a fixed vocabulary of inputs at every
//! privilege level, twice: once before the on-open hook (paging and width
//! still at device defaults) and once after. The harvested responses become
//! an [`EventCatalog`] for the simulation server.

use super::driver::{DriverError, EndpointDriver};
use super::CollectError;
use crate::catalog::{
    Event, EventBucket, EventCatalog, InteractStep, InteractiveEvent, OnOpenPhase, PhaseBuckets,
    StandardEvent, AUTH_SECONDARY, CLOSES_CONNECTION, REDACTED_STEP, UNKNOWN_INPUT,
};
use crate::channel::decode_output;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// One step of an interactive dialog to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractSpec {
    pub input: String,
    /// Text the endpoint shows when it is ready for the next step.
    pub response: String,
    pub hidden: bool,
}

impl InteractSpec {
    pub fn new(input: impl Into<String>, response: impl Into<String>, hidden: bool) -> Self {
        Self {
            input: input.into(),
            response: response.into(),
            hidden,
        }
    }
}

/// What to collect.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub channel_inputs: Vec<String>,
    pub interact_events: Vec<Vec<InteractSpec>>,
    /// Text the endpoint shows when it pauses output for paging.
    pub paging_indicator: String,
    pub paging_escape_string: String,
}

impl CollectorOptions {
    pub fn new(paging_indicator: impl Into<String>) -> Self {
        Self {
            channel_inputs: Vec::new(),
            interact_events: Vec::new(),
            paging_indicator: paging_indicator.into(),
            paging_escape_string: "\x1b".to_string(),
        }
    }
}

pub struct Collector<D> {
    driver: D,
    options: CollectorOptions,
    level_patterns: Vec<(String, Regex)>,
    phase: OnOpenPhase,
    initial_privilege_level: String,
    privilege_level_prompts: BTreeMap<String, String>,
    prompts_collected: bool,
    expected_patterns: Vec<String>,
    escalate_inputs: Vec<String>,
    deescalate_inputs: Vec<String>,
    interact_escalations: Vec<Vec<InteractSpec>>,
    events: BTreeMap<String, PhaseBuckets<EventBucket>>,
    unknown_events: BTreeMap<String, PhaseBuckets<Option<StandardEvent>>>,
    on_open_inputs: Vec<String>,
    on_close_inputs: Vec<String>,
}

impl<D: EndpointDriver> Collector<D> {
    /// Wrap `driver`. Hooks are disabled and an open connection is closed so
    /// the first pass starts from device defaults.
    pub fn new(mut driver: D, options: CollectorOptions) -> Result<Self, CollectError> {
        driver.set_hooks_enabled(false);
        if driver.is_alive() {
            driver.close()?;
        }

        let mut level_patterns = Vec::new();
        let mut events = BTreeMap::new();
        let mut unknown_events = BTreeMap::new();
        let mut escalate_inputs = Vec::new();
        let mut deescalate_inputs = Vec::new();
        let mut interact_escalations = Vec::new();

        for level in driver.privilege_levels() {
            let regex = RegexBuilder::new(&level.pattern)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .map_err(|source| CollectError::InvalidPattern {
                    level: level.name.clone(),
                    source,
                })?;
            level_patterns.push((level.name.clone(), regex));
            events.insert(level.name.clone(), PhaseBuckets::default());
            unknown_events.insert(level.name.clone(), PhaseBuckets::default());

            if !level.escalate_auth && !level.escalate.is_empty() {
                escalate_inputs.push(level.escalate.clone());
            }
            if !level.deescalate.is_empty() {
                deescalate_inputs.push(level.deescalate.clone());
            }
            if level.escalate_auth && !level.escalate_prompt.is_empty() {
                interact_escalations.push(vec![
                    InteractSpec::new(&level.escalate, &level.escalate_prompt, false),
                    InteractSpec::new(AUTH_SECONDARY, &level.pattern, true),
                ]);
            }
        }

        let expected_patterns = vec![options.paging_indicator.clone()];
        debug!(
            levels = level_patterns.len(),
            escalations = escalate_inputs.len(),
            deescalations = deescalate_inputs.len(),
            interactive_escalations = interact_escalations.len(),
            "collector created"
        );

        Ok(Self {
            driver,
            options,
            level_patterns,
            phase: OnOpenPhase::PreOnOpen,
            initial_privilege_level: String::new(),
            privilege_level_prompts: BTreeMap::new(),
            prompts_collected: false,
            expected_patterns,
            escalate_inputs,
            deescalate_inputs,
            interact_escalations,
            events,
            unknown_events,
            on_open_inputs: Vec::new(),
            on_close_inputs: Vec::new(),
        })
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Open the endpoint. The first open also records the initial level.
    pub fn open(&mut self) -> Result<(), CollectError> {
        self.driver.open()?;
        if self.initial_privilege_level.is_empty() {
            self.initial_privilege_level = self.current_privilege_level()?;
            debug!(level = %self.initial_privilege_level, "initial privilege level");
        }
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), CollectError> {
        self.driver.close()?;
        Ok(())
    }

    /// Run both collection passes.
    pub fn collect(&mut self) -> Result<(), CollectError> {
        if !self.driver.is_alive() {
            self.open()?;
        }
        self.collect_privilege_prompts()?;
        self.extend_expected_patterns()?;

        self.collect_privilege_and_open_close()?;
        self.collect_inputs()?;

        self.close()?;
        self.driver.set_hooks_enabled(true);
        self.open()?;
        self.phase = OnOpenPhase::PostOnOpen;
        info!("on-open hook enabled, collecting second pass");

        self.collect_privilege_and_open_close()?;
        self.collect_inputs()?;
        Ok(())
    }

    fn current_privilege_level(&mut self) -> Result<String, CollectError> {
        let prompt = self.driver.get_prompt()?;
        self.privilege_level_for(&prompt)
    }

    fn privilege_level_for(&self, prompt: &str) -> Result<String, CollectError> {
        self.level_patterns
            .iter()
            .find(|(_, regex)| regex.is_match(prompt))
            .map(|(name, _)| name.clone())
            .ok_or_else(|| CollectError::UnknownPrivilege {
                prompt: prompt.to_string(),
            })
    }

    fn level_names(&self) -> Vec<String> {
        self.level_patterns
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn collect_privilege_prompts(&mut self) -> Result<(), CollectError> {
        for level in self.level_names() {
            info!(%level, "collecting prompt");
            self.driver.acquire_privilege(&level)?;
            let prompt = self.driver.get_prompt()?;
            self.privilege_level_prompts.insert(level, prompt);
        }
        self.prompts_collected = true;
        Ok(())
    }

    fn extend_expected_patterns(&mut self) -> Result<(), CollectError> {
        if !self.prompts_collected {
            return Err(CollectError::PromptsNotCollected);
        }
        for level in self.level_names() {
            if let Some(prompt) = self.privilege_level_prompts.get(&level) {
                self.expected_patterns.push(prompt.clone());
            }
        }
        Ok(())
    }

    fn hook_inputs(&self, writes: Vec<String>) -> Vec<String> {
        let return_char = self.driver.return_char();
        writes
            .into_iter()
            .filter(|w| !w.is_empty() && w != return_char)
            .collect()
    }

    fn collect_on_open_inputs(&mut self) -> Result<(), CollectError> {
        let level = self.driver.default_privilege_level().to_string();
        self.driver.acquire_privilege(&level)?;
        info!("collecting on-open inputs");
        let writes = self.driver.run_on_open()?;
        self.on_open_inputs = self.hook_inputs(writes);
        debug!(inputs = ?self.on_open_inputs, "on-open inputs");
        Ok(())
    }

    fn collect_on_close_inputs(&mut self) -> Result<(), CollectError> {
        let level = self.driver.default_privilege_level().to_string();
        self.driver.acquire_privilege(&level)?;
        info!("collecting on-close inputs");
        let writes = self.driver.run_on_close()?;
        self.on_close_inputs = self.hook_inputs(writes);
        debug!(inputs = ?self.on_close_inputs, "on-close inputs");

        match self.driver.get_prompt() {
            Ok(_) => Ok(()),
            Err(DriverError::ConnectionClosed) => {
                debug!("on-close hook closed the connection, reopening");
                self.open()
            }
            Err(e) => Err(e.into()),
        }
    }

    fn collect_privilege_and_open_close(&mut self) -> Result<(), CollectError> {
        self.collect_on_open_inputs()?;
        for input in self.on_open_inputs.clone() {
            self.collect_standard_event(&input)?;
        }
        self.collect_on_close_inputs()?;
        for input in self.on_close_inputs.clone() {
            self.collect_standard_event(&input)?;
        }
        for input in self.escalate_inputs.clone() {
            self.collect_standard_event(&input)?;
        }
        for input in self.deescalate_inputs.clone() {
            self.collect_standard_event(&input)?;
        }
        for dialog in self.interact_escalations.clone() {
            self.collect_interactive_event(&dialog)?;
        }
        Ok(())
    }

    fn collect_inputs(&mut self) -> Result<(), CollectError> {
        self.collect_unknown_events()?;
        for input in self.options.channel_inputs.clone() {
            self.collect_standard_event(&input)?;
        }
        for dialog in self.options.interact_events.clone() {
            self.collect_interactive_event(&dialog)?;
        }
        Ok(())
    }

    /// Send one input from the current level and describe what happened.
    fn probe(&mut self, input: &str) -> Result<StandardEvent, CollectError> {
        let patterns = self.expected_patterns.clone();
        let (channel_output, returns_prompt, closes_connection) =
            match self.driver.send_input_and_read(input, &patterns) {
                Ok(raw) => {
                    let returns_prompt = !self.escape_paging(&raw)?;
                    (decode_output(&raw), returns_prompt, false)
                }
                Err(DriverError::ConnectionClosed) => {
                    debug!(input, "input closed the connection, reopening");
                    self.open()?;
                    (CLOSES_CONNECTION.to_string(), false, true)
                }
                Err(e) => return Err(e.into()),
            };

        Ok(StandardEvent {
            channel_output: strip_leading_newline(&channel_output).to_string(),
            result_privilege_level: self.current_privilege_level()?,
            returns_prompt,
            closes_connection,
        })
    }

    /// Leave a paging prompt if `raw` stopped at one.
    fn escape_paging(&mut self, raw: &[u8]) -> Result<bool, CollectError> {
        let indicator = self.options.paging_indicator.as_bytes();
        if indicator.is_empty() || !contains(raw, indicator) {
            return Ok(false);
        }
        debug!("paging indicator seen, sending escape");
        let escape = self.options.paging_escape_string.clone();
        self.driver.write(&escape, false)?;
        self.driver.send_return()?;
        Ok(true)
    }

    fn collect_standard_event(&mut self, input: &str) -> Result<(), CollectError> {
        let phase = self.phase;
        for level in self.level_names() {
            info!(input, %level, %phase, "collecting input");
            self.driver.acquire_privilege(&level)?;
            let event = self.probe(input)?;
            if let Some(buckets) = self.events.get_mut(&level) {
                buckets
                    .get_mut(phase)
                    .insert(input.to_string(), Event::Standard(event));
            }
        }
        Ok(())
    }

    fn collect_unknown_events(&mut self) -> Result<(), CollectError> {
        let phase = self.phase;
        for level in self.level_names() {
            info!(%level, %phase, "collecting unknown input");
            self.driver.acquire_privilege(&level)?;
            let event = self.probe(UNKNOWN_INPUT)?;
            if let Some(buckets) = self.unknown_events.get_mut(&level) {
                *buckets.get_mut(phase) = Some(event);
            }
        }
        Ok(())
    }

    fn interact_step(&mut self, spec: &InteractSpec) -> Result<Vec<u8>, CollectError> {
        let mut patterns = self.expected_patterns.clone();
        patterns.push(spec.response.clone());

        if spec.hidden {
            let secret = if spec.input == AUTH_SECONDARY {
                self.driver.auth_secondary().to_string()
            } else {
                spec.input.clone()
            };
            self.driver.write(&secret, true)?;
            self.driver.send_return()?;
            return Ok(self.driver.read_until_any(&patterns)?);
        }

        let raw = self.driver.send_input_and_read(&spec.input, &patterns)?;
        if spec.input.is_empty() {
            // A bare return comes back as an extra return before the output.
            let skip = self.driver.return_char().len().min(raw.len());
            return Ok(raw[skip..].to_vec());
        }
        Ok(raw)
    }

    fn stored_step_input(&self, spec: &InteractSpec) -> String {
        if spec.hidden && spec.input == AUTH_SECONDARY {
            AUTH_SECONDARY.to_string()
        } else if spec.hidden {
            REDACTED_STEP.to_string()
        } else if spec.input.is_empty() {
            self.driver.return_char().to_string()
        } else {
            spec.input.clone()
        }
    }

    fn collect_interactive_event(&mut self, dialog: &[InteractSpec]) -> Result<(), CollectError> {
        let Some(first) = dialog.first() else {
            return Ok(());
        };
        let key = first.input.clone();
        let phase = self.phase;

        for level in self.level_names() {
            info!(dialog = %key, %level, %phase, "collecting interactive event");
            self.driver.acquire_privilege(&level)?;

            let mut steps = Vec::with_capacity(dialog.len());
            for spec in dialog {
                let raw = self.interact_step(spec)?;
                let returns_prompt = !self.escape_paging(&raw)?;
                let output = decode_output(&raw);
                steps.push(InteractStep {
                    channel_input: self.stored_step_input(spec),
                    channel_output: strip_leading_newline(&output).to_string(),
                    hidden_input: spec.hidden,
                    returns_prompt,
                });

                if !returns_prompt {
                    break;
                }
                if self
                    .expected_patterns
                    .iter()
                    .any(|p| !p.is_empty() && output.contains(p.as_str()))
                {
                    debug!(dialog = %key, steps = steps.len(), "dialog reached a known prompt");
                    break;
                }
            }

            let event = InteractiveEvent {
                result_privilege_level: self.current_privilege_level()?,
                event_steps: steps,
            };
            if let Some(buckets) = self.events.get_mut(&level) {
                buckets
                    .get_mut(phase)
                    .insert(key.clone(), Event::Interactive(event));
            }
        }
        Ok(())
    }

    /// Build the validated catalog from what was collected.
    pub fn catalog(&self) -> Result<EventCatalog, CollectError> {
        let mut unknown_events = BTreeMap::new();
        for (level, buckets) in &self.unknown_events {
            let missing = |phase: OnOpenPhase| {
                CollectError::Incomplete(format!(
                    "no unknown-input response for {}/{}",
                    level, phase
                ))
            };
            let pre = buckets
                .pre_on_open
                .clone()
                .ok_or_else(|| missing(OnOpenPhase::PreOnOpen))?;
            let post = buckets
                .post_on_open
                .clone()
                .ok_or_else(|| missing(OnOpenPhase::PostOnOpen))?;
            unknown_events.insert(
                level.clone(),
                PhaseBuckets {
                    pre_on_open: pre,
                    post_on_open: post,
                },
            );
        }

        let catalog = EventCatalog {
            events: self.events.clone(),
            unknown_events,
            initial_privilege_level: self.initial_privilege_level.clone(),
            privilege_level_prompts: self.privilege_level_prompts.clone(),
            on_open_inputs: self.on_open_inputs.clone(),
            on_close_inputs: self.on_close_inputs.clone(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn into_catalog(self) -> Result<EventCatalog, CollectError> {
        self.catalog()
    }

    /// Write the catalog to `path`.
    pub fn dump(&self, path: &Path) -> Result<(), CollectError> {
        let catalog = self.catalog()?;
        catalog.save(path)?;
        info!(path = %path.display(), "catalog written");
        Ok(())
    }
}

fn strip_leading_newline(output: &str) -> &str {
    output.strip_prefix('\n').unwrap_or(output)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
