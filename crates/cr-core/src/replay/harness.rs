//! Session harness.
//!
//! Scopes one test's record/replay session: resolves the effective mode from
//! the settings and what is on disk, hands out recording or replaying
//! channels per logical connection, and persists the transcript when the
//! session ends. Dropping the harness without calling
//! [`ReplayHarness::finish`] still saves, so a panicking test keeps its
//! recording.

use super::recorder::{lock, CaptureLog, Recorder, SharedCaptureLog};
use super::replayer::Replayer;
use super::token::TokenMask;
use super::ReplayError;
use crate::channel::{AsyncChannel, Channel, ChannelError};
use crate::transcript::{ConnectionProfile, Transcript};
use async_trait::async_trait;
use cr_common::{InstanceId, SessionName};
use cr_config::{ReplayMode, ReplaySettings};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options for one harness scope.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub settings: ReplaySettings,
    pub session_name: SessionName,
    /// Pattern of volatile tokens to mask in stored transcripts.
    pub token_mask: Option<TokenMask>,
    /// Strip ANSI escapes from what the client reads.
    pub strip_ansi: bool,
}

impl HarnessOptions {
    pub fn new(settings: ReplaySettings, session_name: SessionName) -> Self {
        Self {
            settings,
            session_name,
            token_mask: None,
            strip_ansi: false,
        }
    }

    pub fn with_token_mask(mut self, mask: TokenMask) -> Self {
        self.token_mask = Some(mask);
        self
    }

    pub fn with_ansi_stripping(mut self, enabled: bool) -> Self {
        self.strip_ansi = enabled;
        self
    }
}

/// What the client is about to connect to. Secrets are only described by
/// whether they are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub transport: String,
    /// Client-side logging uid; distinguishes otherwise identical connections.
    pub uid: String,
    pub auth_username: String,
    pub auth_password: bool,
    pub auth_private_key: bool,
    pub auth_private_key_passphrase: bool,
    pub auth_bypass: bool,
    pub auth_secondary: bool,
}

impl ConnectionDescriptor {
    pub fn new(host: impl Into<String>, port: u16, transport: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            transport: transport.into(),
            uid: String::new(),
            auth_username: String::new(),
            auth_password: false,
            auth_private_key: false,
            auth_private_key_passphrase: false,
            auth_bypass: false,
            auth_secondary: false,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.auth_username = username.into();
        self
    }

    pub fn with_password(mut self) -> Self {
        self.auth_password = true;
        self
    }

    pub fn with_private_key(mut self, passphrase: bool) -> Self {
        self.auth_private_key = true;
        self.auth_private_key_passphrase = passphrase;
        self
    }

    pub fn with_secondary(mut self) -> Self {
        self.auth_secondary = true;
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn profile(&self) -> ConnectionProfile {
        ConnectionProfile {
            host: self.host.clone(),
            port: self.port,
            auth_username: self.auth_username.clone(),
            auth_password: self.auth_password,
            auth_private_key: self.auth_private_key,
            auth_private_key_passphrase: self.auth_private_key_passphrase,
            auth_bypass: self.auth_bypass,
            transport: self.transport.clone(),
            auth_secondary: self.auth_secondary,
        }
    }
}

/// Channel handed to the client for one connection.
pub enum SessionChannel<C> {
    /// Live channel observed by a recorder.
    Recording(Recorder<C>),
    /// Transcript stand-in; no network contact.
    Replaying(Replayer),
    /// Record/replay disabled.
    Passthrough(C),
}

impl<C> SessionChannel<C> {
    pub fn is_replaying(&self) -> bool {
        matches!(self, SessionChannel::Replaying(_))
    }

    pub fn as_replayer(&self) -> Option<&Replayer> {
        match self {
            SessionChannel::Replaying(r) => Some(r),
            _ => None,
        }
    }
}

impl<C: Channel> Channel for SessionChannel<C> {
    fn write(&mut self, input: &str, redacted: bool) -> Result<(), ChannelError> {
        match self {
            SessionChannel::Recording(c) => Channel::write(c, input, redacted),
            SessionChannel::Replaying(c) => Channel::write(c, input, redacted),
            SessionChannel::Passthrough(c) => c.write(input, redacted),
        }
    }

    fn read(&mut self) -> Result<Vec<u8>, ChannelError> {
        match self {
            SessionChannel::Recording(c) => Channel::read(c),
            SessionChannel::Replaying(c) => Channel::read(c),
            SessionChannel::Passthrough(c) => c.read(),
        }
    }
}

#[async_trait]
impl<C: AsyncChannel> AsyncChannel for SessionChannel<C> {
    fn write(&mut self, input: &str, redacted: bool) -> Result<(), ChannelError> {
        match self {
            SessionChannel::Recording(c) => AsyncChannel::write(c, input, redacted),
            SessionChannel::Replaying(c) => AsyncChannel::write(c, input, redacted),
            SessionChannel::Passthrough(c) => c.write(input, redacted),
        }
    }

    async fn read(&mut self) -> Result<Vec<u8>, ChannelError> {
        match self {
            SessionChannel::Recording(c) => AsyncChannel::read(c).await,
            SessionChannel::Replaying(c) => AsyncChannel::read(c).await,
            SessionChannel::Passthrough(c) => c.read().await,
        }
    }
}

struct Recording {
    profile: ConnectionProfile,
    log: SharedCaptureLog,
}

/// One test's record/replay scope.
pub struct ReplayHarness {
    mode: ReplayMode,
    disabled: bool,
    block_network: bool,
    path: PathBuf,
    recorded: Transcript,
    opened: Vec<InstanceId>,
    recordings: BTreeMap<InstanceId, Recording>,
    token_mask: Option<TokenMask>,
    strip_ansi: bool,
    finished: bool,
}

impl ReplayHarness {
    /// Resolve the mode and load the recorded transcript if one is used.
    pub fn begin(options: HarnessOptions) -> Result<Self, ReplayError> {
        let settings = &options.settings;
        let path = session_path(&settings.directory, &options.session_name);
        let requested = settings.effective_mode(&options.session_name.0);

        let (mode, recorded) = resolve_mode(requested, &path)?;
        info!(
            session = %options.session_name,
            path = %path.display(),
            mode = %mode,
            disabled = settings.disabled,
            "replay session started"
        );

        Ok(Self {
            mode,
            disabled: settings.disabled,
            block_network: settings.block_network,
            path,
            recorded,
            opened: Vec::new(),
            recordings: BTreeMap::new(),
            token_mask: options.token_mask,
            strip_ansi: options.strip_ansi,
            finished: false,
        })
    }

    pub fn mode(&self) -> ReplayMode {
        self.mode
    }

    pub fn session_path(&self) -> &Path {
        &self.path
    }

    fn is_recording(&self) -> bool {
        !self.disabled && self.mode.is_recording()
    }

    /// Open a channel for a new logical connection. `connect` is only called
    /// when traffic has to go to a real endpoint.
    pub fn open_channel<C, F>(
        &mut self,
        descriptor: &ConnectionDescriptor,
        connect: F,
    ) -> Result<(InstanceId, SessionChannel<C>), ChannelError>
    where
        F: FnOnce() -> Result<C, ChannelError>,
    {
        let instance = self.next_instance(descriptor);
        if let Some(replayer) = self.prepare_replay(&instance, descriptor)? {
            return Ok((instance, SessionChannel::Replaying(replayer)));
        }
        let live = connect()?;
        Ok((instance.clone(), self.wrap_live(instance, descriptor, live)))
    }

    /// Async flavour of [`ReplayHarness::open_channel`].
    pub async fn open_channel_async<C, F, Fut>(
        &mut self,
        descriptor: &ConnectionDescriptor,
        connect: F,
    ) -> Result<(InstanceId, SessionChannel<C>), ChannelError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C, ChannelError>>,
    {
        let instance = self.next_instance(descriptor);
        if let Some(replayer) = self.prepare_replay(&instance, descriptor)? {
            return Ok((instance, SessionChannel::Replaying(replayer)));
        }
        let live = connect().await?;
        Ok((instance.clone(), self.wrap_live(instance, descriptor, live)))
    }

    fn next_instance(&mut self, descriptor: &ConnectionDescriptor) -> InstanceId {
        let instance = InstanceId::next(
            &descriptor.host,
            descriptor.port,
            &descriptor.transport,
            &descriptor.uid,
            &self.opened,
        );
        self.opened.push(instance.clone());
        instance
    }

    fn prepare_replay(
        &self,
        instance: &InstanceId,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Option<Replayer>, ReplayError> {
        if self.disabled {
            return Ok(None);
        }
        if self.mode.is_recording() {
            if self.block_network {
                return Err(ReplayError::NetworkBlocked {
                    instance: instance.to_string(),
                });
            }
            return Ok(None);
        }

        let session = self
            .recorded
            .get(instance)
            .ok_or_else(|| ReplayError::MissingInstance {
                instance: instance.to_string(),
            })?;
        let replayer = Replayer::new(session, &descriptor.profile())?
            .with_token_mask(self.token_mask.clone())
            .with_ansi_stripping(self.strip_ansi);
        debug!(%instance, interactions = session.interactions.len(), "replaying instance");
        Ok(Some(replayer))
    }

    fn wrap_live<C>(
        &mut self,
        instance: InstanceId,
        descriptor: &ConnectionDescriptor,
        live: C,
    ) -> SessionChannel<C> {
        if !self.is_recording() {
            return SessionChannel::Passthrough(live);
        }
        let log = CaptureLog::new(self.token_mask.clone()).shared();
        debug!(%instance, "recording instance");
        self.recordings.insert(
            instance,
            Recording {
                profile: descriptor.profile(),
                log: Arc::clone(&log),
            },
        );
        SessionChannel::Recording(Recorder::new(live, log).with_ansi_stripping(self.strip_ansi))
    }

    /// Called once the client finished authenticating on `instance`. Telnet
    /// logins are trimmed so replay starts at the username exchange.
    pub fn mark_authenticated(&mut self, instance: &InstanceId) -> Result<(), ReplayError> {
        if !self.is_recording() {
            return Ok(());
        }
        let recording =
            self.recordings
                .get(instance)
                .ok_or_else(|| ReplayError::UnknownInstance {
                    instance: instance.to_string(),
                })?;
        if recording.profile.is_telnet() && !recording.profile.auth_bypass {
            lock(&recording.log).trim_telnet_login(&recording.profile.auth_username);
        }
        Ok(())
    }

    /// Current transcript as it would be saved.
    pub fn snapshot(&self) -> Transcript {
        let mut transcript = Transcript::new();
        for (instance, recording) in &self.recordings {
            let session = lock(&recording.log).serialize(recording.profile.clone());
            transcript.insert(instance.clone(), session);
        }
        transcript
    }

    /// End the session: save on record/overwrite, nothing on replay.
    pub fn finish(mut self) -> Result<(), ReplayError> {
        self.finished = true;
        self.save()
    }

    fn save(&self) -> Result<(), ReplayError> {
        if !self.is_recording() {
            return Ok(());
        }
        let transcript = self.snapshot();
        transcript.save(&self.path)?;
        info!(
            path = %self.path.display(),
            instances = transcript.len(),
            "transcript saved"
        );
        Ok(())
    }
}

impl Drop for ReplayHarness {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.save() {
            warn!(path = %self.path.display(), error = %e, "failed to save transcript");
        }
    }
}

/// Transcript path; falls back to the working directory when the configured
/// directory does not exist.
fn session_path(directory: &Path, name: &SessionName) -> PathBuf {
    if directory.is_dir() {
        directory.join(name.file_name())
    } else {
        debug!(
            directory = %directory.display(),
            "session directory missing, using working directory"
        );
        PathBuf::from(name.file_name())
    }
}

fn resolve_mode(requested: ReplayMode, path: &Path) -> Result<(ReplayMode, Transcript), ReplayError> {
    if requested == ReplayMode::Overwrite {
        return Ok((ReplayMode::Overwrite, Transcript::new()));
    }
    if !path.is_file() {
        if requested == ReplayMode::Replay {
            info!(path = %path.display(), "no recorded session, recording");
        }
        return Ok((ReplayMode::Record, Transcript::new()));
    }
    if requested == ReplayMode::Record {
        info!(path = %path.display(), "session exists, replaying instead of recording");
    }

    let recorded = Transcript::load(path)?;
    if !recorded.is_replayable() {
        warn!(path = %path.display(), "recorded session has empty instances, recording");
        return Ok((ReplayMode::Record, Transcript::new()));
    }
    Ok((ReplayMode::Replay, recorded))
}
