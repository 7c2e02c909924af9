//! Record a session against a fake endpoint, then replay it offline.

use async_trait::async_trait;
use cr_common::SessionName;
use cr_config::{ReplayMode, ReplaySettings};
use cr_core::channel::{AsyncChannel, Channel, ChannelError};
use cr_core::replay::{
    ConnectionDescriptor, HarnessOptions, ReplayError, ReplayHarness, ReplayOperation, TokenMask,
};
use cr_core::transcript::Transcript;
use std::collections::VecDeque;
use std::path::Path;

/// Endpoint that answers every write with the next canned output.
struct FakeEndpoint {
    outputs: VecDeque<Vec<u8>>,
}

impl FakeEndpoint {
    fn new(outputs: &[&str]) -> Self {
        Self {
            outputs: outputs.iter().map(|o| o.as_bytes().to_vec()).collect(),
        }
    }
}

impl Channel for FakeEndpoint {
    fn write(&mut self, _input: &str, _redacted: bool) -> Result<(), ChannelError> {
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.outputs.pop_front().ok_or(ChannelError::Closed)
    }
}

#[async_trait]
impl AsyncChannel for FakeEndpoint {
    fn write(&mut self, input: &str, redacted: bool) -> Result<(), ChannelError> {
        Channel::write(self, input, redacted)
    }

    async fn read(&mut self) -> Result<Vec<u8>, ChannelError> {
        Channel::read(self)
    }
}

fn options(dir: &Path, mode: ReplayMode) -> HarnessOptions {
    let settings = ReplaySettings {
        mode,
        directory: dir.to_path_buf(),
        ..Default::default()
    };
    HarnessOptions::new(settings, SessionName::for_test("test_config_session", None))
        .with_token_mask(TokenMask::new(r"cfg_\d+").unwrap())
}

async fn no_connect() -> Result<FakeEndpoint, ChannelError> {
    panic!("replay must not connect")
}

fn descriptor() -> ConnectionDescriptor {
    ConnectionDescriptor::new("10.0.0.1", 22, "asyncssh")
        .with_username("admin")
        .with_password()
        .with_secondary()
}

async fn record(dir: &Path) {
    let mut harness = ReplayHarness::begin(options(dir, ReplayMode::Record)).unwrap();
    let (_, mut channel) = harness
        .open_channel_async(&descriptor(), || async {
            Ok(FakeEndpoint::new(&[
                "router#",
                "router(config-s-cfg_111)#",
                "router#",
            ]))
        })
        .await
        .unwrap();

    AsyncChannel::read(&mut channel).await.unwrap();
    AsyncChannel::write(&mut channel, "configure session cfg_111", false).unwrap();
    AsyncChannel::read(&mut channel).await.unwrap();
    AsyncChannel::write(&mut channel, "end", false).unwrap();
    AsyncChannel::read(&mut channel).await.unwrap();
    harness.finish().unwrap();
}

#[tokio::test]
async fn volatile_token_replays_with_new_value() {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path()).await;

    let yaml = std::fs::read_to_string(dir.path().join("test_config_session.yaml")).unwrap();
    assert!(yaml.contains("__VOLATILE_TOKEN__"));
    assert!(!yaml.contains("cfg_111"));

    let mut harness = ReplayHarness::begin(options(dir.path(), ReplayMode::Replay)).unwrap();
    assert_eq!(harness.mode(), ReplayMode::Replay);
    let (_, mut channel) = harness
        .open_channel_async(&descriptor(), no_connect)
        .await
        .unwrap();

    assert_eq!(AsyncChannel::read(&mut channel).await.unwrap(), b"router#");
    AsyncChannel::write(&mut channel, "configure session cfg_222", false).unwrap();
    assert_eq!(
        AsyncChannel::read(&mut channel).await.unwrap(),
        b"router(config-s-cfg_222)#"
    );
    AsyncChannel::write(&mut channel, "end", false).unwrap();
    assert_eq!(AsyncChannel::read(&mut channel).await.unwrap(), b"router#");

    let err = AsyncChannel::read(&mut channel).await.unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Replay(ReplayError::Exhausted {
            operation: ReplayOperation::Read
        })
    ));
    harness.finish().unwrap();
}

#[tokio::test]
async fn divergent_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path()).await;

    let mut harness = ReplayHarness::begin(options(dir.path(), ReplayMode::Replay)).unwrap();
    let (_, mut channel) = harness
        .open_channel_async(&descriptor(), no_connect)
        .await
        .unwrap();

    AsyncChannel::read(&mut channel).await.unwrap();
    let err = AsyncChannel::write(&mut channel, "show running-config", false).unwrap_err();
    match err {
        ChannelError::Replay(ReplayError::UnexpectedInput {
            position, actual, ..
        }) => {
            assert_eq!(position, 0);
            assert_eq!(actual, "show running-config");
        }
        other => panic!("unexpected error: {other}"),
    }
    harness.finish().unwrap();
}

#[test]
fn replay_leaves_transcript_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(record(dir.path()));

    let path = dir.path().join("test_config_session.yaml");
    let before = std::fs::read_to_string(&path).unwrap();
    {
        let mut harness = ReplayHarness::begin(options(dir.path(), ReplayMode::Replay)).unwrap();
        let (_, mut channel) = harness
            .open_channel::<FakeEndpoint, _>(&descriptor(), || panic!("replay must not connect"))
            .unwrap();
        Channel::read(&mut channel).unwrap();
    }
    let after = std::fs::read_to_string(&path).unwrap();
    assert_eq!(before, after);

    let transcript = Transcript::load(&path).unwrap();
    assert_eq!(transcript.len(), 1);
    assert!(transcript.is_replayable());
}
