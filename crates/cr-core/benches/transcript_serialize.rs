//! Criterion benchmarks for capture serialization and replay in `cr-core`.
//!
//! Benchmarks slicing a capture log into interactions and draining a
//! replayer built from the result, for sessions of varying length.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cr_core::replay::{CaptureLog, Replayer};
use cr_core::transcript::ConnectionProfile;

fn profile() -> ConnectionProfile {
    ConnectionProfile {
        host: "10.0.0.1".to_string(),
        port: 22,
        auth_username: "admin".to_string(),
        auth_password: true,
        auth_private_key: false,
        auth_private_key_passphrase: false,
        auth_bypass: false,
        transport: "system".to_string(),
        auth_secondary: false,
    }
}

fn captured_session(commands: usize) -> CaptureLog {
    let mut log = CaptureLog::new(None);
    log.record_read(b"router#");
    for i in 0..commands {
        log.record_write(&format!("show interface Ethernet1/{}", i), false);
        let output = format!(
            "Ethernet1/{} is up, line protocol is up\r\n  MTU 1500 bytes\r\nrouter#",
            i
        );
        log.record_read(output.as_bytes());
    }
    log
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture_log/serialize");
    for commands in [10usize, 100, 1000] {
        let log = captured_session(commands);
        group.bench_with_input(BenchmarkId::from_parameter(commands), &log, |b, log| {
            b.iter(|| {
                let session = log.serialize(black_box(profile()));
                black_box(session.interactions.len());
            })
        });
    }
    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replayer/drain");
    for commands in [10usize, 100, 1000] {
        let session = captured_session(commands).serialize(profile());
        let inputs: Vec<String> = (0..commands)
            .map(|i| format!("show interface Ethernet1/{}", i))
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(commands),
            &session,
            |b, session| {
                b.iter(|| {
                    let observed = profile();
                    let mut replayer = match Replayer::new(session, &observed) {
                        Ok(r) => r,
                        Err(e) => panic!("profile mismatch: {e}"),
                    };
                    for input in &inputs {
                        black_box(replayer.replay_read().ok());
                        black_box(replayer.replay_write(input, false).ok());
                    }
                    black_box(replayer.replay_read().ok());
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_serialize, bench_replay);
criterion_main!(benches);
