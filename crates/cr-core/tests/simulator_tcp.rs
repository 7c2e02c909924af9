//! Simulation server over a real TCP socket.

mod common;

use cr_config::ServerConfig;
use cr_core::server::SimulationServer;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

async fn expect(client: &mut TcpStream, needle: &str) -> String {
    let mut seen = String::new();
    let mut chunk = [0u8; 1024];
    tokio::time::timeout(Duration::from_secs(5), async {
        while !seen.contains(needle) {
            let n = client.read(&mut chunk).await.unwrap();
            assert!(n > 0, "stream closed before {needle:?}; got {seen:?}");
            seen.push_str(&String::from_utf8_lossy(&chunk[..n]));
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}; got {seen:?}"));
    seen
}

async fn login(client: &mut TcpStream) {
    expect(client, "Username: ").await;
    client.write_all(b"chanreplay\r\n").await.unwrap();
    expect(client, "Password: ").await;
    client.write_all(b"chanreplay\r\n").await.unwrap();
    expect(client, "router>").await;
}

fn config(dir: &std::path::Path, max_connections: usize) -> ServerConfig {
    ServerConfig {
        listen_address: "127.0.0.1".into(),
        port: 0,
        catalog_path: common::write_catalog(dir),
        max_connections,
        ..Default::default()
    }
}

#[tokio::test]
async fn serves_catalog_phases_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = SimulationServer::from_config(&config(dir.path(), 0), shutdown_rx)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let stats = server.stats();
    let handle = tokio::spawn(server.run());

    let mut client = TcpStream::connect(addr).await.unwrap();
    login(&mut client).await;

    client.write_all(b"show version\n").await.unwrap();
    expect(&mut client, "Version 1.0\nrouter>").await;

    client.write_all(b"terminal length 0\n").await.unwrap();
    expect(&mut client, "terminal length 0\nrouter>").await;

    client.write_all(b"show version\n").await.unwrap();
    expect(&mut client, "Version 1.0 (no paging)\nrouter>").await;

    client.write_all(b"show bogus\n").await.unwrap();
    expect(&mut client, "% Unknown command (post)\nrouter>").await;

    client.write_all(b"enable\n").await.unwrap();
    expect(&mut client, "Password: ").await;
    client.write_all(b"chanreplay\n").await.unwrap();
    let out = expect(&mut client, "router#").await;
    assert!(!out.contains("chanreplay"));

    drop(client);
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn concurrent_sessions_keep_separate_state() {
    let dir = tempfile::tempdir().unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = SimulationServer::from_config(&config(dir.path(), 0), shutdown_rx)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let stats = server.stats();
    let handle = tokio::spawn(server.run());

    let mut first = TcpStream::connect(addr).await.unwrap();
    let mut second = TcpStream::connect(addr).await.unwrap();
    login(&mut first).await;
    login(&mut second).await;

    first.write_all(b"terminal length 0\n").await.unwrap();
    expect(&mut first, "terminal length 0\nrouter>").await;
    first.write_all(b"enable\n").await.unwrap();
    expect(&mut first, "Password: ").await;

    second.write_all(b"show version\n").await.unwrap();
    let out = expect(&mut second, "\nrouter>").await;
    assert!(out.contains("Version 1.0\nrouter>"), "second session saw {out:?}");

    first.write_all(b"chanreplay\n").await.unwrap();
    expect(&mut first, "router#").await;

    second.write_all(b"show bogus\n").await.unwrap();
    expect(&mut second, "% Unknown command (pre)\nrouter>").await;

    drop(first);
    drop(second);
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn closing_input_ends_the_connection() {
    let dir = tempfile::tempdir().unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = SimulationServer::from_config(&config(dir.path(), 0), shutdown_rx)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let handle = tokio::spawn(server.run());

    let mut client = TcpStream::connect(addr).await.unwrap();
    login(&mut client).await;
    client.write_all(b"exit\n").await.unwrap();

    let mut rest = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap();
    assert!(String::from_utf8_lossy(&rest).starts_with("exit\n"));

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn connections_over_the_limit_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = SimulationServer::from_config(&config(dir.path(), 1), shutdown_rx)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let stats = server.stats();
    let handle = tokio::spawn(server.run());

    let mut first = TcpStream::connect(addr).await.unwrap();
    expect(&mut first, "Username: ").await;

    let mut second = TcpStream::connect(addr).await.unwrap();
    let mut buf = [0u8; 64];
    let n = tokio::time::timeout(Duration::from_secs(5), second.read(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);
    assert_eq!(stats.connections_rejected.load(Ordering::Relaxed), 1);

    drop(first);
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn missing_catalog_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), 0);
    config.catalog_path = dir.path().join("absent.yaml");
    let (_tx, rx) = broadcast::channel(1);
    assert!(SimulationServer::from_config(&config, rx).await.is_err());
}
