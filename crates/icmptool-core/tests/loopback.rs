#![cfg(all(feature = "loopback-tests", target_os = "linux"))]

use icmptool_core::{
    Error, PingBuilder, ReplyMatching, SocketKind, TraceBuilder, TracingDiagnostics,
};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

static LOGGING: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter("loopback=debug,icmptool_core=debug")
            .init();
    });
}

#[test]
fn test_ping_loopback() -> anyhow::Result<()> {
    init_logging();
    let pinger = PingBuilder::new(Ipv4Addr::LOCALHOST)
        .count(3)
        .interval(Duration::from_millis(10))
        .reply_matching(ReplyMatching::Strict)
        .diagnostics(TracingDiagnostics)
        .build()?;
    let result = match pinger.run() {
        Err(Error::SocketUnavailable { raw, dgram }) => {
            warn!("skipping test: no ICMP socket available ({raw}, {dgram})");
            return Ok(());
        }
        result => result?,
    };
    assert_eq!(3, result.sent());
    assert_eq!(3, result.received());
    assert_eq!(0, result.lost());
    assert_eq!(3, result.rtts().len());
    assert!(!result.interrupted());
    Ok(())
}

#[test]
fn test_trace_loopback() -> anyhow::Result<()> {
    init_logging();
    let tracer = TraceBuilder::new(Ipv4Addr::LOCALHOST)
        .max_ttl(5)
        .interval(Duration::from_millis(10))
        .reply_matching(ReplyMatching::Strict)
        .diagnostics(TracingDiagnostics)
        .build()?;
    let result = match tracer.run() {
        Err(Error::SocketUnavailable { raw, dgram }) => {
            warn!("skipping test: no ICMP socket available ({raw}, {dgram})");
            return Ok(());
        }
        result => result?,
    };
    assert!(result.reached());
    assert_eq!(1, result.hops().len());
    assert_eq!(
        Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        result.hops()[0].addr()
    );
    assert!(matches!(
        result.socket_kind(),
        Some(SocketKind::Raw | SocketKind::Dgram)
    ));
    Ok(())
}

#[test]
fn test_ping_loopback_default_matching() -> anyhow::Result<()> {
    init_logging();
    let result = match icmptool_core::ping(
        Ipv4Addr::LOCALHOST,
        4,
        Duration::from_millis(10),
        Duration::from_secs(1),
        64,
    ) {
        Err(Error::SocketUnavailable { raw, dgram }) => {
            warn!("skipping test: no ICMP socket available ({raw}, {dgram})");
            return Ok(());
        }
        result => result?,
    };
    assert_eq!(4, result.sent());
    assert_eq!(4, result.received());
    assert_eq!(0, result.lost());
    assert_eq!(4, result.rtts().len());
    Ok(())
}

#[test]
fn test_trace_loopback_default_matching() -> anyhow::Result<()> {
    init_logging();
    let result = match icmptool_core::traceroute(
        Ipv4Addr::LOCALHOST,
        3,
        Duration::from_millis(10),
        Duration::from_secs(1),
        1,
        5,
    ) {
        Err(Error::SocketUnavailable { raw, dgram }) => {
            warn!("skipping test: no ICMP socket available ({raw}, {dgram})");
            return Ok(());
        }
        result => result?,
    };
    assert!(result.reached());
    assert_eq!(1, result.hops().len());
    assert_eq!(
        Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        result.hops()[0].addr()
    );
    Ok(())
}
