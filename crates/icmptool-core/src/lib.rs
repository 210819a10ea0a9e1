//! icmptool - `ICMP` ping and traceroute.
//!
//! This crate drives `ICMPv4` echo probing over raw or datagram sockets. A
//! [`Pinger`] sends a fixed number of echo requests to a destination and
//! aggregates the replies into a [`PingResult`]. A [`Tracer`] sends echo
//! requests with an increasing time-to-live and builds the ordered list of
//! [`Hop`]s of a [`TracerouteResult`].
//!
//! Both operate synchronously with exactly one probe in flight. Lost probes
//! never fail a run; only the failure to open any socket does.
//!
//! # Example
//!
//! The following example pings a host with default configuration and prints
//! each reply as it arrives:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use icmptool_core::PingBuilder;
//! use std::net::Ipv4Addr;
//!
//! let result = PingBuilder::new(Ipv4Addr::new(1, 1, 1, 1))
//!     .build()?
//!     .run_with(|probe| println!("{probe:?}"))?;
//! println!("{} sent, {} received", result.sent(), result.received());
//! # Ok(())
//! # }
//! ```
//!
//! The following example traces the path to a host in unprivileged mode,
//! where only the final hop can be observed:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use icmptool_core::{PrivilegeMode, TraceBuilder};
//! use std::net::Ipv4Addr;
//!
//! TraceBuilder::new(Ipv4Addr::new(1, 1, 1, 1))
//!     .privilege_mode(PrivilegeMode::Unprivileged)
//!     .build()?
//!     .run_with(|hop| println!("{} {:?}", hop.ttl(), hop.addr()))?;
//! # Ok(())
//! # }
//! ```
//!
//! # See Also
//!
//! - [`PingBuilder`] - Build a [`Pinger`].
//! - [`TraceBuilder`] - Build a [`Tracer`].
//! - [`ping`] and [`traceroute`] - One call convenience functions.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc
)]
#![deny(unsafe_code)]

mod builder;
mod config;
mod diagnostics;
mod error;
mod interrupt;
mod matching;
mod net;
mod ping;
mod probe;
mod trace;
mod types;

pub use builder::{PingBuilder, TraceBuilder};
pub use config::{defaults, IdentifierSource, PrivilegeMode, ReplyMatching, SocketKind};
pub use diagnostics::{Diagnostics, DiagnosticsHandle, NoopDiagnostics, TracingDiagnostics};
pub use error::{Error, ErrorKind, IoError, IoOperation, Result};
pub use interrupt::Interrupt;
pub use matching::Outstanding;
pub use net::transport::Transport;
pub use net::{Network, Received};
pub use ping::{PingResult, Pinger};
pub use probe::{Probe, ProbeStatus};
pub use trace::{Hop, Tracer, TracerouteResult};
pub use types::{Sequence, TimeToLive, TraceId};

use std::net::Ipv4Addr;
use std::time::Duration;

/// Ping `destination` with `count` echo requests using default settings
/// otherwise.
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use std::net::Ipv4Addr;
/// use std::time::Duration;
///
/// let result = icmptool_core::ping(
///     Ipv4Addr::LOCALHOST,
///     4,
///     Duration::from_secs(1),
///     Duration::from_secs(1),
///     64,
/// )?;
/// assert_eq!(4, result.sent());
/// # Ok(())
/// # }
/// ```
pub fn ping(
    destination: Ipv4Addr,
    count: usize,
    interval: Duration,
    timeout: Duration,
    ttl: u8,
) -> Result<PingResult> {
    PingBuilder::new(destination)
        .count(count)
        .interval(interval)
        .timeout(timeout)
        .ttl(ttl)
        .build()?
        .run()
}

/// Trace the path to `destination` from `hop_start` to `max_hops` using
/// default settings otherwise.
pub fn traceroute(
    destination: Ipv4Addr,
    attempts: usize,
    interval: Duration,
    timeout: Duration,
    hop_start: u8,
    max_hops: u8,
) -> Result<TracerouteResult> {
    TraceBuilder::new(destination)
        .attempts(attempts)
        .interval(interval)
        .timeout(timeout)
        .first_ttl(hop_start)
        .max_ttl(max_hops)
        .build()?
        .run()
}
