#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::cast_possible_truncation
)]
#![forbid(unsafe_code)]

use crate::config::{Args, Command, Common, LogFormat};
use anyhow::Context;
use clap::Parser;
use icmptool_core::{defaults, Interrupt, PingBuilder, TraceBuilder, TracingDiagnostics};
use std::net::Ipv4Addr;
use std::time::Duration;

mod config;
mod print;

/// The default debug log filter.
const DEFAULT_LOG_FILTER: &str = "icmptool=debug,icmptool_core=debug";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    configure_logging(&args);
    let common = Common::from(&args);
    let interrupt = Interrupt::new();
    let handler = interrupt.clone();
    ctrlc::set_handler(move || handler.trigger()).context("failed to set Ctrl-C handler")?;
    match args.command {
        Command::Ping {
            destination,
            count,
            interval,
            ttl,
        } => run_ping(
            destination,
            count.unwrap_or(defaults::DEFAULT_PING_COUNT),
            interval.unwrap_or(defaults::DEFAULT_PING_INTERVAL),
            ttl.unwrap_or(defaults::DEFAULT_PING_TTL),
            &common,
            interrupt,
        ),
        Command::Trace {
            destination,
            attempts,
            interval,
            first_ttl,
            max_ttl,
        } => run_trace(
            destination,
            attempts.unwrap_or(defaults::DEFAULT_TRACE_ATTEMPTS),
            interval.unwrap_or(defaults::DEFAULT_TRACE_INTERVAL),
            first_ttl.unwrap_or(defaults::DEFAULT_TRACE_FIRST_TTL),
            max_ttl.unwrap_or(defaults::DEFAULT_TRACE_MAX_TTL),
            &common,
            interrupt,
        ),
    }
}

fn run_ping(
    destination: Ipv4Addr,
    count: usize,
    interval: Duration,
    ttl: u8,
    common: &Common,
    interrupt: Interrupt,
) -> anyhow::Result<()> {
    let pinger = PingBuilder::new(destination)
        .count(count)
        .interval(interval)
        .timeout(common.timeout)
        .ttl(ttl)
        .payload_size(common.payload_size)
        .privilege_mode(common.privilege_mode)
        .reply_matching(common.reply_matching)
        .diagnostics(TracingDiagnostics)
        .interrupt(interrupt)
        .build()?;
    println!("{}", print::ping_header(destination, pinger.payload_size()));
    let result = pinger.run_with(|probe| {
        if let Some(line) = print::ping_probe(probe, pinger.payload_size()) {
            println!("{line}");
        }
    })?;
    println!();
    println!("{}", print::ping_summary(&result));
    Ok(())
}

fn run_trace(
    destination: Ipv4Addr,
    attempts: usize,
    interval: Duration,
    first_ttl: u8,
    max_ttl: u8,
    common: &Common,
    interrupt: Interrupt,
) -> anyhow::Result<()> {
    let tracer = TraceBuilder::new(destination)
        .attempts(attempts)
        .interval(interval)
        .timeout(common.timeout)
        .first_ttl(first_ttl)
        .max_ttl(max_ttl)
        .payload_size(common.payload_size)
        .privilege_mode(common.privilege_mode)
        .reply_matching(common.reply_matching)
        .diagnostics(TracingDiagnostics)
        .interrupt(interrupt)
        .build()?;
    println!(
        "traceroute to {destination}, {} hops max, {} byte packets",
        tracer.max_ttl(),
        tracer.payload_size()
    );
    let result = tracer.run_with(|hop| println!("{}", print::hop(hop)))?;
    if !result.reached() && !result.interrupted() {
        tracing::info!(%destination, "destination not reached");
    }
    Ok(())
}

fn configure_logging(args: &Args) {
    if args.verbose {
        let filter = args.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER);
        match args.log_format.unwrap_or(LogFormat::Pretty) {
            LogFormat::Compact => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .compact()
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .pretty()
                    .init();
            }
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .json()
                    .init();
            }
        }
    }
}
