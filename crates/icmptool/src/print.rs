use icmptool_core::{Hop, PingResult, Probe, ProbeStatus};
use itertools::Itertools;
use std::fmt::Write;
use std::net::Ipv4Addr;
use std::time::Duration;

pub fn ping_header(destination: Ipv4Addr, payload_size: usize) -> String {
    format!("PING {destination} {payload_size} bytes of data")
}

/// Format a single ping probe, `None` if there is nothing worth printing.
pub fn ping_probe(probe: &Probe, payload_size: usize) -> Option<String> {
    let addr = probe
        .addr
        .map_or_else(|| String::from("()"), |addr| addr.to_string());
    match probe.status {
        ProbeStatus::Replied => Some(format!(
            "{payload_size} bytes from {addr}: icmp_seq={} time={} ms",
            probe.sequence,
            millis(probe.rtt.unwrap_or_default())
        )),
        ProbeStatus::ErrorReceived => Some(format!(
            "From {addr} icmp_seq={} {}",
            probe.sequence,
            probe.cause.unwrap_or_default()
        )),
        ProbeStatus::Sent
        | ProbeStatus::Unexpected
        | ProbeStatus::NoReply
        | ProbeStatus::Failed => None,
    }
}

pub fn ping_summary(result: &PingResult) -> String {
    let mut out = format!(
        "--- {} ping statistics ---\n{} packets transmitted, {} received, {:.0}% packet loss",
        result.destination(),
        result.sent(),
        result.received(),
        result.packet_loss()
    );
    if let (Some(min), Some(avg), Some(max)) =
        (result.min_rtt(), result.avg_rtt(), result.max_rtt())
    {
        let _ = write!(
            out,
            "\nrtt min/avg/max = {}/{}/{} ms",
            millis(min),
            millis(avg),
            millis(max)
        );
    }
    out
}

/// Format a hop as the ttl followed by each responder and its round trip
/// times, with a `*` per probe without a response.
pub fn hop(hop: &Hop) -> String {
    let responders = hop
        .address_rtts()
        .into_iter()
        .map(|(addr, rtts)| {
            format!(
                "{addr}  {}",
                rtts.into_iter().map(|rtt| format!("{} ms", millis(rtt))).join("  ")
            )
        })
        .chain(
            hop.probes()
                .iter()
                .filter(|probe| probe.rtt.is_none())
                .map(|_| String::from("*")),
        )
        .join("  ");
    format!("{:2}  {responders}", hop.ttl().0)
}

fn millis(duration: Duration) -> String {
    format!("{:.2}", duration.as_secs_f64() * 1000_f64)
}
