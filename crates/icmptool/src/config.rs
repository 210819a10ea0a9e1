use clap::{Parser, Subcommand, ValueEnum};
use icmptool_core::{defaults, PrivilegeMode, ReplyMatching};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Probe hosts with ICMP echo requests
#[derive(Parser, Debug)]
#[command(name = "icmptool", author, version, about, long_about = None, arg_required_else_help(true))]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Use a datagram socket only, without requiring elevated privileges [default: false]
    #[arg(short = 'u', long, global = true)]
    pub unprivileged: bool,

    /// Only accept replies which refer to the outstanding probe [default: false]
    #[arg(long, global = true)]
    pub strict: bool,

    /// How long to wait for each reply [default: 1s]
    #[arg(short = 'W', long, global = true, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// The echo payload size in bytes [default: 56]
    #[arg(short = 's', long, global = true)]
    pub payload_size: Option<usize>,

    /// The debug log format [default: pretty]
    #[arg(value_enum, long, global = true)]
    pub log_format: Option<LogFormat>,

    /// The debug log filter [default: icmptool=debug]
    #[arg(long, global = true)]
    pub log_filter: Option<String>,

    /// Enable verbose debug logging
    #[arg(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send ICMP echo requests to a host
    Ping {
        /// The IPv4 address to ping
        destination: Ipv4Addr,

        /// The number of echo requests to send [default: 4]
        #[arg(short = 'c', long)]
        count: Option<usize>,

        /// The pause between echo requests [default: 1s]
        #[arg(short = 'i', long, value_parser = parse_duration)]
        interval: Option<Duration>,

        /// The time-to-live of echo requests [default: 64]
        #[arg(short = 't', long)]
        ttl: Option<u8>,
    },
    /// Trace the route to a host
    Trace {
        /// The IPv4 address to trace
        destination: Ipv4Addr,

        /// The number of probes per hop [default: 3]
        #[arg(short = 'q', long)]
        attempts: Option<usize>,

        /// The pause after each probe [default: 500ms]
        #[arg(short = 'i', long, value_parser = parse_duration)]
        interval: Option<Duration>,

        /// The time-to-live of the first hop [default: 1]
        #[arg(short = 'f', long)]
        first_ttl: Option<u8>,

        /// The time-to-live of the last hop [default: 30]
        #[arg(short = 'm', long)]
        max_ttl: Option<u8>,
    },
}

/// How to format log data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Display log data in a compact format.
    Compact,
    /// Display log data in a pretty format.
    Pretty,
    /// Display log data in a json format.
    Json,
}

/// Settings shared by both commands.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Common {
    pub privilege_mode: PrivilegeMode,
    pub reply_matching: ReplyMatching,
    pub timeout: Duration,
    pub payload_size: usize,
}

impl From<&Args> for Common {
    fn from(args: &Args) -> Self {
        Self {
            privilege_mode: if args.unprivileged {
                PrivilegeMode::Unprivileged
            } else {
                defaults::DEFAULT_PRIVILEGE_MODE
            },
            reply_matching: if args.strict {
                ReplyMatching::Strict
            } else {
                defaults::DEFAULT_REPLY_MATCHING
            },
            timeout: args.timeout.unwrap_or(defaults::DEFAULT_TIMEOUT),
            payload_size: args.payload_size.unwrap_or(defaults::DEFAULT_PAYLOAD_SIZE),
        }
    }
}

fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    Ok(humantime::parse_duration(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: &str) -> Args {
        Args::try_parse_from(cmd.split_whitespace()).unwrap()
    }

    #[test]
    fn test_ping_defaults() {
        let args = parse("icmptool ping 1.2.3.4");
        let Command::Ping {
            destination,
            count,
            interval,
            ttl,
        } = args.command
        else {
            panic!("expected ping");
        };
        assert_eq!(Ipv4Addr::new(1, 2, 3, 4), destination);
        assert_eq!(None, count);
        assert_eq!(None, interval);
        assert_eq!(None, ttl);
        let common = Common::from(&parse("icmptool ping 1.2.3.4"));
        assert_eq!(PrivilegeMode::Privileged, common.privilege_mode);
        assert_eq!(ReplyMatching::Temporal, common.reply_matching);
        assert_eq!(Duration::from_secs(1), common.timeout);
        assert_eq!(56, common.payload_size);
    }

    #[test]
    fn test_ping_options() {
        let args = parse("icmptool ping -c 10 -i 200ms -t 12 -u --strict -W 2s 1.2.3.4");
        let common = Common::from(&args);
        assert_eq!(PrivilegeMode::Unprivileged, common.privilege_mode);
        assert_eq!(ReplyMatching::Strict, common.reply_matching);
        assert_eq!(Duration::from_secs(2), common.timeout);
        let Command::Ping {
            count,
            interval,
            ttl,
            ..
        } = args.command
        else {
            panic!("expected ping");
        };
        assert_eq!(Some(10), count);
        assert_eq!(Some(Duration::from_millis(200)), interval);
        assert_eq!(Some(12), ttl);
    }

    #[test]
    fn test_trace_options() {
        let args = parse("icmptool -v --log-format json trace -q 1 -f 2 -m 8 10.0.0.1");
        assert!(args.verbose);
        assert_eq!(Some(LogFormat::Json), args.log_format);
        let Command::Trace {
            destination,
            attempts,
            interval,
            first_ttl,
            max_ttl,
        } = args.command
        else {
            panic!("expected trace");
        };
        assert_eq!(Ipv4Addr::new(10, 0, 0, 1), destination);
        assert_eq!(Some(1), attempts);
        assert_eq!(None, interval);
        assert_eq!(Some(2), first_ttl);
        assert_eq!(Some(8), max_ttl);
    }

    #[test]
    fn test_rejects_hostname() {
        assert!(Args::try_parse_from(["icmptool", "ping", "example.com"]).is_err());
    }

    #[test]
    fn test_rejects_bad_duration() {
        assert!(Args::try_parse_from(["icmptool", "ping", "-i", "soon", "1.2.3.4"]).is_err());
    }
}
