use clap::{Parser, Subcommand, ValueEnum};
use heimdall_acl::config::loader;
use heimdall_acl::dns::{DnsHeader, DomainName};
use heimdall_acl::tsig::{sign_message, unix_now};
use heimdall_acl::{AclDirection, Capabilities, LoadError, Options, QueryFacts};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Check configurations and evaluate notify/transfer access lists
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(
        short,
        long,
        env = "HEIMDALL_ACL_CONFIG",
        default_value = "heimdall-acl.toml"
    )]
    config: PathBuf,

    /// Treat the build as having no IPv6 support
    #[arg(long)]
    no_ipv6: bool,

    /// Treat the build as having no TSIG support
    #[arg(long)]
    no_tsig: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and print a zone summary
    Check,
    /// Evaluate one zone list for a peer
    Eval {
        /// Zone apex
        zone: String,

        /// Which list of the zone to evaluate
        #[arg(value_enum)]
        direction: Direction,

        /// Peer address and port, e.g. 192.0.2.1:53
        peer: SocketAddr,

        /// Hex encoded query message. Defaults to an AXFR (or NOTIFY) for
        /// the zone.
        #[arg(long)]
        query_hex: Option<String>,

        /// Sign the query with this configured key before evaluating
        #[arg(long)]
        sign_with: Option<String>,

        /// Fudge for --sign-with, in seconds
        #[arg(long, default_value = "300")]
        fudge: u16,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    AllowNotify,
    RequestXfr,
    Notify,
    ProvideXfr,
}

impl From<Direction> for AclDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::AllowNotify => AclDirection::AllowNotify,
            Direction::RequestXfr => AclDirection::RequestXfr,
            Direction::Notify => AclDirection::Notify,
            Direction::ProvideXfr => AclDirection::ProvideXfr,
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut caps = Capabilities::default();
    if args.no_ipv6 {
        caps = caps.without_ipv6();
    }
    if args.no_tsig {
        caps = caps.without_tsig();
    }

    let options = match loader::load_file(&args.config, caps) {
        Ok(options) => options,
        Err(e) => {
            report_load_error(&e);
            return ExitCode::from(2);
        }
    };

    match args.command {
        Command::Check => {
            check(&options);
            ExitCode::SUCCESS
        }
        Command::Eval {
            zone,
            direction,
            peer,
            query_hex,
            sign_with,
            fudge,
        } => {
            let direction = direction.into();
            match eval(&options, &zone, direction, peer, query_hex, sign_with, fudge) {
                Ok(true) => ExitCode::SUCCESS,
                Ok(false) => ExitCode::from(1),
                Err(message) => {
                    error!("{}", message);
                    ExitCode::from(2)
                }
            }
        }
    }
}

fn report_load_error(e: &LoadError) {
    for diagnostic in e.diagnostics() {
        eprintln!("{}", diagnostic);
    }
    eprintln!("{}", e);
}

fn check(options: &Options) {
    println!(
        "{} zones, {} keys ({} bound)",
        options.zones().count(),
        options.keys().len(),
        options.registry().len()
    );
    for zone in options.zones() {
        let kind = if zone.is_slave() { "slave" } else { "master" };
        println!("zone {} ({}, file {})", zone.apex, kind, zone.zonefile);
        for direction in AclDirection::ALL {
            for entry in zone.acl(direction) {
                println!("    {}: {}", direction, entry);
            }
        }
    }
}

/// A question for the zone: NOTIFY SOA for the notify lists, AXFR otherwise
fn default_query(apex: &DomainName, direction: AclDirection) -> Result<Vec<u8>, String> {
    let notify = matches!(direction, AclDirection::AllowNotify | AclDirection::Notify);
    let header = DnsHeader {
        id: 0x2a2a,
        opcode: if notify { 4 } else { 0 },
        aa: notify,
        qdcount: 1,
        ..Default::default()
    };
    let mut msg = Vec::new();
    header.compose(&mut msg).map_err(|e| e.to_string())?;
    apex.compose(&mut msg);
    let qtype: u16 = if notify { 6 } else { 252 };
    msg.extend_from_slice(&qtype.to_be_bytes());
    msg.extend_from_slice(&1u16.to_be_bytes());
    Ok(msg)
}

fn eval(
    options: &Options,
    zone: &str,
    direction: AclDirection,
    peer: SocketAddr,
    query_hex: Option<String>,
    sign_with: Option<String>,
    fudge: u16,
) -> Result<bool, String> {
    let apex = DomainName::parse(zone).map_err(|e| format!("bad zone name {}: {}", zone, e))?;

    let mut msg = match query_hex {
        Some(text) => hex::decode(text.trim()).map_err(|e| format!("bad query hex: {}", e))?,
        None => default_query(&apex, direction)?,
    };

    if let Some(name) = sign_with {
        let key = options
            .find_key(&name)
            .ok_or_else(|| format!("no key {} configured", name))?
            .tsig_key
            .clone()
            .ok_or_else(|| format!("key {} is not usable", name))?;
        sign_message(&mut msg, &key, unix_now(), fudge).map_err(|e| e.to_string())?;
    }

    let query = QueryFacts::new(peer, msg);
    let verdict = options
        .check_incoming(&apex, direction, &query)
        .ok_or_else(|| format!("zone {} is not configured", apex))?;

    match (verdict.matched, verdict.denial) {
        (Some(index), _) => {
            let reason = verdict.reason.map(|r| r.to_string()).unwrap_or_default();
            println!("allowed: entry {} (first match {})", index, reason);
            Ok(true)
        }
        (None, denial) => {
            let denial = denial.map(|d| d.to_string()).unwrap_or_default();
            match verdict.reason {
                Some(entry) => println!("denied: {} ({})", denial, entry),
                None => println!("denied: {}", denial),
            }
            Ok(false)
        }
    }
}
