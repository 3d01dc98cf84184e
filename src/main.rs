//! Sinkhole - a filtering DNS forwarder.
//!
//! Parses the command line, loads blocklists, and runs the listener on a
//! single-threaded runtime. Queries for denylisted names get a null-routed
//! answer; everything else is relayed to the upstream resolver.

use std::path::{Path, PathBuf};
use std::process::exit;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use sinkhole::filter::Blocklist;
use sinkhole::resolver::Resolver;
use sinkhole::server::{Config, Listener};

#[derive(Parser)]
#[command(name = "sinkhole")]
#[command(about = "Filtering DNS forwarder with denylist null-routing", long_about = None)]
struct Args {
    /// Local IP address to bind
    #[arg(long, default_value = "0.0.0.0", value_name = "ADDR")]
    ip: String,

    /// UDP port to listen on
    #[arg(long, default_value_t = 53)]
    port: u16,

    /// Upstream resolver, bare IPv4 (port 53) or ip:port
    #[arg(long, default_value = "8.8.8.8", value_name = "ADDR")]
    upstream: String,

    /// Upstream receive timeout in milliseconds
    #[arg(long, default_value_t = 5000, value_name = "MS")]
    timeout: u64,

    /// Blocklist files, one domain per line
    #[arg(value_name = "BLOCKLIST_FILES")]
    blocklists: Vec<String>,
}

/// Home directory for path shorthands: `USERPROFILE` beats `HOME`, and a
/// machine with neither falls back to the working directory.
fn home_dir() -> PathBuf {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Expand `~/`, `desktop/`, `documents/`, and `downloads/` shorthands
/// (prefix match, case-insensitive) against the given home directory.
fn expand_path(raw: &str, home: &Path) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        return home.join(rest);
    }
    for (prefix, folder) in [
        ("desktop/", "Desktop"),
        ("documents/", "Documents"),
        ("downloads/", "Downloads"),
    ] {
        if let Some(head) = raw.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                return home.join(folder).join(&raw[prefix.len()..]);
            }
        }
    }
    PathBuf::from(raw)
}

fn main() {
    // Help exits 0; every usage error (unknown option, missing value) exits 1.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            exit(0);
        }
        Err(e) => {
            eprint!("{e}");
            exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let home = home_dir();
    let files: Vec<PathBuf> = args
        .blocklists
        .iter()
        .map(|raw| expand_path(raw, &home))
        .collect();

    let config = Config {
        bind_ip: args.ip,
        port: args.port,
        upstream: args.upstream,
        timeout_ms: args.timeout,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build runtime");
            exit(1);
        }
    };

    runtime.block_on(async {
        let blocklist = Blocklist::from_files(&files);
        let mut listener = Listener::new(Resolver::new(blocklist));

        if let Err(e) = listener.init(&config).await {
            error!(error = %e, "init failed");
            exit(1);
        }
        if let Err(e) = listener.run().await {
            error!(error = %e, "listener stopped");
            exit(1);
        }
    });
}
