use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use ngxed_file::{HostPort, ProxyTarget};

const METHODS: [&str; 2] = ["least_conn", "ip_hash"];

#[derive(Parser)]
#[command(name = "ngxed", version, about)]
pub(crate) struct CLI {
    /// More log output: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to a daily rolling file
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where an edit reads from and where its result goes.
#[derive(Args, Debug)]
pub(crate) struct EditTarget {
    /// Config file path, `file://` or `http(s)://` URL
    #[arg(short, long)]
    pub config: String,

    /// Write the result here instead of back to the config file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the result instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Validate the config file content
    Validate {
        #[arg(short, long)]
        config: String,
    },
    /// Print the config as it would be written back
    Print {
        #[arg(short, long)]
        config: String,
    },
    /// List upstreams, servers and locations
    List {
        #[arg(short, long)]
        config: String,
    },
    AddUpstream {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = METHODS)]
        method: Option<String>,
        /// HOST:PORT, may be repeated
        #[arg(long = "server")]
        servers: Vec<HostPort>,
    },
    RemoveUpstream {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        name: String,
    },
    AddUpstreamServer {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        upstream: String,
        #[arg(long)]
        server: HostPort,
    },
    RemoveUpstreamServer {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        upstream: String,
        #[arg(long)]
        server: HostPort,
    },
    /// Move an upstream server to another port
    SetUpstreamPort {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        upstream: String,
        #[arg(long)]
        server: HostPort,
        #[arg(long)]
        port: u16,
    },
    /// Set the balancing method, or clear it when omitted
    SetMethod {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        upstream: String,
        #[arg(long, value_parser = METHODS)]
        method: Option<String>,
    },
    AddServer {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        name: String,
        #[arg(long)]
        listen: u16,
        #[arg(long, requires = "proxy_pass")]
        location: Option<String>,
        #[arg(long, requires = "location")]
        proxy_pass: Option<ProxyTarget>,
    },
    RemoveServer {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        name: String,
    },
    AddLocation {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        server: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        proxy_pass: Option<ProxyTarget>,
    },
    SetListen {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        server: String,
        #[arg(long)]
        listen: u16,
    },
    SetProxyPass {
        #[command(flatten)]
        target: EditTarget,
        #[arg(long)]
        server: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        proxy_pass: ProxyTarget,
    },
}
