use std::net::Ipv4Addr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::batch;
use crate::config::ProvisionConfig;
use crate::lifecycle;
use crate::logging::{self, LogFormat};
use crate::plan::{self, BatchSpec, NodeSpec};
use crate::ui;

#[derive(Parser)]
#[command(
    name = "pvenix",
    version,
    about = "Provision NixOS containers and VMs on a Proxmox VE host"
)]
struct Cli {
    /// Emit structured JSON logs instead of human-readable output
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a single NixOS container
    Create {
        /// Numeric vmid
        id: u32,
        /// Hypervisor label and guest hostname
        hostname: String,
        /// Static address, `A.B.C.D[/prefix]` (prefix defaults to /24)
        address: String,
        /// Default gateway (defaults to .1 on the node's network)
        #[arg(long)]
        gateway: Option<Ipv4Addr>,
        /// CPU cores
        #[arg(long)]
        cores: Option<u32>,
        /// Memory in MiB
        #[arg(long)]
        memory: Option<u32>,
        /// Rootfs size in GiB
        #[arg(long)]
        disk: Option<u32>,
        /// Create a privileged container
        #[arg(long)]
        privileged: bool,
    },

    /// Provision a single NixOS VM restored from the base image
    CreateVm {
        /// Numeric vmid
        id: u32,
        /// Hypervisor label and guest hostname
        hostname: String,
        /// Static address, `A.B.C.D[/prefix]` (prefix defaults to /24)
        address: String,
        /// Default gateway (defaults to .1 on the node's network)
        #[arg(long)]
        gateway: Option<Ipv4Addr>,
        /// CPU cores
        #[arg(long)]
        cores: Option<u32>,
        /// Memory in MiB
        #[arg(long)]
        memory: Option<u32>,
        /// Grow the restored disk to this size in GiB
        #[arg(long)]
        disk: Option<u32>,
    },

    /// Provision a contiguous cluster of containers
    DeployCluster {
        /// First vmid; node i gets base_id + i
        base_id: u32,
        /// Number of nodes
        count: u32,
        /// Address of node 0, `A.B.C.D[/prefix]`; node i gets the base
        /// host octet + i
        base_address: String,
        /// Shared gateway (defaults to .1 on the base network)
        #[arg(long)]
        gateway: Option<Ipv4Addr>,
        /// Create privileged containers
        #[arg(long)]
        privileged: bool,
    },

    /// Report status and network liveness for a node range
    Check {
        base_id: u32,
        count: u32,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stop and destroy a node range, best-effort
    Cleanup {
        base_id: u32,
        count: u32,
    },
}

/// Parse arguments, initialize logging, dispatch. Exit code 1 on any
/// validation or fatal step failure.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Human
    });

    let cfg = ProvisionConfig::default();

    if let Err(e) = dispatch(cli.command, &cfg) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

fn dispatch(command: Commands, cfg: &ProvisionConfig) -> Result<()> {
    match command {
        Commands::Create {
            id,
            hostname,
            address,
            gateway,
            cores,
            memory,
            disk,
            privileged,
        } => {
            let spec = node_spec(
                cfg, id, hostname, &address, gateway, cores, memory, disk, None, !privileged,
            )?;
            lifecycle::provision_container(&spec, cfg)?;
        }
        Commands::CreateVm {
            id,
            hostname,
            address,
            gateway,
            cores,
            memory,
            disk,
        } => {
            let spec = node_spec(
                cfg, id, hostname, &address, gateway, cores, memory, None, disk, true,
            )?;
            lifecycle::provision_vm(&spec, cfg)?;
        }
        Commands::DeployCluster {
            base_id,
            count,
            base_address,
            gateway,
            privileged,
        } => {
            let (base_address, prefix) = plan::parse_cidr(&base_address)?;
            let batch = BatchSpec {
                base_id,
                count,
                base_address,
                prefix,
                gateway,
                unprivileged: !privileged,
            };
            batch::deploy(&batch, cfg)?;
        }
        Commands::Check {
            base_id,
            count,
            json,
        } => {
            batch::check(base_id, count, cfg, json)?;
        }
        Commands::Cleanup { base_id, count } => {
            batch::cleanup(base_id, count)?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn node_spec(
    cfg: &ProvisionConfig,
    id: u32,
    hostname: String,
    address: &str,
    gateway: Option<Ipv4Addr>,
    cores: Option<u32>,
    memory: Option<u32>,
    disk: Option<u32>,
    vm_disk: Option<u32>,
    unprivileged: bool,
) -> Result<NodeSpec> {
    plan::validate_hostname(&hostname)?;
    let (address, prefix) = plan::parse_cidr(address)?;
    Ok(NodeSpec {
        id,
        hostname,
        address,
        prefix,
        gateway: gateway.unwrap_or_else(|| plan::default_gateway(address)),
        dns: cfg.dns,
        cores: cores.unwrap_or(cfg.cores),
        memory_mib: memory.unwrap_or(cfg.memory_mib),
        disk_gib: disk.unwrap_or(cfg.disk_gib),
        vm_disk_gib: vm_disk,
        unprivileged,
    })
}
