//! Thin wrappers over the Proxmox `pct` (LXC) and `qm` (QEMU) command
//! families. Every function shells out on the hypervisor host; nothing
//! here caches state.

use anyhow::{Context, Result};

use crate::config::ProvisionConfig;
use crate::plan::NodeSpec;
use crate::shell;

/// Observed state of a hypervisor resource. Never cached across steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Absent,
    Exists { running: bool },
}

impl NodeStatus {
    pub fn is_running(self) -> bool {
        matches!(self, NodeStatus::Exists { running: true })
    }
}

fn parse_status(out: &std::process::Output) -> NodeStatus {
    if !out.status.success() {
        // pct/qm exit non-zero for an unknown vmid
        return NodeStatus::Absent;
    }
    let stdout = String::from_utf8_lossy(&out.stdout);
    NodeStatus::Exists {
        running: stdout.contains("running"),
    }
}

// ---------------------------------------------------------------------------
// Containers (pct)
// ---------------------------------------------------------------------------

pub fn ct_status(id: u32) -> Result<NodeStatus> {
    let out = shell::run_host(&format!("pct status {} 2>/dev/null", id))?;
    Ok(parse_status(&out))
}

pub fn ct_create(spec: &NodeSpec, cfg: &ProvisionConfig) -> Result<()> {
    shell::run_host_checked(&format!(
        "pct create {id} {template} \
         --hostname {hostname} \
         --cores {cores} --memory {memory} \
         --rootfs {storage}:{disk} \
         --net0 name=eth0,bridge={bridge} \
         --unprivileged {unpriv} \
         --features nesting=1",
        id = spec.id,
        template = cfg.template,
        hostname = spec.hostname,
        cores = spec.cores,
        memory = spec.memory_mib,
        storage = cfg.storage,
        disk = spec.disk_gib,
        bridge = cfg.bridge,
        unpriv = if spec.unprivileged { 1 } else { 0 },
    ))
    .with_context(|| format!("pct create failed for vmid {}", spec.id))
}

pub fn ct_start(id: u32) -> Result<()> {
    shell::run_host_checked(&format!("pct start {}", id))
}

pub fn ct_stop(id: u32) -> Result<()> {
    shell::run_host_checked(&format!("pct stop {}", id))
}

pub fn ct_destroy(id: u32) -> Result<()> {
    shell::run_host_checked(&format!("pct destroy {} --force 1", id))
}

/// Run a command inside a container guest. `cmd` must not contain single
/// quotes; everything this crate sends through here is generated.
pub fn ct_exec(id: u32, cmd: &str) -> Result<()> {
    shell::run_host_checked(&format!("pct exec {} -- sh -c '{}'", id, cmd))
}

/// Copy a host file into the container guest.
pub fn ct_push(id: u32, host_path: &str, guest_path: &str) -> Result<()> {
    shell::run_host_checked(&format!("pct push {} {} {}", id, host_path, guest_path))
}

// ---------------------------------------------------------------------------
// VMs (qm)
// ---------------------------------------------------------------------------

pub fn vm_status(id: u32) -> Result<NodeStatus> {
    let out = shell::run_host(&format!("qm status {} 2>/dev/null", id))?;
    Ok(parse_status(&out))
}

/// Materialize a VM from a backup image.
pub fn vm_restore(id: u32, image: &str, storage: &str) -> Result<()> {
    shell::run_host_checked(&format!("qmrestore {} {} --storage {}", image, id, storage))
        .with_context(|| format!("qmrestore failed for vmid {}", id))
}

/// Apply name and resource sizing to a restored VM.
pub fn vm_set(spec: &NodeSpec) -> Result<()> {
    shell::run_host_checked(&format!(
        "qm set {id} --name {hostname} --cores {cores} --memory {memory}",
        id = spec.id,
        hostname = spec.hostname,
        cores = spec.cores,
        memory = spec.memory_mib,
    ))
}

pub fn vm_resize_disk(id: u32, device: &str, size_gib: u32) -> Result<()> {
    shell::run_host_checked(&format!("qm resize {} {} {}G", id, device, size_gib))
}

pub fn vm_start(id: u32) -> Result<()> {
    shell::run_host_checked(&format!("qm start {}", id))
}

pub fn vm_stop(id: u32) -> Result<()> {
    shell::run_host_checked(&format!("qm stop {}", id))
}

pub fn vm_destroy(id: u32) -> Result<()> {
    shell::run_host_checked(&format!("qm destroy {} --purge", id))
}

/// Run a command inside a VM guest via the QEMU guest agent.
pub fn vm_exec(id: u32, cmd: &str) -> Result<()> {
    shell::run_host_checked(&format!("qm guest exec {} -- sh -c '{}'", id, cmd))
}
