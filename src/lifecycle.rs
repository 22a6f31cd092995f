//! Per-node lifecycle orchestration.
//!
//! Drives one node through reconcile → create → start → configure →
//! activate. Each step observes current hypervisor state rather than
//! trusting anything cached, so re-invoking the whole sequence is the
//! recovery path for any failure; there is no in-orchestrator rollback.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, Step};
use crate::hypervisor::{self, NodeStatus};
use crate::nixcfg::{self, GuestKind};
use crate::plan::NodeSpec;
use crate::retry;

/// Provision a container node end to end.
pub fn provision_container(spec: &NodeSpec, cfg: &ProvisionConfig) -> Result<(), ProvisionError> {
    reconcile_absent(spec.id, GuestKind::Container)?;

    info!(node = spec.id, hostname = %spec.hostname, "creating container");
    hypervisor::ct_create(spec, cfg).map_err(|e| ProvisionError::step(Step::Create, spec.id, e))?;

    info!(node = spec.id, "starting container");
    hypervisor::ct_start(spec.id).map_err(|e| ProvisionError::step(Step::Start, spec.id, e))?;

    await_ready(spec.id, cfg)?;
    inject_network(spec)?;
    deliver_config(spec, cfg, GuestKind::Container)?;
    activate(spec.id, GuestKind::Container)?;

    info!(node = spec.id, hostname = %spec.hostname, address = %spec.address, "container ready");
    Ok(())
}

/// Provision a VM node end to end.
///
/// VMs are restored from a prepared image whose cloud-init handles boot
/// networking, so there is no readiness poll and no network injection;
/// a fixed settle delay stands in for the missing status channel.
pub fn provision_vm(spec: &NodeSpec, cfg: &ProvisionConfig) -> Result<(), ProvisionError> {
    reconcile_absent(spec.id, GuestKind::Vm)?;

    info!(node = spec.id, image = %cfg.vm_image, "restoring VM from image");
    hypervisor::vm_restore(spec.id, &cfg.vm_image, &cfg.storage)
        .map_err(|e| ProvisionError::step(Step::RestoreImage, spec.id, e))?;

    hypervisor::vm_set(spec).map_err(|e| ProvisionError::step(Step::ApplySizing, spec.id, e))?;

    if let Some(size) = spec.vm_disk_gib {
        info!(node = spec.id, size_gib = size, "resizing VM disk");
        hypervisor::vm_resize_disk(spec.id, "scsi0", size)
            .map_err(|e| ProvisionError::step(Step::ResizeDisk, spec.id, e))?;
    }

    info!(node = spec.id, "starting VM");
    hypervisor::vm_start(spec.id).map_err(|e| ProvisionError::step(Step::Start, spec.id, e))?;

    info!(
        node = spec.id,
        delay_secs = cfg.settle_delay.as_secs(),
        "waiting for VM to settle"
    );
    std::thread::sleep(cfg.settle_delay);

    deliver_config(spec, cfg, GuestKind::Vm)?;
    activate(spec.id, GuestKind::Vm)?;

    info!(node = spec.id, hostname = %spec.hostname, address = %spec.address, "VM ready");
    Ok(())
}

/// Step 1: make sure nothing occupies the target vmid.
///
/// A pre-existing resource, whatever its state, is stopped and destroyed
/// before creation; a stop failure is tolerated (the resource may already
/// be halting), a destroy failure is fatal.
fn reconcile_absent(id: u32, kind: GuestKind) -> Result<(), ProvisionError> {
    let status = query_status(id, kind).map_err(|e| ProvisionError::step(Step::Reconcile, id, e))?;

    match status {
        NodeStatus::Absent => Ok(()),
        NodeStatus::Exists { running } => {
            info!(node = id, running, "pre-existing resource, destroying");
            if running
                && let Err(e) = match kind {
                    GuestKind::Container => hypervisor::ct_stop(id),
                    GuestKind::Vm => hypervisor::vm_stop(id),
                }
            {
                warn!(node = id, error = %e, "stop failed, attempting destroy anyway");
            }
            let destroy = match kind {
                GuestKind::Container => hypervisor::ct_destroy(id),
                GuestKind::Vm => hypervisor::vm_destroy(id),
            };
            destroy.map_err(|e| ProvisionError::step(Step::Reconcile, id, e))
        }
    }
}

fn query_status(id: u32, kind: GuestKind) -> Result<NodeStatus> {
    match kind {
        GuestKind::Container => hypervisor::ct_status(id),
        GuestKind::Vm => hypervisor::vm_status(id),
    }
}

/// Step 4 (container path): poll until the hypervisor reports running.
fn await_ready(id: u32, cfg: &ProvisionConfig) -> Result<(), ProvisionError> {
    info!(node = id, "waiting for container to report running");
    let ready = retry::poll_until(
        cfg.ready_poll_interval,
        cfg.ready_max_attempts,
        "container readiness",
        || Ok(hypervisor::ct_status(id)?.is_running()),
    )
    .map_err(|e| ProvisionError::step(Step::AwaitReady, id, e))?;

    if ready {
        Ok(())
    } else {
        Err(ProvisionError::StartupTimeout {
            node_id: id,
            attempts: cfg.ready_max_attempts,
        })
    }
}

/// Step 5 (container path): bring up static networking inside the guest.
///
/// Each sub-step is fatal on its own; a partially networked guest is left
/// in place for inspection rather than destroyed.
fn inject_network(spec: &NodeSpec) -> Result<(), ProvisionError> {
    info!(node = spec.id, address = %spec.address, "injecting guest network");
    let commands = [
        "ip link set dev eth0 up".to_string(),
        format!("ip addr add {}/{} dev eth0", spec.address, spec.prefix),
        format!("ip route add default via {}", spec.gateway),
        format!("echo nameserver {} > /etc/resolv.conf", spec.dns),
    ];
    for cmd in &commands {
        hypervisor::ct_exec(spec.id, cmd)
            .map_err(|e| ProvisionError::step(Step::InjectNetwork, spec.id, e))?;
    }
    Ok(())
}

/// Step 6: render the configuration payload and place it in the guest.
fn deliver_config(
    spec: &NodeSpec,
    cfg: &ProvisionConfig,
    kind: GuestKind,
) -> Result<(), ProvisionError> {
    let wrap = |e| ProvisionError::step(Step::DeliverConfig, spec.id, e);

    info!(node = spec.id, path = nixcfg::GUEST_CONFIG_PATH, "delivering configuration");
    let payload = nixcfg::render(spec, cfg, kind).map_err(wrap)?;

    match kind {
        GuestKind::Container => {
            // pct push wants a file on the host side
            let tmp = write_payload_tempfile(&payload).map_err(wrap)?;
            hypervisor::ct_exec(spec.id, "mkdir -p /etc/nixos").map_err(wrap)?;
            hypervisor::ct_push(
                spec.id,
                &tmp.path().display().to_string(),
                nixcfg::GUEST_CONFIG_PATH,
            )
            .map_err(wrap)?;
        }
        GuestKind::Vm => {
            hypervisor::vm_exec(spec.id, "mkdir -p /etc/nixos").map_err(wrap)?;
            hypervisor::vm_exec(
                spec.id,
                &format!(
                    "cat > {} << \"PVEOF\"\n{}\nPVEOF",
                    nixcfg::GUEST_CONFIG_PATH,
                    payload.trim_end()
                ),
            )
            .map_err(wrap)?;
        }
    }
    Ok(())
}

fn write_payload_tempfile(payload: &str) -> Result<tempfile::NamedTempFile> {
    let mut tmp = tempfile::Builder::new()
        .prefix("pvenix-")
        .suffix(".nix")
        .tempfile()
        .with_context(|| "Failed to create payload temp file")?;
    tmp.write_all(payload.as_bytes())
        .with_context(|| "Failed to write payload temp file")?;
    Ok(tmp)
}

/// Step 7: switch the guest onto the delivered configuration. Deliberately
/// last; everything before it is known-good when this runs.
fn activate(id: u32, kind: GuestKind) -> Result<(), ProvisionError> {
    info!(node = id, "activating configuration (nixos-rebuild switch)");
    let run = match kind {
        GuestKind::Container => hypervisor::ct_exec(id, "nixos-rebuild switch"),
        GuestKind::Vm => hypervisor::vm_exec(id, "nixos-rebuild switch"),
    };
    run.map_err(|e| ProvisionError::step(Step::Activate, id, e))
}
