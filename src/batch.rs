//! Batch coordination: cluster deploy, status sweep, teardown sweep.
//!
//! Deploy is strictly sequential and fail-fast; the sweeps are best-effort
//! and never abort on a single node's failure.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ProvisionConfig;
use crate::error::ProvisionError;
use crate::hypervisor::{self, NodeStatus};
use crate::lifecycle;
use crate::plan::{self, BatchSpec};
use crate::ui;

/// Plan a batch and provision every node in ascending index order.
///
/// The first node failure aborts the remaining nodes: a mid-batch failure
/// usually means an environmental problem that would recur for every
/// subsequent node.
pub fn deploy(batch: &BatchSpec, cfg: &ProvisionConfig) -> Result<(), ProvisionError> {
    let nodes = plan::plan(batch, cfg)?;
    info!(
        count = nodes.len(),
        base_id = batch.base_id,
        "deploying cluster"
    );

    for (i, spec) in nodes.iter().enumerate() {
        ui::info(&format!(
            "Provisioning node {}/{}: vmid {} ({} @ {}/{})",
            i + 1,
            nodes.len(),
            spec.id,
            spec.hostname,
            spec.address,
            spec.prefix
        ));
        lifecycle::provision_container(spec, cfg)?;
    }

    ui::success(&format!("Cluster of {} nodes deployed", nodes.len()));
    Ok(())
}

/// One row of the status sweep report.
#[derive(Debug, Serialize)]
pub struct NodeReport {
    pub id: u32,
    pub status: String,
    pub network: String,
}

/// Query each node's state and probe guest network liveness.
///
/// Individual query failures are downgraded to a per-node diagnostic;
/// the sweep itself always succeeds.
pub fn check(base_id: u32, count: u32, cfg: &ProvisionConfig, json: bool) -> Result<()> {
    validate_count(count)?;

    let mut reports = Vec::with_capacity(count as usize);
    for i in 0..count {
        let id = base_id + i;
        let (status, network) = match hypervisor::ct_status(id) {
            Ok(NodeStatus::Absent) => ("absent".to_string(), "-".to_string()),
            Ok(NodeStatus::Exists { running: false }) => {
                ("stopped".to_string(), "-".to_string())
            }
            Ok(NodeStatus::Exists { running: true }) => {
                let probe = hypervisor::ct_exec(id, &format!("ping -c 1 -W 1 {}", cfg.dns));
                let network = match probe {
                    Ok(()) => "ok".to_string(),
                    Err(_) => "unreachable".to_string(),
                };
                ("running".to_string(), network)
            }
            Err(e) => {
                warn!(node = id, error = %e, "status query failed");
                ("query failed".to_string(), "-".to_string())
            }
        };
        reports.push(NodeReport { id, status, network });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("{:<8} {:<14} {}", "VMID", "STATUS", "NETWORK");
        for r in &reports {
            println!("{:<8} {:<14} {}", r.id, r.status, r.network);
        }
    }
    Ok(())
}

/// Stop and destroy each node in the range, best-effort.
///
/// Continues past individual failures; the goal is maximal cleanup, not
/// strict success.
pub fn cleanup(base_id: u32, count: u32) -> Result<()> {
    validate_count(count)?;

    let mut removed = 0u32;
    for i in 0..count {
        let id = base_id + i;
        match hypervisor::ct_status(id) {
            Ok(NodeStatus::Absent) => {
                info!(node = id, "already absent");
                continue;
            }
            Ok(NodeStatus::Exists { running }) => {
                if running && let Err(e) = hypervisor::ct_stop(id) {
                    warn!(node = id, error = %e, "stop failed");
                }
                match hypervisor::ct_destroy(id) {
                    Ok(()) => {
                        info!(node = id, "destroyed");
                        removed += 1;
                    }
                    Err(e) => warn!(node = id, error = %e, "destroy failed"),
                }
            }
            Err(e) => warn!(node = id, error = %e, "status query failed, skipping"),
        }
    }

    ui::success(&format!("Cleanup finished, {} node(s) removed", removed));
    Ok(())
}

fn validate_count(count: u32) -> Result<(), ProvisionError> {
    if count == 0 {
        return Err(ProvisionError::validation("count must be at least 1"));
    }
    Ok(())
}
