//! # pvenix — NixOS node provisioner for Proxmox VE
//!
//! Provisions LXC containers and QEMU VMs on a single Proxmox VE host,
//! injecting a declarative NixOS configuration and static networking at
//! creation time.
//!
//! ## Module breakdown
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`plan`] | Identity/address planning: `BatchSpec` → ordered `NodeSpec`s |
//! | [`lifecycle`] | Per-node state machine: reconcile, create, start, configure |
//! | [`batch`] | Cluster deploy, status sweep, teardown sweep |
//! | [`hypervisor`] | `pct`/`qm` command wrappers |
//! | [`nixcfg`] | Pure `NodeSpec` → configuration.nix rendering |
//! | [`cli`] | Command-line surface |

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod hypervisor;
pub mod lifecycle;
pub mod logging;
pub mod nixcfg;
pub mod plan;
pub mod retry;
pub mod shell;
#[cfg(test)]
pub mod shell_mock;
pub mod ui;
