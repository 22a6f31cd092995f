use std::net::Ipv4Addr;
use std::time::Duration;

/// Host-side defaults for provisioning, passed into the planner and the
/// lifecycle orchestrator at construction instead of living as process-wide
/// globals.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// LXC template for `pct create`.
    pub template: String,
    /// VM backup image for `qmrestore`.
    pub vm_image: String,
    /// Storage pool for rootfs volumes and restored disks.
    pub storage: String,
    /// Host bridge the guest interface binds to.
    pub bridge: String,
    /// Resolver written into the guest.
    pub dns: Ipv4Addr,
    /// Hostname prefix for planned batches: `<prefix>-<i>`.
    pub hostname_prefix: String,
    /// Default resource sizing.
    pub cores: u32,
    pub memory_mib: u32,
    pub disk_gib: u32,
    /// Extra packages baked into the generated configuration.nix.
    pub packages: Vec<String>,
    /// NixOS state version pinned in the generated config.
    pub state_version: String,
    /// Container readiness poll: interval between status checks.
    pub ready_poll_interval: Duration,
    /// Container readiness poll: total attempts before giving up.
    pub ready_max_attempts: u32,
    /// Fixed wait after VM start (no status channel to poll).
    pub settle_delay: Duration,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            template: "local:vztmpl/nixos-24.05-default_amd64.tar.xz".to_string(),
            vm_image: "/var/lib/vz/dump/vzdump-qemu-nixos-base.vma.zst".to_string(),
            storage: "local-lvm".to_string(),
            bridge: "vmbr0".to_string(),
            dns: Ipv4Addr::new(8, 8, 8, 8),
            hostname_prefix: "node".to_string(),
            cores: 2,
            memory_mib: 2048,
            disk_gib: 8,
            packages: vec!["vim".to_string(), "git".to_string(), "htop".to_string()],
            state_version: "24.05".to_string(),
            ready_poll_interval: Duration::from_secs(1),
            ready_max_attempts: 30,
            settle_delay: Duration::from_secs(20),
        }
    }
}
