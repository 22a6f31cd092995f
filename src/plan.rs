use std::net::Ipv4Addr;

use serde::Serialize;

use crate::config::ProvisionConfig;
use crate::error::ProvisionError;

/// Declarative intent for one node. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSpec {
    /// Numeric id in the hypervisor's vmid namespace.
    pub id: u32,
    /// Hypervisor label and guest hostname.
    pub hostname: String,
    pub address: Ipv4Addr,
    pub prefix: u8,
    pub gateway: Ipv4Addr,
    pub dns: Ipv4Addr,
    pub cores: u32,
    pub memory_mib: u32,
    /// Rootfs size for containers.
    pub disk_gib: u32,
    /// Disk size override applied after image restore (VM path only).
    pub vm_disk_gib: Option<u32>,
    /// Container isolation flag (`pct create --unprivileged`).
    pub unprivileged: bool,
}

/// Declarative intent for a contiguous batch of container nodes.
#[derive(Debug, Clone)]
pub struct BatchSpec {
    pub base_id: u32,
    pub count: u32,
    pub base_address: Ipv4Addr,
    pub prefix: u8,
    /// Shared gateway; derived from the base network when absent.
    pub gateway: Option<Ipv4Addr>,
    pub unprivileged: bool,
}

/// Parse an `A.B.C.D[/len]` address; the prefix defaults to /24.
pub fn parse_cidr(s: &str) -> Result<(Ipv4Addr, u8), ProvisionError> {
    let (addr_part, prefix) = match s.split_once('/') {
        Some((a, p)) => {
            let prefix: u8 = p
                .parse()
                .map_err(|_| ProvisionError::validation(format!("bad prefix length: {:?}", p)))?;
            if prefix == 0 || prefix > 32 {
                return Err(ProvisionError::validation(format!(
                    "prefix length out of range: /{}",
                    prefix
                )));
            }
            (a, prefix)
        }
        None => (s, 24),
    };

    let addr: Ipv4Addr = addr_part
        .parse()
        .map_err(|_| ProvisionError::validation(format!("bad IPv4 address: {:?}", addr_part)))?;
    Ok((addr, prefix))
}

/// Validate a hostname: lowercase alphanumeric + hyphens, 1-63 chars, no
/// leading or trailing hyphen.
pub fn validate_hostname(name: &str) -> Result<(), ProvisionError> {
    if name.is_empty() || name.len() > 63 {
        return Err(ProvisionError::validation(format!(
            "hostname must be 1-63 characters, got {}",
            name.len()
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ProvisionError::validation(format!(
            "hostname must be lowercase alphanumeric + hyphens: {:?}",
            name
        )));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(ProvisionError::validation(format!(
            "hostname must not start or end with a hyphen: {:?}",
            name
        )));
    }
    Ok(())
}

/// Default gateway for a node: host octet 1 on its own network.
pub fn default_gateway(address: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = address.octets();
    Ipv4Addr::new(a, b, c, 1)
}

/// Expand a batch into an ordered sequence of node specs.
///
/// Fails before returning anything if the count is zero or any derived
/// host octet leaves the 1-254 range, so a rejected batch has caused no
/// side effect at all.
pub fn plan(batch: &BatchSpec, cfg: &ProvisionConfig) -> Result<Vec<NodeSpec>, ProvisionError> {
    if batch.count == 0 {
        return Err(ProvisionError::validation("count must be at least 1"));
    }

    let [a, b, c, base_octet] = batch.base_address.octets();
    let gateway = batch.gateway.unwrap_or_else(|| default_gateway(batch.base_address));

    let mut nodes = Vec::with_capacity(batch.count as usize);
    for i in 0..batch.count {
        let octet = base_octet as u32 + i;
        if !(1..=254).contains(&octet) {
            return Err(ProvisionError::Allocation { index: i, octet });
        }
        nodes.push(NodeSpec {
            id: batch.base_id + i,
            hostname: format!("{}-{}", cfg.hostname_prefix, i),
            address: Ipv4Addr::new(a, b, c, octet as u8),
            prefix: batch.prefix,
            gateway,
            dns: cfg.dns,
            cores: cfg.cores,
            memory_mib: cfg.memory_mib,
            disk_gib: cfg.disk_gib,
            vm_disk_gib: None,
            unprivileged: batch.unprivileged,
        });
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(base_id: u32, count: u32, addr: &str) -> BatchSpec {
        let (base_address, prefix) = parse_cidr(addr).unwrap();
        BatchSpec {
            base_id,
            count,
            base_address,
            prefix,
            gateway: None,
            unprivileged: true,
        }
    }

    #[test]
    fn test_deterministic_naming() {
        let cfg = ProvisionConfig::default();
        let nodes = plan(&batch(100, 3, "192.168.0.10/24"), &cfg).unwrap();

        let got: Vec<(u32, &str, String)> = nodes
            .iter()
            .map(|n| (n.id, n.hostname.as_str(), format!("{}/{}", n.address, n.prefix)))
            .collect();
        assert_eq!(
            got,
            vec![
                (100, "node-0", "192.168.0.10/24".to_string()),
                (101, "node-1", "192.168.0.11/24".to_string()),
                (102, "node-2", "192.168.0.12/24".to_string()),
            ]
        );
    }

    #[test]
    fn test_allocation_bound() {
        let cfg = ProvisionConfig::default();
        // 250 + 4 = 254: the last representable octet
        assert!(plan(&batch(100, 5, "192.168.0.250/24"), &cfg).is_ok());
        // 250 + 9 = 259: rejected up front, no partial plan
        let err = plan(&batch(100, 10, "192.168.0.250/24"), &cfg).unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Allocation { octet: 255, index: 5 }
        ));
    }

    #[test]
    fn test_zero_count_is_validation_error() {
        let cfg = ProvisionConfig::default();
        let err = plan(&batch(100, 0, "192.168.0.10/24"), &cfg).unwrap_err();
        assert!(matches!(err, ProvisionError::Validation(_)));
    }

    #[test]
    fn test_gateway_defaults_to_dot_one() {
        let cfg = ProvisionConfig::default();
        let nodes = plan(&batch(200, 2, "10.0.5.30/24"), &cfg).unwrap();
        assert_eq!(nodes[0].gateway, "10.0.5.1".parse::<Ipv4Addr>().unwrap());
        assert_eq!(nodes[1].gateway, nodes[0].gateway);
    }

    #[test]
    fn test_explicit_gateway_is_kept() {
        let cfg = ProvisionConfig::default();
        let mut b = batch(200, 1, "10.0.5.30/24");
        b.gateway = Some("10.0.5.254".parse().unwrap());
        let nodes = plan(&b, &cfg).unwrap();
        assert_eq!(nodes[0].gateway, "10.0.5.254".parse::<Ipv4Addr>().unwrap());
    }

    #[test]
    fn test_ids_and_addresses_unique() {
        let cfg = ProvisionConfig::default();
        let nodes = plan(&batch(500, 50, "172.16.4.100/24"), &cfg).unwrap();
        let mut ids: Vec<u32> = nodes.iter().map(|n| n.id).collect();
        let mut addrs: Vec<Ipv4Addr> = nodes.iter().map(|n| n.address).collect();
        ids.dedup();
        addrs.dedup();
        assert_eq!(ids.len(), 50);
        assert_eq!(addrs.len(), 50);
    }

    #[test]
    fn test_parse_cidr_defaults_to_24() {
        let (addr, prefix) = parse_cidr("192.168.1.40").unwrap();
        assert_eq!(addr, "192.168.1.40".parse::<Ipv4Addr>().unwrap());
        assert_eq!(prefix, 24);
    }

    #[test]
    fn test_validate_hostname() {
        assert!(validate_hostname("node-0").is_ok());
        assert!(validate_hostname("web3").is_ok());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("Node-0").is_err());
        assert!(validate_hostname("-node").is_err());
        assert!(validate_hostname("node_0").is_err());
    }

    #[test]
    fn test_parse_cidr_rejects_garbage() {
        assert!(parse_cidr("not-an-address").is_err());
        assert!(parse_cidr("192.168.1.40/33").is_err());
        assert!(parse_cidr("192.168.1.40/zero").is_err());
    }
}
