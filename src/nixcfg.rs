use anyhow::Result;

use crate::config::ProvisionConfig;
use crate::plan::NodeSpec;

/// Guest kind, which picks the virtualisation module the generated
/// configuration imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestKind {
    Container,
    Vm,
}

/// Path inside the guest where the payload is delivered.
pub const GUEST_CONFIG_PATH: &str = "/etc/nixos/configuration.nix";

const CONFIG_TEMPLATE: &str = r#"{ config, pkgs, lib, ... }:

{
  imports = [ <nixpkgs/nixos/modules/virtualisation/{{ virt_module }}> ];

  networking.hostName = "{{ hostname }}";
  networking.useDHCP = false;
  networking.interfaces.eth0.ipv4.addresses = [{
    address = "{{ address }}";
    prefixLength = {{ prefix }};
  }];
  networking.defaultGateway = "{{ gateway }}";
  networking.nameservers = [ "{{ dns }}" ];

  environment.systemPackages = with pkgs; [ {{ packages }} ];

  services.openssh.enable = true;
  services.openssh.settings.PermitRootLogin = "yes";

  system.stateVersion = "{{ state_version }}";
}
"#;

/// Render the configuration.nix payload for one node.
///
/// A pure function of the spec and config: identical inputs always yield
/// byte-identical output, which is what makes re-delivering the payload a
/// no-op on an unchanged node.
pub fn render(spec: &NodeSpec, cfg: &ProvisionConfig, kind: GuestKind) -> Result<String> {
    let mut tera = tera::Tera::default();
    tera.add_raw_template("configuration.nix", CONFIG_TEMPLATE)
        .map_err(|e| anyhow::anyhow!("Failed to parse configuration template: {}", e))?;

    let mut ctx = tera::Context::new();
    ctx.insert(
        "virt_module",
        match kind {
            GuestKind::Container => "proxmox-lxc.nix",
            GuestKind::Vm => "proxmox-image.nix",
        },
    );
    ctx.insert("hostname", &spec.hostname);
    ctx.insert("address", &spec.address.to_string());
    ctx.insert("prefix", &spec.prefix);
    ctx.insert("gateway", &spec.gateway.to_string());
    ctx.insert("dns", &spec.dns.to_string());
    ctx.insert("packages", &cfg.packages.join(" "));
    ctx.insert("state_version", &cfg.state_version);

    tera.render("configuration.nix", &ctx)
        .map_err(|e| anyhow::anyhow!("Failed to render configuration template: {}", e))
}
