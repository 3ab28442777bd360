//! Lab-target authorization.
//!
//! The substrate only ever dispatches a tool at a target that is provably
//! inside the assessment lab: an RFC1918 or loopback IPv4 address, a CIDR
//! entirely contained in those blocks, or a hostname under `.lab.internal`.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

/// Hostname suffix that marks a name as belonging to the lab.
pub const LAB_DOMAIN_SUFFIX: &str = ".lab.internal";

/// The only address space a target may fall in.
static LAB_NETS: LazyLock<[Ipv4Net; 4]> = LazyLock::new(|| {
    [
        "10.0.0.0/8".parse().expect("valid lab net"),
        "172.16.0.0/12".parse().expect("valid lab net"),
        "192.168.0.0/16".parse().expect("valid lab net"),
        "127.0.0.0/8".parse().expect("valid lab net"),
    ]
});

/// Whether an IPv4 address is private (RFC1918) or loopback.
pub fn is_lab_address(addr: Ipv4Addr) -> bool {
    LAB_NETS.iter().any(|net| net.contains(&addr))
}

/// Whether an IPv4 network lies entirely within the lab address space.
pub fn is_lab_network(net: Ipv4Net) -> bool {
    LAB_NETS.iter().any(|lab| lab.contains(&net))
}

/// Authorize a raw target string.
///
/// Accepts `.lab.internal` hostnames, private/loopback IPv4 addresses, and
/// IPv4 CIDRs whose whole network is private/loopback. Everything else —
/// public addresses, IPv6 literals, malformed input — is rejected.
pub fn is_lab_target(target: &str) -> bool {
    let target = target.trim();
    if target.is_empty() {
        return false;
    }

    if target.ends_with(LAB_DOMAIN_SUFFIX) {
        return true;
    }

    if let Ok(addr) = target.parse::<Ipv4Addr>() {
        return is_lab_address(addr);
    }

    if let Ok(net) = target.parse::<Ipv4Net>() {
        return is_lab_network(net);
    }

    false
}

/// Parse a target as an IPv4 CIDR, if it is one. Plain addresses and
/// hostnames return `None`.
pub fn parse_cidr(target: &str) -> Option<Ipv4Net> {
    let trimmed = target.trim();
    if !trimmed.contains('/') {
        return None;
    }
    trimmed.parse::<Ipv4Net>().ok()
}

/// Number of addresses covered by an IPv4 network.
pub fn address_count(net: Ipv4Net) -> u64 {
    1u64 << (32 - u32::from(net.prefix_len()))
}

#[cfg(test)]
mod tests;
