//! Network interface enumeration and local address resolution

use std::collections::HashSet;
use std::net::Ipv4Addr;
use tracing::{debug, warn};

/// Source of scan-eligible interfaces and their local addresses.
///
/// The orchestrator only talks to this trait, so tests can substitute a
/// static implementation and never touch real OS interfaces.
pub trait InterfaceProvider: Send + Sync {
    /// Names of interfaces eligible as scan origins: present on the system,
    /// carrying an address, and listed in the allow-list. Deduplicated by
    /// name, enumeration order preserved.
    ///
    /// An OS enumeration failure degrades to an empty list.
    fn eligible_interfaces(&self, allowlist: &[String]) -> Vec<String>;

    /// First IPv4 address of the named interface, considering only
    /// interfaces that are administratively up and operationally running.
    fn local_address(&self, name: &str) -> Option<Ipv4Addr>;
}

/// OS-backed interface provider.
pub struct SystemInterfaces;

impl InterfaceProvider for SystemInterfaces {
    fn eligible_interfaces(&self, allowlist: &[String]) -> Vec<String> {
        use network_interface::{NetworkInterface, NetworkInterfaceConfig};

        let interfaces = match NetworkInterface::show() {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Interface enumeration failed");
                return Vec::new();
            }
        };

        // An interface shows up once per assigned address on some platforms.
        let names = dedup_names(
            interfaces
                .into_iter()
                .filter(|iface| !iface.addr.is_empty() && allowlist.iter().any(|n| n == &iface.name))
                .map(|iface| iface.name),
        );

        debug!(interfaces = ?names, "Eligible interfaces");
        names
    }

    fn local_address(&self, name: &str) -> Option<Ipv4Addr> {
        use pnet::datalink;
        use pnet::ipnetwork::IpNetwork;

        datalink::interfaces()
            .into_iter()
            .filter(|iface| iface.name == name && iface.is_up() && iface.is_running())
            .flat_map(|iface| iface.ips)
            .find_map(|ip| match ip {
                IpNetwork::V4(net) => Some(net.ip()),
                IpNetwork::V6(_) => None,
            })
    }
}

/// Order-preserving deduplication by name.
fn dedup_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserves_first_occurrence_order() {
        let names = dedup_names(
            ["en0", "bridge100", "en0", "utun0", "bridge100"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(names, vec!["en0", "bridge100", "utun0"]);
    }

    #[test]
    fn dedup_of_empty_input_is_empty() {
        assert!(dedup_names(Vec::new()).is_empty());
    }

    #[test]
    fn system_enumeration_respects_allowlist() {
        // No interface is ever named this, so the result must be empty no
        // matter what the host looks like.
        let allowlist = vec!["lanscout-no-such-iface".to_string()];
        assert!(SystemInterfaces.eligible_interfaces(&allowlist).is_empty());
    }

    #[test]
    fn empty_allowlist_matches_nothing() {
        assert!(SystemInterfaces.eligible_interfaces(&[]).is_empty());
    }
}
