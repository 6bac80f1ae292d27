//! Candidate address planning around a scan origin

use std::net::Ipv4Addr;

/// How wide a net to cast around the local address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceClass {
    /// Ordinary LAN segment: the /24 around the local address.
    Lan,
    /// Tunnel/VPN interface: the /16 around the local address.
    Tunnel,
}

/// Lazy, restartable sequence of candidate addresses.
///
/// Only the numeric bounds are held, so a tunnel-sized range costs the same
/// as a /24. Clone the range to restart it from the beginning.
#[derive(Debug, Clone)]
pub struct CandidateRange {
    next: u32,
    end: u32,
    exhausted: bool,
}

impl CandidateRange {
    fn new(start: u32, end: u32) -> Self {
        Self {
            next: start,
            end,
            exhausted: start > end,
        }
    }

    fn empty() -> Self {
        Self {
            next: 0,
            end: 0,
            exhausted: true,
        }
    }

    /// Number of candidates not yet produced.
    pub fn remaining(&self) -> u64 {
        if self.exhausted {
            0
        } else {
            u64::from(self.end - self.next) + 1
        }
    }
}

impl Iterator for CandidateRange {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        if self.exhausted {
            return None;
        }
        let addr = Ipv4Addr::from(self.next);
        if self.next == self.end {
            self.exhausted = true;
        } else {
            self.next += 1;
        }
        Some(addr)
    }
}

/// Compute the ordered candidate space around a local address.
///
/// Candidates come out in ascending numeric order. A malformed local address
/// yields an empty range: nothing to scan, not an error.
pub fn plan_candidates(local: &str, class: InterfaceClass) -> CandidateRange {
    let Ok(addr) = local.parse::<Ipv4Addr>() else {
        return CandidateRange::empty();
    };
    let base = u32::from(addr);
    match class {
        // .0 (network) and .255 (broadcast) are excluded.
        InterfaceClass::Lan => CandidateRange::new((base & 0xffff_ff00) | 1, (base & 0xffff_ff00) | 254),
        InterfaceClass::Tunnel => {
            CandidateRange::new(base & 0xffff_0000, (base & 0xffff_0000) | 0x0000_ffff)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lan_range_covers_1_through_254() {
        let range = plan_candidates("192.168.1.42", InterfaceClass::Lan);
        assert_eq!(range.remaining(), 254);

        let addrs: Vec<Ipv4Addr> = range.collect();
        assert_eq!(addrs.len(), 254);
        assert_eq!(addrs[0], Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(addrs[253], Ipv4Addr::new(192, 168, 1, 254));
        assert!(!addrs.contains(&Ipv4Addr::new(192, 168, 1, 0)));
        assert!(!addrs.contains(&Ipv4Addr::new(192, 168, 1, 255)));
    }

    #[test]
    fn lan_range_is_ascending() {
        let addrs: Vec<Ipv4Addr> = plan_candidates("10.0.0.7", InterfaceClass::Lan).collect();
        let mut sorted = addrs.clone();
        sorted.sort();
        assert_eq!(addrs, sorted);
    }

    #[test]
    fn tunnel_range_spans_the_16() {
        let range = plan_candidates("10.8.131.7", InterfaceClass::Tunnel);
        assert_eq!(range.remaining(), 65_536);

        let mut range = range;
        assert_eq!(range.next(), Some(Ipv4Addr::new(10, 8, 0, 0)));
        assert_eq!(range.next(), Some(Ipv4Addr::new(10, 8, 0, 1)));
        assert_eq!(range.remaining(), 65_534);
    }

    #[test]
    fn malformed_address_yields_empty_range() {
        let mut range = plan_candidates("not.an.ip", InterfaceClass::Lan);
        assert_eq!(range.remaining(), 0);
        assert_eq!(range.next(), None);

        assert_eq!(plan_candidates("", InterfaceClass::Lan).remaining(), 0);
        assert_eq!(plan_candidates("192.168.1", InterfaceClass::Lan).remaining(), 0);
        assert_eq!(plan_candidates("192.168.1.300", InterfaceClass::Tunnel).remaining(), 0);
    }

    #[test]
    fn clone_restarts_the_sequence() {
        let fresh = plan_candidates("192.168.1.42", InterfaceClass::Lan);
        let mut advanced = fresh.clone();
        advanced.by_ref().take(100).for_each(drop);
        assert_eq!(advanced.remaining(), 154);
        assert_eq!(fresh.remaining(), 254);
        assert_eq!(fresh.clone().next(), Some(Ipv4Addr::new(192, 168, 1, 1)));
    }

    #[test]
    fn range_terminates_at_address_space_edge() {
        let addrs: Vec<Ipv4Addr> = plan_candidates("255.255.255.1", InterfaceClass::Tunnel).collect();
        assert_eq!(addrs.len(), 65_536);
        assert_eq!(addrs[65_535], Ipv4Addr::new(255, 255, 255, 255));
    }
}
