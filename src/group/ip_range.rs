//! IP allowlist ranges
//!
//! A range entry is either a single dotted quad (`10.0.0.1`) or an inclusive
//! `low-high` pair (`10.0.0.1-10.0.0.255`). Octets are decimal and may carry
//! leading zeros (`010.0.0.1` is `10.0.0.1`). Entries that do not parse are
//! skipped rather than rejected.

use tracing::trace;

/// Inclusive IPv4 range packed as 32-bit values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    low: u32,
    high: u32,
}

impl IpRange {
    /// Parse a range entry, returning `None` if either side is not four octets
    pub fn parse(entry: &str) -> Option<Self> {
        let (low, high) = match entry.split_once('-') {
            Some((low, high)) => (pack(low)?, pack(high)?),
            None => {
                let single = pack(entry)?;
                (single, single)
            }
        };
        Some(Self { low, high })
    }

    pub fn contains(&self, ip: u32) -> bool {
        self.low <= ip && ip <= self.high
    }
}

/// Pack a dotted quad into `(o0<<24)+(o1<<16)+(o2<<8)+o3`
pub fn pack(quad: &str) -> Option<u32> {
    let mut octets = quad.trim().split('.');
    let mut packed = 0u32;
    for _ in 0..4 {
        let octet = octets.next()?;
        if octet.is_empty() || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        packed = (packed << 8) | u32::from(octet.parse::<u8>().ok()?);
    }
    octets.next().is_none().then_some(packed)
}

/// Whether `ip` falls inside any well-formed entry of `ranges`
pub fn matches_any<S: AsRef<str>>(ranges: &[S], ip: &str) -> bool {
    let Some(ip) = pack(ip) else {
        trace!(ip, "Request IP is not a dotted quad");
        return false;
    };

    ranges.iter().any(|entry| match IpRange::parse(entry.as_ref()) {
        Some(range) => range.contains(ip),
        None => {
            trace!(entry = entry.as_ref(), "Skipping malformed IP range");
            false
        }
    })
}
