use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use cidr::Ipv4Cidr;

use crate::error::{Error, Result};

/// An IPv4 address block: base address plus prefix length. Immutable once
/// constructed. Any child block derived from it nests entirely within its
/// parent's range.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AddressSpace(Ipv4Cidr);

impl AddressSpace {
    /// Parses `"a.b.c.d/len"` into an address space.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` on malformed input, including host bits
    /// set beyond the prefix length.
    pub fn parse(text: &str) -> Result<Self> {
        text.parse::<Ipv4Cidr>()
            .map(Self)
            .map_err(|e| Error::Validation(format!("cidr validation error: {e}")))
    }

    /// The base (network) address of the block.
    #[must_use]
    pub fn base(&self) -> Ipv4Addr {
        self.0.first_address()
    }

    /// The prefix length of the block (0-32).
    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.0.network_length()
    }

    fn bounds(&self) -> (u32, u32) {
        (
            u32::from(self.0.first_address()),
            u32::from(self.0.last_address()),
        )
    }

    /// Whether `other`'s range lies entirely within this block.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        let (lo, hi) = self.bounds();
        let (other_lo, other_hi) = other.bounds();
        lo <= other_lo && other_hi <= hi
    }

    /// Whether the two blocks share any address.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let (lo, hi) = self.bounds();
        let (other_lo, other_hi) = other.bounds();
        lo <= other_hi && other_lo <= hi
    }

    /// Splits the block into equal binary children, returning the full child
    /// set at the first prefix length whose count reaches `target_count`.
    ///
    /// Candidate lengths run from the current prefix toward /32; stopping at
    /// the minimal sufficient split keeps the children non-overlapping while
    /// wasting no address space. Returns `None` when no length up to /32
    /// yields enough children.
    #[must_use]
    pub fn subdivide(&self, target_count: u32) -> Option<Vec<Self>> {
        let prefix = self.prefix();
        for length in prefix..=32 {
            let count = 1u64 << (length - prefix);
            if count >= u64::from(target_count) {
                return Some(self.children_at(length, count));
            }
        }
        None
    }

    fn children_at(&self, length: u8, count: u64) -> Vec<Self> {
        let mut children = Vec::with_capacity(count as usize);
        let mut base = u32::from(self.0.first_address());
        for i in 0..count {
            let child = Ipv4Cidr::new(Ipv4Addr::from(base), length)
                .expect("binary-split child is aligned to its prefix");
            children.push(Self(child));
            // The step only exists for count >= 2, where length >= 1.
            if i + 1 < count {
                base += 1u32 << (32 - length);
            }
        }
        children
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0.first_address(), self.0.network_length())
    }
}

impl FromStr for AddressSpace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
