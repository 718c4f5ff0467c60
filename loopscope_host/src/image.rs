use crate::Address;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A module loaded into the profiled process: the main executable or a shared library
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    /// First address mapped by this image
    pub low: Address,
    /// One past the last address mapped by this image
    pub high: Address,
    /// Whether this is the profiled program itself rather than something it loaded
    #[serde(default)]
    pub main_executable: bool,
}

impl Image {
    pub fn range(&self) -> Range<Address> {
        self.low..self.high
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.range().contains(&addr)
    }

    pub fn overlaps(&self, other: &Image) -> bool {
        self.low < other.high && other.low < self.high
    }
}

/// A function the host has symbolized
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    /// Start address of the routine
    pub address: Address,
    /// Number of bytes covered by the routine
    pub size: u64,
}

impl Routine {
    pub fn contains(&self, addr: Address) -> bool {
        (self.address..self.address.saturating_add(self.size)).contains(&addr)
    }
}

/// Address-to-module and address-to-routine resolution, as the host provides it.
///
/// Both lookups may fail: code can live outside any known image (JIT'd code,
/// trampolines) and stripped code has no routine.
pub trait ProgramImages {
    fn image_containing(&self, addr: Address) -> Option<&Image>;

    fn routine_containing(&self, addr: Address) -> Option<&Routine>;

    fn is_main_executable(&self, addr: Address) -> bool {
        self.image_containing(addr)
            .is_some_and(|img| img.main_executable)
    }
}

impl<T: ProgramImages> ProgramImages for &T {
    fn image_containing(&self, addr: Address) -> Option<&Image> {
        (*self).image_containing(addr)
    }

    fn routine_containing(&self, addr: Address) -> Option<&Routine> {
        (*self).routine_containing(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_ranges() {
        let a = Image {
            name: "a.out".to_string(),
            low: 0x1000,
            high: 0x2000,
            main_executable: true,
        };
        let b = Image {
            name: "libc.so".to_string(),
            low: 0x1800,
            high: 0x3000,
            main_executable: false,
        };
        assert!(a.contains(0x1fff));
        assert!(!a.contains(0x2000));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn routine_bounds() {
        let r = Routine {
            name: "main".to_string(),
            address: 0x1000,
            size: 0x20,
        };
        assert!(r.contains(0x1000));
        assert!(r.contains(0x101f));
        assert!(!r.contains(0x1020));
    }
}
