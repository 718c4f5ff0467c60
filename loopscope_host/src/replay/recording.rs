use crate::error::LoopscopeHostError;
use crate::{Address, CodeUnit, Image, ProgramImages, Routine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One thing a thread of the profiled program did
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// Control entered the basic block starting at this address
    EnterBlock(Address),
    /// The branch instruction at `address` was evaluated
    Branch { address: Address, taken: bool },
    /// The routine starting at this address returned
    Return(Address),
}

/// The structure of a program as the host discovered it, together with what
/// each of its threads executed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub images: Vec<Image>,
    #[serde(default)]
    pub routines: Vec<Routine>,
    #[serde(default)]
    pub code_units: Vec<CodeUnit>,
    /// One event log per thread
    #[serde(default)]
    pub threads: Vec<Vec<ExecutionEvent>>,
}

impl Recording {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoopscopeHostError> {
        let recording: Recording = serde_json::from_reader(reader)?;
        recording.validate()?;
        Ok(recording)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoopscopeHostError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn validate(&self) -> Result<(), LoopscopeHostError> {
        for unit in &self.code_units {
            if unit.blocks.is_empty() || unit.blocks.iter().any(|b| b.is_empty()) {
                return Err(LoopscopeHostError::EmptyBlock(unit.address()));
            }
            if let Some(i) = unit
                .blocks
                .iter()
                .flat_map(|b| &b.instructions)
                .find(|i| i.checked_next_addr().is_none())
            {
                return Err(LoopscopeHostError::AddressOverflow(i.address));
            }
        }
        for (i, a) in self.images.iter().enumerate() {
            if let Some(b) = self.images[i + 1..].iter().find(|b| a.overlaps(b)) {
                return Err(LoopscopeHostError::OverlappingImages(
                    a.name.clone(),
                    b.name.clone(),
                ));
            }
        }
        self.check_code_units_disjoint()?;
        let index = self.block_index();
        for event in self.threads.iter().flatten() {
            match event {
                ExecutionEvent::EnterBlock(addr)
                | ExecutionEvent::Branch { address: addr, .. } => {
                    if self.unit_index(&index, *addr).is_none() {
                        return Err(LoopscopeHostError::UnknownCodeAddress(*addr));
                    }
                }
                ExecutionEvent::Return(_) => {}
            }
        }
        Ok(())
    }

    /// Sweeps every block range in address order; a block starting before the
    /// furthest end seen so far overlaps it.
    fn check_code_units_disjoint(&self) -> Result<(), LoopscopeHostError> {
        let mut ranges: Vec<(Address, Address, usize)> = self
            .code_units
            .iter()
            .enumerate()
            .flat_map(|(u, unit)| {
                unit.blocks
                    .iter()
                    .map(move |b| (b.address(), b.end_address(), u))
            })
            .collect();
        ranges.sort_unstable();
        let mut furthest: Option<(Address, usize)> = None;
        for (start, end, unit) in ranges {
            if let Some((prev_end, prev_unit)) = furthest {
                if start < prev_end && unit != prev_unit {
                    return Err(LoopscopeHostError::OverlappingCodeUnits(
                        self.code_units[prev_unit].address(),
                        self.code_units[unit].address(),
                    ));
                }
                if end <= prev_end {
                    continue;
                }
            }
            furthest = Some((end, unit));
        }
        Ok(())
    }

    /// Maps every block start to the code unit declaring that block
    pub(crate) fn block_index(&self) -> BTreeMap<Address, usize> {
        let mut index = BTreeMap::new();
        for (i, unit) in self.code_units.iter().enumerate() {
            for block in &unit.blocks {
                index.entry(block.address()).or_insert(i);
            }
        }
        index
    }

    pub(crate) fn unit_index(
        &self,
        index: &BTreeMap<Address, usize>,
        addr: Address,
    ) -> Option<usize> {
        let (_, &i) = index.range(..=addr).next_back()?;
        self.code_units[i].contains(addr).then_some(i)
    }
}

impl ProgramImages for Recording {
    fn image_containing(&self, addr: Address) -> Option<&Image> {
        self.images.iter().find(|img| img.contains(addr))
    }

    fn routine_containing(&self, addr: Address) -> Option<&Routine> {
        self.routines.iter().find(|r| r.contains(addr))
    }
}
