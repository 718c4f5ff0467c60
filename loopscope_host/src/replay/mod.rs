//! A deterministic instrumentation host.
//!
//! [`ReplayHost`] drives an [`Instrumenter`] from a [`Recording`] of a program
//! run instead of from live machine code. It keeps the same contract a binary
//! instrumentation engine would: routines are offered to the tool when their
//! image loads, a code unit is offered exactly once, the first time execution
//! reaches it, and hooks then fire on every execution of their insertion point.
mod recording;

pub use recording::{ExecutionEvent, Recording};

use crate::error::LoopscopeHostError;
use crate::hook::{HookArgs, HookId, InsertionPoint, Instrumenter};
use crate::Address;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::thread;
use tracing::{event, instrument, Level};

#[derive(Debug)]
pub struct ReplayHost {
    recording: Recording,
    block_index: BTreeMap<Address, usize>,
}

/// Hooks installed so far, and which code units have been offered to the tool
#[derive(Debug, Default)]
struct HookTable {
    hooks: RwLock<HashMap<InsertionPoint, Vec<HookId>>>,
    discovered: Mutex<Vec<bool>>,
}

impl HookTable {
    fn install<I: IntoIterator<Item = (InsertionPoint, HookId)>>(&self, requests: I) {
        let mut hooks = self.hooks.write();
        for (point, id) in requests {
            hooks.entry(point).or_default().push(id);
        }
    }

    fn fire<T: Instrumenter>(&self, tool: &T, point: InsertionPoint, args: HookArgs) {
        if let Some(ids) = self.hooks.read().get(&point) {
            for id in ids {
                tool.invoke(*id, args);
            }
        }
    }
}

impl ReplayHost {
    pub fn new(recording: Recording) -> Result<Self, LoopscopeHostError> {
        recording.validate()?;
        Ok(Self::from_validated(recording))
    }

    /// Load and validate a recording from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoopscopeHostError> {
        Ok(Self::from_validated(Recording::load(path)?))
    }

    fn from_validated(recording: Recording) -> Self {
        let block_index = recording.block_index();
        Self {
            recording,
            block_index,
        }
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Run the recorded program to completion under `tool`, then call
    /// [`Instrumenter::fini`]. Each recorded thread replays on its own OS thread.
    #[instrument(skip_all, fields(threads = self.recording.threads.len()))]
    pub fn run<T: Instrumenter>(&self, tool: &T) {
        let table = HookTable {
            discovered: Mutex::new(vec![false; self.recording.code_units.len()]),
            ..Default::default()
        };
        for routine in &self.recording.routines {
            table.install(tool.instrument_routine(routine));
        }
        event!(
            Level::DEBUG,
            routines = self.recording.routines.len(),
            "Instrumented routines"
        );

        thread::scope(|s| {
            let handles: Vec<_> = self
                .recording
                .threads
                .iter()
                .enumerate()
                .map(|(tid, log)| {
                    let table = &table;
                    s.spawn(move || self.replay_thread(tid, log, tool, table))
                })
                .collect();
            for handle in handles {
                if let Err(panic) = handle.join() {
                    std::panic::resume_unwind(panic);
                }
            }
        });

        tool.fini(0);
    }

    fn replay_thread<T: Instrumenter>(
        &self,
        tid: usize,
        log: &[ExecutionEvent],
        tool: &T,
        table: &HookTable,
    ) {
        event!(Level::TRACE, tid, events = log.len(), "Replaying thread");
        for ev in log {
            match *ev {
                ExecutionEvent::EnterBlock(addr) => {
                    self.ensure_discovered(addr, tool, table);
                    table.fire(tool, InsertionPoint::BlockEntry(addr), HookArgs::default());
                }
                ExecutionEvent::Branch { address, taken } => {
                    self.ensure_discovered(address, tool, table);
                    table.fire(
                        tool,
                        InsertionPoint::BeforeInstruction(address),
                        HookArgs {
                            branch_taken: taken,
                        },
                    );
                }
                ExecutionEvent::Return(routine) => {
                    table.fire(tool, InsertionPoint::RoutineExit(routine), HookArgs::default());
                }
            }
        }
    }

    /// Offer the code unit covering `addr` to the tool if no thread has yet.
    /// Discovery is serialized across threads.
    fn ensure_discovered<T: Instrumenter>(&self, addr: Address, tool: &T, table: &HookTable) {
        let Some(idx) = self.recording.unit_index(&self.block_index, addr) else {
            tracing::warn!("No code unit covers {:#x}", addr);
            return;
        };
        let mut discovered = table.discovered.lock();
        if discovered[idx] {
            return;
        }
        let unit = &self.recording.code_units[idx];
        let requests = tool.instrument_code_unit(unit, &self.recording);
        event!(
            Level::DEBUG,
            unit = format_args!("{:#x}", unit.address()),
            hooks = requests.len(),
            "Instrumented code unit"
        );
        table.install(requests);
        discovered[idx] = true;
    }
}
