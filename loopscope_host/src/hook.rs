use crate::{Address, CodeUnit, ProgramImages, Routine};

/// A place in the profiled program where the host can run a callback
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InsertionPoint {
    /// Every time the basic block starting at this address is entered
    BlockEntry(Address),
    /// Just before the instruction at this address executes
    BeforeInstruction(Address),
    /// Every time the routine starting at this address returns
    RoutineExit(Address),
}

/// Identifies a callback the tool handed to the host. The host never looks
/// inside; it only passes the id back through [`Instrumenter::invoke`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(pub usize);

/// Values only known when a hook actually fires
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HookArgs {
    /// For hooks placed before a branch: whether that branch is about to be taken
    pub branch_taken: bool,
}

/// The tool side of the instrumentation interface.
///
/// The `instrument_*` methods run at discovery time, once per code unit or
/// routine, and tell the host where to place which hooks. [`Instrumenter::invoke`]
/// runs inline with the profiled program, possibly on many threads at once,
/// and so must neither block for long nor panic.
pub trait Instrumenter: Sync {
    fn instrument_code_unit(
        &self,
        unit: &CodeUnit,
        program: &dyn ProgramImages,
    ) -> Vec<(InsertionPoint, HookId)>;

    fn instrument_routine(&self, routine: &Routine) -> Vec<(InsertionPoint, HookId)>;

    fn invoke(&self, hook: HookId, args: HookArgs);

    /// Called exactly once, when the profiled program ends normally
    fn fini(&self, exit_code: i32);
}

impl<T: Instrumenter> Instrumenter for &T {
    fn instrument_code_unit(
        &self,
        unit: &CodeUnit,
        program: &dyn ProgramImages,
    ) -> Vec<(InsertionPoint, HookId)> {
        (*self).instrument_code_unit(unit, program)
    }

    fn instrument_routine(&self, routine: &Routine) -> Vec<(InsertionPoint, HookId)> {
        (*self).instrument_routine(routine)
    }

    fn invoke(&self, hook: HookId, args: HookArgs) {
        (*self).invoke(hook, args)
    }

    fn fini(&self, exit_code: i32) {
        (*self).fini(exit_code)
    }
}
