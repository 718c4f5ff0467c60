use crate::adapter::{HookAction, HookRequest, discover_code_unit, discover_routine};
use crate::error::LoopscopeError;
use crate::registry::LoopRegistry;
use crate::report::{self, ReportRow};
use crate::routine::RoutineAccounting;
use loopscope_host::{
    CodeUnit, HookArgs, HookId, InsertionPoint, Instrumenter, ProgramImages, Routine,
};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{Level, error, event};


/// The loop profiler as the instrumentation host sees it.
///
/// Owns every piece of profiling state. Hooks requested at discovery time are
/// appended to a dispatch table and handed to the host as [`HookId`]s, which
/// are indices into that table.
#[derive(Debug, Default)]
pub struct Profiler {
    loops: LoopRegistry,
    routines: RoutineAccounting,
    dispatch: RwLock<Vec<HookAction>>,
    report_path: Option<PathBuf>,
}

impl Profiler {
    /// A profiler that keeps its results in memory
    pub fn new() -> Self {
        Self::default()
    }

    /// A profiler that writes its report to `path` when the program ends
    pub fn with_report<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            report_path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn loops(&self) -> &LoopRegistry {
        &self.loops
    }

    pub fn routines(&self) -> &RoutineAccounting {
        &self.routines
    }

    /// Number of hooks installed so far
    pub fn hook_count(&self) -> usize {
        self.dispatch.read().len()
    }

    /// Turn discovery-time requests into dispatch entries. Loop hooks register
    /// their loop as they are installed, so every instrumented backward branch
    /// has a record before it first runs.
    pub fn install(&self, requests: Vec<HookRequest>) -> Vec<(InsertionPoint, HookId)> {
        let mut table = self.dispatch.write();
        requests
            .into_iter()
            .map(|HookRequest { point, action }| {
                if let HookAction::EvaluateLoopBranch { header, owner } = &action {
                    self.loops.discover(*header, owner.clone());
                }
                table.push(action);
                (point, HookId(table.len() - 1))
            })
            .collect()
    }

    fn apply(&self, action: &HookAction, args: HookArgs) {
        match action {
            HookAction::CountInstructions { routine, count } => {
                self.routines.add_instructions(*routine, *count)
            }
            HookAction::EvaluateLoopBranch { header, .. } => {
                self.loops.on_branch_evaluated(*header, args.branch_taken)
            }
            HookAction::CountCall { routine } => self.routines.record_call(*routine),
        }
    }

    pub fn report(&self) -> Vec<ReportRow> {
        report::rows(&self.loops, &self.routines)
    }

    pub fn write_report<P: AsRef<Path>>(&self, path: P) -> Result<(), LoopscopeError> {
        report::write_report(path, &self.report())
    }
}

impl Instrumenter for Profiler {
    fn instrument_code_unit(
        &self,
        unit: &CodeUnit,
        program: &dyn ProgramImages,
    ) -> Vec<(InsertionPoint, HookId)> {
        self.install(discover_code_unit(unit, program))
    }

    fn instrument_routine(&self, routine: &Routine) -> Vec<(InsertionPoint, HookId)> {
        self.install(vec![discover_routine(routine)])
    }

    fn invoke(&self, hook: HookId, args: HookArgs) {
        match self.dispatch.read().get(hook.0) {
            Some(action) => self.apply(action, args),
            None => event!(Level::TRACE, hook = hook.0, "Ignoring unknown hook"),
        }
    }

    fn fini(&self, exit_code: i32) {
        event!(
            Level::INFO,
            exit_code,
            loops = self.loops.len(),
            "Profiled program finished"
        );
        let Some(path) = &self.report_path else {
            return;
        };
        if let Err(e) = self.write_report(path) {
            error!("{}", e);
        }
    }
}
