//! Discovery-time decisions: which hooks go where.
//!
//! Nothing in here touches profiling state. Each function looks at code the
//! host has just discovered and returns the hooks the profiler should install;
//! [`crate::Profiler`] turns those requests into runtime dispatch entries.
use crate::registry::LoopOwner;
use loopscope_host::{Address, CodeUnit, InsertionPoint, Instruction, ProgramImages, Routine};
use tracing::{Level, event};

/// What an installed hook does when it fires
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookAction {
    /// Credit a block's instruction count to a routine
    CountInstructions { routine: Address, count: u64 },
    /// Feed the dynamic outcome of a backward branch to its loop
    EvaluateLoopBranch { header: Address, owner: LoopOwner },
    CountCall { routine: Address },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookRequest {
    pub point: InsertionPoint,
    pub action: HookAction,
}

/// The loop header formed by `ins`, if any: the target of a direct branch
/// that jumps to a lower address than its own.
pub fn loop_header(ins: &Instruction) -> Option<Address> {
    if !ins.is_branch() {
        return None;
    }
    ins.direct_branch_target().filter(|target| *target < ins.address)
}

/// Decide the hooks for a freshly discovered code unit.
///
/// Units outside any known routine are ignored entirely. Within a unit, only
/// blocks that end inside the main executable are instrumented; blocks of
/// shared libraries contribute neither instruction counts nor loops.
/// Instruction counts are credited to the routine the unit starts in, while a
/// loop is owned by the routine containing its backward branch.
pub fn discover_code_unit(unit: &CodeUnit, program: &dyn ProgramImages) -> Vec<HookRequest> {
    let Some(unit_routine) = program.routine_containing(unit.address()) else {
        event!(
            Level::TRACE,
            unit = format_args!("{:#x}", unit.address()),
            "Code unit has no routine, skipping"
        );
        return vec![];
    };

    let mut requests = Vec::new();
    for block in &unit.blocks {
        let Some(tail) = block.tail() else {
            continue;
        };
        if !program.is_main_executable(tail.address) {
            continue;
        }

        requests.push(HookRequest {
            point: InsertionPoint::BlockEntry(block.address()),
            action: HookAction::CountInstructions {
                routine: unit_routine.address,
                count: block.num_instructions() as u64,
            },
        });

        let Some(tail_routine) = program.routine_containing(tail.address) else {
            continue;
        };
        if let Some(header) = loop_header(tail) {
            event!(
                Level::DEBUG,
                header = format_args!("{:#x}", header),
                branch = format_args!("{:#x}", tail.address),
                routine = %tail_routine.name,
                "Found backward branch"
            );
            requests.push(HookRequest {
                point: InsertionPoint::BeforeInstruction(tail.address),
                action: HookAction::EvaluateLoopBranch {
                    header,
                    owner: LoopOwner::new(tail_routine.address, tail_routine.name.as_str()),
                },
            });
        }
    }
    requests
}

/// Every routine, whatever image it lives in, gets its calls counted on return
pub fn discover_routine(routine: &Routine) -> HookRequest {
    HookRequest {
        point: InsertionPoint::RoutineExit(routine.address),
        action: HookAction::CountCall {
            routine: routine.address,
        },
    }
}
