use crate::display::GeneralFloat;
use crate::error::LoopscopeError;
use crate::registry::{LoopRecord, LoopRegistry};
use crate::routine::RoutineAccounting;
use internment::Intern;
use itertools::Itertools;
use loopscope_host::Address;
use std::cmp::Reverse;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{Level, event, instrument};

/// Name of the report written when no other path is configured
pub const DEFAULT_REPORT_PATH: &str = "loop-count.csv";

/// One line of the loop report
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    pub header: Address,
    pub count_seen: u64,
    pub count_invoked: u64,
    pub diff_count: u64,
    pub routine_name: Intern<String>,
    pub routine_address: Address,
    /// Total instructions executed by the owning routine
    pub routine_instructions: u64,
    /// Total calls of the owning routine
    pub routine_calls: u64,
}

impl ReportRow {
    fn new(record: &LoopRecord, routines: &RoutineAccounting) -> Self {
        let routine_address = record.owner_address();
        Self {
            header: record.header,
            count_seen: record.count_seen,
            count_invoked: record.count_invoked,
            diff_count: record.diff_count,
            routine_name: record
                .owner
                .as_ref()
                .map(|o| o.name)
                .unwrap_or_else(|| Intern::from_ref("")),
            routine_address,
            routine_instructions: routines.instructions(routine_address),
            routine_calls: routines.calls(routine_address),
        }
    }

    /// Mean backward-branch evaluations per invocation
    pub fn average(&self) -> f64 {
        self.count_seen as f64 / self.count_invoked as f64
    }
}

impl Display for ReportRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:#x}, {}, {}, {}, {}, {}, {:#x}, {}, {}",
            self.header,
            self.count_seen,
            self.count_invoked,
            GeneralFloat(self.average()),
            self.diff_count,
            self.routine_name,
            self.routine_address,
            self.routine_instructions,
            self.routine_calls
        )
    }
}

/// Build the report: every loop that was both evaluated and exited at least
/// once, hottest first. Loops with equal `count_seen` appear in header order.
pub fn rows(loops: &LoopRegistry, routines: &RoutineAccounting) -> Vec<ReportRow> {
    loops
        .snapshot()
        .into_iter()
        .filter(|r| r.count_seen > 0 && r.count_invoked > 0)
        .sorted_by_key(|r| (Reverse(r.count_seen), r.header))
        .map(|r| ReportRow::new(&r, routines))
        .collect()
}

/// Write `rows` to `path`, one CSV line each, replacing any existing file
#[instrument(skip_all, fields(path = %path.as_ref().display(), rows = rows.len()))]
pub fn write_report<P: AsRef<Path>>(path: P, rows: &[ReportRow]) -> Result<(), LoopscopeError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| LoopscopeError::ReportOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    for row in rows {
        writeln!(out, "{}", row)?;
    }
    out.flush()?;
    event!(Level::INFO, "Wrote loop report");
    Ok(())
}
