use internment::Intern;
use loopscope_host::Address;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

/// The routine a loop was discovered in
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LoopOwner {
    pub address: Address,
    pub name: Intern<String>,
}

impl LoopOwner {
    pub fn new<S: Into<String>>(address: Address, name: S) -> Self {
        Self {
            address,
            name: Intern::new(name.into()),
        }
    }
}

/// Accounting for one loop, identified by its header: the target of a
/// backward branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopRecord {
    pub header: Address,
    /// Fixed by the first discovery of the loop's backward branch
    pub owner: Option<LoopOwner>,
    /// Evaluations of the backward branch, taken or not
    pub count_seen: u64,
    /// Completed invocations, i.e. evaluations that fell out of the loop
    pub count_invoked: u64,
    pub curr_iter_num: u64,
    pub prev_iter_num: u64,
    /// Invocations whose trip count differed from the invocation before them
    pub diff_count: u64,
}

impl LoopRecord {
    pub fn new(header: Address) -> Self {
        Self {
            header,
            owner: None,
            count_seen: 0,
            count_invoked: 0,
            curr_iter_num: 0,
            prev_iter_num: 0,
            diff_count: 0,
        }
    }

    /// Advance the iteration state by one evaluation of the backward branch.
    ///
    /// The first invocation is compared against a previous trip count of zero,
    /// so any first invocation that iterates counts as a difference.
    pub fn record_branch(&mut self, taken: bool) {
        self.count_seen += 1;
        if taken {
            self.curr_iter_num += 1;
        } else {
            self.count_invoked += 1;
            if self.curr_iter_num != self.prev_iter_num {
                self.diff_count += 1;
            }
            self.prev_iter_num = self.curr_iter_num;
            self.curr_iter_num = 0;
        }
    }

    pub fn owner_address(&self) -> Address {
        self.owner.as_ref().map(|o| o.address).unwrap_or_default()
    }

    pub fn owner_name(&self) -> &str {
        self.owner.as_ref().map(|o| o.name.as_str()).unwrap_or_default()
    }
}

/// All loops seen so far, keyed by header address.
///
/// Updates are serialized per loop: the map itself is only write-locked to
/// insert a new header, and each record carries its own lock, so threads
/// running different loops never contend and threads running the same loop
/// never lose an update.
#[derive(Debug, Default)]
pub struct LoopRegistry {
    loops: RwLock<HashMap<Address, Mutex<LoopRecord>>>,
}

impl LoopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the record for `header`, creating a zeroed record first
    /// if there is none.
    pub fn get_or_create<R, F: FnOnce(&mut LoopRecord) -> R>(&self, header: Address, f: F) -> R {
        if let Some(record) = self.loops.read().get(&header) {
            return f(&mut record.lock());
        }
        let mut loops = self.loops.write();
        let record = loops
            .entry(header)
            .or_insert_with(|| Mutex::new(LoopRecord::new(header)));
        f(record.get_mut())
    }

    /// Record that a backward branch to `header` was found inside `owner`.
    /// Only the first discovery sets the owner.
    pub fn discover(&self, header: Address, owner: LoopOwner) {
        self.get_or_create(header, |record| {
            record.owner.get_or_insert(owner);
        })
    }

    pub fn on_branch_evaluated(&self, header: Address, taken: bool) {
        self.get_or_create(header, |record| record.record_branch(taken))
    }

    pub fn get(&self, header: Address) -> Option<LoopRecord> {
        self.loops.read().get(&header).map(|r| r.lock().clone())
    }

    pub fn contains(&self, header: Address) -> bool {
        self.loops.read().contains_key(&header)
    }

    pub fn len(&self) -> usize {
        self.loops.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.read().is_empty()
    }

    /// A copy of every record, in no particular order
    pub fn snapshot(&self) -> Vec<LoopRecord> {
        self.loops.read().values().map(|r| r.lock().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn run_invocations(record: &mut LoopRecord, trip_counts: &[u64]) -> Vec<u64> {
        trip_counts
            .iter()
            .map(|&k| {
                for _ in 0..k {
                    record.record_branch(true);
                }
                record.record_branch(false);
                record.diff_count
            })
            .collect()
    }

    #[test]
    fn one_invocation_of_k_iterations() {
        let mut r = LoopRecord::new(0x40);
        r.record_branch(true);
        r.record_branch(true);
        r.record_branch(true);
        assert_eq!(r.curr_iter_num, 3);
        assert_eq!(r.count_invoked, 0);
        r.record_branch(false);
        assert_eq!(r.count_seen, 4);
        assert_eq!(r.count_invoked, 1);
        assert_eq!(r.prev_iter_num, 3);
        assert_eq!(r.curr_iter_num, 0);
    }

    #[test]
    fn stable_trip_count_only_differs_on_first_invocation() {
        let mut r = LoopRecord::new(0x40);
        assert_eq!(run_invocations(&mut r, &[3, 3, 3]), vec![1, 1, 1]);
    }

    #[test]
    fn varying_trip_count() {
        let mut r = LoopRecord::new(0x40);
        assert_eq!(run_invocations(&mut r, &[3, 5, 5, 2]), vec![1, 2, 2, 3]);
        assert_eq!(r.prev_iter_num, 2);
    }

    #[test]
    fn zero_trip_first_invocation_matches_initial_state() {
        let mut r = LoopRecord::new(0x40);
        assert_eq!(run_invocations(&mut r, &[0, 0, 1]), vec![0, 0, 1]);
    }

    #[test]
    fn seen_never_below_invoked() {
        let mut r = LoopRecord::new(0x40);
        let outcomes = [true, false, false, true, true, false, true, false, false];
        for taken in outcomes {
            r.record_branch(taken);
            assert!(r.count_seen >= r.count_invoked);
        }
        assert_eq!(r.count_seen, outcomes.len() as u64);
        assert_eq!(r.count_invoked, 5);
    }

    #[test]
    fn discovery_sets_owner_once() {
        let reg = LoopRegistry::new();
        assert!(reg.is_empty());
        reg.discover(0x1000, LoopOwner::new(0xf00, "first"));
        reg.discover(0x1000, LoopOwner::new(0xe00, "second"));
        let r = reg.get(0x1000).unwrap();
        assert_eq!(r.owner_name(), "first");
        assert_eq!(r.owner_address(), 0xf00);
        assert_eq!(r.count_seen, 0);
        assert_eq!(reg.len(), 1);
        assert!(reg.get(0x2000).is_none());
    }

    #[test]
    fn unowned_record_defaults() {
        let r = LoopRecord::new(0x10);
        assert_eq!(r.owner_name(), "");
        assert_eq!(r.owner_address(), 0);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let reg = LoopRegistry::new();
        reg.discover(0x1000, LoopOwner::new(0xf00, "f"));
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        reg.on_branch_evaluated(0x1000, true);
                        reg.on_branch_evaluated(0x2000, false);
                    }
                });
            }
        });
        let hot = reg.get(0x1000).unwrap();
        assert_eq!(hot.count_seen, 8000);
        assert_eq!(hot.curr_iter_num, 8000);
        let other = reg.get(0x2000).unwrap();
        assert_eq!(other.count_seen, 8000);
        assert_eq!(other.count_invoked, 8000);
        assert_eq!(reg.len(), 2);
    }
}
