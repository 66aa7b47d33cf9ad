// Snapshot management for reverse execution

use crate::interpreter::engine::Machine;
use std::collections::VecDeque;

/// Snapshot of execution state, taken before an instruction runs
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub machine: Machine,
    /// Number of console events that existed at this point
    pub console_len: usize,
}

/// Bounded execution history. Once full, the oldest snapshot is dropped.
#[derive(Debug)]
pub struct History {
    snapshots: VecDeque<Snapshot>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        History {
            snapshots: VecDeque::new(),
            limit,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) {
        if self.limit == 0 {
            return;
        }
        if self.snapshots.len() == self.limit {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    /// Take the most recent snapshot
    pub fn pop(&mut self) -> Option<Snapshot> {
        self.snapshots.pop_back()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;

    fn snapshot(pc: usize) -> Snapshot {
        let mut machine = Machine::new(&VmConfig::default());
        machine.pc = pc;
        Snapshot {
            machine,
            console_len: pc,
        }
    }

    #[test]
    fn oldest_snapshot_is_evicted() {
        let mut history = History::new(2);
        history.push(snapshot(0));
        history.push(snapshot(1));
        history.push(snapshot(2));
        assert_eq!(history.len(), 2);
        assert_eq!(history.pop().unwrap().machine.pc, 2);
        assert_eq!(history.pop().unwrap().machine.pc, 1);
        assert!(history.pop().is_none());
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let mut history = History::new(0);
        history.push(snapshot(0));
        assert!(history.is_empty());
    }
}
