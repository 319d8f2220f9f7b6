//! Version gate: the compare-and-set that orders writes on one aggregate.

use std::sync::atomic::{AtomicI64, Ordering};

/// Result of a [`VersionGate::try_advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The caller's expected version was current; the counter moved on.
    Accepted {
        /// The version the counter now holds.
        new_version: i64,
    },
    /// The caller's read was stale; nothing changed.
    Rejected {
        /// The version the caller expected.
        expected: i64,
        /// The live counter value at the time of the attempt.
        actual: i64,
    },
}

impl GateDecision {
    /// Whether the transition was accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Lock-free version counter owned by one aggregate cache entry.
///
/// The counter only moves forward by exactly one per accepted transition.
/// Of any number of callers presenting the same expected version, at most
/// one is accepted.
#[derive(Debug, Default)]
pub struct VersionGate {
    counter: AtomicI64,
}

impl VersionGate {
    /// Creates a gate for an aggregate that has seen no events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gate positioned at `version`, used after a replay.
    #[must_use]
    pub fn starting_at(version: i64) -> Self {
        Self {
            counter: AtomicI64::new(version),
        }
    }

    /// The live counter value.
    #[must_use]
    pub fn current(&self) -> i64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Advances the counter from `expected_version` to `expected_version + 1`
    /// if and only if it currently holds `expected_version`. Never blocks.
    pub fn try_advance(&self, expected_version: i64) -> GateDecision {
        match self.counter.compare_exchange(
            expected_version,
            expected_version + 1,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => GateDecision::Accepted {
                new_version: expected_version + 1,
            },
            Err(actual) => GateDecision::Rejected {
                expected: expected_version,
                actual,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    #[test]
    fn test_try_advance_accepts_current_version() {
        let gate = VersionGate::new();

        let decision = gate.try_advance(0);

        assert_eq!(decision, GateDecision::Accepted { new_version: 1 });
        assert_eq!(gate.current(), 1);
    }

    #[test]
    fn test_try_advance_rejects_stale_version_without_mutating() {
        // Arrange
        let gate = VersionGate::starting_at(3);

        // Act
        let decision = gate.try_advance(2);

        // Assert
        assert_eq!(
            decision,
            GateDecision::Rejected {
                expected: 2,
                actual: 3
            }
        );
        assert_eq!(gate.current(), 3);
    }

    #[test]
    fn test_try_advance_rejects_future_version() {
        let gate = VersionGate::starting_at(1);

        assert!(!gate.try_advance(5).is_accepted());
        assert_eq!(gate.current(), 1);
    }

    #[test]
    fn test_only_one_of_many_threads_wins_same_expected_version() {
        // Arrange
        const THREADS: usize = 16;
        let gate = Arc::new(VersionGate::starting_at(7));
        let barrier = Arc::new(Barrier::new(THREADS));

        // Act
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    gate.try_advance(7)
                })
            })
            .collect();
        let decisions: Vec<GateDecision> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Assert
        let winners = decisions.iter().filter(|d| d.is_accepted()).count();
        assert_eq!(winners, 1);
        assert_eq!(gate.current(), 8);
        assert!(decisions.iter().all(|d| match d {
            GateDecision::Accepted { new_version } => *new_version == 8,
            GateDecision::Rejected { expected, actual } => *expected == 7 && *actual == 8,
        }));
    }

    #[test]
    fn test_contending_retry_loops_produce_contiguous_versions() {
        // Arrange
        const THREADS: usize = 8;
        const PER_THREAD: usize = 250;
        let gate = Arc::new(VersionGate::new());

        // Act
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    let mut won = Vec::with_capacity(PER_THREAD);
                    while won.len() < PER_THREAD {
                        let expected = gate.current();
                        if let GateDecision::Accepted { new_version } = gate.try_advance(expected)
                        {
                            won.push(new_version);
                        }
                    }
                    won
                })
            })
            .collect();
        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();

        // Assert
        let expected: Vec<i64> = (1..=i64::try_from(THREADS * PER_THREAD).unwrap()).collect();
        assert_eq!(all, expected);
    }
}
