//! Aggregate cache: the readable source of truth for aggregate state.
//!
//! Every resident aggregate owns a [`VersionGate`] and the last published
//! state. Commands run through [`AggregateCache::execute`]:
//!
//! 1. snapshot the published state,
//! 2. let the domain decide on a candidate event,
//! 3. claim `snapshot.version + 1` at the gate,
//! 4. append the event to the log, then publish `apply(snapshot, event)`.
//!
//! Only the winner of step 3 reaches step 4, so no lock is held across the
//! pipeline. The log append happens before the publish: if it fails, the
//! previous state stays published and the entry is quarantined until
//! [`AggregateCache::recover`] installs a fresh entry rebuilt from the log.
//! The gate keeps the claimed version, so a writer still holding the old
//! snapshot gets a conflict rather than a second attempt at that version.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::aggregate::AggregateState;
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::event_log::EventLog;
use crate::gate::{GateDecision, VersionGate};
use crate::outcome::{CommandOutcome, RuleViolation};
use crate::replay;

#[derive(Debug)]
struct CacheEntry<S> {
    gate: VersionGate,
    state: RwLock<Arc<S>>,
    quarantined: AtomicBool,
}

impl<S: AggregateState> CacheEntry<S> {
    fn new(state: S) -> Self {
        Self {
            gate: VersionGate::starting_at(state.version()),
            state: RwLock::new(Arc::new(state)),
            quarantined: AtomicBool::new(false),
        }
    }

    fn snapshot(&self) -> Arc<S> {
        Arc::clone(&self.state.read())
    }

    fn publish(&self, state: S) {
        *self.state.write() = Arc::new(state);
    }

    fn quarantine(&self) {
        self.quarantined.store(true, Ordering::Release);
    }

    fn is_quarantined(&self) -> bool {
        self.quarantined.load(Ordering::Acquire)
    }
}

/// Gate claim that has not yet been committed.
///
/// If the command future is dropped between the gate and the publish (for
/// example a cancelled request while the log append is pending), the entry
/// is quarantined, since the append may or may not have reached the log.
/// The claim itself is never released.
struct PendingCommit<'a, S: AggregateState> {
    entry: &'a CacheEntry<S>,
    aggregate_id: Uuid,
    version: i64,
    settled: bool,
}

impl<S: AggregateState> PendingCommit<'_, S> {
    fn commit(mut self, state: S) {
        self.entry.publish(state);
        self.settled = true;
    }

    fn abort(mut self) {
        self.entry.quarantine();
        self.settled = true;
    }
}

impl<S: AggregateState> Drop for PendingCommit<'_, S> {
    fn drop(&mut self) {
        if !self.settled {
            self.entry.quarantine();
            warn!(
                aggregate_id = %self.aggregate_id,
                version = self.version,
                "commit abandoned before publish; aggregate quarantined"
            );
        }
    }
}

/// In-memory aggregate states, each guarded by its own version gate.
pub struct AggregateCache<S: AggregateState> {
    entries: RwLock<HashMap<Uuid, Arc<CacheEntry<S>>>>,
    log: Arc<dyn EventLog>,
}

impl<S: AggregateState> std::fmt::Debug for AggregateCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateCache")
            .field("resident", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl<S: AggregateState> AggregateCache<S> {
    /// Creates an empty cache writing through to `log`.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            log,
        }
    }

    /// Returns the published state of a resident aggregate.
    #[must_use]
    pub fn get(&self, aggregate_id: Uuid) -> Option<Arc<S>> {
        self.entries
            .read()
            .get(&aggregate_id)
            .map(|entry| entry.snapshot())
    }

    /// The live gate version of a resident aggregate.
    #[must_use]
    pub fn gate_version(&self, aggregate_id: Uuid) -> Option<i64> {
        self.entries
            .read()
            .get(&aggregate_id)
            .map(|entry| entry.gate.current())
    }

    /// Whether the aggregate is halted after an integrity fault.
    #[must_use]
    pub fn is_quarantined(&self, aggregate_id: Uuid) -> bool {
        self.entries
            .read()
            .get(&aggregate_id)
            .is_some_and(|entry| entry.is_quarantined())
    }

    fn resident(&self, aggregate_id: Uuid) -> Option<Arc<CacheEntry<S>>> {
        self.entries.read().get(&aggregate_id).cloned()
    }

    fn entry(&self, aggregate_id: Uuid) -> Arc<CacheEntry<S>> {
        if let Some(entry) = self.resident(aggregate_id) {
            return entry;
        }
        let mut entries = self.entries.write();
        Arc::clone(
            entries
                .entry(aggregate_id)
                .or_insert_with(|| Arc::new(CacheEntry::new(S::initial(aggregate_id)))),
        )
    }

    /// Retires an entry that never left the zero state, so a refused command
    /// against an unknown id leaves nothing resident. The gate is claimed
    /// first; a writer racing on the same zero snapshot then conflicts.
    fn evict_pristine(&self, aggregate_id: Uuid, entry: &Arc<CacheEntry<S>>) {
        let mut entries = self.entries.write();
        let resident = entries
            .get(&aggregate_id)
            .is_some_and(|current| Arc::ptr_eq(current, entry));
        if resident && entry.gate.try_advance(0).is_accepted() {
            entries.remove(&aggregate_id);
            debug!("unknown aggregate evicted after refused command");
        }
    }

    /// Installs a rebuilt state unless the resident entry must be kept: a
    /// healthy entry that has moved past the zero state always wins, and a
    /// quarantined one is only replaced when `lift_quarantine` is set.
    fn install(&self, aggregate_id: Uuid, state: S, lift_quarantine: bool) -> Result<Arc<S>, DomainError> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&aggregate_id) {
            if existing.is_quarantined() {
                if !lift_quarantine {
                    return Err(DomainError::AggregateQuarantined(aggregate_id));
                }
            } else if existing.gate.current() > 0 {
                return Ok(existing.snapshot());
            }
        }
        let entry = Arc::new(CacheEntry::new(state));
        let snapshot = entry.snapshot();
        entries.insert(aggregate_id, entry);
        Ok(snapshot)
    }

    /// Runs one command against an aggregate.
    ///
    /// An aggregate referenced for the first time is rebuilt from the log
    /// before its snapshot is taken. `decide` receives the snapshot and returns the candidate event, which
    /// must carry `snapshot.version() + 1`, or a rule violation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateQuarantined` if the aggregate is halted,
    /// `DomainError::Infrastructure` if `decide` produced an event with the
    /// wrong identity or version, and `DomainError::LogAppendFailure` if the
    /// log refused the accepted event. Cold-start replay errors are returned
    /// as is.
    #[instrument(skip_all, fields(aggregate_id = %aggregate_id))]
    pub async fn execute<F>(
        &self,
        aggregate_id: Uuid,
        decide: F,
    ) -> Result<CommandOutcome<S>, DomainError>
    where
        F: FnOnce(&S) -> Result<S::Event, RuleViolation> + Send,
    {
        if self.resident(aggregate_id).is_none() {
            match self.rebuild_entry(aggregate_id, false).await {
                Ok(_) | Err(DomainError::AggregateNotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        let entry = self.entry(aggregate_id);
        if entry.is_quarantined() {
            return Err(DomainError::AggregateQuarantined(aggregate_id));
        }

        let snapshot = entry.snapshot();
        let expected = snapshot.version();

        let event = match decide(&snapshot) {
            Ok(event) => event,
            Err(violation) => {
                warn!(reason = %violation, "command refused by domain rule");
                if expected == 0 {
                    self.evict_pristine(aggregate_id, &entry);
                }
                return Ok(CommandOutcome::DomainRuleViolation {
                    reason: violation.reason,
                });
            }
        };
        let meta = event.metadata();
        if meta.aggregate_id != aggregate_id || meta.version != expected + 1 {
            return Err(DomainError::Infrastructure(format!(
                "candidate event {} for aggregate {} at version {} does not follow snapshot version {expected} of {aggregate_id}",
                meta.event_type, meta.aggregate_id, meta.version
            )));
        }

        let new_version = match entry.gate.try_advance(expected) {
            GateDecision::Accepted { new_version } => new_version,
            GateDecision::Rejected { expected, actual } => {
                debug!(expected, actual, "version gate rejected stale snapshot");
                return Ok(CommandOutcome::Conflict {
                    aggregate_id,
                    attempted_version: expected,
                    current_version: actual,
                });
            }
        };
        debug!(new_version, "version gate accepted");

        let pending = PendingCommit {
            entry: &entry,
            aggregate_id,
            version: new_version,
            settled: false,
        };
        let next = snapshot.apply(&event);
        if let Err(err) = self.log.append(aggregate_id, event.to_stored()).await {
            pending.abort();
            error!(version = new_version, error = %err, "log append failed; aggregate quarantined");
            return Err(DomainError::LogAppendFailure {
                aggregate_id,
                version: new_version,
                reason: err.to_string(),
            });
        }
        pending.commit(next.clone());

        info!(version = new_version, event_type = event.event_type(), "event committed");
        Ok(CommandOutcome::Accepted { new_state: next })
    }

    /// Makes an aggregate resident, rebuilding it from the log if needed.
    ///
    /// A resident, healthy aggregate is returned without touching the log.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateQuarantined` for a halted aggregate,
    /// `DomainError::AggregateNotFound` for an empty stream, and the log or
    /// replay error if the stream cannot be read or rebuilt.
    pub async fn load(&self, aggregate_id: Uuid) -> Result<Arc<S>, DomainError> {
        if let Some(entry) = self.resident(aggregate_id) {
            if entry.is_quarantined() {
                return Err(DomainError::AggregateQuarantined(aggregate_id));
            }
            if entry.gate.current() > 0 {
                return Ok(entry.snapshot());
            }
        }
        self.rebuild_entry(aggregate_id, false).await
    }

    /// Rebuilds a quarantined aggregate from the log and clears the
    /// quarantine. A healthy resident aggregate is left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`AggregateCache::load`]; on error the old entry is kept.
    pub async fn recover(&self, aggregate_id: Uuid) -> Result<Arc<S>, DomainError> {
        self.rebuild_entry(aggregate_id, true).await
    }

    #[instrument(skip_all, fields(aggregate_id = %aggregate_id))]
    async fn rebuild_entry(&self, aggregate_id: Uuid, lift_quarantine: bool) -> Result<Arc<S>, DomainError> {
        let stored = self.log.read_all(aggregate_id).await?;
        if stored.is_empty() {
            return Err(DomainError::AggregateNotFound(aggregate_id));
        }
        let state: S = replay::rebuild_stored(aggregate_id, &stored).inspect_err(|err| {
            error!(error = %err, "replay failed");
        })?;
        info!(version = state.version(), events = stored.len(), "aggregate rebuilt from log");
        self.install(aggregate_id, state, lift_quarantine)
    }
}
