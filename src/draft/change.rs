use crate::draft::DocumentSnapshot;

/// Whether `latest` needs to be persisted, given what was last synchronised.
pub fn has_pending_change(latest: &DocumentSnapshot, last_synced: &DocumentSnapshot) -> bool {
    latest != last_synced
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Unchanged,
    /// Content was loaded into a fresh editor; nothing to save.
    AbsorbedInitialLoad,
    Pending,
}

/// Tracks the baseline that new snapshots are compared against.
///
/// Loading an existing draft into the editor looks exactly like the user
/// typing it, so the first move away from an empty baseline is absorbed
/// once instead of being reported as pending.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    baseline: DocumentSnapshot,
    suppress_initial_load: bool,
}

impl ChangeDetector {
    pub fn new(suppress_initial_load: bool) -> Self {
        Self {
            baseline: DocumentSnapshot::default(),
            suppress_initial_load,
        }
    }

    pub fn has_pending_change(&self, latest: &DocumentSnapshot) -> bool {
        !self.would_absorb(latest) && has_pending_change(latest, &self.baseline)
    }

    /// Compares `latest` with the baseline and moves the baseline to it.
    pub fn observe(&mut self, latest: &DocumentSnapshot) -> Observation {
        if !has_pending_change(latest, &self.baseline) {
            return Observation::Unchanged;
        }
        let absorbed = self.would_absorb(latest);
        self.suppress_initial_load = false;
        self.baseline = latest.clone();
        if absorbed {
            Observation::AbsorbedInitialLoad
        } else {
            Observation::Pending
        }
    }

    /// Puts the baseline back, e.g. after a failed save, so the same content
    /// counts as pending again.
    pub fn reset_baseline(&mut self, baseline: DocumentSnapshot) {
        self.baseline = baseline;
    }

    fn would_absorb(&self, latest: &DocumentSnapshot) -> bool {
        self.suppress_initial_load && self.baseline.is_empty() && !latest.is_empty()
    }
}

/// Navigation guard: compares the live document with what was loaded.
#[derive(Debug, Clone, Default)]
pub struct UnsavedChanges {
    initial: DocumentSnapshot,
}

impl UnsavedChanges {
    pub fn reset(&mut self, initial: DocumentSnapshot) {
        self.initial = initial;
    }

    pub fn is_dirty(&self, live: &DocumentSnapshot) -> bool {
        self.initial.title != live.title
            || self.initial.body != live.body
            || self.initial.tags != live.tags
    }
}
