use crate::common::{Change, Zone};

/// Changes needed to bring one zone to its desired state.
#[derive(Debug, Clone)]
pub struct Plan {
    pub desired: Zone,
    /// Whether the zone already exists in the provider.
    pub exists: bool,
    pub changes: Vec<Change>,
}

impl Plan {
    pub fn new(desired: Zone, changes: Vec<Change>) -> Self {
        Self {
            desired,
            exists: false,
            changes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeState {
    PendingCreate,
    PendingUpdate,
    PendingDelete,
    Applied,
    Skipped,
    Failed,
}

impl ChangeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChangeState::Applied | ChangeState::Skipped | ChangeState::Failed
        )
    }
}

impl From<&Change> for ChangeState {
    fn from(value: &Change) -> Self {
        match value {
            Change::Create { .. } => ChangeState::PendingCreate,
            Change::Update { .. } => ChangeState::PendingUpdate,
            Change::Delete { .. } => ChangeState::PendingDelete,
        }
    }
}

/// Outcome of an apply pass. `outcomes` follows the order of the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub processed: usize,
    pub outcomes: Vec<ChangeState>,
}

impl ApplyReport {
    pub fn count(&self, state: ChangeState) -> usize {
        self.outcomes.iter().filter(|s| **s == state).count()
    }
}
