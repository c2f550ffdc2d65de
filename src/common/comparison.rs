use super::{StructuredRecord, Zone};

/// One record-level difference between the provider and the desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Create {
        new: StructuredRecord,
    },
    Update {
        existing: StructuredRecord,
        new: StructuredRecord,
    },
    Delete {
        existing: StructuredRecord,
    },
}

impl Change {
    pub fn kind(&self) -> &'static str {
        match self {
            Change::Create { .. } => "create",
            Change::Update { .. } => "update",
            Change::Delete { .. } => "delete",
        }
    }

    /// The record this change is about, desired side first.
    pub fn record(&self) -> &StructuredRecord {
        match self {
            Change::Create { new } | Change::Update { new, .. } => new,
            Change::Delete { existing } => existing,
        }
    }
}

/// Diffs two zones on (name, type). Deletes come first to avoid conflicts
/// with records being recreated, then updates, then creates.
pub fn diff_records(existing: &Zone, desired: &Zone) -> Vec<Change> {
    let mut create: Vec<Change> = Vec::with_capacity(desired.records().len());
    let mut update: Vec<Change> = Vec::with_capacity(desired.records().len());
    let mut delete: Vec<Change> = Vec::with_capacity(existing.records().len());

    for record in desired.records() {
        match existing.records().iter().find(|r| r.matches(record)) {
            // Only update if content differs
            Some(current) if current != record => update.push(Change::Update {
                existing: current.clone(),
                new: record.clone(),
            }),
            Some(_) => {}
            None => create.push(Change::Create {
                new: record.clone(),
            }),
        }
    }

    for record in existing.records() {
        if !desired.records().iter().any(|r| r.matches(record)) {
            delete.push(Change::Delete {
                existing: record.clone(),
            });
        }
    }

    delete.into_iter().chain(update).chain(create).collect()
}
