use crate::{IdentityHash, NamedRow, PrimaryKeyValues, SessionError, Value};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session-scoped identifier of a pending change.
pub type ChangeId = Uuid;

/// One modified cell of an existing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEdit {
    pub column: String,

    /// Value the cell held when it was first touched.
    pub original_value: Value,

    pub new_value: Value,
}

/// What a pending change does to its row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeKind {
    /// New row; every column present, unset columns NULL.
    Insert { new_row: NamedRow },

    /// Cell edits on an existing row. Never empty.
    Update { edits: Vec<CellEdit> },

    /// Row removal; the snapshot allows undo.
    Delete { original_row: NamedRow },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRowChange {
    pub id: ChangeId,

    /// Position when the change was recorded. Display hint only.
    pub row_index: usize,

    /// Empty for inserts.
    pub primary_key: PrimaryKeyValues,

    pub kind: ChangeKind,
}

impl PendingRowChange {
    pub fn is_insert(&self) -> bool {
        matches!(self.kind, ChangeKind::Insert { .. })
    }

    pub fn is_update(&self) -> bool {
        matches!(self.kind, ChangeKind::Update { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.kind, ChangeKind::Delete { .. })
    }

    fn targets(&self, identity: &IdentityHash) -> bool {
        !self.is_insert() && self.primary_key.identity_hash() == *identity
    }
}

/// Result of recording a cell edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellEditOutcome {
    /// The edit is stored (new or overwritten).
    Recorded,
    /// The cell went back to its original value and its edit was dropped.
    Reverted,
    /// Value equals the original and nothing was pending for the cell.
    Unchanged,
}

/// Counts of pending changes by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl ChangeSummary {
    pub fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }
}

/// Ordered set of uncommitted row changes for one browsed table.
///
/// Per primary key identity there is at most one entry, either an update
/// with at least one edit or a delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeLedger {
    changes: Vec<PendingRowChange>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingRowChange> {
        self.changes.iter()
    }

    pub fn get(&self, id: ChangeId) -> Option<&PendingRowChange> {
        self.changes.iter().find(|c| c.id == id)
    }

    /// The update or delete entry for a primary key, if any.
    pub fn entry_for(&self, primary_key: &PrimaryKeyValues) -> Option<&PendingRowChange> {
        let identity = primary_key.identity_hash();
        self.changes.iter().find(|c| c.targets(&identity))
    }

    pub fn is_row_deleted(&self, primary_key: &PrimaryKeyValues) -> bool {
        self.entry_for(primary_key).is_some_and(|c| c.is_delete())
    }

    /// Pending value for a cell of an existing row, for display overlays.
    pub fn edited_value(&self, primary_key: &PrimaryKeyValues, column: &str) -> Option<&Value> {
        match &self.entry_for(primary_key)?.kind {
            ChangeKind::Update { edits } => edits
                .iter()
                .find(|e| e.column == column)
                .map(|e| &e.new_value),
            _ => None,
        }
    }

    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for change in &self.changes {
            match change.kind {
                ChangeKind::Insert { .. } => summary.inserts += 1,
                ChangeKind::Update { .. } => summary.updates += 1,
                ChangeKind::Delete { .. } => summary.deletes += 1,
            }
        }
        summary
    }

    /// Record an edit of `column` on the row identified by `primary_key`.
    ///
    /// The first touch of a cell captures `original_value`; later edits only
    /// move `new_value`. Returning to the captured original removes the edit,
    /// and an update left without edits is removed entirely.
    pub fn record_cell_edit(
        &mut self,
        row_index: usize,
        primary_key: &PrimaryKeyValues,
        column: &str,
        original_value: Value,
        new_value: Value,
    ) -> Result<CellEditOutcome, SessionError> {
        let identity = primary_key.identity_hash();

        let Some(position) = self.changes.iter().position(|c| c.targets(&identity)) else {
            if new_value == original_value {
                return Ok(CellEditOutcome::Unchanged);
            }

            debug!("[EDIT] New update for {} ({})", identity, column);
            self.changes.push(PendingRowChange {
                id: Uuid::new_v4(),
                row_index,
                primary_key: primary_key.clone(),
                kind: ChangeKind::Update {
                    edits: vec![CellEdit {
                        column: column.to_string(),
                        original_value,
                        new_value,
                    }],
                },
            });
            return Ok(CellEditOutcome::Recorded);
        };

        let ChangeKind::Update { edits } = &mut self.changes[position].kind else {
            return Err(SessionError::RowPendingDeletion);
        };

        let outcome = match edits.iter().position(|e| e.column == column) {
            Some(edit_idx) if edits[edit_idx].original_value == new_value => {
                edits.remove(edit_idx);
                CellEditOutcome::Reverted
            }
            Some(edit_idx) => {
                edits[edit_idx].new_value = new_value;
                CellEditOutcome::Recorded
            }
            None if new_value == original_value => CellEditOutcome::Unchanged,
            None => {
                edits.push(CellEdit {
                    column: column.to_string(),
                    original_value,
                    new_value,
                });
                CellEditOutcome::Recorded
            }
        };

        if edits.is_empty() {
            debug!("[EDIT] Update for {} has no net changes, removing", identity);
            self.changes.remove(position);
        }

        Ok(outcome)
    }

    /// Append a pending insert. Every call creates a distinct row.
    pub fn add_new_row(&mut self, row_index: usize, template: NamedRow) -> ChangeId {
        let id = Uuid::new_v4();
        debug!("[EDIT] New pending insert {}", id);

        self.changes.push(PendingRowChange {
            id,
            row_index,
            primary_key: PrimaryKeyValues::new(),
            kind: ChangeKind::Insert { new_row: template },
        });

        id
    }

    /// Mark a row for deletion.
    ///
    /// Idempotent for rows already marked. A pending update on the same row
    /// is replaced by the delete in its ledger position.
    pub fn mark_row_for_deletion(
        &mut self,
        row_index: usize,
        primary_key: &PrimaryKeyValues,
        original_row: NamedRow,
    ) -> ChangeId {
        let identity = primary_key.identity_hash();
        let delete = PendingRowChange {
            id: Uuid::new_v4(),
            row_index,
            primary_key: primary_key.clone(),
            kind: ChangeKind::Delete { original_row },
        };

        match self.changes.iter().position(|c| c.targets(&identity)) {
            Some(position) if self.changes[position].is_delete() => self.changes[position].id,
            Some(position) => {
                debug!("[EDIT] Delete of {} discards pending edits", identity);
                let id = delete.id;
                self.changes[position] = delete;
                id
            }
            None => {
                let id = delete.id;
                self.changes.push(delete);
                id
            }
        }
    }

    /// Remove an entry by id: cancels an insert or undoes a delete.
    pub fn remove_change(&mut self, id: ChangeId) -> Option<PendingRowChange> {
        let position = self.changes.iter().position(|c| c.id == id)?;
        Some(self.changes.remove(position))
    }

    /// Set a cell of a pending insert. Returns false if `id` is not an insert.
    pub fn update_new_row_cell(&mut self, id: ChangeId, column: &str, value: Value) -> bool {
        let Some(change) = self.changes.iter_mut().find(|c| c.id == id) else {
            return false;
        };

        match &mut change.kind {
            ChangeKind::Insert { new_row } => {
                new_row.insert(column.to_string(), value);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }
}
