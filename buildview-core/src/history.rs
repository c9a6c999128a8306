//! Branch history projection for display ordering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::build_db::{BuildDatabase, BuildDate};

/// One row of the branch history shown next to a repository.
///
/// Derived from a [`BuildDatabase`] on every request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchHistoryEntry {
    pub branch_name: String,
    pub build_date: BuildDate,
}

/// Display order of history entries: most recent build first, equal build
/// dates by branch name ascending.
pub fn history_order(a: &BranchHistoryEntry, b: &BranchHistoryEntry) -> Ordering {
    b.build_date
        .cmp(&a.build_date)
        .then_with(|| a.branch_name.cmp(&b.branch_name))
}

/// Project a build database into its display-ordered branch history.
pub fn branch_history(db: &BuildDatabase) -> Vec<BranchHistoryEntry> {
    let mut entries: Vec<BranchHistoryEntry> = db
        .iter()
        .map(|(branch, record)| BranchHistoryEntry {
            branch_name: branch.clone(),
            build_date: record.build_date(),
        })
        .collect();
    entries.sort_by(history_order);
    entries
}
