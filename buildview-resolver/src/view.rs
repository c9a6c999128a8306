//! Output types of a repository view resolution.

use buildview_core::{BranchBuildRecord, BranchHistoryEntry, BranchName, RepoId};
use buildview_storage::TierSource;
use serde::Serialize;

/// Message shown when a repository has no recorded build status.
pub const NO_BUILD_MESSAGE: &str = "Your build is not yet known to us...";

/// Everything needed to render one repository page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryView {
    pub repo: RepoId,
    /// Branch the view was resolved for.
    pub branch: BranchName,
    /// Build record of `branch`, if the database has one.
    pub branch_record: Option<BranchBuildRecord>,
    pub build_status: String,
    /// Last build duration in seconds.
    pub build_duration: i64,
    pub signature: String,
    pub readme: String,
    /// Whether a build database was found in any tier.
    pub has_builds: bool,
    /// Tier that served the build database.
    pub database_source: Option<TierSource>,
    /// Branches ordered most recently built first.
    pub history: Vec<BranchHistoryEntry>,
    /// Most recent build log identifiers, newest first.
    pub recent_logs: Vec<String>,
}

/// Result of resolving a repository view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ViewOutcome {
    /// The repository has no build status yet.
    NoBuild { repo: RepoId },
    /// The view was assembled.
    Ready(RepositoryView),
}

impl ViewOutcome {
    /// Message to show instead of a view, if any.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            ViewOutcome::NoBuild { .. } => Some(NO_BUILD_MESSAGE),
            ViewOutcome::Ready(_) => None,
        }
    }

    pub fn repo(&self) -> &RepoId {
        match self {
            ViewOutcome::NoBuild { repo } => repo,
            ViewOutcome::Ready(view) => &view.repo,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewOutcome::Ready(_))
    }

    /// The view, if one was assembled.
    pub fn into_view(self) -> Option<RepositoryView> {
        match self {
            ViewOutcome::Ready(view) => Some(view),
            ViewOutcome::NoBuild { .. } => None,
        }
    }
}
