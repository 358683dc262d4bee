//! Read-only entry queries for report screens.
//!
//! All queries are tenant-scoped and paginated by default. The Postgres
//! store implements this against its tables; in tests/dev the sync
//! `LedgerService::list_entries` answers from memory instead.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use contable_core::{DomainError, JournalId, TenantId};
use contable_ledger::{EntryStatus, JournalEntry};

/// Pagination parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of entries to return.
    pub limit: u32,
    /// 0-based offset.
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: 50, offset: 0 }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for entry queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilter {
    pub journal: Option<JournalId>,
    pub status: Option<EntryStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// One page of entries plus the total match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPage {
    pub entries: Vec<JournalEntry>,
    pub total: u64,
}

/// Async, tenant-scoped entry listing.
#[async_trait::async_trait]
pub trait EntryArchive: Send + Sync {
    async fn list_entries(
        &self,
        tenant: TenantId,
        filter: EntryFilter,
        pagination: Pagination,
    ) -> Result<EntryPage, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_to_sane_bounds() {
        let p = Pagination::new(None, None);
        assert_eq!((p.limit, p.offset), (50, 0));

        let p = Pagination::new(Some(1_000_000), Some(30));
        assert_eq!((p.limit, p.offset), (1000, 30));
    }
}
