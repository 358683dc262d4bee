//! Postgres-backed ledger store.
//!
//! The production counterpart of the in-memory store: every mutating
//! operation runs inside one database transaction, and counter rows are
//! locked with `SELECT … FOR UPDATE` **before** any entry row is touched
//! (counter before entry, always), so concurrent posts serialize on the
//! journal and numbers reflect commit order. A rollback releases the lock
//! and its tentative number was never visible to anyone.
//!
//! ## Error mapping
//!
//! | SQLx error | PostgreSQL code | DomainError | Scenario |
//! |------------|-----------------|-------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Concurrent writer hit a unique key; retried by the caller |
//! | Database (check violation) | `23514` | `Storage` | An application-level check was missed; fatal integrity report |
//! | Database (foreign key violation) | `23503` | `Storage` | Referential integrity violation |
//! | RowNotFound | n/a | `NotFound` | Tenant-scoped lookup missed |
//! | Other | any | `Storage` | Connection/pool failures etc. |
//!
//! Balances here are aggregate queries; the in-process [`BalanceCache`]
//! fronts the in-memory store only.
//!
//! [`BalanceCache`]: crate::balance::BalanceCache

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{info, instrument};
use uuid::Uuid;

use contable_core::{
    AccountId, DomainError, DomainResult, EntryId, JournalId, LineId, Money, PeriodId, SeriesId,
    TenantId, UserId,
};
use contable_ledger::{EntryStatus, JournalEntry, JournalLine, SourceDocumentId};
use contable_numbering::NumberFormat;

use super::archive::{EntryArchive, EntryFilter, EntryPage, Pagination};

const SCHEMA: &str = include_str!("schema.sql");

/// Postgres-backed store for the ledger engine.
///
/// Uses the SQLx connection pool (thread-safe, `Send + Sync`). Every query
/// carries `tenant_id` in its WHERE clause; locks are therefore scoped to
/// one tenant's rows and tenants never block each other.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect a pool with sane defaults.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connecting to postgres")?;
        Ok(Self::new(pool))
    }

    /// Apply the ledger schema (idempotent).
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(self.pool.as_ref())
            .await
            .context("applying ledger schema")?;
        info!("ledger schema applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Draw the next number of a document series.
    ///
    /// Locks the series row, bumps the correlative and records the issued
    /// number, all in one transaction. The `issued_numbers` primary key is
    /// the schema backstop against a duplicate ever committing.
    #[instrument(skip(self), fields(tenant = %tenant, series = %series), err)]
    pub async fn next_document_number(
        &self,
        tenant: TenantId,
        series: SeriesId,
    ) -> DomainResult<(u64, String)> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(
            "SELECT code, correlative FROM document_series \
             WHERE tenant_id = $1 AND series_id = $2 FOR UPDATE",
        )
        .bind(*tenant.as_uuid())
        .bind(*series.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_err("locking series counter", e))?
        .ok_or_else(DomainError::not_found)?;

        let code: String = get(&row, "code")?;
        let correlative: i64 = get(&row, "correlative")?;
        let next = correlative + 1;

        sqlx::query(
            "UPDATE document_series SET correlative = $3 \
             WHERE tenant_id = $1 AND series_id = $2",
        )
        .bind(*tenant.as_uuid())
        .bind(*series.as_uuid())
        .bind(next)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_err("advancing series counter", e))?;

        sqlx::query(
            "INSERT INTO issued_numbers (tenant_id, series_id, number) VALUES ($1, $2, $3)",
        )
        .bind(*tenant.as_uuid())
        .bind(*series.as_uuid())
        .bind(next)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_err("recording issued number", e))?;

        self.commit(tx).await?;

        let formatted = NumberFormat::with_default_padding(code.as_str())?.format(next as u64);
        info!(number = %formatted, "document number issued");
        Ok((next as u64, formatted))
    }

    /// Move a series' correlative; below the issued maximum is rejected.
    #[instrument(skip(self), fields(tenant = %tenant, series = %series), err)]
    pub async fn reset_series(
        &self,
        tenant: TenantId,
        series: SeriesId,
        new_value: u64,
    ) -> DomainResult<()> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(
            "SELECT correlative FROM document_series \
             WHERE tenant_id = $1 AND series_id = $2 FOR UPDATE",
        )
        .bind(*tenant.as_uuid())
        .bind(*series.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_err("locking series counter", e))?
        .ok_or_else(DomainError::not_found)?;

        let issued: i64 = get(&row, "correlative")?;
        if (new_value as i64) < issued {
            return Err(DomainError::BelowIssuedMaximum {
                requested: new_value,
                issued: issued as u64,
            });
        }

        sqlx::query(
            "UPDATE document_series SET correlative = $3 \
             WHERE tenant_id = $1 AND series_id = $2",
        )
        .bind(*tenant.as_uuid())
        .bind(*series.as_uuid())
        .bind(new_value as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_err("resetting series counter", e))?;

        self.commit(tx).await
    }

    /// Move a journal's correlative; below the issued maximum is rejected.
    #[instrument(skip(self), fields(tenant = %tenant, journal = %journal), err)]
    pub async fn reset_journal_correlative(
        &self,
        tenant: TenantId,
        journal: JournalId,
        new_value: u64,
    ) -> DomainResult<()> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(
            "SELECT correlative FROM journals \
             WHERE tenant_id = $1 AND journal_id = $2 FOR UPDATE",
        )
        .bind(*tenant.as_uuid())
        .bind(*journal.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_err("locking journal counter", e))?
        .ok_or_else(DomainError::not_found)?;

        let issued: i64 = get(&row, "correlative")?;
        if (new_value as i64) < issued {
            return Err(DomainError::BelowIssuedMaximum {
                requested: new_value,
                issued: issued as u64,
            });
        }

        sqlx::query(
            "UPDATE journals SET correlative = $3 WHERE tenant_id = $1 AND journal_id = $2",
        )
        .bind(*tenant.as_uuid())
        .bind(*journal.as_uuid())
        .bind(new_value as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_err("resetting journal counter", e))?;

        self.commit(tx).await
    }

    /// Post a draft entry: number it from its journal, gate on the period,
    /// freeze it. Returns the assigned number.
    #[instrument(skip(self), fields(tenant = %tenant, entry = %entry), err)]
    pub async fn post_entry(&self, tenant: TenantId, entry: EntryId) -> DomainResult<String> {
        let mut tx = self.begin().await?;

        // Unlocked peek to learn which journal's counter to lock.
        let header = sqlx::query(
            "SELECT journal_id FROM journal_entries WHERE tenant_id = $1 AND entry_id = $2",
        )
        .bind(*tenant.as_uuid())
        .bind(*entry.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_err("loading entry header", e))?
        .ok_or_else(DomainError::not_found)?;
        let journal_id: Uuid = get(&header, "journal_id")?;

        // Counter row first…
        let journal = sqlx::query(
            "SELECT prefix, correlative FROM journals \
             WHERE tenant_id = $1 AND journal_id = $2 FOR UPDATE",
        )
        .bind(*tenant.as_uuid())
        .bind(journal_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_err("locking journal counter", e))?
        .ok_or_else(DomainError::not_found)?;

        // …then the entry row.
        let row = sqlx::query(
            "SELECT status, entry_date, period_id FROM journal_entries \
             WHERE tenant_id = $1 AND entry_id = $2 FOR UPDATE",
        )
        .bind(*tenant.as_uuid())
        .bind(*entry.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_err("locking entry", e))?;

        let status: String = get(&row, "status")?;
        match EntryStatus::parse(&status) {
            Some(EntryStatus::Posted) => return Err(DomainError::AlreadyPosted),
            Some(EntryStatus::Voided) => return Err(DomainError::AlreadyVoided),
            Some(EntryStatus::Draft) => {}
            None => return Err(DomainError::storage(format!("unknown entry status {status:?}"))),
        }
        let entry_date: NaiveDate = get(&row, "entry_date")?;
        let linked_period: Option<Uuid> = get(&row, "period_id")?;

        let lines = sqlx::query(
            "SELECT debit, credit FROM journal_lines WHERE tenant_id = $1 AND entry_id = $2",
        )
        .bind(*tenant.as_uuid())
        .bind(*entry.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_err("loading lines", e))?;

        if lines.len() < 2 {
            return Err(DomainError::validation(
                "entry needs at least two lines to post",
            ));
        }
        let mut total_debit = 0i64;
        let mut total_haber = 0i64;
        for line in &lines {
            total_debit += get::<i64>(line, "debit")?;
            total_haber += get::<i64>(line, "credit")?;
        }
        if total_debit != total_haber {
            return Err(DomainError::Unbalanced {
                debit: Money::from_cents(total_debit),
                haber: Money::from_cents(total_haber),
            });
        }

        // Period gate: the linked period, or the one containing the date.
        let period = match linked_period {
            Some(period_id) => sqlx::query(
                "SELECT period_id, month, year, status FROM accounting_periods \
                 WHERE tenant_id = $1 AND period_id = $2",
            )
            .bind(*tenant.as_uuid())
            .bind(period_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_err("loading period", e))?,
            None => sqlx::query(
                "SELECT period_id, month, year, status FROM accounting_periods \
                 WHERE tenant_id = $1 AND month = $2 AND year = $3",
            )
            .bind(*tenant.as_uuid())
            .bind(entry_date.month() as i16)
            .bind(entry_date.year())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_err("resolving period by date", e))?,
        };
        let resolved_period: Option<Uuid> = match &period {
            Some(row) => {
                let period_status: String = get(row, "status")?;
                if period_status == "closed" {
                    return Err(DomainError::PeriodClosed {
                        month: get::<i16>(row, "month")? as u8,
                        year: get::<i32>(row, "year")?,
                    });
                }
                Some(get::<Uuid>(row, "period_id")?)
            }
            None => None,
        };

        let prefix: String = get(&journal, "prefix")?;
        let correlative: i64 = get(&journal, "correlative")?;
        let next = correlative + 1;
        let number = NumberFormat::with_default_padding(prefix.as_str())?.format(next as u64);

        sqlx::query(
            "UPDATE journals SET correlative = $3 WHERE tenant_id = $1 AND journal_id = $2",
        )
        .bind(*tenant.as_uuid())
        .bind(journal_id)
        .bind(next)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_err("advancing journal counter", e))?;

        sqlx::query(
            "UPDATE journal_entries SET status = 'posted', number = $3, posted_at = now(), \
             total_debit = $4, total_haber = $5, period_id = COALESCE(period_id, $6) \
             WHERE tenant_id = $1 AND entry_id = $2",
        )
        .bind(*tenant.as_uuid())
        .bind(*entry.as_uuid())
        .bind(&number)
        .bind(total_debit)
        .bind(total_haber)
        .bind(resolved_period)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_err("posting entry", e))?;

        self.commit(tx).await?;
        info!(number = %number, "entry posted");
        Ok(number)
    }

    /// Close a period; fails while draft entries are dated into it.
    #[instrument(skip(self), fields(tenant = %tenant, period = %period), err)]
    pub async fn close_period(
        &self,
        tenant: TenantId,
        period: PeriodId,
        closed_by: UserId,
    ) -> DomainResult<()> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(
            "SELECT month, year, status FROM accounting_periods \
             WHERE tenant_id = $1 AND period_id = $2 FOR UPDATE",
        )
        .bind(*tenant.as_uuid())
        .bind(*period.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_err("locking period", e))?
        .ok_or_else(DomainError::not_found)?;

        let month: i16 = get(&row, "month")?;
        let year: i32 = get(&row, "year")?;
        let status: String = get(&row, "status")?;
        if status == "closed" {
            return Err(DomainError::invalid_state(format!(
                "period {month:02}/{year} is already closed"
            )));
        }

        let window = contable_periods::AccountingPeriod::new(period, month as u8, year)?;
        let drafts: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM journal_entries \
             WHERE tenant_id = $1 AND status = 'draft' \
             AND (period_id = $2 OR (period_id IS NULL AND entry_date BETWEEN $3 AND $4))",
        )
        .bind(*tenant.as_uuid())
        .bind(*period.as_uuid())
        .bind(window.start())
        .bind(window.end())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_err("counting draft entries", e))?;
        if drafts > 0 {
            return Err(DomainError::HasDraftEntries(drafts as usize));
        }

        sqlx::query(
            "UPDATE accounting_periods SET status = 'closed', closed_by = $3, closed_at = now() \
             WHERE tenant_id = $1 AND period_id = $2",
        )
        .bind(*tenant.as_uuid())
        .bind(*period.as_uuid())
        .bind(*closed_by.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_err("closing period", e))?;

        self.commit(tx).await?;
        info!(month, year, "period closed");
        Ok(())
    }

    /// Reopen a period; a closed later period blocks it.
    #[instrument(skip(self), fields(tenant = %tenant, period = %period), err)]
    pub async fn reopen_period(&self, tenant: TenantId, period: PeriodId) -> DomainResult<()> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(
            "SELECT month, year, status FROM accounting_periods \
             WHERE tenant_id = $1 AND period_id = $2 FOR UPDATE",
        )
        .bind(*tenant.as_uuid())
        .bind(*period.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_err("locking period", e))?
        .ok_or_else(DomainError::not_found)?;

        let month: i16 = get(&row, "month")?;
        let year: i32 = get(&row, "year")?;
        let status: String = get(&row, "status")?;
        if status == "open" {
            return Err(DomainError::invalid_state(format!(
                "period {month:02}/{year} is already open"
            )));
        }

        let later = sqlx::query(
            "SELECT month, year FROM accounting_periods \
             WHERE tenant_id = $1 AND status = 'closed' AND (year, month) > ($2, $3) \
             ORDER BY year, month LIMIT 1",
        )
        .bind(*tenant.as_uuid())
        .bind(year)
        .bind(month)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_err("checking later periods", e))?;
        if let Some(later) = later {
            return Err(DomainError::LaterPeriodClosed {
                month: get::<i16>(&later, "month")? as u8,
                year: get::<i32>(&later, "year")?,
            });
        }

        sqlx::query(
            "UPDATE accounting_periods SET status = 'open', closed_by = NULL, closed_at = NULL \
             WHERE tenant_id = $1 AND period_id = $2",
        )
        .bind(*tenant.as_uuid())
        .bind(*period.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_err("reopening period", e))?;

        self.commit(tx).await?;
        info!(month, year, "period reopened");
        Ok(())
    }

    /// Signed balance of an account over posted lines: its own lines when
    /// auxiliary, every descendant auxiliary otherwise.
    #[instrument(skip(self), fields(tenant = %tenant, account = %account), err)]
    pub async fn account_balance(
        &self,
        tenant: TenantId,
        account: AccountId,
    ) -> DomainResult<Money> {
        let level: i16 = sqlx::query_scalar(
            "SELECT level FROM accounts WHERE tenant_id = $1 AND account_id = $2",
        )
        .bind(*tenant.as_uuid())
        .bind(*account.as_uuid())
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| map_err("loading account", e))?
        .ok_or_else(DomainError::not_found)?;

        let sum: Option<i64> = if level >= 4 {
            sqlx::query_scalar(
                "SELECT SUM(l.debit - l.credit) FROM journal_lines l \
                 JOIN journal_entries e ON e.entry_id = l.entry_id \
                 WHERE l.tenant_id = $1 AND l.account_id = $2 AND e.status = 'posted'",
            )
            .bind(*tenant.as_uuid())
            .bind(*account.as_uuid())
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| map_err("summing leaf balance", e))?
        } else {
            sqlx::query_scalar(
                "WITH RECURSIVE subtree AS ( \
                     SELECT account_id, level FROM accounts \
                     WHERE tenant_id = $1 AND account_id = $2 \
                     UNION ALL \
                     SELECT a.account_id, a.level FROM accounts a \
                     JOIN subtree s ON a.parent_id = s.account_id \
                     WHERE a.tenant_id = $1 \
                 ) \
                 SELECT SUM(l.debit - l.credit) FROM journal_lines l \
                 JOIN journal_entries e ON e.entry_id = l.entry_id \
                 WHERE l.tenant_id = $1 AND e.status = 'posted' \
                 AND l.account_id IN (SELECT account_id FROM subtree WHERE level >= 4)",
            )
            .bind(*tenant.as_uuid())
            .bind(*account.as_uuid())
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| map_err("summing subtree balance", e))?
        };

        Ok(Money::from_cents(sum.unwrap_or(0)))
    }

    async fn begin(&self) -> DomainResult<sqlx::Transaction<'_, sqlx::Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_err("beginning transaction", e))
    }

    async fn commit(&self, tx: sqlx::Transaction<'_, sqlx::Postgres>) -> DomainResult<()> {
        tx.commit()
            .await
            .map_err(|e| map_err("committing transaction", e))
    }
}

#[async_trait::async_trait]
impl EntryArchive for PostgresLedgerStore {
    async fn list_entries(
        &self,
        tenant: TenantId,
        filter: EntryFilter,
        pagination: Pagination,
    ) -> Result<EntryPage, DomainError> {
        let journal = filter.journal.map(|j| *j.as_uuid());
        let status = filter.status.map(EntryStatus::as_str);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM journal_entries \
             WHERE tenant_id = $1 \
             AND ($2::uuid IS NULL OR journal_id = $2) \
             AND ($3::varchar IS NULL OR status = $3) \
             AND ($4::date IS NULL OR entry_date >= $4) \
             AND ($5::date IS NULL OR entry_date <= $5)",
        )
        .bind(*tenant.as_uuid())
        .bind(journal)
        .bind(status)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| map_err("counting entries", e))?;

        let rows = sqlx::query(
            "SELECT entry_id, journal_id, number, entry_date, memo, status, period_id, \
                    source_document, posted_at, voided_at \
             FROM journal_entries \
             WHERE tenant_id = $1 \
             AND ($2::uuid IS NULL OR journal_id = $2) \
             AND ($3::varchar IS NULL OR status = $3) \
             AND ($4::date IS NULL OR entry_date >= $4) \
             AND ($5::date IS NULL OR entry_date <= $5) \
             ORDER BY entry_date, entry_id \
             LIMIT $6 OFFSET $7",
        )
        .bind(*tenant.as_uuid())
        .bind(journal)
        .bind(status)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(pagination.limit.min(1000) as i64)
        .bind(pagination.offset as i64)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(|e| map_err("listing entries", e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry_id: Uuid = get(&row, "entry_id")?;
            let line_rows = sqlx::query(
                "SELECT line_id, account_id, description, debit, credit \
                 FROM journal_lines WHERE tenant_id = $1 AND entry_id = $2 ORDER BY line_id",
            )
            .bind(*tenant.as_uuid())
            .bind(entry_id)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| map_err("loading lines", e))?;

            let lines = line_rows
                .iter()
                .map(|l| {
                    Ok(JournalLine {
                        id: LineId::from_uuid(get(l, "line_id")?),
                        account: AccountId::from_uuid(get(l, "account_id")?),
                        description: get(l, "description")?,
                        debit: Money::from_cents(get::<i64>(l, "debit")?),
                        credit: Money::from_cents(get::<i64>(l, "credit")?),
                    })
                })
                .collect::<DomainResult<Vec<_>>>()?;

            let status_raw: String = get(&row, "status")?;
            let status = EntryStatus::parse(&status_raw).ok_or_else(|| {
                DomainError::storage(format!("unknown entry status {status_raw:?}"))
            })?;

            entries.push(JournalEntry::rehydrate(
                EntryId::from_uuid(entry_id),
                JournalId::from_uuid(get(&row, "journal_id")?),
                get::<NaiveDate>(&row, "entry_date")?,
                get::<String>(&row, "memo")?,
                get::<Option<String>>(&row, "number")?,
                status,
                lines,
                get::<Option<Uuid>>(&row, "period_id")?.map(PeriodId::from_uuid),
                get::<Option<Uuid>>(&row, "source_document")?.map(SourceDocumentId::from_uuid),
                get::<Option<DateTime<Utc>>>(&row, "posted_at")?,
                get::<Option<DateTime<Utc>>>(&row, "voided_at")?,
            )?);
        }

        Ok(EntryPage {
            entries,
            total: total as u64,
        })
    }
}

fn get<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> DomainResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| DomainError::storage(format!("reading column {column}: {e}")))
}

fn map_err(context: &str, err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::RowNotFound => DomainError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DomainError::conflict(format!("{context}: concurrent writer detected"))
        }
        sqlx::Error::Database(db) if db.is_check_violation() => {
            DomainError::storage(format!("{context}: a schema check constraint rejected the write"))
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            DomainError::storage(format!("{context}: referential integrity violation"))
        }
        _ => DomainError::storage(format!("{context}: storage failure")),
    }
}
