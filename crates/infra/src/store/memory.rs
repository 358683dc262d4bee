//! In-memory store for tests/dev. Not optimized for performance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use contable_core::{DomainError, DomainResult, TenantId};

use super::{LedgerStore, TenantState};

/// In-memory transactional store.
///
/// One mutex per tenant serializes that tenant's writers — the "single
/// writer per counter" queueing the numbering contract allows. A
/// transaction stages a copy of the tenant state and swaps it in on commit,
/// so an aborted closure leaves no partial mutation and its drawn numbers
/// are never visible to anyone else. Different tenants lock different
/// shards and never contend.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    shards: RwLock<HashMap<TenantId, Arc<Mutex<TenantState>>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, tenant: TenantId) -> DomainResult<Arc<Mutex<TenantState>>> {
        {
            let shards = self
                .shards
                .read()
                .map_err(|_| DomainError::storage("store lock poisoned"))?;
            if let Some(shard) = shards.get(&tenant) {
                return Ok(shard.clone());
            }
        }
        let mut shards = self
            .shards
            .write()
            .map_err(|_| DomainError::storage("store lock poisoned"))?;
        Ok(shards.entry(tenant).or_default().clone())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn read<R>(
        &self,
        tenant: TenantId,
        f: impl FnOnce(&TenantState) -> DomainResult<R>,
    ) -> DomainResult<R> {
        let shard = self.shard(tenant)?;
        let state = shard
            .lock()
            .map_err(|_| DomainError::storage("tenant shard poisoned"))?;
        f(&state)
    }

    fn transaction<R>(
        &self,
        tenant: TenantId,
        f: impl FnOnce(&mut TenantState) -> DomainResult<R>,
    ) -> DomainResult<R> {
        let shard = self.shard(tenant)?;
        let mut state = shard
            .lock()
            .map_err(|_| DomainError::storage("tenant shard poisoned"))?;
        // Stage on a copy; commit is the swap below.
        let mut staged = state.clone();
        let result = f(&mut staged)?;
        *state = staged;
        Ok(result)
    }
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn read<R>(
        &self,
        tenant: TenantId,
        f: impl FnOnce(&TenantState) -> DomainResult<R>,
    ) -> DomainResult<R> {
        (**self).read(tenant, f)
    }

    fn transaction<R>(
        &self,
        tenant: TenantId,
        f: impl FnOnce(&mut TenantState) -> DomainResult<R>,
    ) -> DomainResult<R> {
        (**self).transaction(tenant, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contable_core::JournalId;
    use contable_ledger::{Journal, JournalKind};

    fn journal() -> Journal {
        Journal::new(JournalId::new(), "DV", "Diario", JournalKind::Manual, "DV").unwrap()
    }

    #[test]
    fn failed_transactions_leave_no_trace() {
        let store = InMemoryLedgerStore::new();
        let tenant = TenantId::new();
        let j = journal();
        let id = j.id;

        let err = store
            .transaction(tenant, |state| {
                state.journals.insert(id, j.clone());
                Err::<(), _>(DomainError::validation("abort"))
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        store
            .read(tenant, |state| {
                assert!(state.journals.is_empty());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn committed_transactions_are_visible() {
        let store = InMemoryLedgerStore::new();
        let tenant = TenantId::new();
        let j = journal();
        let id = j.id;

        store
            .transaction(tenant, |state| {
                state.journals.insert(id, j.clone());
                Ok(())
            })
            .unwrap();
        store
            .read(tenant, |state| {
                assert!(state.journals.contains_key(&id));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn tenants_are_isolated() {
        let store = InMemoryLedgerStore::new();
        let a = TenantId::new();
        let b = TenantId::new();
        let j = journal();
        let id = j.id;

        store
            .transaction(a, |state| {
                state.journals.insert(id, j.clone());
                Ok(())
            })
            .unwrap();
        store
            .read(b, |state| {
                assert!(state.journals.is_empty());
                Ok(())
            })
            .unwrap();
    }
}
