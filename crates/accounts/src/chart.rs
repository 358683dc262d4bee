//! Per-tenant chart of accounts: hierarchy maintenance and aggregation.

use std::collections::{BTreeMap, HashMap};

use contable_core::{AccountId, DomainError, DomainResult, Money};

use crate::account::{Account, AccountCode, AccountKind, MAX_LEVEL};
use crate::tree::TreeIter;

/// The chart of accounts for one tenant.
///
/// Lookups that walk children scan the account map; charts are small (a few
/// thousand nodes at most) and the store keeps one chart per tenant, so the
/// simple representation wins over index upkeep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartOfAccounts {
    accounts: HashMap<AccountId, Account>,
    by_code: BTreeMap<AccountCode, AccountId>,
}

impl ChartOfAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, id: AccountId) -> DomainResult<&Account> {
        self.accounts.get(&id).ok_or_else(DomainError::not_found)
    }

    pub fn find_by_code(&self, code: &str) -> Option<&Account> {
        let code = AccountCode::new(code).ok()?;
        self.by_code.get(&code).map(|id| &self.accounts[id])
    }

    /// Child ids of `id`, ordered by account code.
    pub fn child_ids(&self, id: AccountId) -> Vec<AccountId> {
        let mut children: Vec<&Account> = self
            .accounts
            .values()
            .filter(|a| a.parent == Some(id))
            .collect();
        children.sort_by(|a, b| a.code.cmp(&b.code));
        children.iter().map(|a| a.id).collect()
    }

    /// Root ids (no parent), ordered by account code.
    pub fn root_ids(&self) -> Vec<AccountId> {
        let mut roots: Vec<&Account> = self
            .accounts
            .values()
            .filter(|a| a.parent.is_none())
            .collect();
        roots.sort_by(|a, b| a.code.cmp(&b.code));
        roots.iter().map(|a| a.id).collect()
    }

    /// Create an account under `parent` (or as a root).
    pub fn create(
        &mut self,
        id: AccountId,
        code: &str,
        name: impl Into<String>,
        kind: AccountKind,
        parent: Option<AccountId>,
    ) -> DomainResult<&Account> {
        let code = AccountCode::new(code)?;
        if self.by_code.contains_key(&code) {
            return Err(DomainError::conflict(format!(
                "account code {code} already exists"
            )));
        }
        if self.accounts.contains_key(&id) {
            return Err(DomainError::conflict("account id already exists"));
        }

        let level = match parent {
            None => 1,
            Some(parent_id) => {
                let parent = self.get(parent_id)?;
                if parent.kind != kind {
                    return Err(DomainError::invalid_hierarchy(format!(
                        "kind {kind:?} does not match parent kind {:?}",
                        parent.kind
                    )));
                }
                if !parent.code.is_prefix_of(&code) {
                    return Err(DomainError::invalid_hierarchy(format!(
                        "code {code} must extend parent code {}",
                        parent.code
                    )));
                }
                if parent.level >= MAX_LEVEL {
                    return Err(DomainError::invalid_hierarchy(format!(
                        "parent {} is already at the maximum level {MAX_LEVEL}",
                        parent.code
                    )));
                }
                parent.level + 1
            }
        };

        let account = Account {
            id,
            code: code.clone(),
            name: name.into(),
            kind,
            parent,
            level,
        };
        self.by_code.insert(code, id);
        self.accounts.insert(id, account);
        Ok(&self.accounts[&id])
    }

    pub fn rename(&mut self, id: AccountId, name: impl Into<String>) -> DomainResult<()> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or_else(DomainError::not_found)?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("account name must not be empty"));
        }
        account.name = name;
        Ok(())
    }

    /// True if `candidate` sits somewhere below `ancestor`.
    pub fn is_descendant(&self, candidate: AccountId, ancestor: AccountId) -> bool {
        let mut cursor = self.accounts.get(&candidate).and_then(|a| a.parent);
        // The chart is kept acyclic; the hop bound is defensive.
        let mut hops = self.accounts.len();
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            if hops == 0 {
                break;
            }
            hops -= 1;
            cursor = self.accounts.get(&current).and_then(|a| a.parent);
        }
        false
    }

    /// Ids of `id` and every account above it, leaf first.
    pub fn self_and_ancestors(&self, id: AccountId) -> DomainResult<Vec<AccountId>> {
        let mut chain = vec![id];
        let mut cursor = self.get(id)?.parent;
        let mut hops = self.accounts.len();
        while let Some(current) = cursor {
            chain.push(current);
            if hops == 0 {
                break;
            }
            hops -= 1;
            cursor = self.accounts.get(&current).and_then(|a| a.parent);
        }
        Ok(chain)
    }

    /// Ids of the whole subtree rooted at `id` (including `id`), preorder.
    pub fn subtree_ids(&self, id: AccountId) -> DomainResult<Vec<AccountId>> {
        self.get(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children = self.child_ids(current);
            children.reverse();
            stack.extend(children);
        }
        Ok(out)
    }

    /// Move `id` (and its subtree) under `new_parent`.
    ///
    /// Levels and auxiliary status are recomputed for the whole subtree.
    pub fn reparent(&mut self, id: AccountId, new_parent: Option<AccountId>) -> DomainResult<()> {
        let account = self.get(id)?;
        let kind = account.kind;

        let new_level = match new_parent {
            None => 1,
            Some(parent_id) => {
                if parent_id == id || self.is_descendant(parent_id, id) {
                    return Err(DomainError::CyclicReference);
                }
                let parent = self.get(parent_id)?;
                if parent.kind != kind {
                    return Err(DomainError::invalid_hierarchy(format!(
                        "kind {kind:?} does not match parent kind {:?}",
                        parent.kind
                    )));
                }
                parent.level + 1
            }
        };

        let subtree = self.subtree_ids(id)?;
        let old_level = self.accounts[&id].level;
        let deepest = subtree
            .iter()
            .map(|a| self.accounts[a].level - old_level)
            .max()
            .unwrap_or(0);
        if new_level + deepest > MAX_LEVEL {
            return Err(DomainError::invalid_hierarchy(format!(
                "moved subtree would exceed the maximum level {MAX_LEVEL}"
            )));
        }

        if let Some(account) = self.accounts.get_mut(&id) {
            account.parent = new_parent;
        }
        // Preorder guarantees parents are re-leveled before their children.
        for member in subtree {
            let parent_level = match self.accounts[&member].parent {
                Some(p) if member != id => self.accounts[&p].level,
                _ if member == id => {
                    if let Some(account) = self.accounts.get_mut(&member) {
                        account.level = new_level;
                    }
                    continue;
                }
                _ => 0,
            };
            if let Some(account) = self.accounts.get_mut(&member) {
                account.level = parent_level + 1;
            }
        }
        Ok(())
    }

    /// Re-classify a root account's subtree.
    ///
    /// Children inherit the subtree kind, so only roots change kind, and only
    /// while the subtree has no auxiliary accounts (their posted lines would
    /// silently switch balance-sheet classification).
    pub fn change_kind(&mut self, id: AccountId, kind: AccountKind) -> DomainResult<()> {
        let account = self.get(id)?;
        if account.parent.is_some() {
            return Err(DomainError::invalid_hierarchy(
                "kind is set on root accounts; children inherit the subtree kind",
            ));
        }
        let subtree = self.subtree_ids(id)?;
        if subtree
            .iter()
            .any(|a| *a != id && self.accounts[a].is_auxiliary())
        {
            return Err(DomainError::invalid_hierarchy(
                "subtree has auxiliary accounts; their classification cannot change",
            ));
        }
        for member in subtree {
            if let Some(account) = self.accounts.get_mut(&member) {
                account.kind = kind;
            }
        }
        Ok(())
    }

    /// Remove an account that has no children and no ledger movements.
    ///
    /// The caller resolves `has_movements` against the ledger (the chart does
    /// not see journal lines).
    pub fn delete(&mut self, id: AccountId, has_movements: bool) -> DomainResult<Account> {
        self.get(id)?;
        if !self.child_ids(id).is_empty() {
            return Err(DomainError::HasChildren);
        }
        if has_movements {
            return Err(DomainError::HasMovements);
        }
        let account = self
            .accounts
            .remove(&id)
            .ok_or_else(DomainError::not_found)?;
        self.by_code.remove(&account.code);
        Ok(account)
    }

    /// Signed balance of `id`.
    ///
    /// Auxiliary accounts answer from their own posted lines (`leaf_balance`);
    /// everything else aggregates every auxiliary account below it.
    pub fn balance(
        &self,
        id: AccountId,
        leaf_balance: &dyn Fn(&AccountId) -> Money,
    ) -> DomainResult<Money> {
        let account = self.get(id)?;
        if account.is_auxiliary() {
            return Ok(leaf_balance(&id));
        }
        let mut total = Money::ZERO;
        for member in self.subtree_ids(id)? {
            if self.accounts[&member].is_auxiliary() {
                total = total.checked_add(leaf_balance(&member))?;
            }
        }
        Ok(total)
    }

    /// Lazy depth-first traversal (children ordered by code).
    ///
    /// The iterator borrows the chart and is consumed by iteration; restart
    /// by asking for a new one.
    pub fn tree(&self, root: Option<AccountId>) -> DomainResult<TreeIter<'_>> {
        let start = match root {
            Some(id) => {
                self.get(id)?;
                vec![id]
            }
            None => self.root_ids(),
        };
        Ok(TreeIter::new(self, start))
    }

    pub(crate) fn account_unchecked(&self, id: AccountId) -> &Account {
        &self.accounts[&id]
    }
}
