//! Depth-first chart traversal for hierarchical reports.

use contable_core::AccountId;

use crate::account::Account;
use crate::chart::ChartOfAccounts;

/// Lazy depth-first iterator over a chart (or one subtree of it).
///
/// Children are visited in account-code order. The iterator is consumed by
/// iteration and cannot be restarted; request a fresh one from
/// [`ChartOfAccounts::tree`].
#[derive(Debug)]
pub struct TreeIter<'a> {
    chart: &'a ChartOfAccounts,
    stack: Vec<AccountId>,
}

impl<'a> TreeIter<'a> {
    pub(crate) fn new(chart: &'a ChartOfAccounts, mut start: Vec<AccountId>) -> Self {
        // Reversed so that popping yields ascending code order.
        start.reverse();
        Self { chart, stack: start }
    }
}

impl<'a> Iterator for TreeIter<'a> {
    type Item = &'a Account;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let mut children = self.chart.child_ids(id);
        children.reverse();
        self.stack.extend(children);
        Some(self.chart.account_unchecked(id))
    }
}
