//! Integration tests for the full engine: service → store → domain.
//!
//! Covers the end-to-end scenarios: drafting and posting against the chart,
//! period gating, cache invalidation, and numbering under concurrency.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use proptest::prelude::*;

use contable_accounts::AccountKind;
use contable_core::{AccountId, DomainError, Money, TenantId, UserId};
use contable_ledger::{EntryStatus, JournalKind, SourceDocumentId, SourceDocumentTotals};
use contable_numbering::DocumentKind;

use crate::service::dto::{NewAccount, NewEntry, NewJournal, NewLine, NewSeries, SourceDocumentEntry};
use crate::service::LedgerService;
use crate::store::InMemoryLedgerStore;

fn service() -> Arc<LedgerService<InMemoryLedgerStore>> {
    contable_observability::init();
    Arc::new(LedgerService::new(InMemoryLedgerStore::new()))
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Builds `10 → 101 → 10101 → 1010101` (asset) and the same shape under
/// `70…` (income); returns (asset leaf, income leaf, asset parent `10101`).
fn seed_chart(
    service: &LedgerService<InMemoryLedgerStore>,
    tenant: TenantId,
) -> (AccountId, AccountId, AccountId) {
    let chains = [
        (["10", "101", "10101", "1010101"], AccountKind::Asset),
        (["70", "701", "70101", "7010101"], AccountKind::Income),
    ];
    let mut leaves = Vec::new();
    let mut parents = Vec::new();
    for (chain, kind) in chains {
        let mut parent: Option<AccountId> = None;
        for (segment, code) in chain.iter().enumerate() {
            let account = service
                .create_account(
                    tenant,
                    NewAccount {
                        code: (*code).into(),
                        name: format!("Account {code}"),
                        kind,
                        parent,
                    },
                )
                .unwrap();
            if segment == 2 {
                parents.push(account.id);
            }
            parent = Some(account.id);
        }
        leaves.push(parent.unwrap());
    }
    (leaves[0], leaves[1], parents[0])
}

fn seed_journal(service: &LedgerService<InMemoryLedgerStore>, tenant: TenantId) -> contable_core::JournalId {
    service
        .create_journal(
            tenant,
            NewJournal {
                code: "DV".into(),
                name: "Diario general".into(),
                kind: JournalKind::Manual,
                prefix: "DV".into(),
            },
        )
        .unwrap()
        .id
}

fn balanced_entry(
    journal: contable_core::JournalId,
    debit_account: AccountId,
    credit_account: AccountId,
    cents: i64,
    on: NaiveDate,
) -> NewEntry {
    NewEntry {
        journal,
        date: on,
        memo: "test entry".into(),
        period: None,
        lines: vec![
            NewLine {
                account: debit_account,
                description: "debit side".into(),
                debit: Money::from_cents(cents),
                credit: Money::ZERO,
            },
            NewLine {
                account: credit_account,
                description: "credit side".into(),
                debit: Money::ZERO,
                credit: Money::from_cents(cents),
            },
        ],
    }
}

#[test]
fn posted_entries_aggregate_up_the_account_tree() {
    let service = service();
    let tenant = TenantId::new();
    let (asset_leaf, income_leaf, asset_parent) = seed_chart(&service, tenant);
    let journal = seed_journal(&service, tenant);

    // Two posted entries debiting the leaf for 75.00 each.
    for _ in 0..2 {
        let entry = service
            .create_entry(
                tenant,
                balanced_entry(journal, asset_leaf, income_leaf, 7_500, date(2026, 3, 10)),
            )
            .unwrap();
        service.post_entry(tenant, entry.id).unwrap();
    }

    assert_eq!(
        service.account_balance(tenant, asset_leaf, None).unwrap(),
        Money::from_cents(15_000)
    );
    // The non-auxiliary parent aggregates to the same 150.00.
    assert_eq!(
        service.account_balance(tenant, asset_parent, None).unwrap(),
        Money::from_cents(15_000)
    );
    // The income side carries the mirror credit.
    assert_eq!(
        service.account_balance(tenant, income_leaf, None).unwrap(),
        Money::from_cents(-15_000)
    );
}

#[test]
fn drafts_do_not_count_toward_balances() {
    let service = service();
    let tenant = TenantId::new();
    let (asset_leaf, income_leaf, _) = seed_chart(&service, tenant);
    let journal = seed_journal(&service, tenant);

    service
        .create_entry(
            tenant,
            balanced_entry(journal, asset_leaf, income_leaf, 9_999, date(2026, 3, 11)),
        )
        .unwrap();

    assert_eq!(
        service.account_balance(tenant, asset_leaf, None).unwrap(),
        Money::ZERO
    );
}

#[test]
fn three_way_entry_posts_and_lopsided_entry_does_not() {
    let service = service();
    let tenant = TenantId::new();
    let (asset_leaf, income_leaf, _) = seed_chart(&service, tenant);
    let journal = seed_journal(&service, tenant);

    // 100.00 = 60.00 + 40.00 across three lines.
    let split = service
        .create_entry(
            tenant,
            NewEntry {
                journal,
                date: date(2026, 3, 12),
                memo: "split".into(),
                period: None,
                lines: vec![
                    NewLine {
                        account: asset_leaf,
                        description: "d".into(),
                        debit: Money::from_cents(10_000),
                        credit: Money::ZERO,
                    },
                    NewLine {
                        account: income_leaf,
                        description: "c1".into(),
                        debit: Money::ZERO,
                        credit: Money::from_cents(6_000),
                    },
                    NewLine {
                        account: income_leaf,
                        description: "c2".into(),
                        debit: Money::ZERO,
                        credit: Money::from_cents(4_000),
                    },
                ],
            },
        )
        .unwrap();
    let posted = service.post_entry(tenant, split.id).unwrap();
    assert_eq!(posted.status(), EntryStatus::Posted);
    assert_eq!(posted.number(), Some("DV-00000001"));

    // 100.00 vs 90.00 refuses to post and stays draft.
    let lopsided = service
        .create_entry(
            tenant,
            balanced_entry(journal, asset_leaf, income_leaf, 10_000, date(2026, 3, 13)),
        )
        .unwrap();
    service
        .update_line(
            tenant,
            lopsided.id,
            lopsided.lines()[1].id,
            Money::ZERO,
            Money::from_cents(9_000),
            None,
        )
        .unwrap();
    let err = service.post_entry(tenant, lopsided.id).unwrap_err();
    assert_eq!(
        err,
        DomainError::Unbalanced {
            debit: Money::from_cents(10_000),
            haber: Money::from_cents(9_000),
        }
    );
    assert!(service.get_entry(tenant, lopsided.id).unwrap().is_draft());

    // The failed post never burned a number: the next post gets 2.
    let next = service
        .create_entry(
            tenant,
            balanced_entry(journal, asset_leaf, income_leaf, 500, date(2026, 3, 14)),
        )
        .unwrap();
    let next = service.post_entry(tenant, next.id).unwrap();
    assert_eq!(next.number(), Some("DV-00000002"));
}

#[test]
fn closed_periods_reject_postings_by_date() {
    let service = service();
    let tenant = TenantId::new();
    let (asset_leaf, income_leaf, _) = seed_chart(&service, tenant);
    let journal = seed_journal(&service, tenant);

    let period = service.create_period(tenant, 3, 2026).unwrap();
    let entry = service
        .create_entry(
            tenant,
            balanced_entry(journal, asset_leaf, income_leaf, 1_000, date(2026, 3, 20)),
        )
        .unwrap();
    // The draft blocks the close…
    assert_eq!(
        service
            .close_period(tenant, period.id, UserId::new())
            .unwrap_err(),
        DomainError::HasDraftEntries(1)
    );
    // …void it, close, and the next posting dated into the period bounces.
    service.void_entry(tenant, entry.id).unwrap();
    service.close_period(tenant, period.id, UserId::new()).unwrap();

    let late = service
        .create_entry(
            tenant,
            balanced_entry(journal, asset_leaf, income_leaf, 1_000, date(2026, 3, 21)),
        )
        .unwrap();
    assert_eq!(
        service.post_entry(tenant, late.id).unwrap_err(),
        DomainError::PeriodClosed { month: 3, year: 2026 }
    );
}

#[test]
fn periods_close_and_reopen_in_chronological_order() {
    let service = service();
    let tenant = TenantId::new();

    let report = service
        .bulk_create_periods(tenant, 2026, &[1, 2, 3])
        .unwrap();
    assert_eq!(report.created.len(), 3);

    // Re-running skips everything, touching nothing.
    let rerun = service
        .bulk_create_periods(tenant, 2026, &[1, 2, 3])
        .unwrap();
    assert!(rerun.created.is_empty());
    assert_eq!(rerun.skipped_months, vec![1, 2, 3]);

    let user = UserId::new();
    // Closing an empty period succeeds.
    service.close_period(tenant, report.created[0], user).unwrap();
    service.close_period(tenant, report.created[1], user).unwrap();

    assert_eq!(
        service
            .reopen_period(tenant, report.created[0])
            .unwrap_err(),
        DomainError::LaterPeriodClosed { month: 2, year: 2026 }
    );
    service.reopen_period(tenant, report.created[1]).unwrap();
    service.reopen_period(tenant, report.created[0]).unwrap();
}

#[test]
fn posting_invalidates_cached_balances_up_the_chain() {
    let service = service();
    let tenant = TenantId::new();
    let (asset_leaf, income_leaf, asset_parent) = seed_chart(&service, tenant);
    let journal = seed_journal(&service, tenant);

    let entry = service
        .create_entry(
            tenant,
            balanced_entry(journal, asset_leaf, income_leaf, 2_000, date(2026, 4, 1)),
        )
        .unwrap();
    service.post_entry(tenant, entry.id).unwrap();

    // Prime the cache.
    assert_eq!(
        service.account_balance(tenant, asset_parent, None).unwrap(),
        Money::from_cents(2_000)
    );
    assert!(service.balances().get(tenant, asset_parent, None).is_some());

    // A second posting dirties the leaf and every ancestor.
    let entry = service
        .create_entry(
            tenant,
            balanced_entry(journal, asset_leaf, income_leaf, 3_000, date(2026, 4, 2)),
        )
        .unwrap();
    service.post_entry(tenant, entry.id).unwrap();
    assert!(service.balances().get(tenant, asset_parent, None).is_none());
    assert_eq!(
        service.account_balance(tenant, asset_parent, None).unwrap(),
        Money::from_cents(5_000)
    );

    // Voiding the posted entry pulls it back out of the aggregates.
    service.void_entry(tenant, entry.id).unwrap();
    assert_eq!(
        service.account_balance(tenant, asset_parent, None).unwrap(),
        Money::from_cents(2_000)
    );
}

#[test]
fn accounts_with_movements_cannot_be_deleted() {
    let service = service();
    let tenant = TenantId::new();
    let (asset_leaf, income_leaf, _) = seed_chart(&service, tenant);
    let journal = seed_journal(&service, tenant);

    let entry = service
        .create_entry(
            tenant,
            balanced_entry(journal, asset_leaf, income_leaf, 100, date(2026, 5, 1)),
        )
        .unwrap();
    service.post_entry(tenant, entry.id).unwrap();

    assert_eq!(
        service.delete_account(tenant, asset_leaf).unwrap_err(),
        DomainError::HasMovements
    );
}

#[test]
fn source_documents_generate_one_entry_only() {
    let service = service();
    let tenant = TenantId::new();
    let (asset_leaf, income_leaf, _) = seed_chart(&service, tenant);
    let journal = seed_journal(&service, tenant);

    // A liability leaf for the tax side.
    let mut parent = None;
    let mut tax_leaf = None;
    for code in ["40", "4001", "400101", "40010101"] {
        let account = service
            .create_account(
                tenant,
                NewAccount {
                    code: code.into(),
                    name: "IGV".into(),
                    kind: AccountKind::Liability,
                    parent,
                },
            )
            .unwrap();
        parent = Some(account.id);
        tax_leaf = Some(account.id);
    }
    let tax_leaf = tax_leaf.unwrap();

    let request = SourceDocumentEntry {
        journal,
        date: date(2026, 5, 2),
        memo: "Invoice F001-00000001".into(),
        totals: SourceDocumentTotals {
            document: SourceDocumentId::new(),
            total_net: Money::from_cents(10_000),
            total_tax: Money::from_cents(1_800),
            total_gross: Money::from_cents(11_800),
        },
        receivable_account: asset_leaf,
        revenue_account: income_leaf,
        tax_account: tax_leaf,
    };

    let generated = service.entry_from_source(tenant, request.clone()).unwrap();
    assert!(generated.is_balanced());
    assert_eq!(generated.lines().len(), 3);

    // The document already owns an entry.
    assert_eq!(
        service.entry_from_source(tenant, request.clone()).unwrap_err(),
        DomainError::AlreadyLinked
    );

    // Voiding releases the document for regeneration.
    service.void_entry(tenant, generated.id).unwrap();
    service.entry_from_source(tenant, request).unwrap();
}

#[test]
fn duplicate_produces_an_unnumbered_draft_through_the_service() {
    let service = service();
    let tenant = TenantId::new();
    let (asset_leaf, income_leaf, _) = seed_chart(&service, tenant);
    let journal = seed_journal(&service, tenant);

    let entry = service
        .create_entry(
            tenant,
            balanced_entry(journal, asset_leaf, income_leaf, 4_200, date(2026, 6, 1)),
        )
        .unwrap();
    service.post_entry(tenant, entry.id).unwrap();

    let copy = service.duplicate_entry(tenant, entry.id).unwrap();
    assert!(copy.is_draft());
    assert!(copy.number().is_none());
    assert_eq!(copy.total_debit(), Money::from_cents(4_200));
}

#[test]
fn concurrent_document_numbering_yields_distinct_values() {
    let service = service();
    let tenant = TenantId::new();
    let series = service
        .create_series(
            tenant,
            NewSeries {
                kind: DocumentKind::Invoice,
                code: "F001".into(),
            },
        )
        .unwrap();
    service.reset_series(tenant, series.id, 5).unwrap();

    const THREADS: usize = 8;
    const DRAWS: usize = 5;
    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let service = service.clone();
        let series_id = series.id;
        handles.push(thread::spawn(move || {
            (0..DRAWS)
                .map(|_| service.next_document_number(tenant, series_id).unwrap().0)
                .collect::<Vec<u64>>()
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for value in handle.join().unwrap() {
            assert!(value > 5, "values start above the seeded correlative");
            assert!(seen.insert(value), "duplicate number {value}");
        }
    }
    assert_eq!(seen.len(), THREADS * DRAWS);
}

#[test]
fn two_concurrent_draws_from_a_seeded_series_are_six_and_seven() {
    let service = service();
    let tenant = TenantId::new();
    let series = service
        .create_series(
            tenant,
            NewSeries {
                kind: DocumentKind::Invoice,
                code: "F002".into(),
            },
        )
        .unwrap();
    service.reset_series(tenant, series.id, 5).unwrap();

    let a = {
        let service = service.clone();
        let id = series.id;
        thread::spawn(move || service.next_document_number(tenant, id).unwrap().0)
    };
    let b = {
        let service = service.clone();
        let id = series.id;
        thread::spawn(move || service.next_document_number(tenant, id).unwrap().0)
    };
    let mut drawn = vec![a.join().unwrap(), b.join().unwrap()];
    drawn.sort_unstable();
    assert_eq!(drawn, vec![6, 7]);
}

#[test]
fn concurrent_posts_get_distinct_entry_numbers() {
    let service = service();
    let tenant = TenantId::new();
    let (asset_leaf, income_leaf, _) = seed_chart(&service, tenant);
    let journal = seed_journal(&service, tenant);

    let mut handles = Vec::new();
    for i in 0..6 {
        let service = service.clone();
        let entry = service
            .create_entry(
                tenant,
                balanced_entry(journal, asset_leaf, income_leaf, 100 + i, date(2026, 7, 1)),
            )
            .unwrap();
        handles.push(thread::spawn(move || {
            service
                .post_entry(tenant, entry.id)
                .unwrap()
                .number()
                .unwrap()
                .to_string()
        }));
    }

    let numbers: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(numbers.len(), 6, "every posted entry got its own number");
}

#[test]
fn entries_serialize_to_a_stable_wire_shape() {
    let service = service();
    let tenant = TenantId::new();
    let (asset_leaf, income_leaf, _) = seed_chart(&service, tenant);
    let journal = seed_journal(&service, tenant);

    let entry = service
        .create_entry(
            tenant,
            balanced_entry(journal, asset_leaf, income_leaf, 15_000, date(2026, 9, 3)),
        )
        .unwrap();
    let posted = service.post_entry(tenant, entry.id).unwrap();

    let wire = serde_json::to_value(&posted).unwrap();
    assert_eq!(wire["status"], "posted");
    assert_eq!(wire["number"], "DV-00000001");
    assert_eq!(wire["total_debit"], 15_000);
    assert_eq!(wire["date"], "2026-09-03");
    // Transparent ids serialize as bare UUID strings.
    assert_eq!(
        wire["lines"][0]["account"],
        asset_leaf.as_uuid().to_string()
    );

    // And the wire shape round-trips.
    let back: contable_ledger::JournalEntry = serde_json::from_value(wire).unwrap();
    assert_eq!(back, posted);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 24,
        ..ProptestConfig::default()
    })]

    /// Whatever balanced entries are thrown at the service, posted debits
    /// always equal posted credits and the tree aggregates exactly.
    #[test]
    fn random_balanced_postings_aggregate_exactly(
        amounts in prop::collection::vec(1i64..1_000_000, 1..10)
    ) {
        let service = service();
        let tenant = TenantId::new();
        let (asset_leaf, income_leaf, asset_parent) = seed_chart(&service, tenant);
        let journal = seed_journal(&service, tenant);

        let mut total = 0i64;
        for cents in amounts {
            let entry = service
                .create_entry(
                    tenant,
                    balanced_entry(journal, asset_leaf, income_leaf, cents, date(2026, 10, 5)),
                )
                .unwrap();
            let posted = service.post_entry(tenant, entry.id).unwrap();
            prop_assert_eq!(posted.total_debit(), posted.total_haber());
            total += cents;
        }

        prop_assert_eq!(
            service.account_balance(tenant, asset_leaf, None).unwrap(),
            Money::from_cents(total)
        );
        prop_assert_eq!(
            service.account_balance(tenant, asset_parent, None).unwrap(),
            Money::from_cents(total)
        );
        prop_assert_eq!(
            service.account_balance(tenant, income_leaf, None).unwrap(),
            Money::from_cents(-total)
        );
    }
}

#[test]
fn tenants_never_share_counters_or_charts() {
    let service = service();
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();

    // Same codes on both tenants: no conflicts.
    let (a_leaf, a_income, _) = seed_chart(&service, tenant_a);
    let (b_leaf, b_income, _) = seed_chart(&service, tenant_b);
    let journal_a = seed_journal(&service, tenant_a);
    let journal_b = seed_journal(&service, tenant_b);

    // Counters advance independently: both tenants get number 1.
    let on = date(2026, 8, 1);
    let entry_a = service
        .create_entry(tenant_a, balanced_entry(journal_a, a_leaf, a_income, 100, on))
        .unwrap();
    let entry_b = service
        .create_entry(tenant_b, balanced_entry(journal_b, b_leaf, b_income, 200, on))
        .unwrap();
    let posted_a = service.post_entry(tenant_a, entry_a.id).unwrap();
    let posted_b = service.post_entry(tenant_b, entry_b.id).unwrap();
    assert_eq!(posted_a.number(), Some("DV-00000001"));
    assert_eq!(posted_b.number(), Some("DV-00000001"));

    // And balances stay tenant-local.
    assert_eq!(
        service.account_balance(tenant_a, a_leaf, None).unwrap(),
        Money::from_cents(100)
    );
    assert_eq!(
        service.account_balance(tenant_b, b_leaf, None).unwrap(),
        Money::from_cents(200)
    );

    // A tenant cannot see another tenant's accounts at all.
    assert_eq!(
        service.account_balance(tenant_a, b_leaf, None).unwrap_err(),
        DomainError::NotFound
    );
}
