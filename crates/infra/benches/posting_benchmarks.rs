use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

use chrono::NaiveDate;

use contable_accounts::AccountKind;
use contable_core::{AccountId, JournalId, Money, TenantId};
use contable_infra::service::dto::{NewAccount, NewEntry, NewJournal, NewLine};
use contable_infra::{InMemoryLedgerStore, LedgerService};
use contable_ledger::JournalKind;

struct Fixture {
    service: LedgerService<InMemoryLedgerStore>,
    tenant: TenantId,
    journal: JournalId,
    debit_leaf: AccountId,
    credit_leaf: AccountId,
    parent: AccountId,
}

/// Chart with two 4-level chains, one journal, no periods.
fn fixture() -> Fixture {
    let service = LedgerService::new(InMemoryLedgerStore::new());
    let tenant = TenantId::new();

    let build_chain = |codes: [&str; 4], kind: AccountKind| -> (AccountId, AccountId) {
        let mut parent = None;
        let mut level3 = None;
        for (i, code) in codes.iter().enumerate() {
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
            if i == 2 {
                level3 = Some(account.id);
            }
            parent = Some(account.id);
        }
        (parent.unwrap(), level3.unwrap())
    };

    let (debit_leaf, parent) = build_chain(["10", "101", "10101", "1010101"], AccountKind::Asset);
    let (credit_leaf, _) = build_chain(["70", "701", "70101", "7010101"], AccountKind::Income);

    let journal = service
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
        .id;

    Fixture {
        service,
        tenant,
        journal,
        debit_leaf,
        credit_leaf,
        parent,
    }
}

fn entry_request(f: &Fixture, cents: i64) -> NewEntry {
    NewEntry {
        journal: f.journal,
        date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
        memo: "bench entry".into(),
        period: None,
        lines: vec![
            NewLine {
                account: f.debit_leaf,
                description: "d".into(),
                debit: Money::from_cents(cents),
                credit: Money::ZERO,
            },
            NewLine {
                account: f.credit_leaf,
                description: "c".into(),
                debit: Money::ZERO,
                credit: Money::from_cents(cents),
            },
        ],
    }
}

fn bench_posting(c: &mut Criterion) {
    let mut group = c.benchmark_group("posting");
    group.throughput(Throughput::Elements(1));
    group.bench_function("draft_and_post", |b| {
        let f = fixture();
        b.iter_batched(
            || {
                f.service
                    .create_entry(f.tenant, entry_request(&f, 1_000))
                    .unwrap()
                    .id
            },
            |entry| f.service.post_entry(f.tenant, entry).unwrap(),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_balances(c: &mut Criterion) {
    let mut group = c.benchmark_group("balance_aggregation");

    for entries in [10u32, 100] {
        let f = fixture();
        for _ in 0..entries {
            let id = f
                .service
                .create_entry(f.tenant, entry_request(&f, 500))
                .unwrap()
                .id;
            f.service.post_entry(f.tenant, id).unwrap();
        }

        group.bench_with_input(
            BenchmarkId::new("recomputed", entries),
            &entries,
            |b, _| {
                b.iter(|| {
                    f.service.balances().invalidate_tenant(f.tenant);
                    f.service.account_balance(f.tenant, f.parent, None).unwrap()
                });
            },
        );
        group.bench_with_input(BenchmarkId::new("cached", entries), &entries, |b, _| {
            // Prime once; every iteration is a cache hit.
            f.service.account_balance(f.tenant, f.parent, None).unwrap();
            b.iter(|| f.service.account_balance(f.tenant, f.parent, None).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_posting, bench_balances);
criterion_main!(benches);
