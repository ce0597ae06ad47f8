use cle::ids::{AccountId, CurrencyId, CustomerId, ReferenceNo};
use cle::models::{Account, CashTransaction, TransactionStatus, TransactionType};
use cle::stores::{
    AccountStore, HistoryFilters, LedgerStore, MemoryStore, StoreError, TransactionQuery,
    TransactionStore, UnitOfWork,
};
use cle::{
    ApplicationError, LedgerEngine, LedgerError, LedgerSettings, MemoryLedger, Money,
    RejectionReason, TransactionCommand,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

const SOME_CURRENCY: CurrencyId = CurrencyId(949);
const OTHER_CURRENCY: CurrencyId = CurrencyId(840);
const SOME_OWNER: CustomerId = CustomerId(Uuid::from_u128(1));
const OTHER_OWNER: CustomerId = CustomerId(Uuid::from_u128(2));

struct Fixture {
    store: Arc<MemoryStore>,
    engine: MemoryLedger,
    a: AccountId,
    b: AccountId,
}

fn money(amount: Decimal) -> Money {
    Money::new(amount, SOME_CURRENCY)
}

fn build_fixture(settings: LedgerSettings) -> Fixture {
    let (store, engine) = cle::build_memory_ledger(settings);

    let a = store
        .open_account(Account::new("A", "TR0A", SOME_CURRENCY).with_balance(dec!(100)).with_owner(SOME_OWNER))
        .unwrap();
    let b = store
        .open_account(Account::new("B", "TR0B", SOME_CURRENCY).with_balance(dec!(50)).with_owner(OTHER_OWNER))
        .unwrap();

    Fixture { store, engine, a, b }
}

fn balance(store: &MemoryStore, id: AccountId) -> Decimal {
    store.load_account(id).unwrap().unwrap().balance.amount()
}

fn total(store: &MemoryStore) -> Decimal {
    store.accounts().iter().map(|account| account.balance.amount()).sum()
}

#[test]
fn transfer_preserves_total() {
    let f = build_fixture(LedgerSettings::default());

    let result = f
        .engine
        .submit_transaction(TransactionCommand::transfer("R1", f.a, f.b, money(dec!(30)), SOME_OWNER))
        .unwrap();

    assert_eq!(result.transaction.status(), TransactionStatus::Posted);
    assert_eq!(balance(&f.store, f.a), dec!(70));
    assert_eq!(balance(&f.store, f.b), dec!(80));
    assert_eq!(total(&f.store), dec!(150));
    assert_eq!(result.balances.len(), 2);
}

#[test]
fn fees_leave_the_system() {
    let f = build_fixture(LedgerSettings::default());

    f.engine
        .submit_transaction(
            TransactionCommand::transfer("R1", f.a, f.b, money(dec!(30)), SOME_OWNER)
                .with_fees(money(dec!(1.25))),
        )
        .unwrap();

    assert_eq!(balance(&f.store, f.a), dec!(68.75));
    assert_eq!(balance(&f.store, f.b), dec!(80));
    assert_eq!(total(&f.store), dec!(148.75));
}

#[test]
fn resubmitting_is_idempotent() {
    let f = build_fixture(LedgerSettings::default());
    let command = TransactionCommand::transfer("R1", f.a, f.b, money(dec!(30)), SOME_OWNER);

    let first = f.engine.submit_transaction(command.clone()).unwrap();
    let second = f.engine.submit_transaction(command);

    assert_eq!(
        second,
        Err(LedgerError::Rejected(RejectionReason::DuplicateReference("R1".into())))
    );
    assert_eq!(balance(&f.store, f.a), dec!(70));
    assert_eq!(f.store.transactions().len(), 1);
    assert_eq!(
        f.engine.find_by_reference(&"R1".into()).unwrap(),
        Some(first.transaction)
    );
}

#[rstest]
#[case::insufficient_funds(
    TransactionCommand::withdrawal("R1", AccountId(Uuid::nil()), Money::new(dec!(100.01), SOME_CURRENCY), SOME_OWNER),
    "insufficient"
)]
#[case::unsupported(
    TransactionCommand {
        transaction_type: cle::RequestedType::Unsupported("refund".to_string()),
        ..TransactionCommand::deposit("R1", AccountId(Uuid::nil()), Money::new(dec!(1), SOME_CURRENCY), SOME_OWNER)
    },
    "unsupported"
)]
#[case::wrong_currency(
    TransactionCommand::deposit("R1", AccountId(Uuid::nil()), Money::new(dec!(1), OTHER_CURRENCY), SOME_OWNER),
    "currency"
)]
#[case::not_owner(
    TransactionCommand::withdrawal("R1", AccountId(Uuid::nil()), Money::new(dec!(1), SOME_CURRENCY), OTHER_OWNER),
    "owner"
)]
fn rejections_leave_no_trace(#[case] command: TransactionCommand, #[case] expected: &str) {
    let f = build_fixture(LedgerSettings::default());
    let command = TransactionCommand {
        from_account: f.a,
        ..command
    };

    let reason = f
        .engine
        .submit_transaction(command)
        .unwrap_err()
        .rejection()
        .cloned()
        .unwrap();

    let matched = match reason {
        RejectionReason::InsufficientFunds(id) => expected == "insufficient" && id == f.a,
        RejectionReason::UnsupportedTransactionType(_) => expected == "unsupported",
        RejectionReason::CurrencyMismatch { .. } => expected == "currency",
        RejectionReason::UnauthorizedOperation(id) => expected == "owner" && id == f.a,
        _ => false,
    };

    assert!(matched, "{expected}: {reason:?}");
    assert_eq!(balance(&f.store, f.a), dec!(100));
    assert!(f.store.transactions().is_empty());
    assert_eq!(f.engine.find_by_reference(&"R1".into()).unwrap(), None);
}

#[test]
fn overdraft_floor() {
    let f = build_fixture(LedgerSettings::default());
    let c = f
        .store
        .open_account(
            Account::new("C", "TR0C", SOME_CURRENCY)
                .with_overdraft(dec!(0), dec!(50))
                .with_owner(SOME_OWNER),
        )
        .unwrap();

    f.engine
        .submit_transaction(TransactionCommand::withdrawal("R1", c, money(dec!(50)), SOME_OWNER))
        .unwrap();
    assert_eq!(balance(&f.store, c), dec!(-50));

    let result = f
        .engine
        .submit_transaction(TransactionCommand::withdrawal("R2", c, money(dec!(0.01)), SOME_OWNER));
    assert_eq!(result, Err(LedgerError::from(RejectionReason::InsufficientFunds(c))));

    // Deposits into an overdrawn account are always accepted
    f.engine
        .submit_transaction(TransactionCommand::deposit("R3", c, money(dec!(10)), SOME_OWNER))
        .unwrap();
    assert_eq!(balance(&f.store, c), dec!(-40));
}

#[test]
fn history_after_activity() {
    let f = build_fixture(LedgerSettings::default());

    for n in 0..5 {
        f.engine
            .submit_transaction(TransactionCommand::transfer(format!("T{n}"), f.a, f.b, money(dec!(1)), SOME_OWNER))
            .unwrap();
    }
    f.engine
        .submit_transaction(TransactionCommand::withdrawal("W", f.b, money(dec!(1)), OTHER_OWNER))
        .unwrap();

    let page = f.engine.get_account_history("B", &HistoryFilters::default(), 1, 4).unwrap();
    assert_eq!(page.total_count, 6);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.data.len(), 4);

    let withdrawals = HistoryFilters {
        transaction_type: Some(TransactionType::Withdrawal),
        ..Default::default()
    };
    let page = f.engine.get_account_history("TR0B", &withdrawals, 1, 4).unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.data[0].reference_no, "W".into());

    let page = f.engine.get_account_history("A", &withdrawals, 1, 4).unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.data.is_empty());
}

#[test]
fn same_reference_from_many_threads_posts_once() {
    let f = build_fixture(LedgerSettings {
        max_attempts: 50,
        ..Default::default()
    });

    let posted = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..16 {
            scope.spawn(|| {
                let command = TransactionCommand::transfer("SAME", f.a, f.b, money(dec!(10)), SOME_OWNER);

                match f.engine.submit_transaction(command) {
                    Ok(_) => {
                        posted.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => assert_eq!(
                        e,
                        LedgerError::Rejected(RejectionReason::DuplicateReference("SAME".into()))
                    ),
                }
            });
        }
    });

    assert_eq!(posted.load(Ordering::SeqCst), 1);
    assert_eq!(balance(&f.store, f.a), dec!(90));
    assert_eq!(balance(&f.store, f.b), dec!(60));
    assert_eq!(f.store.transactions().len(), 1);
}

#[test]
fn concurrent_debits_never_overdraw() {
    let f = build_fixture(LedgerSettings {
        max_attempts: 1_000,
        ..Default::default()
    });

    let posted = AtomicUsize::new(0);

    // 200 debits of 10 against a balance of 100: exactly 10 may succeed
    thread::scope(|scope| {
        for worker in 0..20 {
            let f = &f;
            let posted = &posted;

            scope.spawn(move || {
                for n in 0..10 {
                    let reference_no = format!("W{worker}-{n}");
                    let command = if n % 2 == 0 {
                        TransactionCommand::withdrawal(reference_no, f.a, money(dec!(10)), SOME_OWNER)
                    } else {
                        TransactionCommand::transfer(reference_no, f.a, f.b, money(dec!(10)), SOME_OWNER)
                    };

                    match f.engine.submit_transaction(command) {
                        Ok(_) => {
                            posted.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => assert_eq!(e, LedgerError::from(RejectionReason::InsufficientFunds(f.a))),
                    }
                }
            });
        }
    });

    assert_eq!(posted.load(Ordering::SeqCst), 10);
    assert_eq!(balance(&f.store, f.a), dec!(0));

    let transferred: Decimal = f
        .store
        .transactions()
        .iter()
        .filter(|transaction| transaction.transaction_type == TransactionType::Transfer)
        .map(|transaction| transaction.amount.amount())
        .sum();
    assert_eq!(balance(&f.store, f.b), dec!(50) + transferred);
}

/// Store whose units of work misbehave on commit
struct FaultyStore {
    inner: MemoryStore,
    fault: Fault,
    commits: AtomicUsize,
}

#[derive(Clone, Copy)]
enum Fault {
    Unavailable,
    AlwaysConflict,
}

struct FaultyUnit<'a> {
    inner: Box<dyn UnitOfWork + 'a>,
    store: &'a FaultyStore,
    touched: Option<AccountId>,
}

impl AccountStore for FaultyUnit<'_> {
    fn load_for_update(&mut self, id: AccountId) -> Result<Account, StoreError> {
        self.touched = Some(id);
        self.inner.load_for_update(id)
    }

    fn save(&mut self, account: Account) -> Result<(), StoreError> {
        self.inner.save(account)
    }
}

impl TransactionStore for FaultyUnit<'_> {
    fn exists_by_reference(&self, reference_no: &ReferenceNo) -> Result<bool, StoreError> {
        self.inner.exists_by_reference(reference_no)
    }

    fn insert(&mut self, transaction: CashTransaction) -> Result<(), StoreError> {
        self.inner.insert(transaction)
    }
}

impl UnitOfWork for FaultyUnit<'_> {
    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.store.commits.fetch_add(1, Ordering::SeqCst);

        match (self.store.fault, self.touched) {
            (Fault::AlwaysConflict, Some(id)) => Err(StoreError::VersionConflict(id)),
            _ => Err(StoreError::Unavailable("connection reset".to_string())),
        }
    }
}

impl LedgerStore for FaultyStore {
    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>, StoreError> {
        Ok(Box::new(FaultyUnit {
            inner: self.inner.begin()?,
            store: self,
            touched: None,
        }))
    }

    fn load_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.inner.load_account(id)
    }

    fn find_account(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        self.inner.find_account(identifier)
    }

    fn find_by_reference(&self, reference_no: &ReferenceNo) -> Result<Option<CashTransaction>, StoreError> {
        self.inner.find_by_reference(reference_no)
    }

    fn query(&self, query: &TransactionQuery) -> Result<(Vec<CashTransaction>, usize), StoreError> {
        self.inner.query(query)
    }
}

fn build_faulty(fault: Fault) -> (Arc<FaultyStore>, AccountId, AccountId) {
    let inner = MemoryStore::new();
    let a = inner
        .open_account(Account::new("A", "TR0A", SOME_CURRENCY).with_balance(dec!(100)))
        .unwrap();
    let b = inner
        .open_account(Account::new("B", "TR0B", SOME_CURRENCY))
        .unwrap();

    let store = Arc::new(FaultyStore {
        inner,
        fault,
        commits: AtomicUsize::new(0),
    });

    (store, a, b)
}

#[test]
fn failed_commit_changes_nothing() {
    let (store, a, b) = build_faulty(Fault::Unavailable);
    let engine = LedgerEngine::new(Arc::clone(&store), Arc::new(|_: AccountId, _: CustomerId| true), LedgerSettings::default());

    let result = engine.submit_transaction(TransactionCommand::transfer("R1", a, b, money(dec!(30)), SOME_OWNER));

    let e = result.unwrap_err();
    assert!(matches!(e, LedgerError::Application(ApplicationError::StoreUnavailable(_))));
    assert!(e.is_retryable());
    assert_eq!(store.commits.load(Ordering::SeqCst), 1);
    assert_eq!(balance(&store.inner, a), dec!(100));
    assert_eq!(balance(&store.inner, b), dec!(0));
    assert!(store.inner.transactions().is_empty());
}

#[test]
fn persistent_conflict_gives_up() {
    let (store, a, b) = build_faulty(Fault::AlwaysConflict);
    let settings = LedgerSettings {
        max_attempts: 4,
        ..Default::default()
    };
    let engine = LedgerEngine::new(Arc::clone(&store), Arc::new(|_: AccountId, _: CustomerId| true), settings);

    let result = engine.submit_transaction(TransactionCommand::transfer("R1", a, b, money(dec!(30)), SOME_OWNER));

    assert_eq!(
        result,
        Err(LedgerError::from(ApplicationError::ConflictRetriesExhausted {
            reference_no: "R1".into(),
            attempts: 4,
        }))
    );
    assert_eq!(store.commits.load(Ordering::SeqCst), 4);
    assert_eq!(balance(&store.inner, a), dec!(100));
    assert!(store.inner.transactions().is_empty());
}
