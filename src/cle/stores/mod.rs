mod memory_store;

pub use memory_store::MemoryStore;

use crate::ids::{AccountId, CustomerId, ReferenceNo};
use crate::models::{Account, CashTransaction, TransactionStatus, TransactionType};

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Account {0} was modified by another transaction")]
    VersionConflict(AccountId),

    #[error("Reference {0} already exists")]
    DuplicateReference(ReferenceNo),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    #[error("Serialization failure: {0}")]
    Serialization(String),
}

/// Account half of a unit of work
pub trait AccountStore {
    /// Reads the current row and remembers its version for the commit check
    fn load_for_update(&mut self, id: AccountId) -> Result<Account, StoreError>;

    fn save(&mut self, account: Account) -> Result<(), StoreError>;
}

/// Transaction half of a unit of work
pub trait TransactionStore {
    fn exists_by_reference(&self, reference_no: &ReferenceNo) -> Result<bool, StoreError>;

    fn insert(&mut self, transaction: CashTransaction) -> Result<(), StoreError>;
}

/// All-or-nothing group of writes. Dropping it without calling `commit` rolls
/// everything back.
pub trait UnitOfWork: AccountStore + TransactionStore {
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Filters applied before counting and windowing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilters {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
}

impl HistoryFilters {
    pub fn matches(&self, transaction: &CashTransaction) -> bool {
        let date = transaction.transaction_date;

        self.from_date.map_or(true, |from| date >= from)
            && self.to_date.map_or(true, |to| date <= to)
            && self
                .transaction_type
                .map_or(true, |transaction_type| transaction.transaction_type == transaction_type)
            && self.status.map_or(true, |status| transaction.status() == status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionOrdering {
    /// `transaction_date`, then `created_on`, then `id`, all descending
    #[default]
    NewestFirst,
    OldestFirst,
}

impl TransactionOrdering {
    pub fn compare(&self, a: &CashTransaction, b: &CashTransaction) -> Ordering {
        let oldest_first = a
            .transaction_date
            .cmp(&b.transaction_date)
            .then_with(|| a.created_on.cmp(&b.created_on))
            .then_with(|| a.id.cmp(&b.id));

        match self {
            Self::NewestFirst => oldest_first.reverse(),
            Self::OldestFirst => oldest_first,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub account_id: AccountId,
    pub filters: HistoryFilters,
    pub ordering: TransactionOrdering,
    pub window: Window,
}

/// Backing store for the ledger. Reads outside a unit of work see the last
/// committed state.
pub trait LedgerStore: Send + Sync {
    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>, StoreError>;

    fn load_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Looks an account up by account number, IBAN or id
    fn find_account(&self, identifier: &str) -> Result<Option<Account>, StoreError>;

    fn find_by_reference(&self, reference_no: &ReferenceNo) -> Result<Option<CashTransaction>, StoreError>;

    /// Returns one window of the filtered, ordered history and the size of the
    /// whole filtered set
    fn query(&self, query: &TransactionQuery) -> Result<(Vec<CashTransaction>, usize), StoreError>;
}

/// Decides whether a customer may move money out of an account
pub trait Authorization: Send + Sync {
    fn is_owner(&self, account_id: AccountId, requester_id: CustomerId) -> bool;
}

impl<F> Authorization for F
where
    F: Fn(AccountId, CustomerId) -> bool + Send + Sync,
{
    fn is_owner(&self, account_id: AccountId, requester_id: CustomerId) -> bool {
        self(account_id, requester_id)
    }
}
