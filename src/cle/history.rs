use crate::ids::{AccountId, CurrencyId, ReferenceNo, TransactionId};
use crate::models::{CashTransaction, Initiator, PagedList, TransactionStatus, TransactionType};
use crate::settings::LedgerSettings;
use crate::stores::{HistoryFilters, LedgerStore, StoreError, TransactionOrdering, TransactionQuery, Window};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Page numbers start at 1")]
    InvalidPage,

    #[error("Invalid filters: {0}")]
    InvalidFilters(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

/// A posted transaction as seen from one of the accounts it touched
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CashTransactionResponse {
    pub id: TransactionId,
    pub reference_no: ReferenceNo,
    pub transaction_type: TransactionType,
    pub initiated_by: Initiator,
    pub direction: Direction,
    pub from_account: AccountId,
    pub to_account: Option<AccountId>,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub fees: Decimal,
    pub currency_id: CurrencyId,
    pub description: String,
    pub payment_type: String,
    pub status: TransactionStatus,
    pub transaction_date: DateTime<Utc>,
    pub created_on: DateTime<Utc>,
}

impl CashTransactionResponse {
    pub fn from_transaction(transaction: &CashTransaction, account_id: &AccountId) -> Self {
        let direction = match transaction.transaction_type {
            TransactionType::Deposit => Direction::Credit,
            TransactionType::Withdrawal => Direction::Debit,
            TransactionType::Transfer if transaction.from_account == *account_id => Direction::Debit,
            TransactionType::Transfer => Direction::Credit,
        };

        return Self {
            id: transaction.id,
            reference_no: transaction.reference_no.clone(),
            transaction_type: transaction.transaction_type,
            initiated_by: transaction.initiated_by,
            direction,
            from_account: transaction.from_account,
            to_account: transaction.to_account,
            amount: transaction.amount.amount(),
            fees: transaction.fees.amount(),
            currency_id: transaction.amount.currency_id(),
            description: transaction.description.clone(),
            payment_type: transaction.payment_type.clone(),
            status: transaction.status(),
            transaction_date: transaction.transaction_date,
            created_on: transaction.created_on,
        };
    }
}

/// Paginated, newest-first read path over posted transactions. Filters are
/// applied before counting, so totals describe the filtered set.
pub struct HistoryReader<S: ?Sized> {
    store: Arc<S>,
    settings: LedgerSettings,
}

impl<S: LedgerStore + ?Sized> HistoryReader<S> {
    pub fn new(store: Arc<S>, settings: LedgerSettings) -> Self {
        return Self { store, settings };
    }

    /// `page_number` is 1-based. A page size of 0 means the default size, and
    /// sizes above the maximum are clamped. Pages past the end come back empty
    /// with the totals intact.
    pub fn list(
        &self,
        account_identifier: &str,
        filters: &HistoryFilters,
        page_number: usize,
        page_size: usize,
    ) -> Result<PagedList<CashTransactionResponse>, HistoryError> {
        if page_number == 0 {
            return Err(HistoryError::InvalidPage);
        }

        if let (Some(from), Some(to)) = (filters.from_date, filters.to_date) {
            if from > to {
                return Err(HistoryError::InvalidFilters(format!(
                    "from_date {from} is after to_date {to}"
                )));
            }
        }

        let account = self
            .store
            .find_account(account_identifier)?
            .ok_or_else(|| HistoryError::AccountNotFound(account_identifier.to_string()))?;

        let page_size = self.page_size(page_size);

        let query = TransactionQuery {
            account_id: account.id,
            filters: filters.clone(),
            ordering: TransactionOrdering::NewestFirst,
            window: Window {
                offset: (page_number - 1).saturating_mul(page_size),
                limit: page_size,
            },
        };

        log::debug!("Querying history of {}: {query:?}", account.account_no);

        let (items, total_count) = self.store.query(&query)?;

        let page = PagedList::new(items, page_number, page_size, total_count)
            .map(|transaction| CashTransactionResponse::from_transaction(&transaction, &account.id));

        return Ok(page);
    }

    fn page_size(&self, requested: usize) -> usize {
        if requested == 0 {
            return self.settings.default_page_size;
        }

        requested.min(self.settings.max_page_size)
    }
}
