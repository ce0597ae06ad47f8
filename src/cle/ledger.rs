use crate::history::{CashTransactionResponse, HistoryError, HistoryReader};
use crate::ids::{AccountId, ReferenceNo};
use crate::models::{Account, CashTransaction, PagedList};
use crate::settings::LedgerSettings;
use crate::stores::{AccountStore, Authorization, HistoryFilters, LedgerStore, StoreError, TransactionStore};
use crate::transaction::TransactionCommand;
use crate::validator::{self, BalanceChange, RejectionReason, ValidatedPlan, ValidationFacts};

use std::sync::Arc;

use chrono::Utc;

use thiserror::Error;

/// Infrastructure failures. Safe to retry with the same reference number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Account {0} changed while the transaction was being applied")]
    Conflict(AccountId),

    #[error("Gave up on {reference_no} after {attempts} conflicting attempts")]
    ConflictRetriesExhausted { reference_no: ReferenceNo, attempts: u32 },

    #[error("Serialization failure: {0}")]
    Serialization(String),
}

/// Broken invariants. These cannot happen when validation is correct.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InternalFault {
    #[error("Plan for {0} does not fit account {1}: {2}")]
    PlanMismatch(ReferenceNo, AccountId, String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Transaction rejected: {0}")]
    Rejected(#[from] RejectionReason),

    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("Internal fault: {0}")]
    Fault(#[from] InternalFault),
}

impl LedgerError {
    pub fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            Self::Rejected(reason) => Some(reason),
            _ => None,
        }
    }

    /// Whether resubmitting with the same reference number may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Application(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict(id) => ApplicationError::Conflict(id).into(),
            StoreError::DuplicateReference(reference_no) => {
                RejectionReason::DuplicateReference(reference_no).into()
            }
            StoreError::AccountNotFound(id) => RejectionReason::AccountNotFound(id).into(),
            StoreError::Serialization(msg) => ApplicationError::Serialization(msg).into(),
            e @ (StoreError::Unavailable(_) | StoreError::DuplicateAccount(_)) => {
                ApplicationError::StoreUnavailable(e.to_string()).into()
            }
        }
    }
}

/// A posted transaction with the balances it left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
    pub transaction: CashTransaction,
    pub balances: Vec<BalanceChange>,
}

/// Moves money between accounts.
///
/// Each submission runs validate → authorize → apply. Applying happens in a
/// single unit of work that re-reads every touched account; if any of them
/// moved since validation, the commit is refused and the whole pipeline runs
/// again against the fresh balances, up to `max_attempts` times.
pub struct LedgerEngine<S: ?Sized, A: ?Sized> {
    store: Arc<S>,
    authorization: Arc<A>,
    settings: LedgerSettings,
}

impl<S, A> LedgerEngine<S, A>
where
    S: LedgerStore + ?Sized,
    A: Authorization + ?Sized,
{
    pub fn new(store: Arc<S>, authorization: Arc<A>, settings: LedgerSettings) -> Self {
        return Self {
            store,
            authorization,
            settings,
        };
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn submit_transaction(&self, command: TransactionCommand) -> Result<TransactionResult, LedgerError> {
        log::debug!("Submitting transaction: {command:?}");

        let attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=attempts {
            let plan = match self.plan(&command) {
                Ok(plan) => plan,
                Err(e) => return Err(self.report(&command.reference_no, e)),
            };

            match self.apply(&plan) {
                Ok(transaction) => {
                    log::info!(
                        "Posted {} ({}) on attempt {attempt}",
                        transaction.reference_no,
                        transaction.id
                    );

                    return Ok(TransactionResult {
                        transaction,
                        balances: plan.changes,
                    });
                }
                Err(LedgerError::Application(ApplicationError::Conflict(account_id))) => {
                    log::warn!(
                        "Conflict on account {account_id} while applying {} (attempt {attempt}/{attempts})",
                        command.reference_no
                    );
                }
                Err(e) => return Err(self.report(&command.reference_no, e)),
            }
        }

        let e = ApplicationError::ConflictRetriesExhausted {
            reference_no: command.reference_no.clone(),
            attempts,
        };

        return Err(self.report(&command.reference_no, e.into()));
    }

    /// Loads the accounts a command touches and validates it against them
    pub fn plan(&self, command: &TransactionCommand) -> Result<ValidatedPlan, LedgerError> {
        let reference_posted = self.store.find_by_reference(&command.reference_no)?.is_some();

        let (source, destination) = match self.load_accounts(command) {
            Ok(accounts) => accounts,
            Err(_) if reference_posted => {
                Err(RejectionReason::DuplicateReference(command.reference_no.clone()))?
            }
            Err(e) => return Err(e),
        };

        let facts = ValidationFacts {
            reference_posted,
            requester_is_owner: self
                .authorization
                .is_owner(source.id, command.requested_by),
        };

        let plan = validator::validate(command, &source, destination.as_ref(), facts)?;

        return Ok(plan);
    }

    /// Writes a validated plan in one unit of work. A single attempt: version
    /// conflicts come back as `ApplicationError::Conflict` and nothing is
    /// written.
    pub fn apply(&self, plan: &ValidatedPlan) -> Result<CashTransaction, LedgerError> {
        let reference_no = &plan.command.reference_no;

        let mut unit = self.store.begin()?;

        if unit.exists_by_reference(reference_no)? {
            Err(RejectionReason::DuplicateReference(reference_no.clone()))?
        }

        // Stable order so stores that lock rows cannot deadlock
        let mut changes: Vec<&BalanceChange> = plan.changes.iter().collect();
        changes.sort_by_key(|change| change.account_id);

        for change in changes {
            let mut account = unit.load_for_update(change.account_id)?;

            if account.version != change.version {
                Err(ApplicationError::Conflict(account.id))?
            }

            check_change(reference_no, &account, change)?;

            account.balance = change.balance_after;
            unit.save(account)?;
        }

        let transaction = plan.to_pending(Utc::now()).post();

        unit.insert(transaction.clone())?;
        unit.commit()?;

        return Ok(transaction);
    }

    /// Looks up a transaction by reference, e.g. after a caller-side timeout
    pub fn find_by_reference(&self, reference_no: &ReferenceNo) -> Result<Option<CashTransaction>, LedgerError> {
        return Ok(self.store.find_by_reference(reference_no)?);
    }

    pub fn get_account_history(
        &self,
        account_identifier: &str,
        filters: &HistoryFilters,
        page_number: usize,
        page_size: usize,
    ) -> Result<PagedList<CashTransactionResponse>, HistoryError> {
        let reader = HistoryReader::new(Arc::clone(&self.store), self.settings);

        return reader.list(account_identifier, filters, page_number, page_size);
    }

    fn load_accounts(&self, command: &TransactionCommand) -> Result<(Account, Option<Account>), LedgerError> {
        let source = self.load_account(command.from_account)?;

        let destination = match command.to_account {
            Some(id) => Some(self.load_account(id)?),
            None => None,
        };

        Ok((source, destination))
    }

    fn load_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let account = self
            .store
            .load_account(id)?
            .ok_or(RejectionReason::AccountNotFound(id))?;

        Ok(account)
    }

    fn report(&self, reference_no: &ReferenceNo, e: LedgerError) -> LedgerError {
        match &e {
            LedgerError::Rejected(reason) => log::warn!("Rejected {reference_no}: {reason}"),
            LedgerError::Application(error) => log::warn!("Failed to apply {reference_no}: {error}"),
            LedgerError::Fault(fault) => log::error!("Aborted {reference_no}: {fault}"),
        }

        e
    }
}

/// The freshly read account must be the one the plan was computed from
fn check_change(reference_no: &ReferenceNo, account: &Account, change: &BalanceChange) -> Result<(), InternalFault> {
    let fault = |msg: String| InternalFault::PlanMismatch(reference_no.clone(), account.id, msg);

    if change.balance_after.currency_id() != account.currency_id {
        return Err(fault(format!(
            "planned balance {} is not in account currency {}",
            change.balance_after, account.currency_id
        )));
    }

    if account.balance != change.balance_before {
        return Err(fault(format!(
            "balance {} differs from planned starting balance {}",
            account.balance, change.balance_before
        )));
    }

    let drops = change
        .balance_after
        .compare(&change.balance_before)
        .map_err(|e| fault(e.to_string()))?
        .is_lt();

    let settles = account
        .can_settle_at(&change.balance_after)
        .map_err(|e| fault(e.to_string()))?;

    if drops && !settles {
        return Err(fault(format!(
            "planned balance {} is below the account floor",
            change.balance_after
        )));
    }

    Ok(())
}
