use crate::ids::{AccountId, CurrencyId, ReferenceNo, TransactionId};
use crate::models::{Account, PendingTransaction, TransactionData, TransactionType};
use crate::transaction::{RequestedType, TransactionCommand};
use crate::money::{Money, MoneyError};

use chrono::{DateTime, Utc};

use thiserror::Error;

/// Business rejections. Expected, reported to the caller and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("Reference {0} has already been posted")]
    DuplicateReference(ReferenceNo),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    #[error("Currency mismatch: account holds {expected}, request uses {found}")]
    CurrencyMismatch { expected: CurrencyId, found: CurrencyId },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds in account {0}")]
    InsufficientFunds(AccountId),

    #[error("Requester is not an owner of account {0}")]
    UnauthorizedOperation(AccountId),

    #[error("Unsupported transaction type: {0}")]
    UnsupportedTransactionType(String),
}

/// Facts gathered by the caller that the validator cannot look up itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationFacts {
    pub reference_posted: bool,
    pub requester_is_owner: bool,
}

/// Post-transaction state of one account, computed once at validation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceChange {
    pub account_id: AccountId,
    pub version: u64,
    pub balance_before: Money,
    pub balance_after: Money,
}

/// An accepted request together with the exact balances it leaves behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPlan {
    pub command: TransactionCommand,
    pub transaction_type: TransactionType,
    pub changes: Vec<BalanceChange>,
}

impl ValidatedPlan {
    pub fn change_for(&self, account_id: &AccountId) -> Option<&BalanceChange> {
        self.changes.iter().find(|change| change.account_id == *account_id)
    }

    /// Builds the ledger entry this plan records
    pub fn to_pending(&self, now: DateTime<Utc>) -> PendingTransaction {
        let command = &self.command;

        return PendingTransaction::new(TransactionData {
            id: TransactionId::new(),
            reference_no: command.reference_no.clone(),
            transaction_type: self.transaction_type,
            initiated_by: command.initiated_by,
            from_account: command.from_account,
            to_account: command.to_account,
            amount: command.amount,
            fees: command.fees,
            description: command.description.clone(),
            payment_type: command.payment_type.clone(),
            requested_by: command.requested_by,
            transaction_date: command.transaction_date.unwrap_or(now),
            created_on: now,
        });
    }
}

/// Checks a request against freshly loaded accounts. The first failing check
/// wins, in this order:
///
/// 1. reference not already posted
/// 2. accounts active
/// 3. currencies match, amount positive, fees not negative
/// 4. funds sufficient
/// 5. requester owns the source account
/// 6. transaction type supported and shaped correctly
pub fn validate(
    command: &TransactionCommand,
    source: &Account,
    destination: Option<&Account>,
    facts: ValidationFacts,
) -> Result<ValidatedPlan, RejectionReason> {
    if facts.reference_posted {
        return Err(RejectionReason::DuplicateReference(command.reference_no.clone()));
    }

    check_active(source, destination)?;
    check_amounts(command, source, destination)?;

    let source_after = source_balance_after(command, source)?;

    if !facts.requester_is_owner {
        return Err(RejectionReason::UnauthorizedOperation(source.id));
    }

    let transaction_type = check_shape(command, destination)?;

    let mut changes = vec![BalanceChange {
        account_id: source.id,
        version: source.version,
        balance_before: source.balance,
        balance_after: source_after,
    }];

    if let (TransactionType::Transfer, Some(destination)) = (transaction_type, destination) {
        let destination_after = destination
            .balance
            .add(&command.amount)
            .map_err(money_rejection)?;

        changes.push(BalanceChange {
            account_id: destination.id,
            version: destination.version,
            balance_before: destination.balance,
            balance_after: destination_after,
        });
    }

    log::debug!("Validated {}: {changes:?}", command.reference_no);

    return Ok(ValidatedPlan {
        command: command.clone(),
        transaction_type,
        changes,
    });
}

fn check_active(source: &Account, destination: Option<&Account>) -> Result<(), RejectionReason> {
    if !source.is_active {
        return Err(RejectionReason::AccountInactive(source.id));
    }

    if let Some(destination) = destination {
        if !destination.is_active {
            return Err(RejectionReason::AccountInactive(destination.id));
        }
    }

    Ok(())
}

fn check_amounts(
    command: &TransactionCommand,
    source: &Account,
    destination: Option<&Account>,
) -> Result<(), RejectionReason> {
    let expected = source.currency_id;

    let currencies = [
        Some(command.amount.currency_id()),
        Some(command.fees.currency_id()),
        destination.map(|destination| destination.currency_id),
    ];

    for found in currencies.into_iter().flatten() {
        if found != expected {
            return Err(RejectionReason::CurrencyMismatch { expected, found });
        }
    }

    if command.amount.is_negative() || command.amount.is_zero() {
        return Err(RejectionReason::InvalidAmount(format!(
            "amount must be positive, got {}",
            command.amount
        )));
    }

    if command.fees.is_negative() {
        return Err(RejectionReason::InvalidAmount(format!(
            "fees cannot be negative, got {}",
            command.fees
        )));
    }

    Ok(())
}

/// Fees always leave through the source account. A balance that drops may not
/// end below the account's floor; one that rises is always accepted.
fn source_balance_after(command: &TransactionCommand, source: &Account) -> Result<Money, RejectionReason> {
    let transaction_type = match command.transaction_type.supported() {
        Some(transaction_type) => transaction_type,
        None => return Ok(source.balance),
    };

    let after = if transaction_type.debits_source() {
        command
            .amount
            .add(&command.fees)
            .and_then(|debit| source.balance.subtract(&debit))
    } else {
        source
            .balance
            .add(&command.amount)
            .and_then(|credited| credited.subtract(&command.fees))
    }
    .map_err(money_rejection)?;

    let drops = after.compare(&source.balance).map_err(money_rejection)?.is_lt();

    if drops && !source.can_settle_at(&after).map_err(money_rejection)? {
        log::debug!(
            "Balance of {} would fall to {after}, below floor {:?}",
            source.id,
            source.floor()
        );
        return Err(RejectionReason::InsufficientFunds(source.id));
    }

    Ok(after)
}

fn check_shape(
    command: &TransactionCommand,
    destination: Option<&Account>,
) -> Result<TransactionType, RejectionReason> {
    let transaction_type = match &command.transaction_type {
        RequestedType::Supported(transaction_type) => *transaction_type,
        RequestedType::Unsupported(code) => {
            return Err(RejectionReason::UnsupportedTransactionType(code.clone()))
        }
    };

    match (transaction_type, destination) {
        (TransactionType::Transfer, None) => Err(RejectionReason::UnsupportedTransactionType(
            "transfer without a destination account".to_string(),
        )),
        (TransactionType::Transfer, Some(destination)) if destination.id == command.from_account => {
            Err(RejectionReason::UnsupportedTransactionType(
                "transfer to the source account".to_string(),
            ))
        }
        (TransactionType::Deposit | TransactionType::Withdrawal, Some(_)) => {
            Err(RejectionReason::UnsupportedTransactionType(format!(
                "{transaction_type} with a destination account"
            )))
        }
        _ => Ok(transaction_type),
    }
}

fn money_rejection(e: MoneyError) -> RejectionReason {
    match e {
        MoneyError::CurrencyMismatch(_, left, right) => RejectionReason::CurrencyMismatch {
            expected: left.currency_id(),
            found: right.currency_id(),
        },
        e => RejectionReason::InvalidAmount(e.to_string()),
    }
}
