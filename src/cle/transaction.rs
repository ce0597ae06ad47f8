use crate::ids::{AccountId, CustomerId, ReferenceNo};
use crate::models::{Initiator, TransactionType};
use crate::Money;

use chrono::{DateTime, Utc};

/// Type code as submitted. Codes outside the supported set are carried through
/// so the validator can reject them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedType {
    Supported(TransactionType),
    Unsupported(String),
}

impl RequestedType {
    pub fn from_code(code: &str) -> Self {
        match TransactionType::from_code(code) {
            Some(transaction_type) => Self::Supported(transaction_type),
            None => Self::Unsupported(code.to_string()),
        }
    }

    pub fn supported(&self) -> Option<TransactionType> {
        match self {
            Self::Supported(transaction_type) => Some(*transaction_type),
            Self::Unsupported(_) => None,
        }
    }
}

impl From<TransactionType> for RequestedType {
    fn from(transaction_type: TransactionType) -> Self {
        Self::Supported(transaction_type)
    }
}

/// TransactionCommand represents a requested movement of money.
///
/// `from_account` is the account the operation is performed on: the debited
/// side of a transfer or withdrawal, the credited side of a deposit.
/// `to_account` is only present for transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCommand {
    pub reference_no: ReferenceNo,
    pub transaction_type: RequestedType,
    pub initiated_by: Initiator,
    pub from_account: AccountId,
    pub to_account: Option<AccountId>,
    pub amount: Money,
    pub fees: Money,
    pub description: String,
    pub payment_type: String,
    pub requested_by: CustomerId,
    pub transaction_date: Option<DateTime<Utc>>,
}

impl TransactionCommand {
    pub fn transfer(
        reference_no: impl Into<String>,
        from_account: AccountId,
        to_account: AccountId,
        amount: Money,
        requested_by: CustomerId,
    ) -> Self {
        let mut command = Self::single(
            reference_no,
            TransactionType::Transfer,
            from_account,
            amount,
            requested_by,
        );
        command.to_account = Some(to_account);
        command
    }

    pub fn deposit(
        reference_no: impl Into<String>,
        account: AccountId,
        amount: Money,
        requested_by: CustomerId,
    ) -> Self {
        Self::single(reference_no, TransactionType::Deposit, account, amount, requested_by)
    }

    pub fn withdrawal(
        reference_no: impl Into<String>,
        account: AccountId,
        amount: Money,
        requested_by: CustomerId,
    ) -> Self {
        Self::single(reference_no, TransactionType::Withdrawal, account, amount, requested_by)
    }

    pub fn with_fees(mut self, fees: Money) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_transaction_date(mut self, transaction_date: DateTime<Utc>) -> Self {
        self.transaction_date = Some(transaction_date);
        self
    }

    pub fn with_initiator(mut self, initiated_by: Initiator) -> Self {
        self.initiated_by = initiated_by;
        self
    }

    fn single(
        reference_no: impl Into<String>,
        transaction_type: TransactionType,
        from_account: AccountId,
        amount: Money,
        requested_by: CustomerId,
    ) -> Self {
        Self {
            reference_no: ReferenceNo::new(reference_no),
            transaction_type: RequestedType::Supported(transaction_type),
            initiated_by: Initiator::Unknown,
            from_account,
            to_account: None,
            amount,
            fees: Money::zero(amount.currency_id()),
            description: String::new(),
            payment_type: String::new(),
            requested_by,
            transaction_date: None,
        }
    }
}
