use crate::ids::{AccountId, CustomerId, ReferenceNo, TransactionId};
use crate::Money;

use std::fmt;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Transfer,
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "transfer" => Some(Self::Transfer),
            "deposit" => Some(Self::Deposit),
            "withdrawal" => Some(Self::Withdrawal),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }

    /// Whether the transaction takes money out of its source account
    pub fn debits_source(&self) -> bool {
        matches!(self, Self::Transfer | Self::Withdrawal)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(f, "{}", self.code());
    }
}

/// Channel a transaction came in through. Unrecognised codes map to `Unknown`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Initiator {
    Atm,
    Branch,
    Pos,
    Unknown,
}

impl Initiator {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "atm" => Self::Atm,
            "branch" => Self::Branch,
            "pos" => Self::Pos,
            _ => Self::Unknown,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Atm => "atm",
            Self::Branch => "branch",
            Self::Pos => "pos",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Posted,
    Rejected,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Fields fixed by the requester when the transaction is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionData {
    pub id: TransactionId,
    pub reference_no: ReferenceNo,
    pub transaction_type: TransactionType,
    pub initiated_by: Initiator,
    pub from_account: AccountId,
    pub to_account: Option<AccountId>,
    pub amount: Money,
    pub fees: Money,
    pub description: String,
    pub payment_type: String,
    pub requested_by: CustomerId,
    pub transaction_date: DateTime<Utc>,
    pub created_on: DateTime<Utc>,
}

impl TransactionData {
    pub fn touches(&self, account_id: &AccountId) -> bool {
        self.from_account == *account_id || self.to_account.as_ref() == Some(account_id)
    }
}

/// A transaction that has been created but not yet settled.
///
/// PendingTransaction
/// -> post: CashTransaction (Posted)
/// -> reject: CashTransaction (Rejected)
/// -> fail: CashTransaction (Failed)
///
/// Every transition consumes the pending value, so the status can only ever
/// change once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction(TransactionData);

impl PendingTransaction {
    pub fn new(data: TransactionData) -> Self {
        return Self(data);
    }

    pub fn post(self) -> CashTransaction {
        return CashTransaction::settle(self.0, TransactionStatus::Posted);
    }

    pub fn reject(self) -> CashTransaction {
        return CashTransaction::settle(self.0, TransactionStatus::Rejected);
    }

    pub fn fail(self) -> CashTransaction {
        return CashTransaction::settle(self.0, TransactionStatus::Failed);
    }

    pub fn status(&self) -> TransactionStatus {
        return TransactionStatus::Pending;
    }
}

impl Deref for PendingTransaction {
    type Target = TransactionData;

    fn deref(&self) -> &Self::Target {
        return &self.0;
    }
}

/// Append-only ledger entry in a terminal state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashTransaction {
    data: TransactionData,
    status: TransactionStatus,
}

impl CashTransaction {
    fn settle(data: TransactionData, status: TransactionStatus) -> Self {
        return Self { data, status };
    }

    pub fn status(&self) -> TransactionStatus {
        return self.status;
    }
}

impl Deref for CashTransaction {
    type Target = TransactionData;

    fn deref(&self) -> &Self::Target {
        return &self.data;
    }
}
