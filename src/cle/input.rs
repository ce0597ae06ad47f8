use crate::ids::{CurrencyId, CustomerId};
use crate::models::{Account, Initiator};
use crate::transaction::{RequestedType, TransactionCommand};
use crate::Money;
use crate::Result;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use thiserror::Error;

/// One row of the accounts file
#[derive(Deserialize, Debug, Clone)]
pub struct AccountRecord {
    pub account_no: String,
    pub iban: String,
    pub currency: i32,
    pub balance: String,
    pub minimum_allowed_balance: Option<String>,
    pub allowed_balance_to_use: Option<String>,
    pub active: Option<bool>,
    pub owner: Option<CustomerId>,
}

/// One row of the transactions file. Accounts are referred to by account
/// number, IBAN or id.
#[derive(Deserialize, Debug, Clone)]
pub struct CommandRecord {
    #[serde(rename = "type")]
    pub typ: String,

    pub reference: String,
    pub from: String,
    pub to: Option<String>,
    pub amount: String,
    pub fees: Option<String>,
    pub initiator: Option<String>,
    pub requested_by: CustomerId,
    pub description: Option<String>,
    pub payment_type: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Error, Debug)]
pub enum InputParseError {
    #[error("Error parsing input record: unknown account {0:?}")]
    UnknownAccount(String),

    #[error("Error parsing input record: empty reference number: {0:?}")]
    NoReference(CommandRecord),
}

impl AccountRecord {
    pub fn parse_account(self) -> Result<Account> {
        let currency_id = CurrencyId(self.currency);

        let mut account = Account::new(self.account_no, self.iban, currency_id)
            .with_balance(Money::parse(&self.balance, currency_id)?.amount());

        let minimum = parse_optional(&self.minimum_allowed_balance, currency_id)?;
        let allowed = parse_optional(&self.allowed_balance_to_use, currency_id)?;
        account = account.with_overdraft(minimum.amount(), allowed.amount());

        if let Some(owner) = self.owner {
            account = account.with_owner(owner);
        }

        if self.active == Some(false) {
            account = account.deactivated();
        }

        Ok(account)
    }
}

impl CommandRecord {
    /// Resolves account identifiers through `find_account`. Amounts are read in
    /// the currency of the source account so a mismatch with the destination
    /// surfaces as a rejection rather than a parse error.
    pub fn parse_command(self, find_account: impl Fn(&str) -> Option<Account>) -> Result<TransactionCommand> {
        if self.reference.trim().is_empty() {
            Err(InputParseError::NoReference(self.clone()))?;
        }

        let source = find_account(&self.from)
            .ok_or_else(|| InputParseError::UnknownAccount(self.from.clone()))?;

        let destination = match &self.to {
            Some(to) if !to.trim().is_empty() => {
                let destination = find_account(to)
                    .ok_or_else(|| InputParseError::UnknownAccount(to.clone()))?;
                Some(destination.id)
            }
            _ => None,
        };

        let amount = Money::parse(&self.amount, source.currency_id)?;
        let fees = parse_optional(&self.fees, source.currency_id)?;

        let command = TransactionCommand {
            reference_no: self.reference.trim().into(),
            transaction_type: RequestedType::from_code(&self.typ),
            initiated_by: self
                .initiator
                .as_deref()
                .map(Initiator::from_code)
                .unwrap_or(Initiator::Unknown),
            from_account: source.id,
            to_account: destination,
            amount,
            fees,
            description: self.description.unwrap_or_default(),
            payment_type: self.payment_type.unwrap_or_default(),
            requested_by: self.requested_by,
            transaction_date: self.date,
        };

        Ok(command)
    }
}

fn parse_optional(value: &Option<String>, currency_id: CurrencyId) -> Result<Money> {
    let money = match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Money::parse(value, currency_id)?,
        _ => Money::zero(currency_id),
    };

    Ok(money)
}
