use crate::ids::{AccountId, CurrencyId, CustomerId};
use crate::money::{Money, MoneyError};

use std::collections::BTreeSet;

use rust_decimal::Decimal;

/// In-memory copy of a bank account, loaded for the duration of one
/// transaction. `version` is the row token checked when the copy is written
/// back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub account_no: String,
    pub iban: String,
    pub currency_id: CurrencyId,
    pub balance: Money,
    pub allowed_balance_to_use: Money,
    pub minimum_allowed_balance: Money,
    pub is_active: bool,
    pub owner_ids: BTreeSet<CustomerId>,
    pub version: u64,
}

impl Account {
    pub fn new(account_no: impl Into<String>, iban: impl Into<String>, currency_id: CurrencyId) -> Self {
        return Self {
            id: AccountId::new(),
            account_no: account_no.into(),
            iban: iban.into(),
            currency_id,
            balance: Money::zero(currency_id),
            allowed_balance_to_use: Money::zero(currency_id),
            minimum_allowed_balance: Money::zero(currency_id),
            is_active: true,
            owner_ids: BTreeSet::new(),
            version: 0,
        };
    }

    pub fn with_id(mut self, id: AccountId) -> Self {
        self.id = id;
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = Money::new(balance, self.currency_id);
        self
    }

    pub fn with_overdraft(mut self, minimum_allowed_balance: Decimal, allowed_balance_to_use: Decimal) -> Self {
        self.minimum_allowed_balance = Money::new(minimum_allowed_balance, self.currency_id);
        self.allowed_balance_to_use = Money::new(allowed_balance_to_use, self.currency_id);
        self
    }

    pub fn with_owner(mut self, owner_id: CustomerId) -> Self {
        self.owner_ids.insert(owner_id);
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Lowest balance the account may reach: `minimum_allowed_balance - allowed_balance_to_use`
    pub fn floor(&self) -> Result<Money, MoneyError> {
        return self.minimum_allowed_balance.subtract(&self.allowed_balance_to_use);
    }

    pub fn can_settle_at(&self, balance: &Money) -> Result<bool, MoneyError> {
        let floor = self.floor()?;
        return Ok(balance.compare(&floor)?.is_ge());
    }

    /// Accounts are looked up by account number, IBAN or id
    pub fn is_identified_by(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();

        self.account_no == identifier
            || self.iban.eq_ignore_ascii_case(identifier)
            || self.id.to_string().eq_ignore_ascii_case(identifier)
    }
}
