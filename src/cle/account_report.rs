use crate::models::Account;

use serde::{Deserialize, Serialize};

/// One line of the closing balance report
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AccountReport {
    pub account_no: String,
    pub iban: String,
    pub currency: i32,
    pub balance: String,
    pub active: bool,
}

impl AccountReport {
    pub fn from_account(account: &Account) -> Self {
        return Self {
            account_no: account.account_no.clone(),
            iban: account.iban.clone(),
            currency: account.currency_id.0,
            balance: format!("{:.2}", account.balance.amount()),
            active: account.is_active,
        };
    }

    /// Sorted by account number
    pub fn build_report<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Vec<Self> {
        let mut report: Vec<Self> = accounts.into_iter().map(Self::from_account).collect();
        report.sort();

        return report;
    }
}
