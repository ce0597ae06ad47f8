use super::{
    AccountStore, Authorization, LedgerStore, StoreError, TransactionQuery, TransactionStore,
    UnitOfWork,
};

use crate::ids::{AccountId, CustomerId, ReferenceNo};
use crate::models::{Account, CashTransaction};

use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    transactions: Vec<CashTransaction>,
    references: HashMap<ReferenceNo, usize>,
}

/// Thread-safe in-memory ledger store with optimistic concurrency.
///
/// A unit of work records the version of every account it loads. Commit takes
/// the write lock, refuses if any of those versions moved or any staged
/// reference already exists, and otherwise writes everything at once.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new account, as the account-opening flow would
    pub fn open_account(&self, account: Account) -> Result<AccountId, StoreError> {
        let mut state = self.state.write();

        let taken = state.accounts.values().any(|existing| {
            existing.id == account.id
                || existing.account_no == account.account_no
                || existing.iban.eq_ignore_ascii_case(&account.iban)
        });

        if taken {
            return Err(StoreError::DuplicateAccount(account.account_no));
        }

        let id = account.id;
        log::debug!("Opening account {} ({id})", account.account_no);
        state.accounts.insert(id, account);

        Ok(id)
    }

    /// Soft-deactivates an account. Accounts are never removed.
    pub fn deactivate(&self, id: AccountId) -> Result<(), StoreError> {
        let mut state = self.state.write();

        let account = state
            .accounts
            .get_mut(&id)
            .ok_or(StoreError::AccountNotFound(id))?;

        account.is_active = false;
        account.version += 1;

        Ok(())
    }

    /// Every account, ordered by account number
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.state.read().accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.account_no.cmp(&b.account_no));
        accounts
    }

    /// Every committed transaction, in commit order
    pub fn transactions(&self) -> Vec<CashTransaction> {
        self.state.read().transactions.clone()
    }
}

impl LedgerStore for MemoryStore {
    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>, StoreError> {
        Ok(Box::new(MemoryUnit {
            store: self,
            read_versions: HashMap::new(),
            staged_accounts: vec![],
            staged_transactions: vec![],
            committed: false,
        }))
    }

    fn load_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().accounts.get(&id).cloned())
    }

    fn find_account(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        let state = self.state.read();

        let account = state
            .accounts
            .values()
            .find(|account| account.is_identified_by(identifier))
            .cloned();

        Ok(account)
    }

    fn find_by_reference(&self, reference_no: &ReferenceNo) -> Result<Option<CashTransaction>, StoreError> {
        let state = self.state.read();

        let transaction = state
            .references
            .get(reference_no)
            .and_then(|idx| state.transactions.get(*idx))
            .cloned();

        Ok(transaction)
    }

    fn query(&self, query: &TransactionQuery) -> Result<(Vec<CashTransaction>, usize), StoreError> {
        let state = self.state.read();

        let mut matching: Vec<&CashTransaction> = state
            .transactions
            .iter()
            .filter(|transaction| transaction.touches(&query.account_id))
            .filter(|transaction| query.filters.matches(transaction))
            .collect();

        matching.sort_by(|a, b| query.ordering.compare(a, b));

        let total_count = matching.len();

        let window = matching
            .into_iter()
            .skip(query.window.offset)
            .take(query.window.limit)
            .cloned()
            .collect();

        Ok((window, total_count))
    }
}

impl Authorization for MemoryStore {
    fn is_owner(&self, account_id: AccountId, requester_id: CustomerId) -> bool {
        self.state
            .read()
            .accounts
            .get(&account_id)
            .map_or(false, |account| account.owner_ids.contains(&requester_id))
    }
}

struct MemoryUnit<'a> {
    store: &'a MemoryStore,
    read_versions: HashMap<AccountId, u64>,
    staged_accounts: Vec<Account>,
    staged_transactions: Vec<CashTransaction>,
    committed: bool,
}

impl AccountStore for MemoryUnit<'_> {
    fn load_for_update(&mut self, id: AccountId) -> Result<Account, StoreError> {
        if let Some(staged) = self.staged_accounts.iter().find(|account| account.id == id) {
            return Ok(staged.clone());
        }

        let account = self
            .store
            .load_account(id)?
            .ok_or(StoreError::AccountNotFound(id))?;

        self.read_versions.entry(id).or_insert(account.version);

        Ok(account)
    }

    fn save(&mut self, account: Account) -> Result<(), StoreError> {
        if !self.read_versions.contains_key(&account.id) {
            return Err(StoreError::AccountNotFound(account.id));
        }

        self.staged_accounts.retain(|staged| staged.id != account.id);
        self.staged_accounts.push(account);

        Ok(())
    }
}

impl TransactionStore for MemoryUnit<'_> {
    fn exists_by_reference(&self, reference_no: &ReferenceNo) -> Result<bool, StoreError> {
        let staged = self
            .staged_transactions
            .iter()
            .any(|transaction| transaction.reference_no == *reference_no);

        Ok(staged || self.store.state.read().references.contains_key(reference_no))
    }

    fn insert(&mut self, transaction: CashTransaction) -> Result<(), StoreError> {
        if self.exists_by_reference(&transaction.reference_no)? {
            return Err(StoreError::DuplicateReference(transaction.reference_no.clone()));
        }

        self.staged_transactions.push(transaction);

        Ok(())
    }
}

impl UnitOfWork for MemoryUnit<'_> {
    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let store = self.store;
        let mut state = store.state.write();

        for transaction in self.staged_transactions.iter() {
            if state.references.contains_key(&transaction.reference_no) {
                return Err(StoreError::DuplicateReference(transaction.reference_no.clone()));
            }
        }

        for (id, read_version) in self.read_versions.iter() {
            let current = state
                .accounts
                .get(id)
                .ok_or(StoreError::AccountNotFound(*id))?;

            if current.version != *read_version {
                return Err(StoreError::VersionConflict(*id));
            }
        }

        for mut account in self.staged_accounts.drain(..) {
            if let Some(read_version) = self.read_versions.get(&account.id) {
                account.version = read_version + 1;
            }
            state.accounts.insert(account.id, account);
        }

        for transaction in self.staged_transactions.drain(..) {
            let idx = state.transactions.len();
            state.references.insert(transaction.reference_no.clone(), idx);
            state.transactions.push(transaction);
        }

        self.committed = true;

        Ok(())
    }
}

impl Drop for MemoryUnit<'_> {
    fn drop(&mut self) {
        let staged = self.staged_accounts.len() + self.staged_transactions.len();

        if !self.committed && staged > 0 {
            log::debug!("Rolling back unit of work with {staged} staged writes");
        }
    }
}
