use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{
    AccountStore, Database, MailingListStore, StoreError, SubscriptionStore, UnitOfWork,
};
use crate::domain::{
    Account, AccountId, Email, MailingList, MailingListId, NewMailingList, Subscription,
    SubscriptionId,
};

#[derive(Debug, Default, Clone)]
struct Records {
    mailing_lists: HashMap<MailingListId, MailingList>,
    accounts: HashMap<AccountId, Account>,
    subscriptions: Vec<Subscription>,
}

/// A write made inside a unit of work, replayed onto the shared records when
/// it commits.
#[derive(Debug, Clone)]
enum Change {
    InsertMailingList(MailingList),
    InsertAccount(Account),
    UpdateAccountEmail(AccountId, Email),
    UpdateAccountMailingFlag(AccountId, bool),
    CreateSubscription(Subscription),
    MarkUnsubscribed(SubscriptionId, DateTime<Utc>),
}

impl Records {
    fn active_subscription(&self, mailing_list_id: MailingListId, email: &Email) -> Option<&Subscription> {
        self.subscriptions
            .iter()
            .find(|s| s.is_active() && s.mailing_list_id() == mailing_list_id && s.email() == email)
    }

    fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, StoreError> {
        self.accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "account",
                id: id.to_string(),
            })
    }

    /// Applies one change, enforcing the same constraints as the SQL schema.
    fn apply(&mut self, change: &Change) -> Result<(), StoreError> {
        match change {
            Change::InsertMailingList(mailing_list) => {
                if self.mailing_lists.values().any(|l| l.email == mailing_list.email) {
                    return Err(StoreError::Conflict(format!(
                        "a mailing list with email {} already exists",
                        mailing_list.email
                    )));
                }
                self.mailing_lists
                    .insert(mailing_list.id, mailing_list.clone());
            }
            Change::InsertAccount(account) => {
                if self.accounts.values().any(|a| a.email == account.email) {
                    return Err(StoreError::Conflict(format!(
                        "an account with email {} already exists",
                        account.email
                    )));
                }
                self.accounts.insert(account.id, account.clone());
            }
            Change::UpdateAccountEmail(id, email) => {
                if self.accounts.values().any(|a| a.id != *id && &a.email == email) {
                    return Err(StoreError::Conflict(format!(
                        "an account with email {} already exists",
                        email
                    )));
                }
                self.account_mut(*id)?.email = email.clone();
            }
            Change::UpdateAccountMailingFlag(id, on_mailing_lists) => {
                self.account_mut(*id)?.on_mailing_lists = *on_mailing_lists;
            }
            Change::CreateSubscription(subscription) => {
                let mailing_list_id = subscription.mailing_list_id();
                if !self.mailing_lists.contains_key(&mailing_list_id) {
                    return Err(StoreError::NotFound {
                        entity: "mailing list",
                        id: mailing_list_id.to_string(),
                    });
                }
                if let Some(account_id) = subscription.account_id() {
                    if !self.accounts.contains_key(&account_id) {
                        return Err(StoreError::NotFound {
                            entity: "account",
                            id: account_id.to_string(),
                        });
                    }
                }
                if self
                    .active_subscription(mailing_list_id, subscription.email())
                    .is_some()
                {
                    return Err(StoreError::Conflict(format!(
                        "{} is already subscribed to mailing list {}",
                        subscription.email(),
                        mailing_list_id
                    )));
                }
                self.subscriptions.push(subscription.clone());
            }
            Change::MarkUnsubscribed(id, unsubscribed_at) => {
                let subscription = self
                    .subscriptions
                    .iter_mut()
                    .find(|s| s.id() == *id)
                    .ok_or_else(|| StoreError::NotFound {
                        entity: "subscription",
                        id: id.to_string(),
                    })?;
                // The first close wins, whoever committed it.
                if subscription.is_active() {
                    subscription
                        .unsubscribe(*unsubscribed_at)
                        .map_err(|e| StoreError::Conflict(e.to_string()))?;
                }
            }
        }
        Ok(())
    }
}

/// A process-local database.
///
/// A unit of work reads from a copy of the records taken when it begins and
/// keeps a log of its writes. Committing replays that log onto the current
/// shared records, so writes committed in between are kept. Overlapping
/// writes to the same row resolve to the last commit; a replay that breaks a
/// uniqueness rule fails the commit and applies nothing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDatabase {
    records: Arc<Mutex<Records>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subscription record ever committed, in creation order.
    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.records.lock().await.subscriptions.clone()
    }

    pub async fn account(&self, id: AccountId) -> Option<Account> {
        self.records.lock().await.accounts.get(&id).cloned()
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let records = self.records.lock().await.clone();
        Ok(Box::new(InMemoryUnitOfWork {
            shared: Arc::clone(&self.records),
            records,
            changes: Vec::new(),
        }))
    }
}

pub struct InMemoryUnitOfWork {
    shared: Arc<Mutex<Records>>,
    records: Records,
    changes: Vec<Change>,
}

impl InMemoryUnitOfWork {
    fn record(&mut self, change: Change) -> Result<(), StoreError> {
        self.records.apply(&change)?;
        self.changes.push(change);
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryUnitOfWork { shared, changes, .. } = *self;
        let mut shared = shared.lock().await;
        let mut records = shared.clone();
        for change in &changes {
            records.apply(change)?;
        }
        *shared = records;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryUnitOfWork {
    async fn find_active_subscriptions(
        &mut self,
        account: &Account,
    ) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .records
            .subscriptions
            .iter()
            .filter(|s| s.is_active() && s.email() == &account.email)
            .cloned()
            .collect())
    }

    async fn find_active_subscription(
        &mut self,
        mailing_list_id: MailingListId,
        email: &Email,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .records
            .active_subscription(mailing_list_id, email)
            .cloned())
    }

    async fn create_subscription(
        &mut self,
        mailing_list_id: MailingListId,
        account: Option<&Account>,
        email: &Email,
        subscribed_at: DateTime<Utc>,
    ) -> Result<Subscription, StoreError> {
        let subscription = Subscription::new(
            mailing_list_id,
            account.map(|a| a.id),
            email.clone(),
            subscribed_at,
        );
        self.record(Change::CreateSubscription(subscription.clone()))?;
        Ok(subscription)
    }

    async fn mark_unsubscribed(
        &mut self,
        id: SubscriptionId,
        unsubscribed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.record(Change::MarkUnsubscribed(id, unsubscribed_at))
    }

    async fn update_account_mailing_flag(
        &mut self,
        account: &mut Account,
        on_mailing_lists: bool,
    ) -> Result<(), StoreError> {
        self.record(Change::UpdateAccountMailingFlag(account.id, on_mailing_lists))?;
        account.on_mailing_lists = on_mailing_lists;
        Ok(())
    }

    async fn find_subscription(
        &mut self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .records
            .subscriptions
            .iter()
            .find(|s| s.id() == id)
            .cloned())
    }

    async fn find_list_subscriptions(
        &mut self,
        mailing_list_id: MailingListId,
        email: Option<&Email>,
    ) -> Result<Vec<Subscription>, StoreError> {
        let mut subscriptions: Vec<Subscription> = self
            .records
            .subscriptions
            .iter()
            .filter(|s| s.mailing_list_id() == mailing_list_id)
            .filter(|s| email.map_or(true, |email| s.email() == email))
            .cloned()
            .collect();
        subscriptions.sort_by(|a, b| b.subscribed_at().cmp(&a.subscribed_at()));
        Ok(subscriptions)
    }

    async fn is_subscribed(&mut self, email: &Email) -> Result<bool, StoreError> {
        Ok(self
            .records
            .subscriptions
            .iter()
            .any(|s| s.is_active() && s.email() == email))
    }
}

#[async_trait]
impl AccountStore for InMemoryUnitOfWork {
    async fn insert_account(&mut self, email: Email) -> Result<Account, StoreError> {
        let account = Account::new(email);
        self.record(Change::InsertAccount(account.clone()))?;
        Ok(account)
    }

    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.records.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self
            .records
            .accounts
            .values()
            .find(|a| &a.email == email)
            .cloned())
    }

    async fn update_account_email(
        &mut self,
        account: &mut Account,
        email: Email,
    ) -> Result<(), StoreError> {
        self.record(Change::UpdateAccountEmail(account.id, email.clone()))?;
        account.email = email;
        Ok(())
    }
}

#[async_trait]
impl MailingListStore for InMemoryUnitOfWork {
    async fn insert_mailing_list(
        &mut self,
        mailing_list: NewMailingList,
    ) -> Result<MailingList, StoreError> {
        let mailing_list = MailingList {
            id: MailingListId::generate(),
            name: mailing_list.name,
            email: mailing_list.email,
        };
        self.record(Change::InsertMailingList(mailing_list.clone()))?;
        Ok(mailing_list)
    }

    async fn find_mailing_list(
        &mut self,
        id: MailingListId,
    ) -> Result<Option<MailingList>, StoreError> {
        Ok(self.records.mailing_lists.get(&id).cloned())
    }

    async fn find_mailing_lists(&mut self) -> Result<Vec<MailingList>, StoreError> {
        let mut mailing_lists: Vec<MailingList> =
            self.records.mailing_lists.values().cloned().collect();
        mailing_lists.sort_by(|a, b| a.name.as_ref().cmp(b.name.as_ref()));
        Ok(mailing_lists)
    }

    async fn find_mailing_list_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<MailingList>, StoreError> {
        Ok(self
            .records
            .mailing_lists
            .values()
            .find(|l| &l.email == email)
            .cloned())
    }
}
