//! Persistence seam for the membership operations.
//!
//! Every operation runs against one [`UnitOfWork`], obtained from a
//! [`Database`] and committed once at the end. Dropping a unit of work without
//! committing discards its writes. Two units of work touching the same account
//! concurrently are not coordinated: whichever commits last wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Account, AccountId, Email, MailingList, MailingListId, NewMailingList, Subscription,
    SubscriptionId,
};

pub mod memory;
pub mod postgres;

pub use self::memory::InMemoryDatabase;
pub use self::postgres::PgDatabase;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("stored record is invalid: {0}")]
    InvalidRecord(String),
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Conflict(String),
}

#[async_trait]
pub trait SubscriptionStore: Send {
    /// Active subscriptions held by the account's current email address.
    async fn find_active_subscriptions(
        &mut self,
        account: &Account,
    ) -> Result<Vec<Subscription>, StoreError>;

    async fn find_active_subscription(
        &mut self,
        mailing_list_id: MailingListId,
        email: &Email,
    ) -> Result<Option<Subscription>, StoreError>;

    async fn create_subscription(
        &mut self,
        mailing_list_id: MailingListId,
        account: Option<&Account>,
        email: &Email,
        subscribed_at: DateTime<Utc>,
    ) -> Result<Subscription, StoreError>;

    /// Closes an active subscription. Closing one that is already closed
    /// leaves its original timestamp in place.
    async fn mark_unsubscribed(
        &mut self,
        id: SubscriptionId,
        unsubscribed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn update_account_mailing_flag(
        &mut self,
        account: &mut Account,
        on_mailing_lists: bool,
    ) -> Result<(), StoreError>;

    async fn find_subscription(
        &mut self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Every subscription record of a list, newest first, optionally narrowed
    /// to one email address.
    async fn find_list_subscriptions(
        &mut self,
        mailing_list_id: MailingListId,
        email: Option<&Email>,
    ) -> Result<Vec<Subscription>, StoreError>;

    /// Whether the address holds at least one active subscription.
    async fn is_subscribed(&mut self, email: &Email) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send {
    async fn insert_account(&mut self, email: Email) -> Result<Account, StoreError>;

    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_email(&mut self, email: &Email)
        -> Result<Option<Account>, StoreError>;

    async fn update_account_email(
        &mut self,
        account: &mut Account,
        email: Email,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait MailingListStore: Send {
    async fn insert_mailing_list(
        &mut self,
        mailing_list: NewMailingList,
    ) -> Result<MailingList, StoreError>;

    async fn find_mailing_list(
        &mut self,
        id: MailingListId,
    ) -> Result<Option<MailingList>, StoreError>;

    /// All mailing lists ordered by name.
    async fn find_mailing_lists(&mut self) -> Result<Vec<MailingList>, StoreError>;

    async fn find_mailing_list_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<MailingList>, StoreError>;
}

/// One transaction over every store.
#[async_trait]
pub trait UnitOfWork: SubscriptionStore + AccountStore + MailingListStore {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}
