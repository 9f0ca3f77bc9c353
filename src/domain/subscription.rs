use chrono::{DateTime, Utc};

use super::{
    email::Email,
    id::{AccountId, MailingListId, SubscriptionId},
};

/// Where a subscription record is in its lifecycle.
///
/// The only transition is `Active -> Unsubscribed`. A closed record is history;
/// joining the same list again creates a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    Unsubscribed { unsubscribed_at: DateTime<Utc> },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("subscription {id} was already unsubscribed at {at}")]
    AlreadyUnsubscribed { id: SubscriptionId, at: DateTime<Utc> },
}

/// Membership of one email address in one mailing list over an interval.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Subscription {
    id: SubscriptionId,
    mailing_list_id: MailingListId,
    account_id: Option<AccountId>,
    email: Email,
    subscribed_at: DateTime<Utc>,
    #[serde(flatten)]
    state: SubscriptionState,
}

impl Subscription {
    /// A freshly created subscription, always active.
    pub fn new(
        mailing_list_id: MailingListId,
        account_id: Option<AccountId>,
        email: Email,
        subscribed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SubscriptionId::generate(),
            mailing_list_id,
            account_id,
            email,
            subscribed_at,
            state: SubscriptionState::Active,
        }
    }

    /// Rebuilds a record read back from storage.
    pub(crate) fn restore(
        id: SubscriptionId,
        mailing_list_id: MailingListId,
        account_id: Option<AccountId>,
        email: Email,
        subscribed_at: DateTime<Utc>,
        unsubscribed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let state = match unsubscribed_at {
            Some(unsubscribed_at) => SubscriptionState::Unsubscribed { unsubscribed_at },
            None => SubscriptionState::Active,
        };
        Self {
            id,
            mailing_list_id,
            account_id,
            email,
            subscribed_at,
            state,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn mailing_list_id(&self) -> MailingListId {
        self.mailing_list_id
    }

    pub fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn subscribed_at(&self) -> DateTime<Utc> {
        self.subscribed_at
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SubscriptionState::Active)
    }

    pub fn unsubscribed_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SubscriptionState::Active => None,
            SubscriptionState::Unsubscribed { unsubscribed_at } => Some(unsubscribed_at),
        }
    }

    pub fn unsubscribe(&mut self, at: DateTime<Utc>) -> Result<(), SubscriptionError> {
        if let SubscriptionState::Unsubscribed { unsubscribed_at } = self.state {
            return Err(SubscriptionError::AlreadyUnsubscribed {
                id: self.id,
                at: unsubscribed_at,
            });
        }
        self.state = SubscriptionState::Unsubscribed {
            unsubscribed_at: at,
        };
        Ok(())
    }
}
