//! Mailing list membership: the reconciler and the operations around it.
//!
//! Every function takes the store it writes through and the timestamp to stamp
//! on new or closed records. None of them commit; the caller owns the unit of
//! work.

mod address;
mod email_change;
mod reconcile;

#[cfg(test)]
mod fixture;

pub use self::address::{close_subscription, subscribe_address, unsubscribe_address, unsubscribe_lists};
pub use self::email_change::change_email_address;
pub use self::reconcile::{reconcile, unsubscribe_all};

use chrono::{DateTime, Utc};

use crate::{
    domain::{SubscriptionError, SubscriptionId},
    store::StoreError,
};

#[derive(thiserror::Error, Debug)]
pub enum MembershipError {
    #[error("subscription {0} does not exist")]
    SubscriptionNotFound(SubscriptionId),
    #[error("subscription {id} started at {subscribed_at} and cannot end at {unsubscribed_at}")]
    UnsubscribedBeforeSubscribed {
        id: SubscriptionId,
        subscribed_at: DateTime<Utc>,
        unsubscribed_at: DateTime<Utc>,
    },
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
