use chrono::{DateTime, Utc};

use super::MembershipError;
use crate::{
    domain::{Account, Email, MailingListId, Subscription, SubscriptionId},
    store::{StoreError, SubscriptionStore},
};

/// Subscribes an address to one list, optionally on behalf of an account.
///
/// If the address already holds an active subscription to the list, that one
/// is returned and nothing is written.
#[tracing::instrument(
    name = "Subscribe an address to a mailing list",
    skip(store, account, email),
    fields(email = %email)
)]
pub async fn subscribe_address<S>(
    store: &mut S,
    mailing_list_id: MailingListId,
    account: Option<&Account>,
    email: &Email,
    subscribed_at: DateTime<Utc>,
) -> Result<Subscription, StoreError>
where
    S: SubscriptionStore + ?Sized,
{
    if let Some(existing) = store.find_active_subscription(mailing_list_id, email).await? {
        tracing::debug!(subscription_id = %existing.id(), "address is already subscribed");
        return Ok(existing);
    }
    store
        .create_subscription(mailing_list_id, account, email, subscribed_at)
        .await
}

/// Closes the address's active subscription to the list. Returns whether there
/// was one.
#[tracing::instrument(
    name = "Unsubscribe an address from a mailing list",
    skip(store, email),
    fields(email = %email)
)]
pub async fn unsubscribe_address<S>(
    store: &mut S,
    mailing_list_id: MailingListId,
    email: &Email,
    unsubscribed_at: DateTime<Utc>,
) -> Result<bool, StoreError>
where
    S: SubscriptionStore + ?Sized,
{
    match store.find_active_subscription(mailing_list_id, email).await? {
        Some(subscription) => {
            store
                .mark_unsubscribed(subscription.id(), unsubscribed_at)
                .await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Closes the account's subscriptions on the given lists only.
#[tracing::instrument(
    name = "Unsubscribe an account from some mailing lists",
    skip(store, mailing_list_ids, account),
    fields(account_id = %account.id, lists = mailing_list_ids.len())
)]
pub async fn unsubscribe_lists<S>(
    store: &mut S,
    mailing_list_ids: &[MailingListId],
    account: &Account,
    unsubscribed_at: DateTime<Utc>,
) -> Result<(), StoreError>
where
    S: SubscriptionStore + ?Sized,
{
    for mailing_list_id in mailing_list_ids {
        unsubscribe_address(&mut *store, *mailing_list_id, &account.email, unsubscribed_at)
            .await?;
    }
    Ok(())
}

/// Closes a subscription picked by id, stamping the timestamp the caller
/// supplies. Used for address-only subscribers, who have no account to
/// reconcile. A date before the subscription started is refused.
#[tracing::instrument(name = "Close a subscription", skip(store))]
pub async fn close_subscription<S>(
    store: &mut S,
    id: SubscriptionId,
    unsubscribed_at: DateTime<Utc>,
) -> Result<Subscription, MembershipError>
where
    S: SubscriptionStore + ?Sized,
{
    let mut subscription = store
        .find_subscription(id)
        .await?
        .ok_or(MembershipError::SubscriptionNotFound(id))?;
    if subscription.is_active() && unsubscribed_at < subscription.subscribed_at() {
        return Err(MembershipError::UnsubscribedBeforeSubscribed {
            id,
            subscribed_at: subscription.subscribed_at(),
            unsubscribed_at,
        });
    }
    subscription.unsubscribe(unsubscribed_at)?;
    store.mark_unsubscribed(id, unsubscribed_at).await?;
    Ok(subscription)
}
