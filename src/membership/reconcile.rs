use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::{
    domain::{Account, MailingList, MailingListId},
    store::{StoreError, SubscriptionStore},
};

/// Brings the account's active subscriptions in line with `desired`.
///
/// Lists are compared by identity. Subscriptions to lists outside `desired` are
/// closed at `as_of`, lists without an active subscription get a new one
/// stamped `as_of`, and subscriptions already in place are left alone. An
/// empty `desired` closes everything and clears the account's mailing list
/// flag; anything else sets it. Without an account there is nothing to do.
#[tracing::instrument(
    name = "Reconcile mailing list subscriptions",
    skip(store, desired, account),
    fields(account_id = tracing::field::Empty, desired = desired.len())
)]
pub async fn reconcile<S>(
    store: &mut S,
    desired: &[MailingList],
    account: Option<&mut Account>,
    as_of: DateTime<Utc>,
) -> Result<(), StoreError>
where
    S: SubscriptionStore + ?Sized,
{
    let Some(account) = account else {
        tracing::debug!("no account given, nothing to reconcile");
        return Ok(());
    };
    tracing::Span::current().record("account_id", &tracing::field::display(account.id));

    let desired: BTreeSet<MailingListId> = desired.iter().map(|list| list.id).collect();

    if desired.is_empty() {
        unsubscribe_all(store, account, as_of).await?;
        store.update_account_mailing_flag(account, false).await?;
        return Ok(());
    }

    store.update_account_mailing_flag(account, true).await?;

    // Whatever is left once the current subscriptions are matched off still
    // needs a subscription.
    let mut missing = desired;
    let mut unsubscribed = 0;
    for subscription in store.find_active_subscriptions(account).await? {
        // A list seen twice means a duplicate active record; only the first survives.
        if !missing.remove(&subscription.mailing_list_id()) {
            store.mark_unsubscribed(subscription.id(), as_of).await?;
            unsubscribed += 1;
        }
    }

    for mailing_list_id in &missing {
        store
            .create_subscription(*mailing_list_id, Some(&*account), &account.email, as_of)
            .await?;
    }

    tracing::info!(
        subscribed = missing.len(),
        unsubscribed,
        "reconciled mailing list subscriptions"
    );
    Ok(())
}

/// Closes every active subscription held by the account's address.
#[tracing::instrument(
    name = "Unsubscribe from all mailing lists",
    skip(store, account),
    fields(account_id = %account.id)
)]
pub async fn unsubscribe_all<S>(
    store: &mut S,
    account: &Account,
    as_of: DateTime<Utc>,
) -> Result<(), StoreError>
where
    S: SubscriptionStore + ?Sized,
{
    let subscriptions = store.find_active_subscriptions(account).await?;
    for subscription in &subscriptions {
        store.mark_unsubscribed(subscription.id(), as_of).await?;
    }
    tracing::info!(unsubscribed = subscriptions.len(), "closed all subscriptions");
    Ok(())
}
