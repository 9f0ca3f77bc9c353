use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::address::subscribe_address;
use crate::{
    domain::{Account, Email, MailingListId},
    store::{AccountStore, StoreError, SubscriptionStore},
};

/// Moves the account's active subscriptions to a new email address.
///
/// The subscriptions held under the old address are closed at `as_of` and kept
/// as history; the same lists are then subscribed again under the new address.
#[tracing::instrument(
    name = "Change the account email address",
    skip(store, account, new_email),
    fields(account_id = %account.id, old_email = %account.email, new_email = %new_email)
)]
pub async fn change_email_address<S>(
    store: &mut S,
    account: &mut Account,
    new_email: Email,
    as_of: DateTime<Utc>,
) -> Result<(), StoreError>
where
    S: SubscriptionStore + AccountStore + ?Sized,
{
    if account.email == new_email {
        return Ok(());
    }

    let current = store.find_active_subscriptions(account).await?;
    let lists: BTreeSet<MailingListId> = current.iter().map(|s| s.mailing_list_id()).collect();
    for subscription in &current {
        store.mark_unsubscribed(subscription.id(), as_of).await?;
    }

    store.update_account_email(account, new_email).await?;

    for mailing_list_id in lists {
        subscribe_address(
            &mut *store,
            mailing_list_id,
            Some(&*account),
            &account.email,
            as_of,
        )
        .await?;
    }

    let on_mailing_lists = !store.find_active_subscriptions(account).await?.is_empty();
    store
        .update_account_mailing_flag(account, on_mailing_lists)
        .await?;
    Ok(())
}
