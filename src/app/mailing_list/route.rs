use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use super::schema::{
    CreateMailingListRequestBody, MailingListsQuery, SubscribeRequestBody, SubscriptionsQuery,
    UnsubscribeRequestBody, UnsubscribeResponseBody,
};
use crate::{
    app::{
        error::{AppError, AppResult},
        AppState,
    },
    domain::{Email, MailingList, NewMailingList, Subscription},
    membership,
    store::{AccountStore, MailingListStore, SubscriptionStore, UnitOfWork},
};

#[tracing::instrument(name = "Create a mailing list", skip(state, body), fields(name = %body.name, email = %body.email))]
pub async fn create_mailing_list(
    State(state): State<AppState>,
    Json(body): Json<CreateMailingListRequestBody>,
) -> AppResult<(StatusCode, Json<MailingList>)> {
    let new_list = NewMailingList::try_from(body).map_err(AppError::ValidationError)?;

    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let mailing_list = uow.insert_mailing_list(new_list).await?;
    uow.commit()
        .await
        .context("Could not save the new mailing list.")?;

    Ok((StatusCode::CREATED, Json(mailing_list)))
}

#[tracing::instrument(name = "List mailing lists", skip(state))]
pub async fn list_mailing_lists(
    State(state): State<AppState>,
    Query(query): Query<MailingListsQuery>,
) -> AppResult<Json<Vec<MailingList>>> {
    let email = query
        .email
        .map(Email::try_from)
        .transpose()
        .map_err(AppError::ValidationError)?;

    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let mailing_lists = match email {
        Some(email) => uow
            .find_mailing_list_by_email(&email)
            .await?
            .into_iter()
            .collect(),
        None => uow.find_mailing_lists().await?,
    };

    Ok(Json(mailing_lists))
}

#[tracing::instrument(name = "Search the subscriptions of a mailing list", skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SubscriptionsQuery>,
) -> AppResult<Json<Vec<Subscription>>> {
    let email = query
        .email
        .map(Email::try_from)
        .transpose()
        .map_err(AppError::ValidationError)?;

    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let mailing_list = find_mailing_list(&mut *uow, id).await?;
    let subscriptions = uow
        .find_list_subscriptions(mailing_list.id, email.as_ref())
        .await?;

    Ok(Json(subscriptions))
}

#[tracing::instrument(name = "Subscribe an address", skip(state, body), fields(email = %body.email))]
pub async fn subscribe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubscribeRequestBody>,
) -> AppResult<Json<Subscription>> {
    let email = Email::try_from(body.email).map_err(AppError::ValidationError)?;

    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let mailing_list = find_mailing_list(&mut *uow, id).await?;
    let account = match body.account_id {
        Some(account_id) => Some(
            uow.find_account(account_id.into())
                .await?
                .ok_or_else(|| AppError::NotFound(format!("account {} does not exist", account_id)))?,
        ),
        None => None,
    };

    let subscription = membership::subscribe_address(
        &mut *uow,
        mailing_list.id,
        account.as_ref(),
        &email,
        body.subscribed_at,
    )
    .await?;
    uow.commit()
        .await
        .context("Could not save the subscription.")?;

    Ok(Json(subscription))
}

#[tracing::instrument(name = "Unsubscribe an address", skip(state, body), fields(email = %body.email))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UnsubscribeRequestBody>,
) -> AppResult<Json<UnsubscribeResponseBody>> {
    let email = Email::try_from(body.email).map_err(AppError::ValidationError)?;

    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let mailing_list = find_mailing_list(&mut *uow, id).await?;
    let unsubscribed =
        membership::unsubscribe_address(&mut *uow, mailing_list.id, &email, Utc::now())
            .await?;
    uow.commit()
        .await
        .context("Could not save the unsubscription.")?;

    Ok(Json(UnsubscribeResponseBody {
        email,
        unsubscribed,
    }))
}

async fn find_mailing_list(uow: &mut dyn UnitOfWork, id: Uuid) -> AppResult<MailingList> {
    uow.find_mailing_list(id.into())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("mailing list {} does not exist", id)))
}
