use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use super::schema::{
    AccountMailingListsResponseBody, ChangeEmailRequestBody, CreateAccountRequestBody,
    UpdateMailingListsRequestBody,
};
use crate::{
    app::{
        error::{AppError, AppResult},
        AppState,
    },
    domain::{Account, Email},
    membership,
    store::{AccountStore, MailingListStore, SubscriptionStore, UnitOfWork},
};

#[tracing::instrument(name = "Create an account", skip(state, body), fields(email = %body.email))]
pub async fn create_account(
    State(state): State<AppState>,
    Json(body): Json<CreateAccountRequestBody>,
) -> AppResult<(StatusCode, Json<Account>)> {
    let email = Email::try_from(body.email).map_err(AppError::ValidationError)?;

    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let account = uow.insert_account(email).await?;
    uow.commit().await.context("Could not save the new account.")?;

    Ok((StatusCode::CREATED, Json(account)))
}

#[tracing::instrument(name = "Get the mailing lists of an account", skip(state))]
pub async fn get_mailing_lists(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AccountMailingListsResponseBody>> {
    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let account = find_account(&mut *uow, id).await?;
    let subscriptions = uow.find_active_subscriptions(&account).await?;

    Ok(Json(AccountMailingListsResponseBody {
        account,
        subscriptions,
    }))
}

#[tracing::instrument(
    name = "Update the mailing lists of an account",
    skip(state, body),
    fields(desired = body.mailing_lists.len())
)]
pub async fn update_mailing_lists(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMailingListsRequestBody>,
) -> AppResult<Json<AccountMailingListsResponseBody>> {
    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let mut account = find_account(&mut *uow, id).await?;

    let mut desired = Vec::with_capacity(body.mailing_lists.len());
    for mailing_list_id in body.mailing_lists {
        let mailing_list = uow
            .find_mailing_list(mailing_list_id.into())
            .await?
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "mailing list {} does not exist",
                    mailing_list_id
                ))
            })?;
        desired.push(mailing_list);
    }

    membership::reconcile(&mut *uow, &desired, Some(&mut account), Utc::now()).await?;
    let subscriptions = uow.find_active_subscriptions(&account).await?;
    uow.commit()
        .await
        .context("Could not save the mailing list subscriptions.")?;

    Ok(Json(AccountMailingListsResponseBody {
        account,
        subscriptions,
    }))
}

#[tracing::instrument(name = "Change the email address of an account", skip(state, body), fields(email = %body.email))]
pub async fn change_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ChangeEmailRequestBody>,
) -> AppResult<Json<AccountMailingListsResponseBody>> {
    let new_email = Email::try_from(body.email).map_err(AppError::ValidationError)?;

    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let mut account = find_account(&mut *uow, id).await?;
    membership::change_email_address(&mut *uow, &mut account, new_email, Utc::now()).await?;
    let subscriptions = uow.find_active_subscriptions(&account).await?;
    uow.commit()
        .await
        .context("Could not save the new email address.")?;

    Ok(Json(AccountMailingListsResponseBody {
        account,
        subscriptions,
    }))
}

async fn find_account(uow: &mut dyn UnitOfWork, id: Uuid) -> AppResult<Account> {
    uow.find_account(id.into())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {} does not exist", id)))
}
