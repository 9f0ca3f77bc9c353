use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use super::schema::{StatusParams, StatusResponseBody, UnsubscribeRequestBody};
use crate::{
    app::{
        error::{AppError, AppResult},
        AppState,
    },
    domain::{Email, Subscription},
    membership,
    store::{SubscriptionStore, UnitOfWork},
};

#[tracing::instrument(name = "Check whether an address is subscribed", skip(state))]
pub async fn subscription_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> AppResult<Json<StatusResponseBody>> {
    let email = Email::try_from(params.email).map_err(AppError::ValidationError)?;

    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let subscribed = uow.is_subscribed(&email).await?;

    Ok(Json(StatusResponseBody { email, subscribed }))
}

#[tracing::instrument(name = "Unsubscribe a subscription", skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UnsubscribeRequestBody>,
) -> AppResult<Json<Subscription>> {
    let mut uow = state.db.begin().await.context("Could not begin a transaction.")?;
    let subscription =
        membership::close_subscription(&mut *uow, id.into(), body.unsubscribed_at).await?;
    uow.commit()
        .await
        .context("Could not save the unsubscription.")?;

    Ok(Json(subscription))
}
