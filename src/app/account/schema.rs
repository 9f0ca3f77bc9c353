use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Account, Subscription};

#[derive(Deserialize)]
pub struct CreateAccountRequestBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdateMailingListsRequestBody {
    pub mailing_lists: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct ChangeEmailRequestBody {
    pub email: String,
}

#[derive(Serialize)]
pub struct AccountMailingListsResponseBody {
    pub account: Account,
    pub subscriptions: Vec<Subscription>,
}
