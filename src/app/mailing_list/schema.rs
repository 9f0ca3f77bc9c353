use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Email, ListName, NewMailingList};

#[derive(Deserialize)]
pub struct CreateMailingListRequestBody {
    pub name: String,
    pub email: String,
}

impl TryFrom<CreateMailingListRequestBody> for NewMailingList {
    type Error = String;
    fn try_from(value: CreateMailingListRequestBody) -> Result<Self, Self::Error> {
        let name = ListName::try_from(value.name)?;
        let email = Email::try_from(value.email)?;
        Ok(Self { name, email })
    }
}

#[derive(Debug, Deserialize)]
pub struct MailingListsQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionsQuery {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct SubscribeRequestBody {
    pub email: String,
    pub account_id: Option<Uuid>,
    pub subscribed_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct UnsubscribeRequestBody {
    pub email: String,
}

#[derive(Serialize)]
pub struct UnsubscribeResponseBody {
    pub email: Email,
    /// False when the address held no active subscription to the list.
    pub unsubscribed: bool,
}
