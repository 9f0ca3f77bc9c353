use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Email;

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub email: String,
}

#[derive(Serialize)]
pub struct StatusResponseBody {
    pub email: Email,
    pub subscribed: bool,
}

/// The administrator records when the subscriber asked to leave; the date is
/// taken as given.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequestBody {
    pub unsubscribed_at: DateTime<Utc>,
}
