use super::{email::Email, id::AccountId};

/// A registered member.
///
/// `on_mailing_lists` mirrors whether the account has at least one active
/// subscription. It is written by the membership operations and never derived
/// on read.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Account {
    pub id: AccountId,
    pub email: Email,
    pub on_mailing_lists: bool,
}

impl Account {
    pub fn new(email: Email) -> Self {
        Self {
            id: AccountId::generate(),
            email,
            on_mailing_lists: false,
        }
    }
}
