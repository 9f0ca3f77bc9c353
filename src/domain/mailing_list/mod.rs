mod name;

pub use self::name::ListName;

use super::{email::Email, id::MailingListId};

/// A named distribution list. Reference data: created once, never edited by
/// the membership operations.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MailingList {
    pub id: MailingListId,
    pub name: ListName,
    pub email: Email,
}

pub struct NewMailingList {
    pub name: ListName,
    pub email: Email,
}
