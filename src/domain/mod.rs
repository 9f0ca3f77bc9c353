pub mod account;
pub mod email;
pub mod id;
pub mod mailing_list;
pub mod subscription;

pub use self::account::Account;
pub use self::email::Email;
pub use self::id::{AccountId, MailingListId, SubscriptionId};
pub use self::mailing_list::{ListName, MailingList, NewMailingList};
pub use self::subscription::{Subscription, SubscriptionError, SubscriptionState};
