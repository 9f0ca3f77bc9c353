use derive_more::Display;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Display,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[display(fmt = "{}", _0)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Identity of an account.
    AccountId
);
entity_id!(
    /// Identity of a mailing list.
    MailingListId
);
entity_id!(
    /// Identity of a single subscription record.
    SubscriptionId
);
