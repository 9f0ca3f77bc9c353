use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    domain::{Account, Email, ListName, MailingList, MailingListId, NewMailingList, Subscription},
    store::{AccountStore, Database, InMemoryDatabase, MailingListStore, UnitOfWork},
};

pub struct Fixture {
    pub db: InMemoryDatabase,
    pub lists: Vec<MailingList>,
    pub account: Account,
}

impl Fixture {
    /// A database holding `lists` mailing lists and one account without
    /// subscriptions.
    pub async fn with_lists(lists: usize) -> Self {
        let db = InMemoryDatabase::new();
        let mut uow = db.begin().await.unwrap();
        let mut created = Vec::with_capacity(lists);
        for i in 0..lists {
            let list = uow
                .insert_mailing_list(NewMailingList {
                    name: ListName::try_from(format!("List {}", i)).unwrap(),
                    email: Email::try_from(format!("list{}@jug.org", i)).unwrap(),
                })
                .await
                .unwrap();
            created.push(list);
        }
        let account = uow
            .insert_account(Email::try_from("member@example.com").unwrap())
            .await
            .unwrap();
        uow.commit().await.unwrap();

        Self {
            db,
            lists: created,
            account,
        }
    }

    pub fn pick(&self, indexes: &[usize]) -> Vec<MailingList> {
        indexes.iter().map(|&i| self.lists[i].clone()).collect()
    }

    pub fn ids(&self, indexes: &[usize]) -> BTreeSet<MailingListId> {
        indexes.iter().map(|&i| self.lists[i].id).collect()
    }
}

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
}

pub fn email(value: &str) -> Email {
    Email::try_from(value).unwrap()
}

pub fn active_lists(subscriptions: &[Subscription], email: &Email) -> BTreeSet<MailingListId> {
    subscriptions
        .iter()
        .filter(|s| s.is_active() && s.email() == email)
        .map(|s| s.mailing_list_id())
        .collect()
}
