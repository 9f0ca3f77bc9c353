use chrono::{Duration, TimeZone, Utc};
use mailroll::{
    domain::{Account, Email, ListName, MailingListId, NewMailingList},
    store::{AccountStore, Database, MailingListStore, StoreError, SubscriptionStore},
};
use serde_json::{json, Value};

use crate::helper::spawn_app_with_postgres;

fn email(value: &str) -> Email {
    Email::try_from(value).unwrap()
}

fn members() -> NewMailingList {
    NewMailingList {
        name: ListName::try_from("Members".to_string()).unwrap(),
        email: email("members@jug.org"),
    }
}

#[tokio::test]
async fn reconciling_against_postgres_applies_the_difference() {
    let app = spawn_app_with_postgres().await;
    let members = app.create_mailing_list("Members", "members@jug.org").await;
    let news = app.create_mailing_list("News", "news@jug.org").await;
    let events = app.create_mailing_list("Events", "events@jug.org").await;
    let account = app.create_account("member@example.com").await;
    let path = format!("/accounts/{}/mailing_lists", account);

    app.put(&path, &json!({ "mailing_lists": [members, news] }))
        .await;
    let response = app
        .put(&path, &json!({ "mailing_lists": [news, events] }))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = app.get(&path).await.json().await.unwrap();
    let mut active: Vec<&str> = body["subscriptions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["mailing_list_id"].as_str().unwrap())
        .collect();
    active.sort();
    let mut expected = vec![news.as_str(), events.as_str()];
    expected.sort();
    assert_eq!(active, expected);
    assert_eq!(body["account"]["on_mailing_lists"], true);

    let history: Value = app
        .get(&format!("/mailing_lists/{}/subscriptions", members))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["status"], "unsubscribed");
}

#[tokio::test]
async fn a_second_active_subscription_is_refused_until_the_first_is_closed() {
    let app = spawn_app_with_postgres().await;
    let address = email("guest@example.com");
    let mut uow = app.db.begin().await.unwrap();
    let list = uow.insert_mailing_list(members()).await.unwrap();
    let first = uow
        .create_subscription(list.id, None, &address, Utc::now())
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let mut uow = app.db.begin().await.unwrap();
    let err = uow
        .create_subscription(list.id, None, &address, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    drop(uow);

    let mut uow = app.db.begin().await.unwrap();
    uow.mark_unsubscribed(first.id(), Utc::now()).await.unwrap();
    uow.create_subscription(list.id, None, &address, Utc::now())
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let mut uow = app.db.begin().await.unwrap();
    let history = uow.find_list_subscriptions(list.id, None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|s| s.is_active()).count(), 1);
}

#[tokio::test]
async fn list_history_is_newest_first_and_can_be_narrowed() {
    let app = spawn_app_with_postgres().await;
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut uow = app.db.begin().await.unwrap();
    let list = uow.insert_mailing_list(members()).await.unwrap();
    for (day, address) in ["a@example.com", "b@example.com", "c@example.com"]
        .into_iter()
        .enumerate()
    {
        uow.create_subscription(list.id, None, &email(address), start + Duration::days(day as i64))
            .await
            .unwrap();
    }
    uow.commit().await.unwrap();

    let mut uow = app.db.begin().await.unwrap();
    let all = uow.find_list_subscriptions(list.id, None).await.unwrap();
    let narrowed = uow
        .find_list_subscriptions(list.id, Some(&email("b@example.com")))
        .await
        .unwrap();

    let order: Vec<&str> = all.iter().map(|s| s.email().as_ref()).collect();
    assert_eq!(order, ["c@example.com", "b@example.com", "a@example.com"]);
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].email().as_ref(), "b@example.com");
}

#[tokio::test]
async fn closing_twice_keeps_the_first_timestamp() {
    let app = spawn_app_with_postgres().await;
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut uow = app.db.begin().await.unwrap();
    let list = uow.insert_mailing_list(members()).await.unwrap();
    let subscription = uow
        .create_subscription(list.id, None, &email("guest@example.com"), start)
        .await
        .unwrap();

    uow.mark_unsubscribed(subscription.id(), start + Duration::days(1))
        .await
        .unwrap();
    uow.mark_unsubscribed(subscription.id(), start + Duration::days(2))
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let mut uow = app.db.begin().await.unwrap();
    let stored = uow
        .find_subscription(subscription.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.unsubscribed_at(), Some(start + Duration::days(1)));
}

#[tokio::test]
async fn missing_references_name_the_missing_record() {
    let app = spawn_app_with_postgres().await;
    let mut uow = app.db.begin().await.unwrap();
    let list = uow.insert_mailing_list(members()).await.unwrap();
    uow.commit().await.unwrap();
    let address = email("guest@example.com");

    let mut uow = app.db.begin().await.unwrap();
    let err = uow
        .create_subscription(MailingListId::generate(), None, &address, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "mailing list", .. }));
    drop(uow);

    let stranger = Account::new(address.clone());
    let mut uow = app.db.begin().await.unwrap();
    let err = uow
        .create_subscription(list.id, Some(&stranger), &address, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "account", .. }));
}

#[tokio::test]
async fn an_address_can_only_hold_one_account_in_postgres() {
    let app = spawn_app_with_postgres().await;
    app.create_account("member@example.com").await;

    let response = app
        .post("/accounts", &json!({ "email": "member@example.com" }))
        .await;

    assert_eq!(409, response.status().as_u16());
    let mut uow = app.db.begin().await.unwrap();
    assert!(uow
        .find_account_by_email(&email("member@example.com"))
        .await
        .unwrap()
        .is_some());
}
