use serde_json::{json, Value};

use crate::helper::spawn_app;

#[tokio::test]
async fn mailing_lists_are_listed_by_name() {
    let app = spawn_app().await;
    app.create_mailing_list("Members", "members@jug.org").await;
    app.create_mailing_list("Announcements", "announce@jug.org").await;

    let response = app.get("/mailing_lists").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|list| list["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Announcements", "Members"]);
}

#[tokio::test]
async fn create_mailing_list_returns_a_400_for_invalid_fields() {
    let app = spawn_app().await;
    let test_cases = [
        (json!({ "name": "", "email": "members@jug.org" }), "empty name"),
        (json!({ "name": "Members", "email": "" }), "empty email"),
        (json!({ "name": "Members", "email": "not-an-email" }), "invalid email"),
        (json!({ "name": "Mem<bers>", "email": "members@jug.org" }), "forbidden characters"),
    ];

    for (body, description) in test_cases {
        let response = app.post("/mailing_lists", &body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not return a 400 Bad Request when the payload had an {}.",
            description
        );
    }
}

#[tokio::test]
async fn two_lists_cannot_share_an_address() {
    let app = spawn_app().await;
    app.create_mailing_list("Members", "members@jug.org").await;

    let response = app
        .post(
            "/mailing_lists",
            &json!({ "name": "Other", "email": "members@jug.org" }),
        )
        .await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn subscribing_an_address_twice_keeps_one_active_record() {
    let app = spawn_app().await;
    let list = app.create_mailing_list("Members", "members@jug.org").await;
    let body = json!({
        "email": "guest@example.com",
        "subscribed_at": "2024-03-01T12:00:00Z",
    });

    let first: Value = app
        .post(&format!("/mailing_lists/{}/subscriptions", list), &body)
        .await
        .json()
        .await
        .unwrap();
    let second: Value = app
        .post(&format!("/mailing_lists/{}/subscriptions", list), &body)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["status"], "active");
    assert!(first["account_id"].is_null());
    assert_eq!(app.db.subscriptions().await.len(), 1);
}

#[tokio::test]
async fn list_subscriptions_can_be_narrowed_to_one_address() {
    let app = spawn_app().await;
    let list = app.create_mailing_list("Members", "members@jug.org").await;
    for email in ["a@example.com", "b@example.com"] {
        let response = app
            .post(
                &format!("/mailing_lists/{}/subscriptions", list),
                &json!({ "email": email, "subscribed_at": "2024-03-01T12:00:00Z" }),
            )
            .await;
        assert_eq!(200, response.status().as_u16());
    }

    let all: Value = app
        .get(&format!("/mailing_lists/{}/subscriptions", list))
        .await
        .json()
        .await
        .unwrap();
    let narrowed: Value = app
        .get(&format!(
            "/mailing_lists/{}/subscriptions?email=b@example.com",
            list
        ))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(narrowed.as_array().unwrap().len(), 1);
    assert_eq!(narrowed[0]["email"], "b@example.com");
}

#[tokio::test]
async fn unknown_mailing_lists_return_a_404() {
    let app = spawn_app().await;

    let response = app
        .get(&format!(
            "/mailing_lists/{}/subscriptions",
            uuid::Uuid::new_v4()
        ))
        .await;

    assert_eq!(404, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn a_mailing_list_can_be_found_by_its_address() {
    let app = spawn_app().await;
    let members = app.create_mailing_list("Members", "members@jug.org").await;
    app.create_mailing_list("News", "news@jug.org").await;

    let found: Value = app
        .get("/mailing_lists?email=members@jug.org")
        .await
        .json()
        .await
        .unwrap();
    let missing: Value = app
        .get("/mailing_lists?email=nobody@jug.org")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["id"], members.as_str());
    assert!(missing.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unsubscribing_an_address_reports_whether_it_was_subscribed() {
    let app = spawn_app().await;
    let list = app.create_mailing_list("Members", "members@jug.org").await;
    app.post(
        &format!("/mailing_lists/{}/subscriptions", list),
        &json!({ "email": "guest@example.com", "subscribed_at": "2024-03-01T12:00:00Z" }),
    )
    .await;
    let path = format!("/mailing_lists/{}/unsubscribe", list);
    let body = json!({ "email": "guest@example.com", "unsubscribed_at": "2001-01-01T00:00:00Z" });

    let first: Value = app.post(&path, &body).await.json().await.unwrap();
    let second: Value = app.post(&path, &body).await.json().await.unwrap();

    assert_eq!(first["unsubscribed"], true);
    assert_eq!(second["unsubscribed"], false);
    let subscriptions = app.db.subscriptions().await;
    assert_eq!(subscriptions.len(), 1);
    // The server stamps its own time.
    let subscribed_at = subscriptions[0].subscribed_at();
    assert!(subscriptions[0].unsubscribed_at().unwrap() > subscribed_at);
}
