use std::sync::Arc;

use mailroll::{
    app::App,
    config::{get_configuration, DatabaseSettings},
    store::{Database, InMemoryDatabase, PgDatabase},
    telemetry::get_subscriber,
};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

static TRACING: Lazy<()> = Lazy::new(|| {
    let env_filter = "mailroll=trace,sqlx=trace,tower_http=trace,axum::rejection=trace";

    if std::env::var("TEST_LOG").is_ok() {
        get_subscriber(env_filter, std::io::stdout).init();
    } else {
        get_subscriber(env_filter, std::io::sink).init();
    };
});

pub struct TestApp<D = InMemoryDatabase> {
    pub addr: String,
    pub db: D,
    client: reqwest::Client,
}

impl<D> TestApp<D> {
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", &self.addr, path))
            .send()
            .await
            .expect("The request should succeed.")
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", &self.addr, path))
            .json(body)
            .send()
            .await
            .expect("The request should succeed.")
    }

    pub async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(format!("{}{}", &self.addr, path))
            .json(body)
            .send()
            .await
            .expect("The request should succeed.")
    }

    /// Creates a mailing list and returns its id.
    pub async fn create_mailing_list(&self, name: &str, email: &str) -> String {
        let response = self
            .post("/mailing_lists", &json!({ "name": name, "email": email }))
            .await;
        assert_eq!(201, response.status().as_u16());
        id_of(response).await
    }

    /// Creates an account and returns its id.
    pub async fn create_account(&self, email: &str) -> String {
        let response = self.post("/accounts", &json!({ "email": email })).await;
        assert_eq!(201, response.status().as_u16());
        id_of(response).await
    }
}

async fn id_of(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("The body should be JSON.");
    body["id"]
        .as_str()
        .expect("The body should carry an id.")
        .to_string()
}

/// Serves the app from an in-memory database.
pub async fn spawn_app() -> TestApp {
    serve(InMemoryDatabase::new()).await
}

/// Serves the app from a freshly created and migrated PostgreSQL database.
pub async fn spawn_app_with_postgres() -> TestApp<PgDatabase> {
    let mut config = get_configuration().expect("Failed to read configuration.");
    config.database.database_name = Uuid::new_v4().to_string();

    let db = configure_database(&config.database).await;
    serve(db).await
}

async fn serve<D>(db: D) -> TestApp<D>
where
    D: Database + Clone + 'static,
{
    Lazy::force(&TRACING);

    let mut config = get_configuration().expect("Failed to read configuration.");
    config.application.host = "127.0.0.1".into();
    config.application.port = 0;

    let app = App::with(&config.application)
        .await
        .expect("The listener should bind.");

    let test_app = TestApp {
        addr: format!("http://127.0.0.1:{}", app.port()),
        db: db.clone(),
        client: reqwest::Client::new(),
    };

    let _ = tokio::spawn(async move {
        app.serve(Arc::new(db))
            .await
            .expect("The server should be running")
    });

    test_app
}

async fn configure_database(config: &DatabaseSettings) -> PgDatabase {
    // Create database
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("A postgres connection should be created.");

    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("The database should be created.");

    // Migrate database
    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("A postgres connection pool should be created.");

    let db = PgDatabase::new(connection_pool);
    db.migrate()
        .await
        .expect("The migrations should run without error.");

    db
}
