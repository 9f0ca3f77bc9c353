use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    AccountStore, Database, MailingListStore, StoreError, SubscriptionStore, UnitOfWork,
};
use crate::domain::{
    Account, AccountId, Email, ListName, MailingList, MailingListId, NewMailingList,
    Subscription, SubscriptionId,
};

const ACCOUNT_FK: &str = "mailing_list_subscriptions_account_fk";

const SUBSCRIPTION_COLUMNS: &str =
    "id, mailing_list_id, account_id, email, subscribed_at, unsubscribed_at";

/// PostgreSQL-backed database. Each unit of work is one transaction.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(name = "Run database migrations", skip(self))]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let transaction = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            e
        })?;
        Ok(Box::new(PgUnitOfWork { transaction }))
    }
}

pub struct PgUnitOfWork {
    transaction: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.transaction.commit().await.map_err(|e| {
            tracing::error!("Failed to commit transaction: {:?}", e);
            e
        })?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    mailing_list_id: Uuid,
    account_id: Option<Uuid>,
    email: String,
    subscribed_at: DateTime<Utc>,
    unsubscribed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = StoreError;
    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription::restore(
            row.id.into(),
            row.mailing_list_id.into(),
            row.account_id.map(AccountId::from),
            Email::try_from(row.email).map_err(StoreError::InvalidRecord)?,
            row.subscribed_at,
            row.unsubscribed_at,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    on_mailing_lists: bool,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;
    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id.into(),
            email: Email::try_from(row.email).map_err(StoreError::InvalidRecord)?,
            on_mailing_lists: row.on_mailing_lists,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MailingListRow {
    id: Uuid,
    name: String,
    email: String,
}

impl TryFrom<MailingListRow> for MailingList {
    type Error = StoreError;
    fn try_from(row: MailingListRow) -> Result<Self, Self::Error> {
        Ok(MailingList {
            id: row.id.into(),
            name: ListName::try_from(row.name).map_err(StoreError::InvalidRecord)?,
            email: Email::try_from(row.email).map_err(StoreError::InvalidRecord)?,
        })
    }
}

fn into_records<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Turns a unique violation into a conflict, anything else stays a database error.
fn conflict_or_database(e: sqlx::Error, conflict: impl FnOnce() -> String) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict(conflict());
        }
    }
    tracing::error!("Failed to execute query: {:?}", e);
    StoreError::Database(e)
}

/// Names the record a subscription insert pointed at but did not find.
fn missing_reference(
    e: &sqlx::Error,
    mailing_list_id: MailingListId,
    subscription: &Subscription,
) -> Option<StoreError> {
    let sqlx::Error::Database(db) = e else {
        return None;
    };
    if !db.is_foreign_key_violation() {
        return None;
    }
    match (db.constraint(), subscription.account_id()) {
        (Some(ACCOUNT_FK), Some(account_id)) => Some(StoreError::NotFound {
            entity: "account",
            id: account_id.to_string(),
        }),
        _ => Some(StoreError::NotFound {
            entity: "mailing list",
            id: mailing_list_id.to_string(),
        }),
    }
}

#[async_trait]
impl SubscriptionStore for PgUnitOfWork {
    #[tracing::instrument(name = "Fetch active subscriptions of an account", skip(self, account), fields(email = %account.email))]
    async fn find_active_subscriptions(
        &mut self,
        account: &Account,
    ) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM mailing_list_subscriptions \
             WHERE email = $1 AND unsubscribed_at IS NULL \
             ORDER BY subscribed_at"
        ))
        .bind(account.email.as_ref())
        .fetch_all(&mut *self.transaction)
        .await?;

        into_records(rows)
    }

    async fn find_active_subscription(
        &mut self,
        mailing_list_id: MailingListId,
        email: &Email,
    ) -> Result<Option<Subscription>, StoreError> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM mailing_list_subscriptions \
             WHERE mailing_list_id = $1 AND email = $2 AND unsubscribed_at IS NULL"
        ))
        .bind(mailing_list_id.as_uuid())
        .bind(email.as_ref())
        .fetch_optional(&mut *self.transaction)
        .await?
        .map(Subscription::try_from)
        .transpose()
    }

    #[tracing::instrument(name = "Insert a subscription", skip(self, account, email), fields(email = %email))]
    async fn create_subscription(
        &mut self,
        mailing_list_id: MailingListId,
        account: Option<&Account>,
        email: &Email,
        subscribed_at: DateTime<Utc>,
    ) -> Result<Subscription, StoreError> {
        let subscription = Subscription::new(
            mailing_list_id,
            account.map(|a| a.id),
            email.clone(),
            subscribed_at,
        );

        sqlx::query(
            r#"INSERT INTO mailing_list_subscriptions (id, mailing_list_id, account_id, email, subscribed_at)
            VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(subscription.id().as_uuid())
        .bind(mailing_list_id.as_uuid())
        .bind(subscription.account_id().map(|id| id.as_uuid()))
        .bind(email.as_ref())
        .bind(subscribed_at)
        .execute(&mut *self.transaction)
        .await
        .map_err(|e| {
            if let Some(missing) = missing_reference(&e, mailing_list_id, &subscription) {
                return missing;
            }
            conflict_or_database(e, || {
                format!(
                    "{} is already subscribed to mailing list {}",
                    email, mailing_list_id
                )
            })
        })?;

        Ok(subscription)
    }

    #[tracing::instrument(name = "Mark a subscription as unsubscribed", skip(self))]
    async fn mark_unsubscribed(
        &mut self,
        id: SubscriptionId,
        unsubscribed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"UPDATE mailing_list_subscriptions
            SET unsubscribed_at = COALESCE(unsubscribed_at, $2)
            WHERE id = $1"#,
        )
        .bind(id.as_uuid())
        .bind(unsubscribed_at)
        .execute(&mut *self.transaction)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "subscription",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    #[tracing::instrument(name = "Update the account mailing list flag", skip(self, account), fields(account_id = %account.id))]
    async fn update_account_mailing_flag(
        &mut self,
        account: &mut Account,
        on_mailing_lists: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(r#"UPDATE accounts SET on_mailing_lists = $2 WHERE id = $1"#)
            .bind(account.id.as_uuid())
            .bind(on_mailing_lists)
            .execute(&mut *self.transaction)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "account",
                id: account.id.to_string(),
            });
        }
        account.on_mailing_lists = on_mailing_lists;
        Ok(())
    }

    async fn find_subscription(
        &mut self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM mailing_list_subscriptions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.transaction)
        .await?
        .map(Subscription::try_from)
        .transpose()
    }

    async fn find_list_subscriptions(
        &mut self,
        mailing_list_id: MailingListId,
        email: Option<&Email>,
    ) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM mailing_list_subscriptions \
             WHERE mailing_list_id = $1 AND ($2::TEXT IS NULL OR email = $2) \
             ORDER BY subscribed_at DESC"
        ))
        .bind(mailing_list_id.as_uuid())
        .bind(email.map(|e| e.as_ref().to_owned()))
        .fetch_all(&mut *self.transaction)
        .await?;

        into_records(rows)
    }

    async fn is_subscribed(&mut self, email: &Email) -> Result<bool, StoreError> {
        let subscribed = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (
                SELECT 1 FROM mailing_list_subscriptions
                WHERE email = $1 AND unsubscribed_at IS NULL
            )"#,
        )
        .bind(email.as_ref())
        .fetch_one(&mut *self.transaction)
        .await?;

        Ok(subscribed)
    }
}

#[async_trait]
impl AccountStore for PgUnitOfWork {
    #[tracing::instrument(name = "Insert an account", skip(self, email), fields(email = %email))]
    async fn insert_account(&mut self, email: Email) -> Result<Account, StoreError> {
        let account = Account::new(email);

        sqlx::query(r#"INSERT INTO accounts (id, email, on_mailing_lists) VALUES ($1, $2, $3)"#)
            .bind(account.id.as_uuid())
            .bind(account.email.as_ref())
            .bind(account.on_mailing_lists)
            .execute(&mut *self.transaction)
            .await
            .map_err(|e| {
                conflict_or_database(e, || {
                    format!("an account with email {} already exists", account.email)
                })
            })?;

        Ok(account)
    }

    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, AccountRow>(
            r#"SELECT id, email, on_mailing_lists FROM accounts WHERE id = $1"#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.transaction)
        .await?
        .map(Account::try_from)
        .transpose()
    }

    async fn find_account_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, AccountRow>(
            r#"SELECT id, email, on_mailing_lists FROM accounts WHERE email = $1"#,
        )
        .bind(email.as_ref())
        .fetch_optional(&mut *self.transaction)
        .await?
        .map(Account::try_from)
        .transpose()
    }

    #[tracing::instrument(name = "Update the account email", skip(self, account, email), fields(account_id = %account.id))]
    async fn update_account_email(
        &mut self,
        account: &mut Account,
        email: Email,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(r#"UPDATE accounts SET email = $2 WHERE id = $1"#)
            .bind(account.id.as_uuid())
            .bind(email.as_ref())
            .execute(&mut *self.transaction)
            .await
            .map_err(|e| {
                conflict_or_database(e, || {
                    format!("an account with email {} already exists", email)
                })
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "account",
                id: account.id.to_string(),
            });
        }
        account.email = email;
        Ok(())
    }
}

#[async_trait]
impl MailingListStore for PgUnitOfWork {
    #[tracing::instrument(name = "Insert a mailing list", skip(self, mailing_list), fields(name = %mailing_list.name, email = %mailing_list.email))]
    async fn insert_mailing_list(
        &mut self,
        mailing_list: NewMailingList,
    ) -> Result<MailingList, StoreError> {
        let mailing_list = MailingList {
            id: MailingListId::generate(),
            name: mailing_list.name,
            email: mailing_list.email,
        };

        sqlx::query(r#"INSERT INTO mailing_lists (id, name, email) VALUES ($1, $2, $3)"#)
            .bind(mailing_list.id.as_uuid())
            .bind(mailing_list.name.as_ref())
            .bind(mailing_list.email.as_ref())
            .execute(&mut *self.transaction)
            .await
            .map_err(|e| {
                conflict_or_database(e, || {
                    format!(
                        "a mailing list with email {} already exists",
                        mailing_list.email
                    )
                })
            })?;

        Ok(mailing_list)
    }

    async fn find_mailing_list(
        &mut self,
        id: MailingListId,
    ) -> Result<Option<MailingList>, StoreError> {
        sqlx::query_as::<_, MailingListRow>(
            r#"SELECT id, name, email FROM mailing_lists WHERE id = $1"#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.transaction)
        .await?
        .map(MailingList::try_from)
        .transpose()
    }

    async fn find_mailing_lists(&mut self) -> Result<Vec<MailingList>, StoreError> {
        let rows = sqlx::query_as::<_, MailingListRow>(
            r#"SELECT id, name, email FROM mailing_lists ORDER BY name ASC"#,
        )
        .fetch_all(&mut *self.transaction)
        .await?;

        into_records(rows)
    }

    async fn find_mailing_list_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<MailingList>, StoreError> {
        sqlx::query_as::<_, MailingListRow>(
            r#"SELECT id, name, email FROM mailing_lists WHERE email = $1"#,
        )
        .bind(email.as_ref())
        .fetch_optional(&mut *self.transaction)
        .await?
        .map(MailingList::try_from)
        .transpose()
    }
}
