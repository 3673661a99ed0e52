use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{on_unique_violation, Persisted};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "customer_status", rename_all = "lowercase")]
pub enum CustomerStatus {
    #[default]
    Lead,
    Active,
    Archived,
}

impl FromStr for CustomerStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lead" => Ok(CustomerStatus::Lead),
            "active" => Ok(CustomerStatus::Active),
            "archived" => Ok(CustomerStatus::Archived),
            _ => Err(()),
        }
    }
}

/// Customer row joined with the linked user's email.
#[derive(Debug, Clone, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub status: CustomerStatus,
    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated customer fields. `status: None` keeps the stored status on
/// update and means `lead` on create.
#[derive(Debug, Clone)]
pub struct CustomerDraft {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub status: Option<CustomerStatus>,
    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Ordered by name.
    async fn list(&self) -> anyhow::Result<Vec<Customer>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Customer>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Customer>>;
    async fn create(&self, draft: &CustomerDraft) -> anyhow::Result<Persisted<Customer>>;
    async fn update(
        &self,
        id: Uuid,
        draft: &CustomerDraft,
    ) -> anyhow::Result<Option<Persisted<Customer>>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgCustomerStore {
    db: PgPool,
}

impl PgCustomerStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const SELECT_CUSTOMER: &str = r#"
    SELECT c.id, c.name, c.email, c.company, c.status, c.notes,
           c.user_id, u.email AS user_email, c.created_at, c.updated_at
    FROM customers c
    LEFT JOIN users u ON u.id = c.user_id
"#;

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn list(&self) -> anyhow::Result<Vec<Customer>> {
        let sql = format!("{SELECT_CUSTOMER} ORDER BY c.name ASC");
        let rows = sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list customers")?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Customer>> {
        let sql = format!("{SELECT_CUSTOMER} WHERE c.id = $1");
        let row = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find customer by id")?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Customer>> {
        let sql = format!("{SELECT_CUSTOMER} WHERE c.email = $1");
        let row = sqlx::query_as::<_, Customer>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find customer by email")?;
        Ok(row)
    }

    async fn create(&self, draft: &CustomerDraft) -> anyhow::Result<Persisted<Customer>> {
        let result = sqlx::query_as::<_, Customer>(
            r#"
            WITH c AS (
                INSERT INTO customers (id, name, email, company, status, notes, user_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT c.id, c.name, c.email, c.company, c.status, c.notes,
                   c.user_id, u.email AS user_email, c.created_at, c.updated_at
            FROM c
            LEFT JOIN users u ON u.id = c.user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.company)
        .bind(draft.status.unwrap_or_default())
        .bind(&draft.notes)
        .bind(draft.user_id)
        .fetch_one(&self.db)
        .await;
        on_unique_violation(result, "insert customer")
    }

    async fn update(
        &self,
        id: Uuid,
        draft: &CustomerDraft,
    ) -> anyhow::Result<Option<Persisted<Customer>>> {
        let result = sqlx::query_as::<_, Customer>(
            r#"
            WITH c AS (
                UPDATE customers
                SET name = $2, email = $3, company = $4,
                    status = COALESCE($5, status), notes = $6, user_id = $7,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT c.id, c.name, c.email, c.company, c.status, c.notes,
                   c.user_id, u.email AS user_email, c.created_at, c.updated_at
            FROM c
            LEFT JOIN users u ON u.id = c.user_id
            "#,
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.company)
        .bind(draft.status)
        .bind(&draft.notes)
        .bind(draft.user_id)
        .fetch_optional(&self.db)
        .await;
        Ok(match on_unique_violation(result, "update customer")? {
            Persisted::Saved(Some(c)) => Some(Persisted::Saved(c)),
            Persisted::Saved(None) => None,
            Persisted::Duplicate => Some(Persisted::Duplicate),
        })
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let done = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete customer")?;
        Ok(done.rows_affected() > 0)
    }
}
