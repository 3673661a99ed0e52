use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{on_unique_violation, Persisted};

/// Post row joined with its author's email.
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub description: String,
    pub is_published: bool,
    pub user_id: Option<Uuid>,
    pub author_email: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated post fields. `is_published: None` keeps the stored flag on update
/// and means unpublished on create.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub description: String,
    pub is_published: Option<bool>,
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Newest first.
    async fn list(&self, published_only: bool) -> anyhow::Result<Vec<Post>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>>;
    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<Post>>;
    async fn create(&self, author: Uuid, draft: &PostDraft) -> anyhow::Result<Persisted<Post>>;
    async fn update(&self, id: Uuid, draft: &PostDraft) -> anyhow::Result<Option<Persisted<Post>>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgPostStore {
    db: PgPool,
}

impl PgPostStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const SELECT_POST: &str = r#"
    SELECT p.id, p.title, p.slug, p.content, p.description, p.is_published,
           p.user_id, u.email AS author_email, p.created_at, p.updated_at
    FROM posts p
    LEFT JOIN users u ON u.id = p.user_id
"#;

#[async_trait]
impl PostStore for PgPostStore {
    async fn list(&self, published_only: bool) -> anyhow::Result<Vec<Post>> {
        let sql = format!(
            "{SELECT_POST} WHERE ($1 = FALSE OR p.is_published) ORDER BY p.created_at DESC"
        );
        let rows = sqlx::query_as::<_, Post>(&sql)
            .bind(published_only)
            .fetch_all(&self.db)
            .await
            .context("list posts")?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        let sql = format!("{SELECT_POST} WHERE p.id = $1");
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find post by id")?;
        Ok(post)
    }

    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<Post>> {
        let sql = format!("{SELECT_POST} WHERE p.slug = $1");
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(slug)
            .fetch_optional(&self.db)
            .await
            .context("find post by slug")?;
        Ok(post)
    }

    async fn create(&self, author: Uuid, draft: &PostDraft) -> anyhow::Result<Persisted<Post>> {
        let result = sqlx::query_as::<_, Post>(
            r#"
            WITH p AS (
                INSERT INTO posts (id, title, slug, content, description, is_published, user_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT p.id, p.title, p.slug, p.content, p.description, p.is_published,
                   p.user_id, u.email AS author_email, p.created_at, p.updated_at
            FROM p
            LEFT JOIN users u ON u.id = p.user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&draft.title)
        .bind(&draft.slug)
        .bind(&draft.content)
        .bind(&draft.description)
        .bind(draft.is_published.unwrap_or(false))
        .bind(author)
        .fetch_one(&self.db)
        .await;
        on_unique_violation(result, "insert post")
    }

    async fn update(&self, id: Uuid, draft: &PostDraft) -> anyhow::Result<Option<Persisted<Post>>> {
        let result = sqlx::query_as::<_, Post>(
            r#"
            WITH p AS (
                UPDATE posts
                SET title = $2, slug = $3, content = $4, description = $5,
                    is_published = COALESCE($6, is_published), updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT p.id, p.title, p.slug, p.content, p.description, p.is_published,
                   p.user_id, u.email AS author_email, p.created_at, p.updated_at
            FROM p
            LEFT JOIN users u ON u.id = p.user_id
            "#,
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.slug)
        .bind(&draft.content)
        .bind(&draft.description)
        .bind(draft.is_published)
        .fetch_optional(&self.db)
        .await;
        Ok(match on_unique_violation(result, "update post")? {
            Persisted::Saved(Some(post)) => Some(Persisted::Saved(post)),
            Persisted::Saved(None) => None,
            Persisted::Duplicate => Some(Persisted::Duplicate),
        })
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let done = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete post")?;
        Ok(done.rows_affected() > 0)
    }
}
