//! In-memory stores and request helpers shared by the unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::{
        jwt::JwtKeys,
        principal::Role,
        repo::{User, UserStore},
    },
    config::{AppConfig, Environment, JwtConfig},
    customers::repo::{Customer, CustomerDraft, CustomerStore},
    db::Persisted,
    posts::repo::{Post, PostDraft, PostStore},
    state::AppState,
};

pub fn test_config() -> AppConfig {
    AppConfig {
        environment: Environment::Test,
        database_url: String::new(),
        db_max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        jwt: JwtConfig {
            secret: "test-secret-test-secret-test-secret".into(),
            issuer: "woodwardian-test".into(),
            audience: "woodwardian-test-users".into(),
            ttl_minutes: 60,
        },
        password_cost: 4,
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    async fn email_of(&self, id: Option<Uuid>) -> Option<String> {
        let id = id?;
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.email.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> anyhow::Result<Persisted<User>> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == email) {
            return Ok(Persisted::Duplicate);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role: Role::for_new_account(users.len() as i64),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(Persisted::Saved(user))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role;
            u.clone()
        }))
    }
}

pub struct MemoryPostStore {
    users: Arc<MemoryUserStore>,
    posts: RwLock<Vec<Post>>,
}

impl MemoryPostStore {
    pub fn new(users: Arc<MemoryUserStore>) -> Self {
        Self {
            users,
            posts: RwLock::new(Vec::new()),
        }
    }

    async fn with_author(&self, mut post: Post) -> Post {
        post.author_email = self.users.email_of(post.user_id).await;
        post
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn list(&self, published_only: bool) -> anyhow::Result<Vec<Post>> {
        let mut rows: Vec<Post> = self
            .posts
            .read()
            .await
            .iter()
            .filter(|p| !published_only || p.is_published)
            .cloned()
            .collect();
        // Stable on equal timestamps: later inserts come first.
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut out = Vec::with_capacity(rows.len());
        for post in rows {
            out.push(self.with_author(post).await);
        }
        Ok(out)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        let found = self.posts.read().await.iter().find(|p| p.id == id).cloned();
        Ok(match found {
            Some(post) => Some(self.with_author(post).await),
            None => None,
        })
    }

    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<Post>> {
        let found = self.posts.read().await.iter().find(|p| p.slug == slug).cloned();
        Ok(match found {
            Some(post) => Some(self.with_author(post).await),
            None => None,
        })
    }

    async fn create(&self, author: Uuid, draft: &PostDraft) -> anyhow::Result<Persisted<Post>> {
        let post = {
            let mut posts = self.posts.write().await;
            if posts.iter().any(|p| p.slug == draft.slug) {
                return Ok(Persisted::Duplicate);
            }
            let now = OffsetDateTime::now_utc();
            let post = Post {
                id: Uuid::new_v4(),
                title: draft.title.clone(),
                slug: draft.slug.clone(),
                content: draft.content.clone(),
                description: draft.description.clone(),
                is_published: draft.is_published.unwrap_or(false),
                user_id: Some(author),
                author_email: None,
                created_at: now,
                updated_at: now,
            };
            posts.push(post.clone());
            post
        };
        Ok(Persisted::Saved(self.with_author(post).await))
    }

    async fn update(&self, id: Uuid, draft: &PostDraft) -> anyhow::Result<Option<Persisted<Post>>> {
        let post = {
            let mut posts = self.posts.write().await;
            if posts.iter().any(|p| p.slug == draft.slug && p.id != id) {
                return Ok(Some(Persisted::Duplicate));
            }
            let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
                return Ok(None);
            };
            post.title = draft.title.clone();
            post.slug = draft.slug.clone();
            post.content = draft.content.clone();
            post.description = draft.description.clone();
            if let Some(flag) = draft.is_published {
                post.is_published = flag;
            }
            post.updated_at = OffsetDateTime::now_utc();
            post.clone()
        };
        Ok(Some(Persisted::Saved(self.with_author(post).await)))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok(posts.len() != before)
    }
}

pub struct MemoryCustomerStore {
    users: Arc<MemoryUserStore>,
    customers: RwLock<Vec<Customer>>,
}

impl MemoryCustomerStore {
    pub fn new(users: Arc<MemoryUserStore>) -> Self {
        Self {
            users,
            customers: RwLock::new(Vec::new()),
        }
    }

    async fn with_user(&self, mut customer: Customer) -> Customer {
        customer.user_email = self.users.email_of(customer.user_id).await;
        customer
    }
}

#[async_trait]
impl CustomerStore for MemoryCustomerStore {
    async fn list(&self) -> anyhow::Result<Vec<Customer>> {
        let mut rows = self.customers.read().await.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        let mut out = Vec::with_capacity(rows.len());
        for customer in rows {
            out.push(self.with_user(customer).await);
        }
        Ok(out)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Customer>> {
        let found = self.customers.read().await.iter().find(|c| c.id == id).cloned();
        Ok(match found {
            Some(c) => Some(self.with_user(c).await),
            None => None,
        })
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Customer>> {
        let found = self
            .customers
            .read()
            .await
            .iter()
            .find(|c| c.email == email)
            .cloned();
        Ok(match found {
            Some(c) => Some(self.with_user(c).await),
            None => None,
        })
    }

    async fn create(&self, draft: &CustomerDraft) -> anyhow::Result<Persisted<Customer>> {
        let customer = {
            let mut customers = self.customers.write().await;
            if customers.iter().any(|c| c.email == draft.email) {
                return Ok(Persisted::Duplicate);
            }
            let now = OffsetDateTime::now_utc();
            let customer = Customer {
                id: Uuid::new_v4(),
                name: draft.name.clone(),
                email: draft.email.clone(),
                company: draft.company.clone(),
                status: draft.status.unwrap_or_default(),
                notes: draft.notes.clone(),
                user_id: draft.user_id,
                user_email: None,
                created_at: now,
                updated_at: now,
            };
            customers.push(customer.clone());
            customer
        };
        Ok(Persisted::Saved(self.with_user(customer).await))
    }

    async fn update(
        &self,
        id: Uuid,
        draft: &CustomerDraft,
    ) -> anyhow::Result<Option<Persisted<Customer>>> {
        let customer = {
            let mut customers = self.customers.write().await;
            if customers.iter().any(|c| c.email == draft.email && c.id != id) {
                return Ok(Some(Persisted::Duplicate));
            }
            let Some(c) = customers.iter_mut().find(|c| c.id == id) else {
                return Ok(None);
            };
            c.name = draft.name.clone();
            c.email = draft.email.clone();
            c.company = draft.company.clone();
            if let Some(status) = draft.status {
                c.status = status;
            }
            c.notes = draft.notes.clone();
            c.user_id = draft.user_id;
            c.updated_at = OffsetDateTime::now_utc();
            c.clone()
        };
        Ok(Some(Persisted::Saved(self.with_user(customer).await)))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut customers = self.customers.write().await;
        let before = customers.len();
        customers.retain(|c| c.id != id);
        Ok(customers.len() != before)
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: Arc<MemoryUserStore>,
    pub keys: JwtKeys,
}

pub fn test_app() -> TestApp {
    test_app_with(test_config())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
    let users = Arc::new(MemoryUserStore::default());
    test_app_over(config, users.clone(), users)
}

/// App whose user store is `store`, a wrapper around `users`. Posts and
/// customers resolve emails through `users` directly.
pub fn test_app_over(
    config: AppConfig,
    users: Arc<MemoryUserStore>,
    store: Arc<dyn UserStore>,
) -> TestApp {
    let state = AppState::from_parts(
        Arc::new(config),
        store,
        Arc::new(MemoryPostStore::new(users.clone())),
        Arc::new(MemoryCustomerStore::new(users.clone())),
    );
    TestApp {
        router: build_app(state.clone()),
        keys: state.keys.clone(),
        state,
        users,
    }
}

async fn call(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

/// Send a JSON request, optionally authenticated, and decode the response.
pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();
    call(app, req).await
}

/// Send a raw body labelled as JSON.
pub async fn send_raw(app: &TestApp, method: Method, uri: &str, raw: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(raw.to_string()))
        .unwrap();
    call(app, req).await
}

/// Create a user with password `password1`. The first seeded user is admin.
pub async fn seed_user(app: &TestApp, email: &str) -> User {
    let hash = app.state.hasher.hash("password1").await.unwrap();
    match app.users.create(email, &hash).await.unwrap() {
        Persisted::Saved(user) => user,
        Persisted::Duplicate => panic!("{email} already seeded"),
    }
}

/// A valid token for a stored user, reflecting their current role.
pub async fn bearer(app: &TestApp, email: &str) -> String {
    let user = app.users.find_by_email(email).await.unwrap().unwrap();
    app.keys.issue(&user.principal()).unwrap()
}
