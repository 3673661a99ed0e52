use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::AppError,
    posts::repo::{Post, PostDraft},
    validation::{is_valid_slug, Violations},
};

/// Body of `POST /posts` and `PUT /posts/:id`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub description: String,
    pub is_published: Option<bool>,
}

impl PostRequest {
    pub fn into_draft(self) -> Result<PostDraft, AppError> {
        let title = self.title.trim().to_string();
        let slug = self.slug.trim().to_string();
        let description = self.description.trim().to_string();

        let mut v = Violations::new();
        v.check(!title.is_empty(), "title", "Title is required");
        if slug.is_empty() {
            v.check(false, "slug", "Slug is required");
        } else {
            v.check(is_valid_slug(&slug), "slug", "Invalid slug format");
        }
        v.check(!self.content.is_empty(), "content", "Content is required")
            .check(!description.is_empty(), "description", "Description is required");
        v.finish()?;

        Ok(PostDraft {
            title,
            slug,
            content: self.content,
            description,
            is_published: self.is_published,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Author {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub description: String,
    pub is_published: bool,
    pub author: Option<Author>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PostView {
    /// Full view for admins: author id and email.
    pub fn admin(post: Post) -> Self {
        let author = match (post.user_id, post.author_email.clone()) {
            (Some(id), Some(email)) => Some(Author { id: Some(id), email }),
            _ => None,
        };
        Self::build(post, author)
    }

    /// Public view: author email only.
    pub fn public(post: Post) -> Self {
        let author = post
            .author_email
            .clone()
            .map(|email| Author { id: None, email });
        Self::build(post, author)
    }

    fn build(post: Post, author: Option<Author>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            description: post.description,
            is_published: post.is_published,
            author,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}
