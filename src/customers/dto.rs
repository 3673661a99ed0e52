use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    customers::repo::{Customer, CustomerDraft, CustomerStatus},
    error::AppError,
    validation::{is_valid_email, normalize_email, trimmed_opt, Violations},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub company: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
}

impl CustomerRequest {
    pub fn into_draft(self) -> Result<CustomerDraft, AppError> {
        let name = self.name.trim().to_string();
        let email = normalize_email(&self.email);
        let status = self.status.as_deref().map(str::parse::<CustomerStatus>);

        Violations::new()
            .check(!name.is_empty(), "name", "Name is required")
            .check(is_valid_email(&email), "email", "A valid email is required")
            .check(!matches!(status, Some(Err(_))), "status", "Invalid status")
            .finish()?;

        Ok(CustomerDraft {
            name,
            email,
            company: trimmed_opt(self.company),
            status: status.and_then(Result::ok),
            notes: trimmed_opt(self.notes),
            user_id: self.user_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LinkedUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub status: CustomerStatus,
    pub notes: Option<String>,
    pub user: Option<LinkedUser>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Customer> for CustomerView {
    fn from(c: Customer) -> Self {
        let user = match (c.user_id, c.user_email) {
            (Some(id), Some(email)) => Some(LinkedUser { id, email }),
            _ => None,
        };
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            company: c.company,
            status: c.status,
            notes: c.notes,
            user,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
