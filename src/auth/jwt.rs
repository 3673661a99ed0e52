use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::principal::{Principal, Role}, config::JwtConfig, state::AppState};

/// Signed payload of a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Why a presented token was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("token expired")]
    Expired,
    #[error("token signature invalid")]
    BadSignature,
    #[error("token malformed: {0}")]
    Malformed(String),
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(1) as u64) * 60),
        }
    }

    pub fn issue(&self, principal: &Principal) -> anyhow::Result<String> {
        self.issue_at(principal, OffsetDateTime::now_utc())
    }

    /// Sign a token as if issued at `now`.
    pub fn issue_at(&self, principal: &Principal, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: principal.id,
            email: principal.email.clone(),
            role: principal.role,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %principal.id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenRejection> {
        use jsonwebtoken::errors::ErrorKind;

        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, "jwt verified");
                Ok(data.claims)
            }
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                ErrorKind::InvalidSignature => TokenRejection::BadSignature,
                _ => TokenRejection::Malformed(e.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60,
        }
    }

    fn principal() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn issue_and_verify() {
        let keys = JwtKeys::from_config(&config("dev-secret"));
        let who = principal();
        let token = keys.issue(&who).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, who.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn accepted_shortly_before_expiry() {
        let keys = JwtKeys::from_config(&config("dev-secret"));
        let issued = OffsetDateTime::now_utc() - TimeDuration::minutes(59);
        let token = keys.issue_at(&principal(), issued).unwrap();
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn rejected_after_expiry() {
        let keys = JwtKeys::from_config(&config("dev-secret"));
        let issued = OffsetDateTime::now_utc() - TimeDuration::minutes(61);
        let token = keys.issue_at(&principal(), issued).unwrap();
        assert_eq!(keys.verify(&token).unwrap_err(), TokenRejection::Expired);
    }

    #[test]
    fn rejects_other_secret() {
        let ours = JwtKeys::from_config(&config("secret-one"));
        let theirs = JwtKeys::from_config(&config("secret-two"));
        let token = theirs.issue(&principal()).unwrap();
        assert_eq!(ours.verify(&token).unwrap_err(), TokenRejection::BadSignature);
    }

    #[test]
    fn rejects_tampered_payload() {
        let keys = JwtKeys::from_config(&config("dev-secret"));
        let token = keys.issue(&principal()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = keys
            .issue(&Principal { role: Role::User, ..principal() })
            .unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;
        let tampered = parts.join(".");
        assert!(keys.verify(&tampered).is_err());
    }

    #[test]
    fn rejects_garbage() {
        let keys = JwtKeys::from_config(&config("dev-secret"));
        assert!(matches!(
            keys.verify("not.a.token"),
            Err(TokenRejection::Malformed(_))
        ));
        assert!(keys.verify("").is_err());
    }

    #[test]
    fn rejects_wrong_audience() {
        let good = JwtKeys::from_config(&config("same-secret"));
        let mut other = config("same-secret");
        other.audience = "someone-else".into();
        let bad = JwtKeys::from_config(&other);
        let token = good.issue(&principal()).unwrap();
        assert!(bad.verify(&token).is_err());
    }
}
