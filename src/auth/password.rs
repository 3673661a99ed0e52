use anyhow::Context;
use tracing::error;

/// bcrypt work factor for stored passwords.
pub const DEFAULT_COST: u32 = 12;

/// Salted bcrypt hashing. Work runs on the blocking pool so a slow hash
/// never holds up other requests.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let plain = plain.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
            .await
            .context("password hashing task")?
            .map_err(|e| {
                error!(error = %e, "bcrypt hash error");
                anyhow::anyhow!(e).context("hash password")
            })
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    pub async fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let plain = plain.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
            .await
            .context("password verification task")?
            .map_err(|e| {
                error!(error = %e, "bcrypt verify error");
                anyhow::anyhow!(e).context("verify password")
            })
    }
}
