//! In-memory token revocation list.
//!
//! Logged-out tokens stay revoked until their natural expiry, after which a
//! background sweep drops them. Tokens are stored as SHA-256 digests so the
//! list never holds raw credentials.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Default)]
pub struct RevocationList {
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke a token until `expires_at`. Revoking the same token again
    /// keeps the later expiry.
    pub async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) {
        let mut revoked = self.revoked.write().await;
        let entry = revoked.entry(hash_token(token)).or_insert(expires_at);
        if expires_at > *entry {
            *entry = expires_at;
        }
        debug!(revoked = revoked.len(), "token revoked");
    }

    /// A token is revoked while its entry has not yet expired. An expired
    /// entry no longer matters: the token itself is dead by then.
    pub async fn is_revoked(&self, token: &str) -> bool {
        let revoked = self.revoked.read().await;
        match revoked.get(&hash_token(token)) {
            Some(expires_at) => *expires_at > Utc::now(),
            None => false,
        }
    }

    /// Drop entries whose expiry has passed. Returns how many were removed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, expires_at| *expires_at > now);
        before - revoked.len()
    }

    /// Background sweep driver; runs until the token is cancelled.
    pub async fn run_sweep_loop(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("revocation sweep stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let removed = self.sweep_expired(Utc::now()).await;
                    if removed > 0 {
                        debug!(removed, "swept expired revocations");
                    }
                }
            }
        }
    }
}
