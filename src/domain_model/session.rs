use crate::domain_model::{SubjectId, TokenHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A live refresh token. The record's presence in the store is what makes
/// the token redeemable; a valid signature alone is not enough.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RefreshRecord {
    pub subject_id: SubjectId,
    pub token_hash: TokenHash,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

/// Blacklist entry for an access token logged out before its expiry.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RevocationEntry {
    pub token_hash: TokenHash,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}
