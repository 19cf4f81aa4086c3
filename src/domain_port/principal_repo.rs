use crate::application_port::AuthError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait PrincipalRepo: Send + Sync {
    async fn get_by_id(&self, id: SubjectId) -> Result<Option<Principal>, AuthError>;
}

/// Checks a username/password pair and yields the principal it belongs to.
/// `Ok(None)` means the credentials did not match.
#[async_trait::async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str)
    -> Result<Option<Principal>, AuthError>;
}
