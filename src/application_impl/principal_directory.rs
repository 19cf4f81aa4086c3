use crate::application_port::AuthError;
use crate::domain_model::*;
use crate::domain_port::*;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use dashmap::DashMap;

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| AuthError::Internal(format!("invalid PHC hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Internal(format!("verify error: {}", e))),
    }
}

#[derive(Debug, Clone)]
struct Entry {
    principal: Principal,
    password_hash: String,
}

/// In-memory principal repository with Argon2 password checks, for
/// deployments that keep a handful of operator accounts in settings.
#[derive(Default)]
pub struct PrincipalDirectory {
    by_id: DashMap<SubjectId, Entry>,
    by_username: DashMap<String, SubjectId>,
}

impl PrincipalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// `password_hash` is a PHC string as produced by [`hash_password`].
    pub fn insert(&self, principal: Principal, password_hash: String) {
        self.by_username
            .insert(principal.username.clone(), principal.id);
        self.by_id.insert(
            principal.id,
            Entry {
                principal,
                password_hash,
            },
        );
    }

    pub fn set_active(&self, id: SubjectId, active: bool) -> bool {
        match self.by_id.get_mut(&id) {
            Some(mut entry) => {
                entry.principal.active = active;
                true
            }
            None => false,
        }
    }

    pub fn set_role(&self, id: SubjectId, role: Role) -> bool {
        match self.by_id.get_mut(&id) {
            Some(mut entry) => {
                entry.principal.role = role;
                true
            }
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl PrincipalRepo for PrincipalDirectory {
    async fn get_by_id(&self, id: SubjectId) -> Result<Option<Principal>, AuthError> {
        Ok(self.by_id.get(&id).map(|entry| entry.principal.clone()))
    }
}

#[async_trait::async_trait]
impl CredentialVerifier for PrincipalDirectory {
    async fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Principal>, AuthError> {
        let Some(entry) = self
            .by_username
            .get(username)
            .and_then(|id| self.by_id.get(id.value()).map(|e| e.value().clone()))
        else {
            return Ok(None);
        };

        let password = password.to_string();
        let password_hash = entry.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))??;
        if !ok {
            return Ok(None);
        }
        if !entry.principal.active {
            return Err(AuthError::PrincipalInactive);
        }
        Ok(Some(entry.principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> PrincipalDirectory {
        let directory = PrincipalDirectory::new();
        directory.insert(
            Principal {
                id: SubjectId(1),
                username: "erin".to_string(),
                role: Role::Admin,
                active: true,
            },
            hash_password("correct horse").unwrap(),
        );
        directory
    }

    #[tokio::test]
    async fn verifies_passwords() {
        let directory = directory();
        let found = directory.verify("erin", "correct horse").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(SubjectId(1)));
        assert_eq!(directory.verify("erin", "battery").await.unwrap(), None);
        assert_eq!(directory.verify("nobody", "correct horse").await.unwrap(), None);
    }

    #[tokio::test]
    async fn inactive_principals_cannot_log_in() {
        let directory = directory();
        assert!(directory.set_active(SubjectId(1), false));
        assert_eq!(
            directory.verify("erin", "correct horse").await,
            Err(AuthError::PrincipalInactive)
        );
        let principal = directory.get_by_id(SubjectId(1)).await.unwrap().unwrap();
        assert!(!principal.active);
    }
}
