use secrecy::SecretString;
use std::sync::Arc;

/// Signing material handed to the token codec. `key_id` is reserved for
/// multi-key rotation and travels in the token header as `kid` when set.
#[derive(Debug)]
pub struct SigningSecret {
    pub key_id: Option<String>,
    pub secret: SecretString,
}

pub trait SecretProvider: Send + Sync {
    fn current(&self) -> Arc<SigningSecret>;
}

#[derive(Debug)]
pub struct StaticSecretProvider {
    current: Arc<SigningSecret>,
}

impl StaticSecretProvider {
    pub fn new(secret: impl Into<String>, key_id: Option<String>) -> Self {
        StaticSecretProvider {
            current: Arc::new(SigningSecret {
                key_id,
                secret: SecretString::from(secret.into()),
            }),
        }
    }
}

impl SecretProvider for StaticSecretProvider {
    fn current(&self) -> Arc<SigningSecret> {
        self.current.clone()
    }
}
