use crate::application_port::AuthError;
use crate::domain_model::{Claims, Role};

/// Flat role check over verified claims. No implied hierarchy: an admin
/// passes only where `Admin` is listed.
pub struct AccessGate;

impl AccessGate {
    pub fn require_role(claims: &Claims, allowed: &[Role]) -> bool {
        allowed.contains(&claims.role)
    }

    pub fn authorize(claims: &Claims, allowed: &[Role]) -> Result<(), AuthError> {
        if Self::require_role(claims, allowed) {
            Ok(())
        } else {
            Err(AuthError::RoleForbidden)
        }
    }
}
