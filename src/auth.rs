//! Shared-secret guard for mutating routes.

use crate::error::GatewayError;

/// Header carrying the client's key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Optional shared-secret check.
///
/// With no secret configured every request passes. Otherwise the supplied key
/// must equal the secret exactly.
#[derive(Clone, Default)]
pub struct ApiKeyGuard {
    secret: Option<String>,
}

impl ApiKeyGuard {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    pub fn check(&self, supplied: Option<&str>) -> Result<(), GatewayError> {
        match &self.secret {
            None => Ok(()),
            Some(secret) if supplied == Some(secret.as_str()) => Ok(()),
            Some(_) => Err(GatewayError::Unauthorized),
        }
    }
}

impl std::fmt::Debug for ApiKeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGuard")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_guard_passes_everything() {
        let guard = ApiKeyGuard::new(None);
        assert!(guard.check(None).is_ok());
        assert!(guard.check(Some("anything")).is_ok());
    }

    #[test]
    fn empty_secret_counts_as_disabled() {
        let guard = ApiKeyGuard::new(Some(String::new()));
        assert!(!guard.is_enabled());
        assert!(guard.check(None).is_ok());
    }

    #[test]
    fn exact_match_required() {
        let guard = ApiKeyGuard::new(Some("k3y".into()));
        assert!(guard.check(Some("k3y")).is_ok());
        assert!(matches!(guard.check(None), Err(GatewayError::Unauthorized)));
        assert!(matches!(guard.check(Some("K3Y")), Err(GatewayError::Unauthorized)));
        assert!(matches!(guard.check(Some("k3y ")), Err(GatewayError::Unauthorized)));
        assert!(matches!(guard.check(Some("")), Err(GatewayError::Unauthorized)));
    }
}
