use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use iam_models::TenantSettings;

use crate::error::{AuthError, Result};

/// A fixed, never-matching hash used to drive a dummy verification when no
/// real credential exists, so "no such user" and "wrong password" take the
/// same amount of wall-clock time.
const DUMMY_HASH: &str = "$argon2id$v=19$m=65536,t=3,p=1$c29tZXNhbHRzb21lc2FsdA$Y5q7f3W4m8bQW1cQKj5t2hX0FZmQOZzQh5m1O6bY0v0";

#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            memory_kib: std::env::var("IAM_ARGON2_MEMORY_KIB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.memory_kib),
            iterations: std::env::var("IAM_ARGON2_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.iterations),
            parallelism: std::env::var("IAM_ARGON2_PARALLELISM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.parallelism),
        }
    }

    fn argon2(self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| AuthError::Internal(format!("invalid kdf params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

pub struct PasswordHasher {
    params: KdfParams,
}

impl PasswordHasher {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn from_env() -> Self {
        Self::new(KdfParams::from_env())
    }

    /// Hashes `password` on a blocking thread pool; Argon2id is CPU-heavy
    /// enough to starve the async runtime if run inline.
    pub async fn hash(&self, password: &str) -> Result<String> {
        let params = self.params;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            let argon2 = params.argon2()?;
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(AuthError::from)
        })
        .await
        .map_err(|e| AuthError::Internal(format!("hashing task panicked: {e}")))?
    }

    /// Verifies `password` against `hash`, returning whether it verified and
    /// whether the stored hash's parameters no longer match this hasher's
    /// configured cost (and should be rehashed on next successful login).
    pub async fn verify(&self, password: &str, hash: &str) -> Result<(bool, bool)> {
        let params = self.params;
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash).map_err(AuthError::from)?;
            let argon2 = params.argon2()?;
            let ok = match argon2.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => true,
                Err(argon2::password_hash::Error::Password) => false,
                Err(e) => return Err(AuthError::from(e)),
            };
            Ok((ok, ok && needs_rehash(&hash, params)))
        })
        .await
        .map_err(|e| AuthError::Internal(format!("verify task panicked: {e}")))?
    }

    /// Runs a verification against a fixed dummy hash so the absence of a
    /// stored credential does not shortcut the timing profile of a real
    /// password comparison.
    pub async fn dummy_verify(&self, password: &str) -> Result<()> {
        let _ = self.verify(password, DUMMY_HASH).await;
        Ok(())
    }

    pub fn validate_policy(&self, password: &str, settings: &TenantSettings) -> Result<()> {
        if password.len() < settings.password_min_length {
            return Err(AuthError::InvalidRequest);
        }
        if settings.password_require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            return Err(AuthError::InvalidRequest);
        }
        if settings.password_require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            return Err(AuthError::InvalidRequest);
        }
        if settings.password_require_number && !password.chars().any(|c| c.is_numeric()) {
            return Err(AuthError::InvalidRequest);
        }
        if settings.password_require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            return Err(AuthError::InvalidRequest);
        }
        Ok(())
    }
}

fn needs_rehash(hash: &str, params: KdfParams) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return true;
    };
    if parsed.algorithm != argon2::Algorithm::Argon2id.ident() {
        return true;
    }
    let expected = format!("m={},t={},p={}", params.memory_kib, params.iterations, params.parallelism);
    !parsed.to_string().contains(&expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify_roundtrip() {
        let hasher = PasswordHasher::new(KdfParams::default());
        let hash = hasher.hash("correct horse battery staple").await.unwrap();
        let (ok, rehash) = hasher.verify("correct horse battery staple", &hash).await.unwrap();
        assert!(ok);
        assert!(!rehash);
    }

    #[tokio::test]
    async fn wrong_password_does_not_verify() {
        let hasher = PasswordHasher::new(KdfParams::default());
        let hash = hasher.hash("correct horse battery staple").await.unwrap();
        let (ok, _) = hasher.verify("wrong password", &hash).await.unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn detects_stale_params_as_needing_rehash() {
        let old = PasswordHasher::new(KdfParams {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        });
        let hash = old.hash("a reasonably strong password").await.unwrap();

        let current = PasswordHasher::new(KdfParams::default());
        let (ok, rehash) = current.verify("a reasonably strong password", &hash).await.unwrap();
        assert!(ok);
        assert!(rehash);
    }

    #[tokio::test]
    async fn dummy_verify_never_errors() {
        let hasher = PasswordHasher::new(KdfParams::default());
        hasher.dummy_verify("anything").await.unwrap();
    }

    #[test]
    fn policy_rejects_weak_passwords() {
        let hasher = PasswordHasher::new(KdfParams::default());
        let mut settings = TenantSettings::default();
        settings.password_require_uppercase = true;
        settings.password_require_number = true;
        assert!(hasher.validate_policy("alllowercase", &settings).is_err());
        assert!(hasher.validate_policy("Valid1Password", &settings).is_ok());
    }
}
