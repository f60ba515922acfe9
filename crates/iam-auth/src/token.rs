use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use sha2::Sha256;
use uuid::Uuid;

use iam_models::RefreshTokenRecord;
use iam_storage::{DenyListStore, RefreshTokenStore};

use crate::claims::Claims;
use crate::error::{AuthError, Result};

/// A single signing key, identified by the `kid` carried in the JWT header.
/// Retired keys are kept around only long enough to verify tokens minted
/// before the last rotation; they are never used to sign new tokens.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: String,
    pub algorithm: Algorithm,
    pub encoding_key: Arc<EncodingKey>,
    pub decoding_key: Arc<DecodingKey>,
}

/// The active signing key plus any retired keys still valid for
/// verification during a rotation window.
#[derive(Clone)]
pub struct KeySet {
    active: SigningKey,
    retired: Vec<SigningKey>,
}

impl KeySet {
    pub fn new(active: SigningKey) -> Self {
        Self {
            active,
            retired: Vec::new(),
        }
    }

    pub fn rotate(&mut self, new_active: SigningKey) {
        let old_active = std::mem::replace(&mut self.active, new_active);
        self.retired.push(old_active);
    }

    fn find(&self, kid: &str) -> Option<&SigningKey> {
        if self.active.kid == kid {
            return Some(&self.active);
        }
        self.retired.iter().find(|k| k.kid == kid)
    }

    /// Builds an HS256 key set from a single shared secret, for
    /// environments without a configured RSA/Ed25519 key pair. Production
    /// deployments are expected to supply RS256 or EdDSA keys instead.
    pub fn from_hmac_secret(kid: impl Into<String>, secret: &[u8]) -> Self {
        Self::new(SigningKey {
            kid: kid.into(),
            algorithm: Algorithm::HS256,
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
        })
    }

    pub fn from_rsa_pem(kid: impl Into<String>, private_pem: &[u8], public_pem: &[u8]) -> Result<Self> {
        Ok(Self::new(SigningKey {
            kid: kid.into(),
            algorithm: Algorithm::RS256,
            encoding_key: Arc::new(
                EncodingKey::from_rsa_pem(private_pem).map_err(|e| AuthError::Internal(format!("invalid rsa key: {e}")))?,
            ),
            decoding_key: Arc::new(
                DecodingKey::from_rsa_pem(public_pem).map_err(|e| AuthError::Internal(format!("invalid rsa key: {e}")))?,
            ),
        }))
    }

    pub fn from_ed25519_pem(kid: impl Into<String>, private_pem: &[u8], public_pem: &[u8]) -> Result<Self> {
        Ok(Self::new(SigningKey {
            kid: kid.into(),
            algorithm: Algorithm::EdDSA,
            encoding_key: Arc::new(
                EncodingKey::from_ed_pem(private_pem).map_err(|e| AuthError::Internal(format!("invalid ed25519 key: {e}")))?,
            ),
            decoding_key: Arc::new(
                DecodingKey::from_ed_pem(public_pem).map_err(|e| AuthError::Internal(format!("invalid ed25519 key: {e}")))?,
            ),
        }))
    }
}

pub struct TokenServiceConfig {
    pub issuer: String,
    pub audience: String,
    pub refresh_pepper: Vec<u8>,
}

impl TokenServiceConfig {
    pub fn from_env() -> Self {
        Self {
            issuer: std::env::var("IAM_TOKEN_ISSUER").unwrap_or_else(|_| "iam-kernel".to_string()),
            audience: std::env::var("IAM_TOKEN_AUDIENCE").unwrap_or_else(|_| "iam-clients".to_string()),
            refresh_pepper: std::env::var("IAM_REFRESH_PEPPER")
                .map(|v| v.into_bytes())
                .unwrap_or_else(|_| b"development-only-pepper-do-not-use-in-prod".to_vec()),
        }
    }
}

pub struct IssuedRefreshToken {
    pub plaintext: String,
    pub record: RefreshTokenRecord,
}

/// Signs/verifies access and ID tokens, mints opaque refresh tokens, and
/// owns the deny-list / revocation paths. `validate_access` is fail-closed:
/// any unexpected store error rejects the token rather than accepting it.
pub struct TokenService<D: DenyListStore, R: RefreshTokenStore> {
    keys: KeySet,
    config: TokenServiceConfig,
    deny_list: Arc<D>,
    refresh_store: Arc<R>,
}

impl<D: DenyListStore, R: RefreshTokenStore> TokenService<D, R> {
    pub fn new(keys: KeySet, config: TokenServiceConfig, deny_list: Arc<D>, refresh_store: Arc<R>) -> Self {
        Self {
            keys,
            config,
            deny_list,
            refresh_store,
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        let mut header = Header::new(self.keys.active.algorithm);
        header.kid = Some(self.keys.active.kid.clone());
        Ok(encode(&header, claims, &self.keys.active.encoding_key)?)
    }

    pub fn issue_access(&self, claims: &Claims) -> Result<String> {
        self.sign(claims)
    }

    pub fn issue_id(&self, claims: &Claims) -> Result<String> {
        self.sign(claims)
    }

    /// Validation order: signature -> exp/nbf/iat -> iss/aud -> deny-list.
    pub async fn validate_access(&self, jwt: &str) -> Result<Claims> {
        let header = jsonwebtoken::decode_header(jwt).map_err(|_| AuthError::InvalidToken)?;
        let kid = header.kid.ok_or(AuthError::InvalidToken)?;
        let key = self.keys.find(&kid).ok_or(AuthError::InvalidToken)?;

        let mut validation = Validation::new(key.algorithm);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(jwt, &key.decoding_key, &validation)?;
        let claims = token_data.claims;

        let denied = self
            .deny_list
            .contains(&claims.jti.to_string())
            .await
            .map_err(|_| AuthError::InvalidToken)?;
        if denied {
            return Err(AuthError::TokenRevoked);
        }

        Ok(claims)
    }

    pub async fn revoke_access(&self, claims: &Claims) -> Result<()> {
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        self.deny_list.insert(&claims.jti.to_string(), expires_at).await?;
        Ok(())
    }

    pub fn hash_refresh(&self, plaintext: &str) -> Result<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.config.refresh_pepper)
            .map_err(|e| AuthError::Internal(format!("invalid pepper: {e}")))?;
        mac.update(plaintext.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Generates a >=256-bit opaque refresh token and persists its hash. The
    /// plaintext is returned to the caller exactly once and never stored.
    pub async fn issue_refresh(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        ttl: chrono::Duration,
        mfa_verified: bool,
        client_id: Option<String>,
        parent_hash: Option<String>,
    ) -> Result<IssuedRefreshToken> {
        let mut entropy = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut entropy);
        let plaintext = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(entropy);
        let hash = self.hash_refresh(&plaintext)?;

        let now = Utc::now();
        let record = RefreshTokenRecord {
            hash: hash.clone(),
            user_id,
            tenant_id,
            client_id,
            mfa_verified,
            parent_hash,
            created_at: now,
            expires_at: now + ttl,
            revoked_at: None,
        };
        self.refresh_store.insert(record.clone()).await?;

        Ok(IssuedRefreshToken { plaintext, record })
    }

    pub async fn revoke_refresh(&self, hash: &str) -> Result<()> {
        self.refresh_store.revoke(hash).await?;
        if let Some(child) = self.refresh_store.find_child_of(hash).await? {
            self.refresh_store.revoke(&child.hash).await?;
        }
        Ok(())
    }
}

/// Advisory capability/feature snapshot attached to claims; never
/// authoritative, kept separate so callers can't accidentally treat it as
/// an enforcement source.
pub type CapabilitySnapshot = HashMap<String, bool>;

#[cfg(test)]
mod tests {
    use super::*;
    use iam_storage::memory::{InMemoryDenyListStore, InMemoryRefreshTokenStore};

    fn test_service() -> TokenService<InMemoryDenyListStore, InMemoryRefreshTokenStore> {
        let keys = KeySet::from_hmac_secret("test-key-1", b"test-secret-at-least-32-bytes-long!!");
        let config = TokenServiceConfig {
            issuer: "iam-kernel".to_string(),
            audience: "iam-clients".to_string(),
            refresh_pepper: b"test-pepper".to_vec(),
        };
        TokenService::new(
            keys,
            config,
            Arc::new(InMemoryDenyListStore::new()),
            Arc::new(InMemoryRefreshTokenStore::new()),
        )
    }

    fn sample_claims(service: &TokenService<InMemoryDenyListStore, InMemoryRefreshTokenStore>) -> Claims {
        let now = Utc::now();
        Claims {
            sub: Uuid::new_v4(),
            iss: service.config.issuer.clone(),
            aud: service.config.audience.clone(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::minutes(15)).timestamp(),
            jti: Uuid::new_v4(),
            tenant_id: Some(Uuid::new_v4()),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            principal_type: iam_models::PrincipalType::Tenant,
            roles: vec![],
            permissions: vec![],
            system_roles: vec![],
            system_permissions: vec![],
            mfa_verified: true,
            capabilities: HashMap::new(),
            features: HashMap::new(),
            act: None,
        }
    }

    #[tokio::test]
    async fn issues_and_validates_access_token() {
        let service = test_service();
        let claims = sample_claims(&service);
        let jwt = service.issue_access(&claims).unwrap();
        let validated = service.validate_access(&jwt).await.unwrap();
        assert_eq!(validated.sub, claims.sub);
    }

    #[tokio::test]
    async fn revoked_access_token_fails_validation() {
        let service = test_service();
        let claims = sample_claims(&service);
        let jwt = service.issue_access(&claims).unwrap();
        service.revoke_access(&claims).await.unwrap();
        let result = service.validate_access(&jwt).await;
        assert!(matches!(result, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn refresh_token_is_opaque_and_long_enough() {
        let service = test_service();
        let issued = service
            .issue_refresh(Uuid::new_v4(), None, chrono::Duration::days(30), false, None, None)
            .await
            .unwrap();
        assert!(issued.plaintext.len() >= 43);
        assert_eq!(service.hash_refresh(&issued.plaintext).unwrap(), issued.record.hash);
    }

    #[tokio::test]
    async fn revoking_refresh_cascades_to_child() {
        let service = test_service();
        let root = service
            .issue_refresh(Uuid::new_v4(), None, chrono::Duration::days(30), false, None, None)
            .await
            .unwrap();
        let child = service
            .issue_refresh(
                root.record.user_id,
                None,
                chrono::Duration::days(30),
                false,
                None,
                Some(root.record.hash.clone()),
            )
            .await
            .unwrap();

        service.revoke_refresh(&root.record.hash).await.unwrap();

        let child_record = service.refresh_store.find_by_hash(&child.record.hash).await.unwrap().unwrap();
        assert!(child_record.revoked_at.is_some());
    }
}
