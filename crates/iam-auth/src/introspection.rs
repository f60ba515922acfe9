use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use iam_storage::{DenyListStore, RefreshTokenStore};

use crate::claims::Claims;
use crate::token::TokenService;

/// RFC-7662 response. `active:false` never discloses which check failed —
/// a malformed token, an unknown token, and an expired token all produce
/// the same shape, with every claim field absent.
#[derive(Debug, Clone, Serialize)]
pub struct IntrospectionResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<uuid::Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<uuid::Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Vec<String>>,
}

impl IntrospectionResponse {
    fn inactive() -> Self {
        Self {
            active: false,
            sub: None,
            tenant_id: None,
            exp: None,
            iat: None,
            scope: None,
        }
    }

    fn active(sub: uuid::Uuid, tenant_id: Option<uuid::Uuid>) -> Self {
        Self {
            active: true,
            sub: Some(sub),
            tenant_id,
            exp: None,
            iat: None,
            scope: None,
        }
    }

    fn from_claims(claims: Claims) -> Self {
        Self {
            active: true,
            sub: Some(claims.sub),
            tenant_id: claims.tenant_id,
            exp: Some(claims.exp),
            iat: Some(claims.iat),
            scope: Some(claims.permissions),
        }
    }
}

/// Wraps a `TokenService` with the RFC-7662 introspection surface. Every
/// failure mode collapses to the same `{active:false}` — callers must never
/// branch on the underlying error.
pub struct IntrospectionService<D: DenyListStore, R: RefreshTokenStore> {
    tokens: Arc<TokenService<D, R>>,
    refresh_store: Arc<R>,
}

impl<D: DenyListStore, R: RefreshTokenStore> IntrospectionService<D, R> {
    pub fn new(tokens: Arc<TokenService<D, R>>, refresh_store: Arc<R>) -> Self {
        Self { tokens, refresh_store }
    }

    pub async fn introspect_access(&self, jwt: &str) -> IntrospectionResponse {
        match self.tokens.validate_access(jwt).await {
            Ok(claims) => IntrospectionResponse::from_claims(claims),
            Err(_) => IntrospectionResponse::inactive(),
        }
    }

    pub async fn introspect_refresh(&self, plaintext: &str) -> IntrospectionResponse {
        let Ok(hash) = self.tokens.hash_refresh(plaintext) else {
            return IntrospectionResponse::inactive();
        };
        let Ok(Some(record)) = self.refresh_store.find_by_hash(&hash).await else {
            return IntrospectionResponse::inactive();
        };
        if !record.is_usable(Utc::now()) {
            return IntrospectionResponse::inactive();
        }
        IntrospectionResponse::active(record.user_id, record.tenant_id)
    }
}
