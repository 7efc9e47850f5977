//! Axum middleware running the authorization pipeline.
//!
//! Stages run in a fixed order: OIDC resolution when a bearer token is
//! present, API-token resolution when the token header is present, then the
//! engine. A failure in any stage ends the request with the mapped error
//! response. On success the handler sees a [`ResolvedIdentity`] extension and,
//! for permission grants, an [`AllowedNamespaces`] extension.
use super::api_token::ApiTokenResolver;
use super::context::ResolvedIdentity;
use super::engine::{AuthorizationEngine, Decision};
use super::oidc::{OidcResolver, strip_bearer};
use super::{API_KEY_HEADER, API_TOKEN_HEADER, AuthError, AuthResult};
use crate::api::error::ApiError;
use crate::app::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use warden_authz::AllowedNamespaces;

/// The three pipeline stages, built once at startup.
pub struct AuthPipeline {
    pub oidc: OidcResolver,
    pub api_tokens: ApiTokenResolver,
    pub engine: AuthorizationEngine,
}

impl AuthPipeline {
    /// Resolve identity from `headers` and decide on `method` + `path`.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        method: &str,
        path: &str,
    ) -> AuthResult<(ResolvedIdentity, Decision)> {
        let mut identity = ResolvedIdentity::default();

        if let Some(token) = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(strip_bearer)
        {
            identity.groups = Some(self.oidc.resolve(token).await?);
        }

        if let Some(value) = headers.get(API_TOKEN_HEADER) {
            let raw = value
                .to_str()
                .map_err(|_| AuthError::AccessInvalid("api token invalid format".into()))?;
            if !raw.is_empty() {
                identity.permissions = Some(self.api_tokens.resolve(raw).await?);
            }
        }

        let presented_key = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        let decision = self
            .engine
            .decide(presented_key, &identity, method, path)
            .await?;
        Ok((identity, decision))
    }
}

pub async fn authorize(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();
    let (identity, decision) = state
        .auth
        .authorize(request.headers(), &method, &path)
        .await?;

    let extensions = request.extensions_mut();
    extensions.insert(identity);
    if let Decision::Granted { allowed_namespaces } = decision {
        extensions.insert::<AllowedNamespaces>(allowed_namespaces);
    }
    Ok(next.run(request).await)
}
