//! API-token handlers.
//!
//! # Purpose
//! Create, list, fetch, and delete API tokens inside a namespace. Creation
//! generates a random UUID secret, stores only its derived hash, and returns
//! the secret exactly once.
//!
//! # Key invariants
//! - The raw secret never reaches the store or the logs.
//! - Token lifetimes are given as ISO-8601 durations; `PT0S` creates a token
//!   that is already expired.
use crate::api::error::{ApiError, api_validation_error};
use crate::api::types::{
    ApiTokenCreateRequest, ApiTokenCreateResponse, ApiTokenListResponse, ApiTokenView,
    permissions_from_input,
};
use crate::app::AppState;
use crate::store::{FieldErrors, TokenStore};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use uuid::Uuid;
use warden_authz::{ApiToken, hash_token_id};

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Parse an ISO-8601 duration (`PnYnMnWnDTnHnMnS`, integer components) into
/// whole seconds. Years count 365 days and months 30 days.
///
/// Returns `None` for malformed input, an empty designator list, or overflow.
pub fn parse_iso8601_duration(raw: &str) -> Option<i64> {
    let body = raw.strip_prefix('P')?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return None;
            }
            (date, Some(time))
        }
        None => (body, None),
    };

    let mut total: i64 = 0;
    let mut components = 0;
    for (value, unit) in components_of(date_part)? {
        let scale = match unit {
            'Y' => 365 * SECONDS_PER_DAY,
            'M' => 30 * SECONDS_PER_DAY,
            'W' => 7 * SECONDS_PER_DAY,
            'D' => SECONDS_PER_DAY,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(scale)?)?;
        components += 1;
    }
    if let Some(time_part) = time_part {
        for (value, unit) in components_of(time_part)? {
            let scale = match unit {
                'H' => SECONDS_PER_HOUR,
                'M' => SECONDS_PER_MINUTE,
                'S' => 1,
                _ => return None,
            };
            total = total.checked_add(value.checked_mul(scale)?)?;
            components += 1;
        }
    }
    (components > 0).then_some(total)
}

/// Split `12H30M` into `[(12, 'H'), (30, 'M')]`, rejecting repeated units.
fn components_of(part: &str) -> Option<Vec<(i64, char)>> {
    let mut out: Vec<(i64, char)> = Vec::new();
    let mut digits = String::new();
    for ch in part.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if digits.is_empty() || out.iter().any(|(_, unit)| *unit == ch) {
            return None;
        }
        out.push((digits.parse().ok()?, ch));
        digits.clear();
    }
    digits.is_empty().then_some(out)
}

#[utoipa::path(
    get,
    path = "/api/v2/namespaces/{namespace}/api_tokens",
    tag = "api_tokens",
    params(("namespace" = String, Path, description = "Namespace name")),
    responses(
        (status = 200, description = "List API tokens, oldest first", body = ApiTokenListResponse)
    )
)]
pub(crate) async fn list_api_tokens(
    Path(namespace): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiTokenListResponse>, ApiError> {
    let tokens = state.store.list_tokens(&namespace).await?;
    Ok(Json(ApiTokenListResponse {
        items: tokens.into_iter().map(ApiTokenView::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v2/namespaces/{namespace}/api_tokens",
    tag = "api_tokens",
    params(("namespace" = String, Path, description = "Namespace name")),
    request_body = ApiTokenCreateRequest,
    responses(
        (status = 201, description = "Token created; the secret is shown once", body = ApiTokenCreateResponse),
        (status = 400, description = "Invalid fields", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Token already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_api_token(
    Path(namespace): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<ApiTokenCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(lifetime_seconds) = parse_iso8601_duration(&body.duration) else {
        let mut fields = FieldErrors::new();
        fields.insert("duration".into(), "invalid iso8601 duration format".into());
        return Err(api_validation_error(fields));
    };

    let secret = Uuid::new_v4();
    let now = Utc::now();
    let token = ApiToken {
        name: body.name,
        namespace,
        description: body.description,
        hash: hash_token_id(secret),
        permissions: permissions_from_input(body.permissions),
        expires_at: now,
        created_at: now,
        updated_at: now,
    };
    let created = state.store.create_token(token, lifetime_seconds).await?;
    tracing::info!(
        namespace = %created.namespace,
        token = %created.name,
        prefix = %created.prefix(),
        "api token created"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiTokenCreateResponse {
            api_token: created.into(),
            secret: secret.to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v2/namespaces/{namespace}/api_tokens/{name}",
    tag = "api_tokens",
    params(
        ("namespace" = String, Path, description = "Namespace name"),
        ("name" = String, Path, description = "Token name")
    ),
    responses(
        (status = 200, description = "Fetch API token", body = ApiTokenView),
        (status = 404, description = "Token not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_api_token(
    Path((namespace, name)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<ApiTokenView>, ApiError> {
    let token = state.store.get_token(&namespace, &name).await?;
    Ok(Json(token.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v2/namespaces/{namespace}/api_tokens/{name}",
    tag = "api_tokens",
    params(
        ("namespace" = String, Path, description = "Namespace name"),
        ("name" = String, Path, description = "Token name")
    ),
    responses(
        (status = 204, description = "Token deleted"),
        (status = 404, description = "Token not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_api_token(
    Path((namespace, name)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_token(&namespace, &name).await?;
    tracing::info!(namespace = %namespace, token = %name, "api token deleted");
    Ok(StatusCode::NO_CONTENT)
}
