//! Bearer-token context. Tokens are issued elsewhere; this module only reads them,
//! plus a development helper that mints one.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
    routing::post,
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_core::CoreError;
use wayfare_shared::ApiResponse;

use crate::error::{AppError, ApiResult};
use crate::extract::ApiJson;
use crate::state::{AppState, AuthConfig};

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_CUSTOMER: &str = "CUSTOMER";

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomerClaims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

impl CustomerClaims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub fn issue_token(auth: &AuthConfig, user_id: Uuid, email: &str, role: &str) -> Result<String, AppError> {
    let claims = CustomerClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| CoreError::InternalError(format!("Token encoding failed: {}", e)).into())
}

fn decode_claims(token: &str, auth: &AuthConfig) -> Result<CustomerClaims, AppError> {
    decode::<CustomerClaims>(
        token,
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| CoreError::Unauthorized("Invalid or expired token".to_string()).into())
}

// ============================================================================
// Extractors
// ============================================================================

/// Authenticated caller. Rejects with 401 when the token is missing or invalid.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub claims: CustomerClaims,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| CoreError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = decode_claims(bearer.token(), &state.auth)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| CoreError::Unauthorized("Token subject is not a user id".to_string()))?;
        Ok(Self { user_id, claims })
    }
}

/// Caller identity when a token is present. A present but invalid token is still a 401.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(Self(None));
        }
        AuthUser::from_request_parts(parts, state).await.map(|user| Self(Some(user)))
    }
}

// ============================================================================
// Admin Middleware
// ============================================================================

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &state).await?;
    if !user.claims.is_admin() {
        return Err(CoreError::Forbidden("Admin role required".to_string()).into());
    }

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.claims);
    Ok(next.run(req).await)
}

// ============================================================================
// Development tokens
// ============================================================================

#[derive(Debug, Deserialize)]
struct DevTokenRequest {
    user_id: Option<Uuid>,
    email: Option<String>,
    role: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
    user_id: Uuid,
    role: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/dev-token", post(dev_token))
}

async fn dev_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<DevTokenRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TokenResponse>>)> {
    if state.is_production() {
        return Err(CoreError::NotFound("Not found".to_string()).into());
    }

    let user_id = req.user_id.unwrap_or_else(Uuid::new_v4);
    let role = match req.role.as_deref().map(str::trim) {
        Some(r) if r.eq_ignore_ascii_case(ROLE_ADMIN) => ROLE_ADMIN,
        _ => ROLE_CUSTOMER,
    };
    let email = req.email.unwrap_or_else(|| format!("{}@wayfare.dev", user_id.simple()));
    let token = issue_token(&state.auth, user_id, &email, role)?;
    tracing::debug!(%user_id, role, "Issued development token");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Token issued",
            TokenResponse {
                token,
                user_id,
                role: role.to_string(),
            },
        )),
    ))
}
