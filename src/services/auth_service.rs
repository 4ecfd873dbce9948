use crate::{
    config::JwtConfig,
    models::{Role, User, UserResponse},
    store::UserStore,
    utils::AppError,
};
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,           // user id (ObjectId hex)
    pub email: String,
    pub role: Role,
    pub iat: usize,            // issued at
    pub exp: usize,            // expiration
    pub jti: String,           // JWT ID
    pub aud: String,           // audience
    pub iss: String,           // issuer
}

/// Authenticated identity carried through a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        AuthContext {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: user.id_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

pub fn generate_jwt(user: &User, config: &JwtConfig) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id_hex(),
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::days(config.expiry_days)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: config.audience.clone(),
        iss: config.issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_ref()),
    )
    .map_err(|e| AppError::InvalidRequest(format!("Failed to generate token: {}", e)))
}

/// Pure token verification: signature, expiry, audience and issuer.
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<AuthContext, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.audience.as_str()]);
    validation.set_issuer(&[config.issuer.as_str()]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_ref()),
        &validation,
    )
    .map(|data| AuthContext::from(data.claims))
    .map_err(|_| AppError::Unauthorized("Token is not valid".to_string()))
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// User login
pub async fn login(
    store: &dyn UserStore,
    config: &JwtConfig,
    request: &LoginRequest,
) -> Result<AuthResponse, AppError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidRequest(
            "Please provide email and password".to_string(),
        ));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = store.find_by_email(&request.email).await?.ok_or_else(invalid)?;

    let valid = match verify(&request.password, &user.password) {
        Ok(valid) => valid,
        Err(e) => {
            log::error!("❌ Stored password hash for {} is unreadable: {}", user.email, e);
            false
        }
    };

    if !valid {
        return Err(invalid());
    }

    let token = generate_jwt(&user, config)?;

    Ok(AuthResponse {
        success: true,
        token,
        user: UserInfo::from(&user),
    })
}

// Get current user
pub async fn get_current_user(
    store: &dyn UserStore,
    ctx: &AuthContext,
) -> Result<UserResponse, AppError> {
    store
        .find_by_id(&ctx.user_id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
