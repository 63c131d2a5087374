use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use crate::auth::service::{LOGIN_FIELDS_REQUIRED, REGISTER_FIELDS_REQUIRED};
use crate::auth::token::TokenKind;
use crate::AppState;
use crate::error::AppError;
use tracing::{info, warn, error};

pub const SESSION_COOKIE_NAME: &str = "coffeeJWTToken";

const REGISTER_FAILURE: &str = "something went wrong registering the user";
const LOGIN_FAILURE: &str = "something went wrong logging in the user";

/// Mounts register, login and logout under `/user/auth`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user/auth")
            .service(
                web::resource("/register")
                    .app_data(json_config(REGISTER_FIELDS_REQUIRED))
                    .route(web::post().to(register)),
            )
            .service(
                web::resource("/login")
                    .app_data(json_config(LOGIN_FIELDS_REQUIRED))
                    .route(web::post().to(login)),
            )
            .route("/logout", web::post().to(logout)),
    );
}

/// Unreadable bodies (absent, not JSON, null fields) fail the same way as empty fields.
fn json_config(message: &'static str) -> web::JsonConfig {
    web::JsonConfig::default()
        .content_type_required(false)
        .error_handler(move |err, _req| {
            warn!("Rejected request body: {}", err);
            AppError::ValidationError(message.to_string()).into()
        })
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub access_token: String,
}

// Missing fields come through as empty strings and fail validation.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for email: {}", req.email);

    match state.auth_service.register(&req.user_name, &req.email, &req.password).await {
        Ok(registration) => {
            info!("Registration successful for email: {}", req.email);
            let cookie = session_cookie(registration.refresh_token, state.config.is_production());
            Ok(HttpResponse::Ok().cookie(cookie).json(RegisterResponse {
                message: "successfull user registration".to_string(),
                access_token: registration.access_token,
            }))
        }
        Err(e) if e.is_internal() => {
            error!("Registration failed for email: {}: {}", req.email, e);
            Ok(HttpResponse::InternalServerError().json(MessageResponse::new(REGISTER_FAILURE)))
        }
        Err(e) => {
            warn!("Registration rejected for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", req.email);

    match state.auth_service.login(&req.email, &req.password).await {
        Ok(user) => {
            info!("Login successful for user {}", user.id);
            Ok(HttpResponse::Ok().json(MessageResponse::new("You have logged in successfully...")))
        }
        Err(e) if e.is_internal() => {
            error!("Login failed for email: {}: {}", req.email, e);
            Ok(HttpResponse::InternalServerError().json(MessageResponse::new(LOGIN_FAILURE)))
        }
        Err(e) => {
            warn!("Login rejected for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

/// Drops the session cookie. Tokens already handed out stay valid until expiry.
pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(SESSION_COOKIE_NAME, "").path("/").finish();
    cookie.make_removal();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(MessageResponse::new("user logged out successfully..."))
}

fn session_cookie(refresh_token: String, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME, refresh_token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(CookieDuration::seconds(TokenKind::Refresh.lifetime().num_seconds()))
        .finish()
}
