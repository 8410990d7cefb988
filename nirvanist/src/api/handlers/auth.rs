use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::{
        extract::{ApiJson, ApiQuery},
        models::{
            MessageResponse,
            auth::{
                EmailRequest, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
                TokenRequest, UserProfile, VerifyEmailResponse,
            },
        },
    },
    auth::{
        current_user::CurrentAccount,
        service::{AuthService, FORGOT_PASSWORD_MESSAGE, RESEND_VERIFICATION_MESSAGE, Registration},
    },
    errors::{Error, ErrorBody},
};

/// Register a new account
///
/// Creates the account, emails a verification link and returns a session token immediately.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "auth",
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid input, CAPTCHA failure or email already registered", body = ErrorBody),
        (status = 403, description = "Registration is disabled", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), Error> {
    let registered = AuthService::new(&state)
        .register(Registration {
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
            captcha_token: request.captcha_token,
            subscribe_newsletter: request.subscribe_newsletter,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful. Please check your email to verify your account.".to_string(),
            user_id: registered.account.id,
            token: registered.token,
            user: registered.account.into(),
            notification: registered.notification,
        }),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials, or email not yet verified", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, ApiJson(request): ApiJson<LoginRequest>) -> Result<Json<LoginResponse>, Error> {
    let logged_in = AuthService::new(&state).login(&request.email, &request.password).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token: logged_in.token,
        user: logged_in.account.into(),
    }))
}

/// Verify an email address (link target)
#[utoipa::path(
    get,
    path = "/api/auth/verify-email",
    params(TokenRequest),
    tag = "auth",
    responses(
        (status = 200, description = "Email verified", body = VerifyEmailResponse),
        (status = 400, description = "Invalid verification token", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn verify_email_link(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TokenRequest>,
) -> Result<Json<VerifyEmailResponse>, Error> {
    verify(&state, query.token.as_deref()).await
}

/// Verify an email address
#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    request_body = TokenRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Email verified", body = VerifyEmailResponse),
        (status = 400, description = "Invalid verification token", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Result<Json<VerifyEmailResponse>, Error> {
    verify(&state, request.token.as_deref()).await
}

async fn verify(state: &AppState, token: Option<&str>) -> Result<Json<VerifyEmailResponse>, Error> {
    let account = AuthService::new(state).verify_email(token).await?;
    Ok(Json(VerifyEmailResponse {
        message: "Email verified successfully".to_string(),
        user: account.into(),
    }))
}

/// Send a fresh verification link
#[utoipa::path(
    post,
    path = "/api/auth/resend-verification",
    request_body = EmailRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Generic acknowledgement", body = MessageResponse),
        (status = 400, description = "Invalid email", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn resend_verification(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EmailRequest>,
) -> Result<Json<MessageResponse>, Error> {
    AuthService::new(&state).resend_verification(&request.email).await?;
    Ok(Json(MessageResponse::new(RESEND_VERIFICATION_MESSAGE)))
}

/// Request a password reset link
///
/// The response is identical whether or not an account exists for the email.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = EmailRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Generic acknowledgement", body = MessageResponse),
        (status = 400, description = "Invalid email", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EmailRequest>,
) -> Result<Json<MessageResponse>, Error> {
    AuthService::new(&state).forgot_password(&request.email).await?;
    Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid or expired reset token, or password rejected", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, Error> {
    AuthService::new(&state)
        .reset_password(request.token.as_deref(), &request.password)
        .await?;
    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}

/// Current account profile
#[utoipa::path(
    get,
    path = "/api/auth/user",
    tag = "auth",
    responses(
        (status = 200, description = "Profile of the authenticated account", body = UserProfile),
        (status = 401, description = "Access token required", body = ErrorBody),
        (status = 403, description = "Invalid or expired token", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn current_user(State(state): State<AppState>, account: CurrentAccount) -> Result<Json<UserProfile>, Error> {
    let account = AuthService::new(&state).profile(account.id).await?;
    Ok(Json(account.into()))
}
