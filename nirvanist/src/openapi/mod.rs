//! OpenAPI documentation for the public API, served with a Scalar UI at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{api, errors, types};

/// Session token scheme used by `GET /api/auth/user`.
struct SessionSecurityAddon;

impl Modify for SessionSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token returned by register or login. Include it in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "The Nirvanist API",
        description = "Accounts, newsletter, contact form and chatbot for The Nirvanist."
    ),
    modifiers(&SessionSecurityAddon),
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::verify_email,
        api::handlers::auth::verify_email_link,
        api::handlers::auth::resend_verification,
        api::handlers::auth::forgot_password,
        api::handlers::auth::reset_password,
        api::handlers::auth::current_user,
        api::handlers::newsletter::subscribe,
        api::handlers::newsletter::send_confirmation,
        api::handlers::newsletter::confirm,
        api::handlers::newsletter::confirm_link,
        api::handlers::contact::submit_contact,
        api::handlers::chat::chat,
    ),
    components(
        schemas(
            errors::ErrorBody,
            types::NotificationStatus,
            api::models::MessageResponse,
            api::models::auth::RegisterRequest,
            api::models::auth::RegisterResponse,
            api::models::auth::LoginRequest,
            api::models::auth::LoginResponse,
            api::models::auth::TokenRequest,
            api::models::auth::VerifyEmailResponse,
            api::models::auth::EmailRequest,
            api::models::auth::ResetPasswordRequest,
            api::models::auth::UserProfile,
            api::models::newsletter::SubscribeRequest,
            api::models::newsletter::SubscribeResponse,
            api::models::newsletter::SendConfirmationRequest,
            api::models::newsletter::SuccessResponse,
            api::models::newsletter::ConfirmResponse,
            api::models::contact::ContactRequest,
            api::models::chat::ChatRequest,
            api::models::chat::ChatResponse,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login, email verification and password reset"),
        (name = "newsletter", description = "Double opt-in newsletter subscription"),
        (name = "contact", description = "Contact form"),
        (name = "chat", description = "Chatbot"),
    )
)]
pub struct ApiDoc;
