use axum::{Json, extract::State};

use crate::{
    AppState,
    api::{
        extract::{ApiJson, ApiQuery},
        models::{
            auth::TokenRequest,
            newsletter::{ConfirmResponse, SendConfirmationRequest, SubscribeRequest, SubscribeResponse, SuccessResponse},
        },
    },
    errors::{Error, ErrorBody},
    newsletter::NewsletterService,
};

/// Subscribe to the newsletter
///
/// The subscription stays pending until the emailed confirmation link is followed.
/// `notification` is `delayed` when the row was saved but the confirmation email could not be sent.
#[utoipa::path(
    post,
    path = "/api/newsletter/subscribe",
    request_body = SubscribeRequest,
    tag = "newsletter",
    responses(
        (status = 200, description = "Subscription pending confirmation", body = SubscribeResponse),
        (status = 400, description = "Invalid email or CAPTCHA failure", body = ErrorBody),
        (status = 500, description = "Subscription could not be stored", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, Error> {
    let subscription = NewsletterService::new(&state)
        .subscribe(&request.email, request.source.as_deref(), request.captcha_token.as_deref())
        .await?;

    Ok(Json(SubscribeResponse {
        success: true,
        message: "Please check your email to confirm your subscription.".to_string(),
        notification: subscription.notification,
    }))
}

/// Re-send the confirmation email for a pending subscription
#[utoipa::path(
    post,
    path = "/api/newsletter/send-confirmation",
    request_body = SendConfirmationRequest,
    tag = "newsletter",
    responses(
        (status = 200, description = "Confirmation email sent", body = SuccessResponse),
        (status = 400, description = "Email and token don't match a pending subscription", body = ErrorBody),
        (status = 500, description = "Email could not be sent", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn send_confirmation(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendConfirmationRequest>,
) -> Result<Json<SuccessResponse>, Error> {
    NewsletterService::new(&state)
        .send_confirmation(&request.email, &request.token)
        .await?;

    Ok(Json(SuccessResponse {
        success: true,
        message: "Confirmation email sent".to_string(),
    }))
}

/// Confirm a subscription (link target)
#[utoipa::path(
    get,
    path = "/api/newsletter/confirm",
    params(TokenRequest),
    tag = "newsletter",
    responses(
        (status = 200, description = "Subscription active", body = ConfirmResponse),
        (status = 400, description = "Unknown or superseded confirmation token", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn confirm_link(State(state): State<AppState>, ApiQuery(query): ApiQuery<TokenRequest>) -> Result<Json<ConfirmResponse>, Error> {
    confirm_token(&state, query.token.as_deref()).await
}

/// Confirm a subscription
#[utoipa::path(
    post,
    path = "/api/newsletter/confirm",
    request_body = TokenRequest,
    tag = "newsletter",
    responses(
        (status = 200, description = "Subscription active", body = ConfirmResponse),
        (status = 400, description = "Unknown or superseded confirmation token", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn confirm(State(state): State<AppState>, ApiJson(request): ApiJson<TokenRequest>) -> Result<Json<ConfirmResponse>, Error> {
    confirm_token(&state, request.token.as_deref()).await
}

async fn confirm_token(state: &AppState, token: Option<&str>) -> Result<Json<ConfirmResponse>, Error> {
    let confirmation = NewsletterService::new(state).confirm(token).await?;

    let message = if confirmation.already_confirmed {
        "Your subscription is already confirmed."
    } else {
        "Thank you for confirming your subscription!"
    };
    Ok(Json(ConfirmResponse {
        success: true,
        message: message.to_string(),
        already_confirmed: confirmation.already_confirmed,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::newsletter::{ConfirmResponse, SubscribeResponse};
    use crate::errors::ErrorBody;
    use crate::test_utils::{create_test_server, extract_token};
    use crate::types::NotificationStatus;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_subscribe_confirm_replay() {
        let (server, mailer) = create_test_server();

        let response = server
            .post("/api/newsletter/subscribe")
            .json(&json!({ "email": "b@y.com" }))
            .await;
        response.assert_status_ok();
        let body: SubscribeResponse = response.json();
        assert!(body.success);
        assert_eq!(body.notification, NotificationStatus::Sent);

        let token = extract_token(&mailer.sent_to("b@y.com")[0].html, "confirm-newsletter").unwrap();

        let first: ConfirmResponse = server
            .get("/api/newsletter/confirm")
            .add_query_param("token", &token)
            .await
            .json();
        assert!(first.success);
        assert!(!first.already_confirmed);
        assert_eq!(first.message, "Thank you for confirming your subscription!");

        let replay: ConfirmResponse = server.post("/api/newsletter/confirm").json(&json!({ "token": token })).await.json();
        assert!(replay.already_confirmed);
        assert_eq!(replay.message, "Your subscription is already confirmed.");
    }

    #[test_log::test(tokio::test)]
    async fn test_resubscribe_supersedes_first_link() {
        let (server, mailer) = create_test_server();

        server.post("/api/newsletter/subscribe").json(&json!({ "email": "b@y.com" })).await;
        server.post("/api/newsletter/subscribe").json(&json!({ "email": "B@y.com" })).await;

        let sent = mailer.sent_to("b@y.com");
        assert_eq!(sent.len(), 2);
        let stale = extract_token(&sent[0].html, "confirm-newsletter").unwrap();
        let current = extract_token(&sent[1].html, "confirm-newsletter").unwrap();
        assert_ne!(stale, current);

        let response = server.get("/api/newsletter/confirm").add_query_param("token", &stale).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<ErrorBody>().message,
            "This confirmation link is invalid or has already been used."
        );

        server
            .get("/api/newsletter/confirm")
            .add_query_param("token", &current)
            .await
            .assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_subscribe_rejects_invalid_email() {
        let (server, mailer) = create_test_server();

        let response = server
            .post("/api/newsletter/subscribe")
            .json(&json!({ "email": "not-an-email" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorBody>().message, "Valid email is required");
        assert!(mailer.sent().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_subscribe_reports_delayed_notification() {
        let (server, mailer) = create_test_server();
        mailer.set_failing(true);

        let response = server
            .post("/api/newsletter/subscribe")
            .json(&json!({ "email": "b@y.com" }))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<SubscribeResponse>().notification, NotificationStatus::Delayed);
    }

    #[test_log::test(tokio::test)]
    async fn test_send_confirmation_requires_matching_pair() {
        let (server, mailer) = create_test_server();
        server.post("/api/newsletter/subscribe").json(&json!({ "email": "b@y.com" })).await;
        let token = extract_token(&mailer.sent_to("b@y.com")[0].html, "confirm-newsletter").unwrap();

        server
            .post("/api/newsletter/send-confirmation")
            .json(&json!({ "email": "b@y.com", "token": token }))
            .await
            .assert_status_ok();
        assert_eq!(mailer.sent_to("b@y.com").len(), 2);

        server
            .post("/api/newsletter/send-confirmation")
            .json(&json!({ "email": "other@y.com", "token": token }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        assert!(mailer.sent_to("other@y.com").is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_confirm_without_token_is_400() {
        let (server, _mailer) = create_test_server();

        server
            .get("/api/newsletter/confirm")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .post("/api/newsletter/confirm")
            .json(&json!({}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
