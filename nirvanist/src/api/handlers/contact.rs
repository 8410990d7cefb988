use axum::{Json, extract::State};

use crate::{
    AppState,
    api::{
        extract::ApiJson,
        models::{MessageResponse, contact::ContactRequest},
    },
    contact::{CONTACT_SUCCESS_MESSAGE, ContactService},
    errors::{Error, ErrorBody},
};

/// Submit the contact form
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    tag = "contact",
    responses(
        (status = 200, description = "Message received", body = MessageResponse),
        (status = 400, description = "Missing or oversized fields, or CAPTCHA failure", body = ErrorBody),
        (status = 500, description = "Failed to send message", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn submit_contact(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ContactRequest>,
) -> Result<Json<MessageResponse>, Error> {
    ContactService::new(&state).submit(request.into()).await?;
    Ok(Json(MessageResponse::new(CONTACT_SUCCESS_MESSAGE)))
}

#[cfg(test)]
mod tests {
    use crate::api::models::MessageResponse;
    use crate::errors::ErrorBody;
    use crate::test_utils::{create_test_config, create_test_context, server_for};
    use axum::http::StatusCode;
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_contact_submission_is_stored_and_forwarded() {
        let mut config = create_test_config();
        config.contact.notify_email = Some("team@thenirvanist.com".to_string());
        let ctx = create_test_context(config);
        let server = server_for(&ctx.state);

        let response = server
            .post("/api/contact")
            .json(&json!({
                "name": "Ravi",
                "email": "ravi@example.com",
                "subject": "Retreat dates",
                "message": "When is the next retreat?",
            }))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<MessageResponse>().message,
            "Thank you for your message. We will get back to you soon!"
        );

        let stored = ctx.contact_messages.all();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].subject, "Retreat dates");

        let forwarded = ctx.mailer.sent_to("team@thenirvanist.com");
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].reply_to.as_deref(), Some("ravi@example.com"));
    }

    #[test_log::test(tokio::test)]
    async fn test_contact_missing_field_is_400() {
        let ctx = create_test_context(create_test_config());
        let server = server_for(&ctx.state);

        let response = server
            .post("/api/contact")
            .json(&json!({ "name": "Ravi", "email": "ravi@example.com", "message": "Hello" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorBody>().message, "Subject is required");
        assert!(ctx.contact_messages.all().is_empty());
    }
}
