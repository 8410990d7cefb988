use axum::{Json, extract::State};

use crate::{
    AppState,
    api::{
        extract::ApiJson,
        models::chat::{ChatRequest, ChatResponse},
    },
    errors::{Error, ErrorBody},
};

/// Ask the chatbot
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    tag = "chat",
    responses(
        (status = 200, description = "Chatbot reply", body = ChatResponse),
        (status = 400, description = "Empty or oversized message", body = ErrorBody),
        (status = 500, description = "Chat service unavailable", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn chat(State(state): State<AppState>, ApiJson(request): ApiJson<ChatRequest>) -> Result<Json<ChatResponse>, Error> {
    let response = state.chat.respond(&request.message).await?;
    Ok(Json(ChatResponse { response }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::chat::ChatResponse;
    use crate::chat::{ChatService, DisabledChat};
    use crate::config::DEFAULT_CHAT_REPLY;
    use crate::errors::ErrorBody;
    use crate::test_utils::{create_test_server, create_test_state, server_for};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    #[test_log::test(tokio::test)]
    async fn test_chat_canned_reply() {
        let (server, _mailer) = create_test_server();

        let response = server.post("/api/chat").json(&json!({ "message": "What is dharma?" })).await;

        response.assert_status_ok();
        assert_eq!(response.json::<ChatResponse>().response, DEFAULT_CHAT_REPLY);
    }

    #[test_log::test(tokio::test)]
    async fn test_chat_empty_message_is_400() {
        let (server, _mailer) = create_test_server();

        let response = server.post("/api/chat").json(&json!({ "message": "   " })).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorBody>().message, "Message is required");
    }

    #[test_log::test(tokio::test)]
    async fn test_chat_provider_failure_is_500() {
        let (mut state, _mailer) = create_test_state();
        state.chat = ChatService::new(Arc::new(DisabledChat));
        let server = server_for(&state);

        let response = server.post("/api/chat").json(&json!({ "message": "Hello" })).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<ErrorBody>().message, "Chat service unavailable");
    }
}
