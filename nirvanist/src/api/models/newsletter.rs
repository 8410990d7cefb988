//! API request/response models for the newsletter.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::NotificationStatus;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub email: String,
    /// Where the form was submitted from (defaults to `homepage_guest`)
    pub source: Option<String>,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
    pub notification: NotificationStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SendConfirmationRequest {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub success: bool,
    pub message: String,
    /// The subscription was already active before this request
    pub already_confirmed: bool,
}
