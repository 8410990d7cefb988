use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::contact::ContactSubmission;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub captcha_token: Option<String>,
}

impl From<ContactRequest> for ContactSubmission {
    fn from(request: ContactRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            subject: request.subject,
            message: request.message,
            captcha_token: request.captcha_token,
        }
    }
}
