//! HTTP API: route handlers and their request/response models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//! - **[`extract`]**: `Json`/`Query` wrappers that reject with the JSON error body
//!
//! # API Structure
//!
//! - **Authentication** (`/api/auth/*`): Registration, login, email verification, password reset
//!   and the current account's profile
//! - **Newsletter** (`/api/newsletter/*`): Double opt-in subscription
//! - **Contact** (`/api/contact`): Contact form
//! - **Chat** (`/api/chat`): Chatbot
//!
//! All endpoints are documented with `utoipa` annotations; the API reference is served at `/docs`.

pub mod extract;
pub mod handlers;
pub mod models;
