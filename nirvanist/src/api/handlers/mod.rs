//! HTTP request handlers.
//!
//! Handlers are thin: they unpack the request model, call into the matching service
//! ([`crate::auth::service`], [`crate::newsletter`], [`crate::contact`], [`crate::chat`]) and wrap
//! the result in a response model. Errors convert through [`crate::errors::Error`]'s
//! `IntoResponse` impl into `{ "message": ... }` bodies.

pub mod auth;
pub mod chat;
pub mod contact;
pub mod newsletter;
