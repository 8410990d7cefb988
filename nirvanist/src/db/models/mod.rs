//! Database record models matching table schemas.
//!
//! - [`accounts`]: Registered accounts with credential and token columns
//! - [`subscribers`]: Newsletter subscribers and their confirmation state
//! - [`contact_messages`]: Contact form submissions
//!
//! Database models are distinct from API models in [`crate::api::models`] so that hashes and
//! token digests never reach a response body.

pub mod accounts;
pub mod contact_messages;
pub mod subscribers;
