//! Accounts and sessions.
//!
//! # Tokens
//!
//! Two kinds of credential are handed out:
//!
//! - **Session tokens** ([`session`]): HS256 JWTs carrying the account id, valid for
//!   `auth.security.jwt_expiry` (7 days by default). Nothing is stored; a token is valid iff its
//!   signature matches and it has not expired. Clients send it as `Authorization: Bearer <jwt>`.
//! - **Opaque tokens** ([`tokens`]): random single-use capabilities embedded in emailed links
//!   for email verification and password reset. Only their SHA-256 digest is stored, and
//!   consuming one clears it.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for the authenticated account in handlers
//! - [`password`]: Argon2id hashing and verification
//! - [`service`]: Registration, login, verification and password reset flows
//! - [`session`]: Session token issue and verification
//! - [`tokens`]: Opaque token generation and storage digests
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use nirvanist::auth::current_user::CurrentAccount;
//!
//! async fn protected_handler(account: CurrentAccount) -> String {
//!     format!("Hello, {}!", account.id)
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod service;
pub mod session;
pub mod tokens;
