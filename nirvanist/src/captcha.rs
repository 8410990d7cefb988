//! Cloudflare Turnstile verification for public forms.
//!
//! The policy is explicit and lives in [`CaptchaConfig`]:
//!
//! | Situation | `fail_open: true` | `fail_open: false` |
//! |---|---|---|
//! | CAPTCHA disabled | allow | allow |
//! | no token submitted | allow (warn) | reject |
//! | verifier unreachable / garbled reply | allow (warn) | reject |
//! | verifier says `success: false` | reject | reject |
//! | verifier says `success: true` | allow | allow |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::CaptchaConfig;
use crate::errors::Error;

#[derive(Debug, Serialize)]
struct SiteverifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// What happened when a challenge token was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaOutcome {
    /// Verification is switched off
    Skipped,
    Passed,
    /// Token missing or verifier unavailable, admitted under fail-open
    FailedOpen,
}

#[derive(Clone)]
pub struct CaptchaVerifier {
    inner: Option<Turnstile>,
}

#[derive(Clone)]
struct Turnstile {
    client: reqwest::Client,
    secret: String,
    verify_url: String,
    fail_open: bool,
}

impl CaptchaVerifier {
    pub fn new(config: &CaptchaConfig) -> Result<Self, Error> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let secret = config
            .secret_key
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::Internal {
                operation: "create CAPTCHA verifier: captcha is enabled but no secret_key is configured".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| Error::Internal {
                operation: format!("create CAPTCHA HTTP client: {e}"),
            })?;

        Ok(Self {
            inner: Some(Turnstile {
                client,
                secret,
                verify_url: config.verify_url.clone(),
                fail_open: config.fail_open,
            }),
        })
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Check a challenge token submitted with a form.
    ///
    /// # Errors
    /// - `CaptchaFailed` on a negative verdict, or on a missing token / unavailable verifier
    ///   when fail-open is off
    #[instrument(skip_all, err)]
    pub async fn verify(&self, token: Option<&str>) -> Result<CaptchaOutcome, Error> {
        let Some(turnstile) = &self.inner else {
            return Ok(CaptchaOutcome::Skipped);
        };

        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return turnstile.unavailable("no CAPTCHA token submitted");
        };

        let response = match turnstile
            .client
            .post(&turnstile.verify_url)
            .json(&SiteverifyRequest {
                secret: &turnstile.secret,
                response: token,
            })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return turnstile.unavailable(&format!("siteverify request failed: {e}")),
        };

        if !response.status().is_success() {
            let status = response.status();
            return turnstile.unavailable(&format!("siteverify returned {status}"));
        }

        let verdict: SiteverifyResponse = match response.json().await {
            Ok(verdict) => verdict,
            Err(e) => return turnstile.unavailable(&format!("unreadable siteverify response: {e}")),
        };

        if verdict.success {
            debug!("CAPTCHA passed");
            Ok(CaptchaOutcome::Passed)
        } else {
            debug!(error_codes = ?verdict.error_codes, "CAPTCHA rejected");
            Err(Error::CaptchaFailed)
        }
    }
}

impl Turnstile {
    fn unavailable(&self, reason: &str) -> Result<CaptchaOutcome, Error> {
        if self.fail_open {
            warn!(reason, "CAPTCHA could not be verified, admitting request (fail-open)");
            Ok(CaptchaOutcome::FailedOpen)
        } else {
            warn!(reason, "CAPTCHA could not be verified, rejecting request");
            Err(Error::CaptchaFailed)
        }
    }
}
