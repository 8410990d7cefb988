use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};

use crate::{AppState, auth::session::SessionClaims, errors::Error, types::AccountId};

/// The caller's account id, taken from an `Authorization: Bearer <jwt>` header.
///
/// Rejections:
/// - no header, or not a Bearer credential: `Unauthenticated` (401)
/// - token fails signature/expiry checks: `InvalidSession` (403)
///
/// The account itself is not loaded; handlers that need it look it up and answer 404 if it has
/// gone.
#[derive(Debug, Clone, Copy)]
pub struct CurrentAccount {
    pub id: AccountId,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(Error::Unauthenticated { message: None })?;

        let SessionClaims { sub, .. } = state.sessions.verify(token).ok_or(Error::InvalidSession)?;
        trace!(account_id = %sub, "Authenticated via bearer token");
        Ok(CurrentAccount { id: sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_state;
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/auth/user");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthenticated() {
        let (state, _) = create_test_state();
        let err = CurrentAccount::from_request_parts(&mut parts_with(None), &state).await.unwrap_err();
        assert_eq!(err.user_message(), "Access token required");

        let err = CurrentAccount::from_request_parts(&mut parts_with(Some("Basic abc")), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));

        let err = CurrentAccount::from_request_parts(&mut parts_with(Some("Bearer   ")), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_valid_token() {
        let (state, _) = create_test_state();
        let id = Uuid::new_v4();
        let token = state.sessions.issue(id).unwrap();

        let header = format!("Bearer {token}");
        let account = CurrentAccount::from_request_parts(&mut parts_with(Some(&header)), &state).await.unwrap();
        assert_eq!(account.id, id);

        let header = format!("bearer {token}");
        assert!(CurrentAccount::from_request_parts(&mut parts_with(Some(&header)), &state).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_or_expired_token_is_forbidden() {
        let (state, _) = create_test_state();

        let err = CurrentAccount::from_request_parts(&mut parts_with(Some("Bearer not.a.jwt")), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSession));

        let expired = state.sessions.issue_at(Uuid::new_v4(), Utc::now() - Duration::days(8)).unwrap();
        let header = format!("Bearer {expired}");
        let err = CurrentAccount::from_request_parts(&mut parts_with(Some(&header)), &state)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Invalid or expired token");
    }
}
