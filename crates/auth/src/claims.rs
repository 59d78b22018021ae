use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session token claims.
///
/// Times are seconds since the Unix epoch, as registered JWT claims are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the operator's username.
    pub sub: String,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(subject: impl Into<String>, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: subject.into(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("malformed or badly signed token: {0}")]
    Malformed(String),
}

/// Deterministically validate session claims against `now`.
///
/// Signature verification happens before this, in `JwtValidator`.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn accepts_within_window() {
        let claims = SessionClaims::new("operator", at(1_000), Duration::minutes(10));
        assert_eq!(validate_claims(&claims, at(1_000)), Ok(()));
        assert_eq!(validate_claims(&claims, at(1_599)), Ok(()));
    }

    #[test]
    fn rejects_expired_and_future_tokens() {
        let claims = SessionClaims::new("operator", at(1_000), Duration::minutes(10));
        assert_eq!(
            validate_claims(&claims, at(1_600)),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims, at(999)),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn rejects_inverted_window() {
        let claims = SessionClaims {
            sub: "operator".into(),
            iat: 10,
            exp: 10,
        };
        assert_eq!(
            validate_claims(&claims, at(10)),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
