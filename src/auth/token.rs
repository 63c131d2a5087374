use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn lifetime(self) -> Duration {
        match self {
            TokenKind::Access => Duration::hours(1),
            TokenKind::Refresh => Duration::days(7),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub exp: i64,     // Expiration time
    pub iat: i64,     // Issued at
    pub kind: TokenKind,
}

/// Mints and checks HS256 session tokens with the process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::ConfigError("token signing secret is empty".into()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn issue(&self, subject: Uuid, kind: TokenKind) -> Result<String, AppError> {
        self.issue_at(subject, kind, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        subject: Uuid,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (issued_at + kind.lifetime()).timestamp(),
            iat: issued_at.timestamp(),
            kind,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Returns the subject of a token signed with this secret and not yet expired.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let claims = self.decode(token)?;
        Uuid::parse_str(&claims.sub).map_err(|_| AppError::AuthError(AuthError::InvalidToken))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test_secret").unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let token = issuer.issue(user_id, TokenKind::Access).unwrap();
        assert_eq!(issuer.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_lifetimes() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let access = issuer.issue_at(user_id, TokenKind::Access, now).unwrap();
        let refresh = issuer.issue_at(user_id, TokenKind::Refresh, now).unwrap();

        let access = issuer.decode(&access).unwrap();
        let refresh = issuer.decode(&refresh).unwrap();

        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(access.exp - access.iat, 3600);
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_expired_token() {
        let issuer = issuer();
        let issued_at = Utc::now() - Duration::hours(2);
        let token = issuer.issue_at(Uuid::new_v4(), TokenKind::Access, issued_at).unwrap();

        assert!(matches!(
            issuer.verify(&token),
            Err(AppError::AuthError(AuthError::TokenExpired))
        ));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let other = TokenIssuer::new("another_secret").unwrap();
        let token = other.issue(Uuid::new_v4(), TokenKind::Refresh).unwrap();

        assert!(matches!(
            issuer().verify(&token),
            Err(AppError::AuthError(AuthError::InvalidToken))
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = issuer();
        let token = issuer.issue(Uuid::new_v4(), TokenKind::Access).unwrap();
        let forged = issuer.issue(Uuid::new_v4(), TokenKind::Access).unwrap();

        // Signature of one token over the payload of another
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(matches!(
            issuer.verify(&tampered),
            Err(AppError::AuthError(AuthError::InvalidToken))
        ));
        assert!(matches!(
            issuer.verify("invalid_token"),
            Err(AppError::AuthError(AuthError::InvalidToken))
        ));
    }

    #[test]
    fn test_empty_secret() {
        assert!(matches!(TokenIssuer::new(""), Err(AppError::ConfigError(_))));
    }
}
