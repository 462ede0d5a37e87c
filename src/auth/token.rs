use crate::error::AppError;
use crate::models::User;
use crate::store::Store;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: Uuid,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Unique token id, so two sessions opened in the same second differ.
    pub jti: Uuid,
    /// Expiration timestamp. Absent when tokens are configured not to expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Issues, validates and revokes bearer tokens.
///
/// A token is only accepted when its signature checks out *and* it is still
/// present in the owner's token list, so removing it from the list revokes it.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Option<chrono::Duration>,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: Option<i64>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is only present when a TTL is configured; it is still checked when it is.
        validation.required_spec_claims.clear();
        validation.validate_exp = true;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: ttl_hours.map(chrono::Duration::hours),
        }
    }

    /// Signs a fresh token for `user_id`. Does not touch the store.
    pub fn generate_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            exp: self.ttl.map(|ttl| (now + ttl).timestamp()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Checks the signature (and expiry, if any) and decodes the claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    /// Signs a token and appends it to the user's session list.
    pub async fn issue(&self, store: &dyn Store, user_id: Uuid) -> Result<String, AppError> {
        let token = self.generate_token(user_id)?;
        store.push_token(user_id, &token).await?;
        Ok(token)
    }

    /// Resolves a presented token to its owner.
    ///
    /// Fails with `Unauthorized` if the signature is bad, the user no longer
    /// exists, or the token has been revoked.
    pub async fn validate(&self, store: &dyn Store, token: &str) -> Result<User, AppError> {
        let claims = self.verify_token(token)?;
        store
            .find_user_by_token(claims.sub, token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Token has been revoked".into()))
    }

    pub async fn revoke(&self, store: &dyn Store, user_id: Uuid, token: &str) -> Result<(), AppError> {
        store.remove_token(user_id, token).await
    }

    pub async fn revoke_all(&self, store: &dyn Store, user_id: Uuid) -> Result<(), AppError> {
        store.clear_tokens(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::MemoryStore;

    const SECRET: &str = "test_secret_for_tokens";

    async fn stored_user(store: &MemoryStore) -> User {
        store
            .insert_user(NewUser {
                name: "Mike".into(),
                email: "mike@example.com".into(),
                password_hash: "hash".into(),
                age: None,
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_token_generation_and_verification() {
        let service = TokenService::new(SECRET, None);
        let user_id = Uuid::new_v4();
        let token = service.generate_token(user_id).unwrap();
        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn test_tokens_are_unique_per_session() {
        let service = TokenService::new(SECRET, None);
        let user_id = Uuid::new_v4();
        assert_ne!(
            service.generate_token(user_id).unwrap(),
            service.generate_token(user_id).unwrap()
        );
    }

    #[test]
    fn test_token_expiration() {
        let service = TokenService::new(SECRET, Some(24));
        let fresh = service.generate_token(Uuid::new_v4()).unwrap();
        assert!(service.verify_token(&fresh).unwrap().exp.is_some());

        let expired_claims = Claims {
            sub: Uuid::new_v4(),
            iat: chrono::Utc::now().timestamp() - 7200,
            jti: Uuid::new_v4(),
            exp: Some(chrono::Utc::now().timestamp() - 3600),
        };
        let expired = encode(
            &Header::default(),
            &expired_claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        match service.verify_token(&expired) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("ExpiredSignature")),
            other => panic!("expected expired token to be rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_token_signature() {
        let signer = TokenService::new("a_completely_different_secret", None);
        let verifier = TokenService::new(SECRET, None);
        let token = signer.generate_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            verifier.verify_token(&token),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            verifier.verify_token("not.a.token"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[actix_rt::test]
    async fn test_issue_validate_and_revoke() {
        let store = MemoryStore::new();
        let service = TokenService::new(SECRET, None);
        let user = stored_user(&store).await;

        let first = service.issue(&store, user.id).await.unwrap();
        let second = service.issue(&store, user.id).await.unwrap();
        assert_eq!(service.validate(&store, &first).await.unwrap().id, user.id);

        service.revoke(&store, user.id, &first).await.unwrap();
        assert!(matches!(
            service.validate(&store, &first).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(service.validate(&store, &second).await.is_ok());

        service.revoke_all(&store, user.id).await.unwrap();
        assert!(service.validate(&store, &second).await.is_err());
    }

    #[actix_rt::test]
    async fn test_token_of_deleted_user_is_rejected() {
        let store = MemoryStore::new();
        let service = TokenService::new(SECRET, None);
        let user = stored_user(&store).await;
        let token = service.issue(&store, user.id).await.unwrap();

        store.delete_user(user.id).await.unwrap();
        assert!(matches!(
            service.validate(&store, &token).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
