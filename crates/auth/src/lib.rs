use argon2::password_hash::{Error as PasswordHashError, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60 * 24;

#[derive(Clone)]
pub struct JwtKeys {
    pub enc: EncodingKey,
    pub dec: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret.as_bytes()),
            dec: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
}

pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

pub fn sign(
    keys: &JwtKeys,
    user_id: Uuid,
    email: &str,
    role: &str,
    ttl_secs: i64,
) -> Result<String, AuthError> {
    let iat = now_ts();
    let claims = Claims {
        sub: user_id,
        email: email.into(),
        role: role.into(),
        iat,
        exp: iat + ttl_secs,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.enc)
        .map_err(|_| AuthError::InvalidToken)
}

pub fn verify(keys: &JwtKeys, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    jsonwebtoken::decode::<Claims>(token, &keys.dec, &validation)
        .map(|d| d.claims)
        .map_err(|_| AuthError::InvalidToken)
}

pub fn hash_password(raw: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut thread_rng());
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(raw.as_bytes(), &salt)?.to_string();
    Ok(hash)
}

pub fn verify_password(raw: &str, hash: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        Argon2::default()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok()
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let keys = JwtKeys::from_secret("test-secret");
        let id = Uuid::new_v4();
        let token = sign(&keys, id, "doc@clinic.test", "doctor", 3600).unwrap();
        let claims = verify(&keys, &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "doc@clinic.test");
        assert_eq!(claims.role, "doctor");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let keys = JwtKeys::from_secret("secret-a");
        let other = JwtKeys::from_secret("secret-b");
        let token = sign(&keys, Uuid::new_v4(), "a@b.c", "staff", 3600).unwrap();
        assert!(verify(&other, &token).is_err());
    }

    #[test]
    fn verify_rejects_expired() {
        let keys = JwtKeys::from_secret("test-secret");
        let token = sign(&keys, Uuid::new_v4(), "a@b.c", "staff", -120).unwrap();
        assert!(verify(&keys, &token).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("supersecret").unwrap();
        assert!(verify_password("supersecret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("supersecret", "not-a-phc-string"));
    }
}
