use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

/// Bearer トークンのクレーム
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// セッション用 Bearer トークン（HS256 JWT）の発行・検証
///
/// パスワードリセットトークンとは独立した空間で、相互に流用できない
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.expose_secret().as_bytes(),
            config.bearer_token_ttl(),
        )
    }

    /// トークンを発行
    pub fn issue(&self, account_id: Uuid) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: account_id,
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = ?e, "JWT 生成エラー");
            AppError::Internal(anyhow::anyhow!("jwt encode error"))
        })
    }

    /// トークンを検証（署名・有効期限）
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(e.to_string()))
    }
}
