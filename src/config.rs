use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    // Bearer トークン設定
    /// HS256 署名鍵
    pub jwt_secret: SecretBox<String>,
    #[serde(default = "default_bearer_token_ttl_secs")]
    pub bearer_token_ttl_secs: i64,

    // SMTP設定（オプション - 未設定時はログ出力のみ）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default)]
    pub smtp_from_address: Option<String>,
    /// SMTP送信のタイムアウト（秒）
    #[serde(default = "default_smtp_timeout_secs")]
    pub smtp_timeout_secs: u64,

    // パスワードリセット設定
    #[serde(default)]
    pub password_reset_url_base: Option<String>,
    #[serde(default = "default_password_reset_token_ttl_secs")]
    pub password_reset_token_ttl_secs: i64,

    /// カンマ区切りの許可オリジン（未設定なら全許可）
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BEARER_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS: i64 = 3600;
const DEFAULT_PASSWORD_RESET_URL_BASE: &str = "http://localhost:3000/reset-password";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_database_max_connections() -> u32 {
    DEFAULT_DATABASE_MAX_CONNECTIONS
}

fn default_bearer_token_ttl_secs() -> i64 {
    DEFAULT_BEARER_TOKEN_TTL_SECS
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_smtp_timeout_secs() -> u64 {
    DEFAULT_SMTP_TIMEOUT_SECS
}

fn default_password_reset_token_ttl_secs() -> i64 {
    DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS
}

impl Config {
    /// 環境変数から設定を読み込む
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env::<Self>()?.validated()
    }

    /// 任意のキー/値ペアから設定を構築（テスト・組み込み用）
    ///
    /// キーは環境変数と同じ大文字表記で渡す
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        envy::from_iter::<_, Self>(vars.into_iter().map(|(k, v)| (k.into(), v.into())))?
            .validated()
    }

    /// 値の範囲チェック（TTL は正の値のみ）
    fn validated(self) -> Result<Self, envy::Error> {
        if self.password_reset_token_ttl_secs <= 0 {
            return Err(envy::Error::Custom(format!(
                "PASSWORD_RESET_TOKEN_TTL_SECS must be positive, got {}",
                self.password_reset_token_ttl_secs
            )));
        }
        if self.bearer_token_ttl_secs <= 0 {
            return Err(envy::Error::Custom(format!(
                "BEARER_TOKEN_TTL_SECS must be positive, got {}",
                self.bearer_token_ttl_secs
            )));
        }
        Ok(self)
    }

    pub fn password_reset_token_ttl(&self) -> time::Duration {
        time::Duration::seconds(self.password_reset_token_ttl_secs)
    }

    pub fn bearer_token_ttl(&self) -> time::Duration {
        time::Duration::seconds(self.bearer_token_ttl_secs)
    }

    pub fn smtp_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.smtp_timeout_secs)
    }

    /// リセットURLのベース（末尾スラッシュなし）
    pub fn password_reset_url_base(&self) -> String {
        self.password_reset_url_base
            .as_deref()
            .unwrap_or(DEFAULT_PASSWORD_RESET_URL_BASE)
            .trim_end_matches('/')
            .to_string()
    }

    /// SMTP送信に必要な項目が全て揃っているか
    pub fn smtp_configured(&self) -> bool {
        self.smtp_host.is_some()
            && self.smtp_username.is_some()
            && self.smtp_password.is_some()
            && self.smtp_from_address.is_some()
    }

    /// SMTP_* のいずれか1つでも設定されているか
    pub fn smtp_requested(&self) -> bool {
        self.smtp_host.is_some()
            || self.smtp_username.is_some()
            || self.smtp_password.is_some()
            || self.smtp_from_address.is_some()
    }

    pub fn cors_allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://localhost/eden"),
            ("JWT_SECRET", "test-secret"),
        ]
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_vars(required()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.password_reset_token_ttl_secs, 3600);
        assert_eq!(config.bearer_token_ttl_secs, 604_800);
        assert_eq!(config.smtp_timeout_secs, 10);
        assert_eq!(config.jwt_secret.expose_secret(), "test-secret");
        assert!(!config.smtp_configured());
        assert_eq!(
            config.password_reset_url_base(),
            "http://localhost:3000/reset-password"
        );
    }

    #[test]
    fn test_missing_jwt_secret_is_error() {
        let result = Config::from_vars([("DATABASE_URL", "postgres://localhost/eden")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_reset_url_base_trailing_slash_trimmed() {
        let mut vars = required();
        vars.push(("PASSWORD_RESET_URL_BASE", "https://eden.example/reset/"));
        let config = Config::from_vars(vars).unwrap();
        assert_eq!(config.password_reset_url_base(), "https://eden.example/reset");
    }

    #[test]
    fn test_cors_origins_split() {
        let mut vars = required();
        vars.push((
            "CORS_ALLOWED_ORIGINS",
            "https://a.example, https://b.example,,",
        ));
        let config = Config::from_vars(vars).unwrap();
        assert_eq!(
            config.cors_allowed_origins(),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_smtp_configured_requires_all_fields() {
        let mut vars = required();
        vars.push(("SMTP_HOST", "smtp.example.com"));
        vars.push(("SMTP_USERNAME", "mailer"));
        let partial = Config::from_vars(vars.clone()).unwrap();
        assert!(!partial.smtp_configured());

        vars.push(("SMTP_PASSWORD", "pw"));
        vars.push(("SMTP_FROM_ADDRESS", "noreply@example.com"));
        let full = Config::from_vars(vars).unwrap();
        assert!(full.smtp_configured());
    }

    #[test]
    fn test_smtp_requested_with_single_key() {
        let mut vars = required();
        assert!(!Config::from_vars(vars.clone()).unwrap().smtp_requested());

        vars.push(("SMTP_FROM_ADDRESS", "noreply@example.com"));
        let config = Config::from_vars(vars).unwrap();
        assert!(config.smtp_requested());
        assert!(!config.smtp_configured());
    }

    #[test]
    fn test_non_positive_reset_ttl_rejected() {
        for ttl in ["0", "-60"] {
            let mut vars = required();
            vars.push(("PASSWORD_RESET_TOKEN_TTL_SECS", ttl));
            assert!(Config::from_vars(vars).is_err(), "ttl {ttl} accepted");
        }
    }

    #[test]
    fn test_non_positive_bearer_ttl_rejected() {
        let mut vars = required();
        vars.push(("BEARER_TOKEN_TTL_SECS", "0"));
        assert!(Config::from_vars(vars).is_err());
    }
}
