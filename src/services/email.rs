use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use time::Duration;

use crate::config::Config;
use crate::error::AppError;

const PASSWORD_RESET_SUBJECT: &str = "Password Reset Request";

/// リセットメール送信ポート
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// リセットURLを含むメールを1通送信する
    ///
    /// 失敗（タイムアウト含む）は `AppError::Delivery` で返す
    async fn send_password_reset(
        &self,
        to: &str,
        reset_url: &str,
        valid_for: Duration,
    ) -> Result<(), AppError>;
}

pub type SharedNotificationSender = Arc<dyn NotificationSender>;

/// 設定からメール送信実装を選択
///
/// SMTP_* が1つも無ければ [`LogMailer`]、1つでもあれば [`SmtpMailer`]。
/// 一部だけ設定されている場合はエラー（起動を止める）
pub fn notification_sender_from_config(
    config: &Config,
) -> Result<SharedNotificationSender, AppError> {
    if config.smtp_requested() {
        let mailer = SmtpMailer::from_config(config)?;
        tracing::info!(smtp_host = ?config.smtp_host, "SMTP 送信を有効化");
        Ok(Arc::new(mailer))
    } else {
        tracing::warn!("SMTP 未設定: リセットメールはログ出力のみ");
        Ok(Arc::new(LogMailer))
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// 有効期間の表記（例: "1 hour", "15 minutes", "1 minute 30 seconds"）
fn describe_window(valid_for: Duration) -> String {
    let secs = valid_for.whole_seconds();
    if secs < 60 {
        return plural(secs, "second");
    }
    if secs % 3600 == 0 {
        return plural(secs / 3600, "hour");
    }
    let (minutes, rest) = (secs / 60, secs % 60);
    if rest == 0 {
        plural(minutes, "minute")
    } else {
        format!("{} {}", plural(minutes, "minute"), plural(rest, "second"))
    }
}

/// 本文（テキスト, HTML）
fn password_reset_body(reset_url: &str, valid_for: Duration) -> (String, String) {
    let window = describe_window(valid_for);
    let text = format!(
        "You requested to reset your password.\n\n\
         Open the link below to choose a new password:\n{reset_url}\n\n\
         This link will expire in {window}. If you did not request a reset, ignore this email."
    );
    let html = format!(
        "<h2>Password Reset</h2>\
         <p>You requested to reset your password. Click below to reset it:</p>\
         <a href=\"{reset_url}\" target=\"_blank\">{reset_url}</a>\
         <p>This link will expire in {window}.</p>"
    );
    (text, html)
}

/// SMTP リレー経由の送信（lettre）
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    timeout: std::time::Duration,
}

impl SmtpMailer {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let (Some(host), Some(username), Some(password), Some(from)) = (
            &config.smtp_host,
            &config.smtp_username,
            &config.smtp_password,
            &config.smtp_from_address,
        ) else {
            return Err(AppError::Internal(anyhow::anyhow!(
                "SMTP settings are incomplete"
            )));
        };

        let from = from.parse::<Mailbox>().map_err(|e| {
            AppError::Internal(anyhow::anyhow!("invalid SMTP_FROM_ADDRESS: {e}"))
        })?;

        let credentials = Credentials::new(
            username.expose_secret().clone(),
            password.expose_secret().clone(),
        );
        let timeout = config.smtp_timeout();

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("SMTP relay error: {e}")))?
            .port(config.smtp_port)
            .credentials(credentials)
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            from,
            timeout,
        })
    }
}

#[async_trait]
impl NotificationSender for SmtpMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        reset_url: &str,
        valid_for: Duration,
    ) -> Result<(), AppError> {
        let to_mailbox = to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Delivery(format!("invalid recipient: {e}")))?;
        let (text, html) = password_reset_body(reset_url, valid_for);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(PASSWORD_RESET_SUBJECT)
            .multipart(MultiPart::alternative_plain_html(text, html))
            .map_err(|e| AppError::Delivery(format!("failed to build email: {e}")))?;

        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Ok(Ok(_)) => {
                tracing::info!(to = %to, "パスワードリセットメール送信");
                Ok(())
            }
            Ok(Err(e)) => Err(AppError::Delivery(format!("SMTP send failed: {e}"))),
            Err(_) => Err(AppError::Delivery(format!(
                "SMTP send timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// 開発環境用: 送信せずログ出力のみ
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl NotificationSender for LogMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        reset_url: &str,
        valid_for: Duration,
    ) -> Result<(), AppError> {
        tracing::info!(
            to = %to,
            valid_for = %describe_window(valid_for),
            "パスワードリセットメール送信（開発モード）"
        );
        // URL にはトークンが含まれるため trace レベルのみ
        tracing::trace!("リセットURL: {}", reset_url);
        Ok(())
    }
}

/// 送信済みメール（[`RecordingMailer`] が記録）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub reset_url: String,
}

impl SentEmail {
    /// URL 末尾のトークン
    pub fn token(&self) -> &str {
        self.reset_url.rsplit('/').next().unwrap_or_default()
    }
}

/// 送信内容を記録するテスト用実装
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に送信失敗を返す
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<SentEmail> {
        self.sent().pop()
    }
}

#[async_trait]
impl NotificationSender for RecordingMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        reset_url: &str,
        _valid_for: Duration,
    ) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::Delivery("simulated delivery failure".to_string()));
        }

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("mailer lock poisoned")))?;
        sent.push(SentEmail {
            to: to.to_string(),
            reset_url: reset_url.to_string(),
        });
        Ok(())
    }
}
