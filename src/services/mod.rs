pub mod auth;
pub mod email;
pub mod password_reset;
pub mod token;

pub use auth::AuthService;
pub use email::{
    LogMailer, NotificationSender, RecordingMailer, SharedNotificationSender, SmtpMailer,
};
pub use password_reset::PasswordResetService;
pub use token::TokenIssuer;
