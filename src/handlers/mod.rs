pub mod health;
pub mod login;
pub mod password_reset;
pub mod protected;
pub mod register;

pub use health::{health_check, root};
pub use login::login;
pub use password_reset::{request_password_reset, reset_password};
pub use protected::protected;
pub use register::register;
