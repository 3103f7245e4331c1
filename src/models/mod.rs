pub mod account;

pub use account::{Account, AccountView, NewAccount, normalize_email};
