mod account;
mod session;
mod user;

pub use {
    account::Account,
    session::{Session, SessionRecord},
    user::User,
};
