// src/session/mod.rs
pub mod anti_forgery;
pub mod error_slot;
pub mod token_store;

pub use anti_forgery::AntiForgeryStore;
pub use error_slot::AuthErrorSlot;
pub use token_store::{Session, TokenStore};
