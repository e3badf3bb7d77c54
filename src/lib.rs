// Public API for integration tests and the bot binary

pub mod api;
pub mod chat;
pub mod commands;
pub mod config;
pub mod countdown;
pub mod engine;
pub mod error;
pub mod irc;
pub mod lang;
pub mod question;
pub mod selector;
pub mod session;
pub mod store;
