//! Session and token lifecycle manager library crate.
//!
//! Turns a one-time OAuth2 authorization code into a long-lived, renewable,
//! tamper-evident cookie session, and gates every request against it.

pub mod config;
pub mod errors;
pub mod http;
pub mod notify;
pub mod oauth;
pub mod session;
pub mod storage;
