//! Shopfront API library.
//!
//! The JSON HTTP API is built as a library so the router can be exercised
//! in tests and reused by the CLI (migrations, user management, seeding).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;
