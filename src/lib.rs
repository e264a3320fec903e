pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod core;
pub mod retry;
