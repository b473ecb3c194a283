pub mod api;
pub mod app;
pub mod auth;
pub mod chunk;
pub mod config;
pub mod global;
pub mod pipeline;
pub mod session;
pub mod transcribe;
pub mod transform;
pub mod zoom;
