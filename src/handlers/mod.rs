// src/handlers/mod.rs
pub mod auth;
pub mod chat;
pub mod profile;
pub mod status;
pub mod ui;
