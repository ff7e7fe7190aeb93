// src/client/mod.rs
//! State the screens keep between requests, as explicit objects over a
//! key-value store and the JSON API.
pub mod account;
pub mod api;
pub mod conversation;
pub mod form;
pub mod profile;
pub mod storage;
pub mod system_prompt;
