//! Client-scoped user management API.
//!
//! Users belong to a client and are served through a read-through response
//! cache that every mutation invalidates by tag.

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod user;
