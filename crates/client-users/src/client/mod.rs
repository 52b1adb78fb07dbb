//! Client owners.
//!
//! Clients own users. The API only looks clients up; operators create them
//! from the command line.

mod models;
mod repository;

pub use models::Client;
pub use repository::ClientRepository;
