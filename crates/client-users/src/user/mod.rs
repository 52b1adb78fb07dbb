//! User management module.
//!
//! Users are owned by a client. Reads go through the tagged response cache;
//! every mutation invalidates the whole user cache group.

mod error;
mod models;
mod password;
mod repository;
mod service;
mod validate;

pub use error::{INVALID_PAYLOAD_MESSAGE, UserError};
pub use models::{
    CreateUserRequest, NewUser, PageRequest, PaginationConfig, UpdateUserRequest, User, UserInfo,
    UserListQuery,
};
pub use password::{hash_password, verify_password};
pub use repository::UserRepository;
pub use service::{USERS_CACHE_TAG, UserService};
pub use validate::{Candidate, Violation, validate};
