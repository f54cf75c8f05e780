//! Request extractors.

mod auth;

pub use auth::{BRANCH_ID_HEADER, BearerToken, CallerScope, USER_ID_HEADER, USER_ROLE_HEADER};
