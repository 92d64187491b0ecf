//! `pharmacy-auth` — account identity records.
//!
//! Credential hashing and token issuance live outside this workspace; this
//! crate only models the persisted user and its role.

pub mod roles;
pub mod user;

pub use roles::Role;
pub use user::{NewUser, PasswordCredential, User};
