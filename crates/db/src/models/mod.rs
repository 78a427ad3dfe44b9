//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and the create DTO for inserts. Response shaping for the API lives
//! with the handlers, not here.

pub mod active_session;
pub mod user;
