//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate the database and the upstream social APIs.

mod clients;
mod identity;
mod user;

pub use clients::UserClients;
pub use identity::IdentityLinker;
pub use user::UserService;
