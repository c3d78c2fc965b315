pub mod challenge;
pub mod errors;
pub mod messages;
pub mod profile;
pub mod session;

pub type UserId = uuid::Uuid;
pub type SessionId = uuid::Uuid;

// Re-export all types
pub use challenge::*;
pub use errors::*;
pub use messages::*;
pub use profile::*;
pub use session::*;
