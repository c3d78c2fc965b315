pub mod challenge_deck;
pub mod cleanup;
pub mod collaborators;
pub mod labels;
pub mod session;
pub mod session_events;
pub mod stats;
pub mod validation;

// Re-export main components
pub use challenge_deck::*;
pub use cleanup::*;
pub use collaborators::*;
pub use labels::*;
pub use session::*;
pub use session_events::*;
pub use stats::*;
pub use validation::*;
