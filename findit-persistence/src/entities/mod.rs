pub mod prelude;

pub mod challenges;
pub mod credentials;
pub mod matches;
pub mod users;
