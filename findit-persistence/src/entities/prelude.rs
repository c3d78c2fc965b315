pub use super::challenges::Entity as Challenges;
pub use super::credentials::Entity as Credentials;
pub use super::matches::Entity as Matches;
pub use super::users::Entity as Users;
