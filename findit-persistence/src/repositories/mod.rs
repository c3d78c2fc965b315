pub mod challenge_repository;
pub mod credential_repository;
pub mod match_repository;
pub mod user_repository;

pub use challenge_repository::ChallengeRepository;
pub use credential_repository::{CredentialRepository, StoredCredential};
pub use match_repository::MatchRepository;
pub use user_repository::UserRepository;
