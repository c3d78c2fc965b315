use findit_types::Challenge;
use rand::Rng;
use rand::seq::SliceRandom;

/// The active challenges a round can be drawn from
#[derive(Debug, Clone, Default)]
pub struct ChallengeDeck {
    challenges: Vec<Challenge>,
}

impl ChallengeDeck {
    /// Build a deck from whatever the challenge source returned, keeping only active entries
    pub fn new(challenges: Vec<Challenge>) -> Self {
        let challenges = challenges
            .into_iter()
            .filter(|challenge| challenge.active)
            .collect();

        Self { challenges }
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    /// Uniformly random draw. `None` when the deck is empty.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Challenge> {
        self.challenges.choose(rng)
    }
}
