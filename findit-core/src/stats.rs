use findit_types::{GameMode, MatchRecord, ProfileSummary, RoundOutcome, UserProfile};

/// Points credited per object found in normal mode
pub const POINTS_PER_OBJECT: i32 = 10;

/// Matches played before per-object tracking existed are assumed to have this many objects each
const LEGACY_OBJECTS_PER_MATCH: i32 = 10;

/// Lower point bound of levels 2 through 10
const LEVEL_THRESHOLDS: [i32; 9] = [500, 1000, 2000, 3500, 5500, 8000, 11000, 15000, 20000];

/// Cumulative totals read from the profile before a session is folded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriorTotals {
    pub objects_found: i32,
    pub total_matches: i32,
    pub objects_played: Option<i32>,
}

impl PriorTotals {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            objects_found: profile.objects_found,
            total_matches: profile.total_matches,
            objects_played: profile.objects_played,
        }
    }

    /// Objects played so far. Documents that predate the field get an
    /// estimate of ten per match; this only ever applies to the first fold.
    pub fn objects_played_or_legacy(&self) -> i32 {
        self.objects_played
            .unwrap_or_else(|| self.total_matches.saturating_mul(LEGACY_OBJECTS_PER_MATCH))
    }
}

/// New cumulative values, recomputed wholesale from the prior totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsUpdate {
    pub objects_found: i32,
    pub total_matches: i32,
    pub objects_played: i32,
    pub accuracy: i32,
    /// Only normal mode rewrites cumulative points
    pub points: Option<i32>,
}

impl StatsUpdate {
    pub fn apply_to(&self, profile: &mut UserProfile) {
        profile.objects_found = self.objects_found;
        profile.total_matches = self.total_matches;
        profile.objects_played = Some(self.objects_played);
        profile.accuracy = self.accuracy;
        if let Some(points) = self.points {
            profile.points = points;
        }
    }
}

pub struct StatsEngine;

impl StatsEngine {
    /// Objects attempted in one session. A normal session always ends on one
    /// miss (wrong photo or timeout), so it attempted one more than it found.
    pub fn session_objects_played(outcome: &RoundOutcome) -> i32 {
        let streak = outcome.streak.max(0);
        match outcome.mode {
            GameMode::Normal => streak + 1,
            GameMode::TimeTrial => streak + outcome.failures.max(0),
        }
    }

    /// `round(found / played * 100)` in [0, 100], 0 when nothing was played.
    /// Halves round up, matching the client's display rounding.
    pub fn accuracy(found: i32, played: i32) -> i32 {
        if played <= 0 {
            return 0;
        }
        let found = i64::from(found.max(0));
        let played = i64::from(played);
        let rounded = (found * 200 + played) / (played * 2);
        rounded.min(100) as i32
    }

    /// Fold a finished session into the prior cumulative totals
    pub fn fold(prior: &PriorTotals, outcome: &RoundOutcome) -> StatsUpdate {
        let objects_found = prior.objects_found.saturating_add(outcome.streak.max(0));
        let total_matches = prior.total_matches.saturating_add(1);
        let objects_played = prior
            .objects_played_or_legacy()
            .saturating_add(Self::session_objects_played(outcome));
        let accuracy = Self::accuracy(objects_found, objects_played);

        let points = match outcome.mode {
            GameMode::Normal => Some(objects_found.saturating_mul(POINTS_PER_OBJECT)),
            GameMode::TimeTrial => None,
        };

        StatsUpdate {
            objects_found,
            total_matches,
            objects_played,
            accuracy,
            points,
        }
    }

    /// History entry for one session, scored on that session alone
    pub fn match_record(outcome: &RoundOutcome, played_at: String) -> MatchRecord {
        let objects_played = Self::session_objects_played(outcome);
        let correct = outcome.streak.max(0);

        let (points, failures) = match outcome.mode {
            GameMode::Normal => (correct * POINTS_PER_OBJECT, None),
            GameMode::TimeTrial => (correct, Some(outcome.failures.max(0))),
        };

        MatchRecord {
            mode: outcome.mode,
            points,
            played_at,
            correct,
            failures,
            accuracy: Self::accuracy(correct, objects_played),
            objects_played,
        }
    }

    pub fn level_for_points(points: i32) -> u8 {
        let passed = LEVEL_THRESHOLDS
            .iter()
            .take_while(|&&threshold| points >= threshold)
            .count();
        (passed + 1) as u8
    }

    pub fn summarize(profile: &UserProfile) -> ProfileSummary {
        ProfileSummary {
            name: profile.name.clone(),
            points: profile.points,
            level: Self::level_for_points(profile.points),
            objects_found: profile.objects_found,
            accuracy: profile.accuracy.clamp(0, 100),
            total_matches: profile.total_matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use findit_types::EndReason;

    fn outcome(mode: GameMode, streak: i32, failures: i32) -> RoundOutcome {
        RoundOutcome {
            mode,
            streak,
            failures,
            elapsed_seconds: 120,
            remaining_seconds: 0,
            end_reason: EndReason::TimedOut,
        }
    }

    #[test]
    fn test_normal_fold_example() {
        let prior = PriorTotals {
            objects_found: 5,
            total_matches: 2,
            objects_played: Some(20),
        };

        let update = StatsEngine::fold(&prior, &outcome(GameMode::Normal, 3, 0));

        assert_eq!(update.objects_found, 8);
        assert_eq!(update.total_matches, 3);
        assert_eq!(update.objects_played, 24);
        assert_eq!(update.accuracy, 33);
        assert_eq!(update.points, Some(80));
    }

    #[test]
    fn test_time_trial_fold_leaves_points_alone() {
        let prior = PriorTotals {
            objects_found: 10,
            total_matches: 4,
            objects_played: Some(30),
        };

        let update = StatsEngine::fold(&prior, &outcome(GameMode::TimeTrial, 6, 4));

        assert_eq!(update.objects_found, 16);
        assert_eq!(update.total_matches, 5);
        assert_eq!(update.objects_played, 40);
        assert_eq!(update.accuracy, 40);
        assert_eq!(update.points, None);
    }

    #[test]
    fn test_session_objects_played_per_mode() {
        assert_eq!(StatsEngine::session_objects_played(&outcome(GameMode::Normal, 0, 0)), 1);
        assert_eq!(StatsEngine::session_objects_played(&outcome(GameMode::Normal, 7, 0)), 8);
        // Normal mode ignores any failure count
        assert_eq!(StatsEngine::session_objects_played(&outcome(GameMode::Normal, 7, 3)), 8);
        assert_eq!(StatsEngine::session_objects_played(&outcome(GameMode::TimeTrial, 0, 0)), 0);
        assert_eq!(StatsEngine::session_objects_played(&outcome(GameMode::TimeTrial, 5, 2)), 7);
    }

    #[test]
    fn test_accuracy_rounding_and_bounds() {
        assert_eq!(StatsEngine::accuracy(0, 0), 0);
        assert_eq!(StatsEngine::accuracy(5, 0), 0);
        assert_eq!(StatsEngine::accuracy(1, 3), 33);
        assert_eq!(StatsEngine::accuracy(2, 3), 67);
        assert_eq!(StatsEngine::accuracy(1, 8), 13); // 12.5 rounds up
        assert_eq!(StatsEngine::accuracy(3, 3), 100);
        // Inconsistent legacy data never pushes accuracy past 100
        assert_eq!(StatsEngine::accuracy(12, 10), 100);
    }

    #[test]
    fn test_accuracy_always_within_bounds() {
        for played in 0..60 {
            for found in 0..=played {
                let accuracy = StatsEngine::accuracy(found, played);
                assert!((0..=100).contains(&accuracy), "{found}/{played} gave {accuracy}");
            }
        }
    }

    #[test]
    fn test_legacy_objects_played_fallback() {
        let prior = PriorTotals {
            objects_found: 12,
            total_matches: 3,
            objects_played: None,
        };
        assert_eq!(prior.objects_played_or_legacy(), 30);

        let update = StatsEngine::fold(&prior, &outcome(GameMode::Normal, 2, 0));
        assert_eq!(update.objects_played, 33);
        assert_eq!(update.accuracy, 42);

        // A recorded zero is real data, not a missing field
        let prior = PriorTotals {
            objects_found: 0,
            total_matches: 3,
            objects_played: Some(0),
        };
        assert_eq!(prior.objects_played_or_legacy(), 0);
    }

    #[test]
    fn test_first_session_with_no_attempts() {
        let update = StatsEngine::fold(&PriorTotals::default(), &outcome(GameMode::TimeTrial, 0, 0));
        assert_eq!(update.objects_played, 0);
        assert_eq!(update.accuracy, 0);
        assert_eq!(update.total_matches, 1);
    }

    #[test]
    fn test_points_are_recomputed_not_accumulated() {
        let mut profile = UserProfile::new(
            uuid::Uuid::new_v4(),
            "Lucia".to_string(),
            "+34600000000".to_string(),
            "lucia@example.com".to_string(),
            "2024-01-01T00:00:00Z".to_string(),
        );
        // Points drifted from some older scoring rule
        profile.points = 999;
        profile.objects_found = 4;
        profile.objects_played = Some(6);

        let update = StatsEngine::fold(
            &PriorTotals::from_profile(&profile),
            &outcome(GameMode::Normal, 1, 0),
        );
        update.apply_to(&mut profile);

        assert_eq!(profile.points, 50);
        assert_eq!(profile.objects_played, Some(8));
    }

    #[test]
    fn test_match_records() {
        let normal = StatsEngine::match_record(&outcome(GameMode::Normal, 3, 0), "t".to_string());
        assert_eq!(normal.points, 30);
        assert_eq!(normal.correct, 3);
        assert_eq!(normal.failures, None);
        assert_eq!(normal.objects_played, 4);
        assert_eq!(normal.accuracy, 75);

        let trial = StatsEngine::match_record(&outcome(GameMode::TimeTrial, 3, 1), "t".to_string());
        assert_eq!(trial.points, 3);
        assert_eq!(trial.failures, Some(1));
        assert_eq!(trial.objects_played, 4);
        assert_eq!(trial.accuracy, 75);
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(StatsEngine::level_for_points(0), 1);
        assert_eq!(StatsEngine::level_for_points(499), 1);
        assert_eq!(StatsEngine::level_for_points(500), 2);
        assert_eq!(StatsEngine::level_for_points(1999), 3);
        assert_eq!(StatsEngine::level_for_points(3500), 5);
        assert_eq!(StatsEngine::level_for_points(14999), 8);
        assert_eq!(StatsEngine::level_for_points(19999), 9);
        assert_eq!(StatsEngine::level_for_points(20000), 10);
        assert_eq!(StatsEngine::level_for_points(1_000_000), 10);
    }
}
