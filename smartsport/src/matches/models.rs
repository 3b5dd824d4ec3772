//! Match data models and lifecycle rules.

use crate::auth::UserId;
use crate::team::TeamId;
use crate::text_enum::text_enum;
use crate::tournament::TournamentId;
use crate::validation::FieldErrors;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Match ID type
pub type MatchId = i64;

text_enum! {
    /// Match lifecycle state
    pub enum MatchStatus {
        Planned => "planned",
        Ongoing => "ongoing",
        Finished => "finished",
        Cancelled => "cancelled",
        Postponed => "postponed",
    }
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Finished | MatchStatus::Cancelled)
    }

    /// Whether a final score may still be recorded.
    pub fn accepts_score(&self) -> bool {
        !self.is_terminal()
    }

    /// Moves allowed through a plain edit. Finishing a match that has not
    /// started goes through score submission instead.
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        use MatchStatus::*;
        match self {
            Planned => matches!(next, Ongoing | Postponed | Cancelled),
            Ongoing => matches!(next, Finished | Postponed | Cancelled),
            Postponed => matches!(next, Planned | Ongoing | Cancelled),
            Finished | Cancelled => false,
        }
    }
}

/// A game between two teams within a tournament
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub score1: Option<i32>,
    pub score2: Option<i32>,
    pub status: MatchStatus,
    pub team1_id: TeamId,
    pub team2_id: TeamId,
    pub referee_id: Option<UserId>,
    pub venue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMatch {
    pub tournament_id: TournamentId,
    /// Defaults to "<team1> vs <team2>"
    #[serde(default)]
    pub name: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    pub team1_id: TeamId,
    pub team2_id: TeamId,
    #[serde(default)]
    pub referee_id: Option<UserId>,
    #[serde(default)]
    pub venue: String,
}

impl NewMatch {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.team1_id == self.team2_id {
            errors.add("team2_id", "A match needs two different teams.");
        }
        check_duration(&mut errors, self.duration_minutes);
        if self.name.as_deref().is_some_and(|n| n.chars().count() > 100) {
            errors.add("name", "Ensure this field has no more than 100 characters.");
        }
        errors
    }
}

/// Partial edit of a match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchUpdate {
    pub name: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub score1: Option<i32>,
    pub score2: Option<i32>,
    pub status: Option<MatchStatus>,
    /// Absent leaves the referee alone; `null` unassigns.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub referee_id: Option<Option<UserId>>,
    pub venue: Option<String>,
}

/// Maps a field that is present in the body, `null` included, to `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl MatchUpdate {
    fn touches_result(&self) -> bool {
        self.score1.is_some() || self.score2.is_some() || self.status.is_some()
    }

    /// Merge onto `current`. Results of a finished match are frozen, and
    /// status changes must follow [`MatchStatus::can_transition_to`].
    pub fn apply(self, mut current: Match) -> Result<Match, FieldErrors> {
        let mut errors = FieldErrors::new();

        if current.status == MatchStatus::Finished && self.touches_result() {
            return Err(FieldErrors::single(
                "status",
                "The match is finished; its score and status can no longer change.",
            ));
        }
        if let Some(next) = self.status {
            if next != current.status && !current.status.can_transition_to(next) {
                errors.add(
                    "status",
                    format!("Cannot move a match from {} to {}.", current.status, next),
                );
            }
            current.status = next;
        }

        if let Some(name) = self.name {
            current.name = name.trim().to_string();
        }
        if let Some(at) = self.scheduled_at {
            current.scheduled_at = at;
        }
        if self.duration_minutes.is_some() {
            check_duration(&mut errors, self.duration_minutes);
            current.duration_minutes = self.duration_minutes;
        }
        if let Some(score) = self.score1 {
            check_score(&mut errors, "score1", score);
            current.score1 = Some(score);
        }
        if let Some(score) = self.score2 {
            check_score(&mut errors, "score2", score);
            current.score2 = Some(score);
        }
        if let Some(referee_id) = self.referee_id {
            current.referee_id = referee_id;
        }
        if let Some(venue) = self.venue {
            current.venue = venue;
        }

        if current.status == MatchStatus::Finished {
            for (field, score) in [("score1", current.score1), ("score2", current.score2)] {
                if score.is_none() {
                    errors.add(field, "A finished match needs both scores.");
                }
            }
        }

        errors.into_result().map(|()| current)
    }
}

/// Final score reported by a referee
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub score1: Option<i32>,
    pub score2: Option<i32>,
}

impl ScoreSubmission {
    /// Both scores, once present and non-negative.
    pub fn validate(&self) -> Result<(i32, i32), FieldErrors> {
        let mut errors = FieldErrors::new();
        for (field, score) in [("score1", self.score1), ("score2", self.score2)] {
            match score {
                None => errors.add(field, "This field is required."),
                Some(value) => check_score(&mut errors, field, value),
            }
        }
        errors.into_result()?;
        match (self.score1, self.score2) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(FieldErrors::single("score1", "This field is required.")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchFilter {
    pub tournament_id: Option<TournamentId>,
    pub status: Option<MatchStatus>,
    /// Matches where the team plays on either side
    pub team_id: Option<TeamId>,
}

/// Options for bulk match generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateMatches {
    /// First kickoff; the tournament start when absent
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    /// Minutes between consecutive kickoffs (default 60)
    #[serde(default)]
    pub spacing_minutes: Option<i64>,
    #[serde(default)]
    pub referee_id: Option<UserId>,
}

pub const DEFAULT_SPACING_MINUTES: i64 = 60;

/// Longest gap allowed between generated kickoffs: one week.
pub const MAX_SPACING_MINUTES: i64 = 7 * 24 * 60;

impl GenerateMatches {
    /// Requested spacing, defaulted and bounded.
    pub fn spacing(&self) -> Result<i64, FieldErrors> {
        let spacing = self.spacing_minutes.unwrap_or(DEFAULT_SPACING_MINUTES);
        if spacing <= 0 {
            return Err(FieldErrors::single(
                "spacing_minutes",
                "Ensure this value is greater than 0.",
            ));
        }
        if spacing > MAX_SPACING_MINUTES {
            return Err(FieldErrors::single(
                "spacing_minutes",
                format!("Ensure this value is less than or equal to {MAX_SPACING_MINUTES}."),
            ));
        }
        Ok(spacing)
    }
}

/// Kickoff of the `slot`-th generated match; `None` when out of range.
pub fn kickoff(start: DateTime<Utc>, spacing_minutes: i64, slot: usize) -> Option<DateTime<Utc>> {
    let minutes = i64::try_from(slot).ok()?.checked_mul(spacing_minutes)?;
    start.checked_add_signed(TimeDelta::try_minutes(minutes)?)
}

/// Result of a generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedMatches {
    pub tournament_id: TournamentId,
    pub matches: Vec<Match>,
    /// Team left unpaired by an odd elimination bracket
    pub bye_team_id: Option<TeamId>,
}

fn check_duration(errors: &mut FieldErrors, duration: Option<i32>) {
    if duration.is_some_and(|d| d < 0) {
        errors.add("duration_minutes", "Ensure this value is greater than or equal to 0.");
    }
}

fn check_score(errors: &mut FieldErrors, field: &str, score: i32) {
    if score < 0 {
        errors.add(field, "Ensure this value is greater than or equal to 0.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(status: MatchStatus) -> Match {
        Match {
            id: 1,
            tournament_id: 1,
            name: "Owls vs Foxes".to_string(),
            scheduled_at: Utc::now(),
            duration_minutes: Some(90),
            score1: None,
            score2: None,
            status,
            team1_id: 10,
            team2_id: 11,
            referee_id: None,
            venue: String::new(),
        }
    }

    #[test]
    fn test_same_team_twice_is_rejected() {
        let m = NewMatch {
            tournament_id: 1,
            name: None,
            scheduled_at: Utc::now(),
            duration_minutes: None,
            team1_id: 4,
            team2_id: 4,
            referee_id: None,
            venue: String::new(),
        };
        assert!(m.validate().contains("team2_id"));
    }

    #[test]
    fn test_terminal_states_admit_no_transition() {
        for next in MatchStatus::ALL {
            assert!(!MatchStatus::Finished.can_transition_to(*next));
            assert!(!MatchStatus::Cancelled.can_transition_to(*next));
        }
        assert!(MatchStatus::Postponed.can_transition_to(MatchStatus::Planned));
        assert!(!MatchStatus::Planned.can_transition_to(MatchStatus::Finished));
    }

    #[test]
    fn test_finished_match_rejects_score_edit() {
        let mut finished = current(MatchStatus::Finished);
        finished.score1 = Some(2);
        finished.score2 = Some(1);

        let edit = MatchUpdate {
            score1: Some(5),
            ..Default::default()
        };
        assert!(edit.apply(finished.clone()).unwrap_err().contains("status"));

        let venue_only = MatchUpdate {
            venue: Some("Hall B".to_string()),
            ..Default::default()
        };
        let updated = venue_only.apply(finished).unwrap();
        assert_eq!(updated.score1, Some(2));
        assert_eq!(updated.venue, "Hall B");
    }

    #[test]
    fn test_finishing_by_edit_requires_scores() {
        let edit = MatchUpdate {
            status: Some(MatchStatus::Finished),
            ..Default::default()
        };
        let errors = edit.apply(current(MatchStatus::Ongoing)).unwrap_err();
        assert!(errors.contains("score1"));
        assert!(errors.contains("score2"));
    }

    #[test]
    fn test_score_submission_requires_both_non_negative_scores() {
        let missing = ScoreSubmission {
            score1: Some(2),
            score2: None,
        };
        assert!(missing.validate().unwrap_err().contains("score2"));

        let negative = ScoreSubmission {
            score1: Some(-1),
            score2: Some(0),
        };
        assert!(negative.validate().unwrap_err().contains("score1"));

        let ok = ScoreSubmission {
            score1: Some(0),
            score2: Some(0),
        };
        assert_eq!(ok.validate().unwrap(), (0, 0));
    }

    #[test]
    fn test_spacing_is_bounded() {
        assert_eq!(GenerateMatches::default().spacing().unwrap(), DEFAULT_SPACING_MINUTES);

        let week = GenerateMatches {
            spacing_minutes: Some(MAX_SPACING_MINUTES),
            ..Default::default()
        };
        assert_eq!(week.spacing().unwrap(), MAX_SPACING_MINUTES);

        let huge = GenerateMatches {
            spacing_minutes: Some(i64::MAX),
            ..Default::default()
        };
        assert!(huge.spacing().unwrap_err().contains("spacing_minutes"));
    }

    #[test]
    fn test_kickoff_out_of_range_is_none() {
        let start = Utc::now();
        assert_eq!(kickoff(start, 30, 2), Some(start + TimeDelta::minutes(60)));
        assert_eq!(kickoff(start, i64::MAX, 2), None);
        assert_eq!(kickoff(DateTime::<Utc>::MAX_UTC, 1, 1), None);
    }

    #[test]
    fn test_null_referee_unassigns() {
        let mut assigned = current(MatchStatus::Planned);
        assigned.referee_id = Some(9);

        let untouched: MatchUpdate = serde_json::from_str(r#"{"venue":"Hall C"}"#).unwrap();
        assert_eq!(untouched.apply(assigned.clone()).unwrap().referee_id, Some(9));

        let reassigned: MatchUpdate = serde_json::from_str(r#"{"referee_id":12}"#).unwrap();
        assert_eq!(reassigned.apply(assigned.clone()).unwrap().referee_id, Some(12));

        let cleared: MatchUpdate = serde_json::from_str(r#"{"referee_id":null}"#).unwrap();
        assert_eq!(cleared.referee_id, Some(None));
        assert_eq!(cleared.apply(assigned).unwrap().referee_id, None);
    }
}
