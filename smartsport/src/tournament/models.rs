//! Tournament data models.

use crate::auth::UserId;
use crate::team::TeamId;
use crate::text_enum::text_enum;
use crate::validation::{FieldErrors, require_text};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tournament ID type
pub type TournamentId = i64;

text_enum! {
    /// How teams are paired.
    pub enum TournamentFormat {
        /// Single elimination
        Elimination => "elimination",
        /// Every team meets every other team once
        RoundRobin => "round_robin",
        /// Group stage followed by a bracket; paired by hand
        Mixed => "mixed",
    }
}

text_enum! {
    /// Tournament lifecycle state
    pub enum TournamentStatus {
        /// Accepting registrations
        Planned => "planned",
        /// In progress
        Ongoing => "ongoing",
        Finished => "finished",
        Cancelled => "cancelled",
    }
}

impl TournamentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TournamentStatus::Finished | TournamentStatus::Cancelled)
    }

    /// `planned → ongoing → finished`, with cancellation from either open state.
    pub fn can_transition_to(&self, next: TournamentStatus) -> bool {
        use TournamentStatus::*;
        matches!(
            (self, next),
            (Planned, Ongoing) | (Planned, Cancelled) | (Ongoing, Finished) | (Ongoing, Cancelled)
        )
    }
}

/// Stored tournament
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub description: String,
    pub rules: String,
    pub format: TournamentFormat,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub entry_fee_cents: i64,
    pub status: TournamentStatus,
    pub registered_count: i32,
    pub organizer_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Tournament creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rules: String,
    pub format: TournamentFormat,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub entry_fee_cents: i64,
    /// Owner; only read when an administrator creates the tournament.
    #[serde(default)]
    pub organizer_id: Option<UserId>,
}

impl NewTournament {
    /// Check field constraints relative to `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name, 100);
        if self.starts_at < now {
            errors.add("starts_at", "The start date cannot be in the past.");
        }
        check_schedule(&mut errors, self.starts_at, self.ends_at);
        check_fee(&mut errors, self.entry_fee_cents);
        errors
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TournamentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rules: Option<String>,
    pub format: Option<TournamentFormat>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub entry_fee_cents: Option<i64>,
}

impl TournamentUpdate {
    /// Apply onto `current`, returning the merged record or field errors.
    pub fn apply(self, mut current: Tournament) -> Result<Tournament, FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = self.name {
            require_text(&mut errors, "name", &name, 100);
            current.name = name;
        }
        if let Some(description) = self.description {
            current.description = description;
        }
        if let Some(rules) = self.rules {
            current.rules = rules;
        }
        if let Some(format) = self.format {
            current.format = format;
        }
        if let Some(starts_at) = self.starts_at {
            current.starts_at = starts_at;
        }
        if let Some(ends_at) = self.ends_at {
            current.ends_at = ends_at;
        }
        if let Some(fee) = self.entry_fee_cents {
            check_fee(&mut errors, fee);
            current.entry_fee_cents = fee;
        }
        check_schedule(&mut errors, current.starts_at, current.ends_at);
        errors.into_result().map(|()| current)
    }
}

fn check_schedule(errors: &mut FieldErrors, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) {
    if ends_at <= starts_at {
        errors.add("ends_at", "The end date must be after the start date.");
    }
}

fn check_fee(errors: &mut FieldErrors, fee: i64) {
    if fee < 0 {
        errors.add("entry_fee_cents", "Ensure this value is greater than or equal to 0.");
    }
}

/// List filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TournamentFilter {
    pub format: Option<TournamentFormat>,
    pub status: Option<TournamentStatus>,
    pub organizer_id: Option<UserId>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
}

/// Registrations per state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// Matches per state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCounts {
    pub planned: i64,
    pub ongoing: i64,
    pub finished: i64,
    pub cancelled: i64,
    pub postponed: i64,
}

impl MatchCounts {
    pub fn total(&self) -> i64 {
        self.planned + self.ongoing + self.finished + self.cancelled + self.postponed
    }
}

/// Aggregate view returned by the stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentStats {
    pub tournament_id: TournamentId,
    pub status: TournamentStatus,
    pub registered_count: i32,
    pub registered_teams: Vec<TeamId>,
    pub registrations: RegistrationCounts,
    pub matches: MatchCounts,
    pub total_matches: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_tournament(start_in: Duration, length: Duration) -> NewTournament {
        let starts_at = Utc::now() + start_in;
        NewTournament {
            name: "Spring Cup".to_string(),
            description: String::new(),
            rules: String::new(),
            format: TournamentFormat::RoundRobin,
            starts_at,
            ends_at: starts_at + length,
            entry_fee_cents: 0,
            organizer_id: None,
        }
    }

    #[test]
    fn test_valid_schedule_passes() {
        let t = new_tournament(Duration::days(7), Duration::days(1));
        assert!(t.validate(Utc::now()).is_empty());
    }

    #[test]
    fn test_end_not_after_start_names_end_field() {
        let same = new_tournament(Duration::days(7), Duration::zero());
        assert!(same.validate(Utc::now()).contains("ends_at"));

        let before = new_tournament(Duration::days(7), Duration::hours(-2));
        assert!(before.validate(Utc::now()).contains("ends_at"));
    }

    #[test]
    fn test_start_in_past_is_rejected() {
        let t = new_tournament(Duration::days(-1), Duration::days(2));
        assert!(t.validate(Utc::now()).contains("starts_at"));
    }

    #[test]
    fn test_negative_fee_is_rejected() {
        let mut t = new_tournament(Duration::days(1), Duration::days(1));
        t.entry_fee_cents = -1;
        assert!(t.validate(Utc::now()).contains("entry_fee_cents"));
    }

    #[test]
    fn test_status_transitions() {
        use TournamentStatus::*;
        assert!(Planned.can_transition_to(Ongoing));
        assert!(Ongoing.can_transition_to(Finished));
        assert!(Planned.can_transition_to(Cancelled));
        assert!(!Planned.can_transition_to(Finished));
        assert!(!Finished.can_transition_to(Ongoing));
        assert!(!Cancelled.can_transition_to(Planned));
        for next in TournamentStatus::ALL {
            assert!(!Finished.can_transition_to(*next));
        }
    }

    #[test]
    fn test_update_rechecks_merged_dates() {
        let now = Utc::now();
        let current = Tournament {
            id: 1,
            name: "Cup".to_string(),
            description: String::new(),
            rules: String::new(),
            format: TournamentFormat::Elimination,
            starts_at: now + Duration::days(3),
            ends_at: now + Duration::days(4),
            entry_fee_cents: 500,
            status: TournamentStatus::Planned,
            registered_count: 0,
            organizer_id: 9,
            created_at: now,
        };

        let moved_end_early = TournamentUpdate {
            ends_at: Some(now + Duration::days(2)),
            ..Default::default()
        };
        assert!(moved_end_early.apply(current.clone()).unwrap_err().contains("ends_at"));

        let renamed = TournamentUpdate {
            name: Some("Summer Cup".to_string()),
            ..Default::default()
        };
        assert_eq!(renamed.apply(current).unwrap().name, "Summer Cup");
    }

    #[test]
    fn test_format_uses_snake_case_json() {
        let json = serde_json::to_string(&TournamentFormat::RoundRobin).unwrap();
        assert_eq!(json, "\"round_robin\"");
    }
}
