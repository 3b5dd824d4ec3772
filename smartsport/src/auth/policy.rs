//! Role-based authorization table.
//!
//! Every role rule of the API lives in [`Policy::allows`]. Handlers ask once
//! at the boundary; ownership ("this organizer owns that tournament") is
//! checked afterwards by the managers, which have the rows at hand.

use super::models::{Actor, Role};
use std::fmt;

/// Kinds of records exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    User,
    PlayerProfile,
    OrganizerProfile,
    RefereeProfile,
    Team,
    TeamMember,
    Tournament,
    Registration,
    Match,
    Payment,
    Faq,
    Dashboard,
}

impl Resource {
    /// Catalog data readable without a token.
    pub fn is_publicly_readable(&self) -> bool {
        matches!(
            self,
            Resource::OrganizerProfile
                | Resource::RefereeProfile
                | Resource::Team
                | Resource::TeamMember
                | Resource::Tournament
                | Resource::Match
                | Resource::Faq
        )
    }
}

/// Operations a role may be granted on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    ChangeStatus,
    GenerateMatches,
    RegisterTeam,
    RegisterPlayer,
    Decide,
    SubmitScore,
}

/// Authorization refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denied {
    pub role: Role,
    pub resource: Resource,
    pub action: Action,
}

impl fmt::Display for Denied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "role {} may not perform {:?} on {:?}",
            self.role, self.action, self.resource
        )
    }
}

impl std::error::Error for Denied {}

pub struct Policy;

impl Policy {
    /// Whether `role` may perform `action` on `resource`.
    pub fn allows(role: Role, resource: Resource, action: Action) -> bool {
        use Action::*;
        use Resource::*;
        use Role::*;

        if action == Read && resource.is_publicly_readable() {
            return true;
        }

        match (resource, action) {
            (User, Read) => true,
            (User, Create | Update | Delete) => role == Administrator,

            (PlayerProfile, Read) => true,
            (PlayerProfile, Update) => matches!(role, Player | Administrator),

            (OrganizerProfile, Update) => matches!(role, Organizer | Administrator),
            (RefereeProfile, Update) => role == Administrator,

            (Team | TeamMember, Create | Update | Delete) => {
                matches!(role, Organizer | Administrator)
            }

            (
                Tournament,
                Create | Update | Delete | ChangeStatus | GenerateMatches | RegisterTeam,
            ) => matches!(role, Organizer | Administrator),
            (Tournament, RegisterPlayer) => role == Player,

            (Registration, Read) => matches!(role, Player | Organizer | Administrator),
            (Registration, Create) => role == Player,
            (Registration, Decide) => matches!(role, Organizer | Administrator),

            (Match, Create | Update | Delete) => {
                matches!(role, Organizer | Referee | Administrator)
            }
            (Match, SubmitScore) => matches!(role, Referee | Administrator),

            (Payment, Read | Create) => matches!(role, Player | Administrator),
            (Payment, Update | Delete) => role == Administrator,

            (Faq, Create | Update | Delete) => role == Administrator,

            (Dashboard, Read) => role == Administrator,

            _ => false,
        }
    }

    /// [`Policy::allows`] as a `Result`.
    pub fn check(actor: &Actor, resource: Resource, action: Action) -> Result<(), Denied> {
        if Self::allows(actor.role, resource, action) {
            Ok(())
        } else {
            Err(Denied {
                role: actor.role,
                resource,
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITES: [Action; 3] = [Action::Create, Action::Update, Action::Delete];

    #[test]
    fn test_only_administrators_write_faq() {
        for role in Role::ALL {
            for action in WRITES {
                assert_eq!(
                    Policy::allows(*role, Resource::Faq, action),
                    *role == Role::Administrator,
                    "{role} {action:?}"
                );
            }
        }
    }

    #[test]
    fn test_catalog_reads_are_open_to_every_role() {
        for role in Role::ALL {
            for resource in [Resource::Tournament, Resource::Team, Resource::Match, Resource::Faq] {
                assert!(Policy::allows(*role, resource, Action::Read));
            }
        }
    }

    #[test]
    fn test_administrators_are_admitted_where_organizers_are() {
        for action in [Action::Create, Action::Update, Action::ChangeStatus, Action::GenerateMatches] {
            assert!(Policy::allows(Role::Organizer, Resource::Tournament, action));
            assert!(Policy::allows(Role::Administrator, Resource::Tournament, action));
            assert!(!Policy::allows(Role::Player, Resource::Tournament, action));
            assert!(!Policy::allows(Role::Referee, Resource::Tournament, action));
        }
    }

    #[test]
    fn test_score_submission_is_for_referees_and_administrators() {
        assert!(Policy::allows(Role::Referee, Resource::Match, Action::SubmitScore));
        assert!(Policy::allows(Role::Administrator, Resource::Match, Action::SubmitScore));
        assert!(!Policy::allows(Role::Organizer, Resource::Match, Action::SubmitScore));
        assert!(!Policy::allows(Role::Player, Resource::Match, Action::SubmitScore));
    }

    #[test]
    fn test_only_players_register_for_tournaments() {
        for role in Role::ALL {
            assert_eq!(
                Policy::allows(*role, Resource::Registration, Action::Create),
                *role == Role::Player
            );
        }
        assert!(Policy::allows(Role::Organizer, Resource::Registration, Action::Decide));
        assert!(!Policy::allows(Role::Player, Resource::Registration, Action::Decide));
        assert!(!Policy::allows(Role::Referee, Resource::Registration, Action::Read));
    }

    #[test]
    fn test_dashboard_is_administrator_only() {
        for role in Role::ALL {
            assert_eq!(
                Policy::allows(*role, Resource::Dashboard, Action::Read),
                *role == Role::Administrator
            );
        }
    }

    #[test]
    fn test_check_reports_the_refused_triple() {
        let actor = Actor::new(7, Role::Referee);
        let denied = Policy::check(&actor, Resource::Payment, Action::Create).unwrap_err();
        assert_eq!(denied.role, Role::Referee);
        assert_eq!(denied.resource, Resource::Payment);
        assert!(denied.to_string().contains("referee"));
    }
}
