//! Database-backed workflow tests.
//!
//! These need a PostgreSQL instance at `DATABASE_URL` and are ignored by
//! default. Run with `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use serial_test::serial;
use smartsport::auth::{Actor, AuthManager, RegisterRequest, Role};
use smartsport::db::{Database, DatabaseConfig};
use smartsport::matches::{
    GenerateMatches, MatchError, MatchManager, MatchStatus, MatchUpdate, NewMatch, ScoreSubmission,
};
use smartsport::registration::{
    Decision, NewRegistration, RegistrationError, RegistrationForm, RegistrationManager,
    RegistrationStatus,
};
use smartsport::team::{NewTeam, TeamManager};
use smartsport::tournament::{NewTournament, TournamentFormat, TournamentManager};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;

struct Fixture {
    auth: AuthManager,
    teams: TeamManager,
    tournaments: TournamentManager,
    registrations: RegistrationManager,
    matches: MatchManager,
}

/// Helper to create a migrated test database pool
async fn setup_test_db() -> Arc<PgPool> {
    let config = DatabaseConfig::from_env().with_url(
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://postgres@localhost/smartsport_test".to_string()),
    );
    let db = Database::new(&config)
        .await
        .expect("Failed to create test database");
    db.migrate().await.expect("Failed to apply schema");
    Arc::new(db.pool().clone())
}

async fn setup() -> Fixture {
    let pool = setup_test_db().await;
    Fixture {
        auth: AuthManager::new(
            pool.clone(),
            "integration-pepper-0123".to_string(),
            "integration-jwt-secret-0123456789abcdef".to_string(),
        ),
        teams: TeamManager::new(pool.clone()),
        tournaments: TournamentManager::new(pool.clone()),
        registrations: RegistrationManager::new(pool.clone()),
        matches: MatchManager::new(pool),
    }
}

fn unique(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &id[..12])
}

async fn create_account(auth: &AuthManager, role: Role) -> Actor {
    let username = unique(role.as_str());
    let user = auth
        .create_user(RegisterRequest {
            email: format!("{username}@example.com"),
            username,
            password: "integration-password".to_string(),
            role: Some(role),
            first_name: None,
            last_name: None,
            phone: None,
            organization_name: None,
        })
        .await
        .expect("Failed to create account");
    Actor::new(user.id, user.role)
}

async fn planned_tournament(fx: &Fixture, organizer: &Actor, format: TournamentFormat) -> i64 {
    let starts_at = Utc::now() + Duration::days(7);
    fx.tournaments
        .create_tournament(
            organizer,
            NewTournament {
                name: unique("cup"),
                description: String::new(),
                rules: String::new(),
                format,
                starts_at,
                ends_at: starts_at + Duration::days(2),
                entry_fee_cents: 1500,
                organizer_id: None,
            },
        )
        .await
        .expect("Failed to create tournament")
        .id
}

fn form(alias: &str) -> RegistrationForm {
    RegistrationForm {
        game: "Rocket League".to_string(),
        alias: alias.to_string(),
        skill_level: Default::default(),
        experience: String::new(),
        comment: None,
        team_id: None,
        team_name: None,
    }
}

async fn enter_teams(fx: &Fixture, organizer: &Actor, tournament_id: i64, count: usize) {
    for _ in 0..count {
        let team = fx
            .teams
            .create_team(organizer, NewTeam { name: unique("team"), organizer_id: None })
            .await
            .unwrap();
        fx.tournaments
            .register_team(organizer, tournament_id, team.id)
            .await
            .expect("Team registration should succeed");
    }
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_concurrent_approvals_count_every_registration() {
    let fx = Arc::new(setup().await);
    let organizer = create_account(&fx.auth, Role::Organizer).await;
    let tournament_id = planned_tournament(&fx, &organizer, TournamentFormat::RoundRobin).await;

    let mut pending = Vec::new();
    for i in 0..8 {
        let player = create_account(&fx.auth, Role::Player).await;
        let registration = fx
            .registrations
            .register(
                &player,
                NewRegistration {
                    tournament_id,
                    form: form(&format!("p{i}")),
                },
            )
            .await
            .expect("Registration should succeed");
        pending.push(registration.id);
    }

    let handles: Vec<_> = pending
        .iter()
        .map(|&id| {
            let fx = fx.clone();
            tokio::spawn(async move {
                fx.registrations
                    .decide(
                        &organizer,
                        id,
                        Decision {
                            status: RegistrationStatus::Approved,
                        },
                    )
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().expect("Approval should succeed");
    }

    let tournament = fx.tournaments.get_tournament(tournament_id).await.unwrap();
    assert_eq!(tournament.registered_count, 8);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_duplicate_registration_until_rejected() {
    let fx = setup().await;
    let organizer = create_account(&fx.auth, Role::Organizer).await;
    let player = create_account(&fx.auth, Role::Player).await;
    let tournament_id = planned_tournament(&fx, &organizer, TournamentFormat::Elimination).await;

    let first = fx
        .registrations
        .register(&player, NewRegistration { tournament_id, form: form("ace") })
        .await
        .expect("First registration should succeed");

    let duplicate = fx
        .registrations
        .register(&player, NewRegistration { tournament_id, form: form("ace") })
        .await;
    assert!(matches!(duplicate, Err(RegistrationError::Validation(_))));

    fx.registrations
        .decide(&organizer, first.id, Decision { status: RegistrationStatus::Rejected })
        .await
        .expect("Rejection should succeed");

    let again = fx
        .registrations
        .register(&player, NewRegistration { tournament_id, form: form("ace") })
        .await
        .expect("Re-registration after rejection should succeed");
    assert_eq!(again.status, RegistrationStatus::Pending);

    // the rejected row is replaced, not kept alongside
    let err = fx.registrations.get_registration(&player, first.id).await;
    assert!(matches!(err, Err(RegistrationError::NotFound(_))));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_only_one_concurrent_score_submission_wins() {
    let fx = Arc::new(setup().await);
    let organizer = create_account(&fx.auth, Role::Organizer).await;
    let referee = create_account(&fx.auth, Role::Referee).await;
    let tournament_id = planned_tournament(&fx, &organizer, TournamentFormat::Elimination).await;

    let home = fx
        .teams
        .create_team(&organizer, NewTeam { name: unique("home"), organizer_id: None })
        .await
        .unwrap();
    let away = fx
        .teams
        .create_team(&organizer, NewTeam { name: unique("away"), organizer_id: None })
        .await
        .unwrap();
    let game = fx
        .matches
        .create_match(
            &organizer,
            NewMatch {
                tournament_id,
                name: None,
                scheduled_at: Utc::now() + Duration::days(7),
                duration_minutes: Some(90),
                team1_id: home.id,
                team2_id: away.id,
                referee_id: Some(referee.user_id),
                venue: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(game.name, format!("{} vs {}", home.name, away.name));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let fx = fx.clone();
            tokio::spawn(async move {
                fx.matches
                    .submit_score(
                        &referee,
                        game.id,
                        ScoreSubmission { score1: Some(i), score2: Some(0) },
                    )
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(finished) => {
                assert_eq!(finished.status, MatchStatus::Finished);
                winners += 1;
            }
            Err(MatchError::Validation(errors)) => assert!(errors.contains("status")),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_round_robin_generation_from_registered_teams() {
    let fx = setup().await;
    let organizer = create_account(&fx.auth, Role::Organizer).await;
    let tournament_id = planned_tournament(&fx, &organizer, TournamentFormat::RoundRobin).await;
    enter_teams(&fx, &organizer, tournament_id, 4).await;

    let generated = fx
        .matches
        .generate_matches(&organizer, tournament_id, GenerateMatches::default())
        .await
        .expect("Generation should succeed");
    assert_eq!(generated.matches.len(), 6);
    assert_eq!(generated.bye_team_id, None);

    let stats = fx.tournaments.stats(tournament_id).await.unwrap();
    assert_eq!(stats.registered_teams.len(), 4);
    assert_eq!(stats.total_matches, 6);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_refereed_result_is_frozen_after_submission() {
    let fx = setup().await;
    let organizer = create_account(&fx.auth, Role::Organizer).await;
    let referee = create_account(&fx.auth, Role::Referee).await;
    let tournament_id = planned_tournament(&fx, &organizer, TournamentFormat::RoundRobin).await;
    enter_teams(&fx, &organizer, tournament_id, 2).await;

    let generated = fx
        .matches
        .generate_matches(
            &organizer,
            tournament_id,
            GenerateMatches {
                referee_id: Some(referee.user_id),
                ..Default::default()
            },
        )
        .await
        .expect("Generation should succeed");
    assert_eq!(generated.matches.len(), 1);
    let game = &generated.matches[0];
    assert_eq!(game.referee_id, Some(referee.user_id));

    let finished = fx
        .matches
        .submit_score(
            &referee,
            game.id,
            ScoreSubmission { score1: Some(2), score2: Some(1) },
        )
        .await
        .expect("Assigned referee should submit");
    assert_eq!(finished.status, MatchStatus::Finished);

    let edit = fx
        .matches
        .update_match(
            &organizer,
            game.id,
            MatchUpdate { score1: Some(0), score2: Some(3), ..Default::default() },
        )
        .await;
    match edit {
        Err(MatchError::Validation(errors)) => assert!(errors.contains("status")),
        other => panic!("expected validation error, got {other:?}"),
    }

    let stored = fx.matches.get_match(game.id).await.unwrap();
    assert_eq!((stored.score1, stored.score2), (Some(2), Some(1)));
    assert_eq!(stored.status, MatchStatus::Finished);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_elimination_generation_pairs_each_team_once() {
    let fx = setup().await;
    let organizer = create_account(&fx.auth, Role::Organizer).await;
    let tournament_id = planned_tournament(&fx, &organizer, TournamentFormat::Elimination).await;
    enter_teams(&fx, &organizer, tournament_id, 4).await;

    let generated = fx
        .matches
        .generate_matches(&organizer, tournament_id, GenerateMatches::default())
        .await
        .expect("Generation should succeed");
    assert_eq!(generated.matches.len(), 2);
    assert_eq!(generated.bye_team_id, None);

    let mut seen = HashSet::new();
    for game in &generated.matches {
        assert!(seen.insert(game.team1_id), "team {} paired twice", game.team1_id);
        assert!(seen.insert(game.team2_id), "team {} paired twice", game.team2_id);
    }
    assert_eq!(seen.len(), 4);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_regeneration_refused_once_a_match_is_finished() {
    let fx = setup().await;
    let organizer = create_account(&fx.auth, Role::Organizer).await;
    let tournament_id = planned_tournament(&fx, &organizer, TournamentFormat::RoundRobin).await;
    enter_teams(&fx, &organizer, tournament_id, 3).await;

    let generated = fx
        .matches
        .generate_matches(&organizer, tournament_id, GenerateMatches::default())
        .await
        .expect("Generation should succeed");
    assert_eq!(generated.matches.len(), 3);

    // any referee may score a match nobody is assigned to
    let referee = create_account(&fx.auth, Role::Referee).await;
    fx.matches
        .submit_score(
            &referee,
            generated.matches[0].id,
            ScoreSubmission { score1: Some(1), score2: Some(1) },
        )
        .await
        .expect("Score submission should succeed");

    let again = fx
        .matches
        .generate_matches(&organizer, tournament_id, GenerateMatches::default())
        .await;
    match again {
        Err(MatchError::Validation(errors)) => assert!(errors.contains("matches")),
        other => panic!("expected validation error, got {other:?}"),
    }

    let stats = fx.tournaments.stats(tournament_id).await.unwrap();
    assert_eq!(stats.total_matches, 3);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_concurrent_registrations_naming_the_same_new_team() {
    let fx = Arc::new(setup().await);
    let organizer = create_account(&fx.auth, Role::Organizer).await;
    let tournament_id = planned_tournament(&fx, &organizer, TournamentFormat::RoundRobin).await;
    let team_name = unique("squad");

    let mut handles = Vec::new();
    for i in 0..2 {
        let player = create_account(&fx.auth, Role::Player).await;
        let fx = fx.clone();
        let mut entry = form(&format!("racer{i}"));
        entry.team_name = Some(team_name.clone());
        handles.push(tokio::spawn(async move {
            fx.registrations
                .register(&player, NewRegistration { tournament_id, form: entry })
                .await
        }));
    }

    let mut registered = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(registration) => {
                assert!(registration.team_id.is_some());
                registered += 1;
            }
            Err(RegistrationError::Validation(errors)) => assert!(errors.contains("team_name")),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(registered >= 1);
}
