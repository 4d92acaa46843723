//! End-to-end flows through the product procedures.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use giveaway_actions::{
    create_sweepstakes, delete_sweepstakes, enter_sweepstakes, fetch_profile, get_sweepstakes,
    list_sweepstakes, pick_winner, publish_sweepstakes, register_all, update_profile,
    update_sweepstakes,
};
use giveaway_core::ErrorCode;
use giveaway_procedure::{AuthMode, Credentials, Environment, ProcedureRegistry};
use giveaway_store::{
    Membership, MemoryStore, Role, Store, Sweepstakes, SweepstakesStatus, Team,
};
use giveaway_test::{
    epoch, session_for, CountingStore, FixedClock, RecordingInvalidator, StaticSessions,
};
use serde_json::{json, Value};

struct World {
    store: Arc<MemoryStore>,
    env: Environment<dyn Store>,
    cache: Arc<RecordingInvalidator>,
    clock: Arc<FixedClock>,
}

impl World {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        seed_team(store.as_ref(), "team_123", "alice").await;
        seed_team(store.as_ref(), "team_b", "bob").await;

        let expires = epoch() + Duration::hours(1);
        let sessions = StaticSessions::none()
            .with_token("alice", session_for("alice", expires))
            .with_token("bob", session_for("bob", expires));
        let cache = Arc::new(RecordingInvalidator::new());
        let clock = Arc::new(FixedClock::default());
        let db: Arc<dyn Store> = store.clone();
        let env = Environment::builder(db)
            .sessions(Arc::new(sessions))
            .clock(clock.clone())
            .cache(cache.clone())
            .build();
        Self {
            store,
            env,
            cache,
            clock,
        }
    }

    fn as_user(&self, user: &str) -> Environment<dyn Store> {
        self.env.with_credentials(Credentials::bearer(user))
    }

    fn anonymous(&self) -> Environment<dyn Store> {
        self.env.anonymous()
    }

    async fn draft(&self) -> String {
        let outcome = create_sweepstakes()
            .call(&self.as_user("alice"), json!({ "id": "team_123" }))
            .await;
        outcome.into_result().expect("draft created").id
    }

    async fn active(&self) -> String {
        let id = self.draft().await;
        let outcome = publish_sweepstakes()
            .call(&self.as_user("alice"), json!({ "id": id }))
            .await;
        assert!(outcome.is_ok(), "publish failed: {outcome:?}");
        id
    }

    async fn sweepstakes(&self, id: &str) -> Option<Sweepstakes> {
        self.store.sweepstakes(id).await.expect("store read")
    }
}

async fn seed_team(store: &dyn Store, team_id: &str, owner: &str) {
    store
        .insert_team(Team {
            id: team_id.to_string(),
            name: format!("Team {owner}"),
            owner_id: owner.to_string(),
        })
        .await
        .expect("team inserted");
    store
        .add_member(Membership {
            team_id: team_id.to_string(),
            user_id: owner.to_string(),
            role: Role::Owner,
        })
        .await
        .expect("member added");
}

#[tokio::test]
async fn create_sweepstakes_makes_one_draft_for_the_team() {
    let world = World::new().await;

    let outcome = create_sweepstakes()
        .call(&world.as_user("alice"), json!({ "id": "team_123" }))
        .await;

    let created = outcome.into_result().expect("success");
    assert_eq!(created.id.len(), 6);
    assert!(created.id.chars().all(|c| c.is_ascii_alphanumeric()));

    let all = world
        .store
        .list_sweepstakes_for_team("team_123")
        .await
        .expect("store read");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, created.id);
    assert_eq!(all[0].status, SweepstakesStatus::Draft);
    assert_eq!(all[0].team_id, "team_123");
    assert_eq!(world.cache.tags(), vec!["team-sweepstakes:team_123"]);
}

#[tokio::test]
async fn create_sweepstakes_checks_membership() {
    let world = World::new().await;

    let outcome = create_sweepstakes()
        .call(&world.as_user("bob"), json!({ "id": "team_123" }))
        .await;
    assert_eq!(outcome.code(), Some(ErrorCode::Forbidden));

    let outcome = create_sweepstakes()
        .call(&world.as_user("alice"), json!({ "id": "team_missing" }))
        .await;
    assert_eq!(outcome.code(), Some(ErrorCode::NotFound));
    assert!(world.cache.tags().is_empty());
}

#[tokio::test]
async fn existing_profile_conflicts_without_update() {
    let world = World::new().await;
    let alice = world.as_user("alice");

    let first = update_profile()
        .call(
            &alice,
            json!({ "userId": "alice", "displayName": "Alice", "bio": "Hosts things" }),
        )
        .await;
    assert!(first.is_ok());

    let second = update_profile()
        .call(&alice, json!({ "userId": "alice", "displayName": "Mallory" }))
        .await;
    assert_eq!(second.code(), Some(ErrorCode::Conflict));
    assert_eq!(second.message(), Some("Profile already exists"));

    let profile = world.store.profile("alice").await.expect("read").expect("exists");
    assert_eq!(profile.display_name, "Alice");
    assert_eq!(profile.bio.as_deref(), Some("Hosts things"));
}

#[tokio::test]
async fn profile_belongs_to_its_owner() {
    let world = World::new().await;

    let outcome = update_profile()
        .call(
            &world.as_user("bob"),
            json!({ "userId": "alice", "displayName": "Not Alice" }),
        )
        .await;

    assert_eq!(outcome.code(), Some(ErrorCode::Forbidden));
    assert!(world.store.profile("alice").await.expect("read").is_none());
}

#[tokio::test]
async fn fetch_profile_is_idempotent() {
    let world = World::new().await;
    let alice = world.as_user("alice");

    let before = fetch_profile().call(&alice, json!({})).await;
    assert_eq!(
        serde_json::to_value(&before).expect("json"),
        json!({ "ok": true, "profile": null })
    );

    update_profile()
        .call(&alice, json!({ "userId": "alice", "displayName": "Alice" }))
        .await
        .into_result()
        .expect("profile created");

    let first = serde_json::to_value(fetch_profile().call(&alice, json!({})).await).expect("json");
    let second = serde_json::to_value(fetch_profile().call(&alice, json!({})).await).expect("json");
    assert_eq!(first, second);
    assert_eq!(first["profile"]["displayName"], "Alice");
}

#[tokio::test]
async fn delete_by_outsider_matches_nothing() {
    let world = World::new().await;
    let id = world.draft().await;

    let outcome = delete_sweepstakes()
        .call(&world.as_user("bob"), json!({ "id": id }))
        .await;

    assert_eq!(outcome.code(), Some(ErrorCode::NotFound));
    assert!(world.sweepstakes(&id).await.is_some(), "other team's data untouched");
}

#[tokio::test]
async fn delete_by_member_removes_and_invalidates() {
    let world = World::new().await;
    let id = world.draft().await;

    let outcome = delete_sweepstakes()
        .call(&world.as_user("alice"), json!({ "id": id }))
        .await;

    assert!(outcome.is_ok());
    assert!(world.sweepstakes(&id).await.is_none());
    let tags = world.cache.tags();
    assert!(tags.contains(&"team-sweepstakes:team_123".to_string()));
    assert!(tags.contains(&format!("sweepstakes:{id}")));

    let again = delete_sweepstakes()
        .call(&world.as_user("alice"), json!({ "id": id }))
        .await;
    assert_eq!(again.code(), Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn unauthenticated_calls_never_reach_the_store() {
    let store = Arc::new(CountingStore::default());
    let db: Arc<dyn Store> = store.clone();
    let env = Environment::builder(db)
        .sessions(Arc::new(StaticSessions::none()))
        .clock(Arc::new(FixedClock::default()))
        .build();

    let mut registry = ProcedureRegistry::<dyn Store>::new();
    register_all(&mut registry);

    let required: Vec<String> = registry
        .describe()
        .into_iter()
        .filter(|info| info.auth == AuthMode::Required)
        .map(|info| info.name)
        .collect();
    assert_eq!(required.len(), 9);

    for name in &required {
        let outcome = registry
            .invoke(name, &env, json!({ "id": "team_123" }))
            .await
            .expect("registered");
        assert_eq!(outcome.code(), Some(ErrorCode::Unauthorized), "{name}");
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn expired_session_is_unauthorized() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let env = Environment::builder(store)
        .sessions(Arc::new(StaticSessions::always(session_for("alice", epoch()))))
        .clock(Arc::new(FixedClock::default()))
        .build();

    let outcome = fetch_profile().call(&env, json!({})).await;
    assert_eq!(outcome.code(), Some(ErrorCode::Unauthorized));
}

#[tokio::test]
async fn draft_lifecycle_rules() {
    let world = World::new().await;
    let alice = world.as_user("alice");
    let id = world.draft().await;

    let outcome = update_sweepstakes()
        .call(
            &alice,
            json!({
                "id": id,
                "name": "Summer giveaway",
                "startsAt": "2026-06-01T00:00:00Z",
                "endsAt": "2026-05-01T00:00:00Z",
            }),
        )
        .await;
    assert_eq!(outcome.code(), Some(ErrorCode::BadRequest));

    let outcome = update_sweepstakes()
        .call(&alice, json!({ "id": id, "name": "Summer giveaway" }))
        .await;
    assert!(outcome.is_ok());
    assert_eq!(
        world.sweepstakes(&id).await.map(|s| s.name),
        Some("Summer giveaway".to_string())
    );

    let outcome = update_sweepstakes()
        .call(&alice, json!({ "id": id, "startsAt": "next tuesday" }))
        .await;
    assert_eq!(outcome.code(), Some(ErrorCode::ValidationError));

    assert!(publish_sweepstakes().call(&alice, json!({ "id": id })).await.is_ok());

    let outcome = publish_sweepstakes().call(&alice, json!({ "id": id })).await;
    assert_eq!(outcome.code(), Some(ErrorCode::BadRequest));

    let outcome = update_sweepstakes()
        .call(&alice, json!({ "id": id, "name": "Too late" }))
        .await;
    assert_eq!(outcome.code(), Some(ErrorCode::BadRequest));
}

#[tokio::test]
async fn entering_and_drawing_a_winner() {
    let world = World::new().await;
    let alice = world.as_user("alice");
    let id = world.active().await;
    let public = world.anonymous();

    for (email, name) in [("Ann@Example.com", "Ann"), ("ben@example.com", "Ben")] {
        let outcome = enter_sweepstakes()
            .call(
                &public,
                json!({ "sweepstakesId": id, "email": email, "name": name }),
            )
            .await;
        assert!(outcome.is_ok(), "entry for {email}: {outcome:?}");
    }

    let duplicate = enter_sweepstakes()
        .call(
            &public,
            json!({ "sweepstakesId": id, "email": "ann@example.com", "name": "Ann again" }),
        )
        .await;
    assert_eq!(duplicate.code(), Some(ErrorCode::Conflict));

    let view = get_sweepstakes().call(&public, json!({ "id": id })).await;
    let view = serde_json::to_value(&view).expect("json");
    assert_eq!(view["entryCount"], 2);
    assert_eq!(view["status"], "ACTIVE");

    let outsider = pick_winner().call(&world.as_user("bob"), json!({ "id": id })).await;
    assert_eq!(outsider.code(), Some(ErrorCode::Forbidden));

    let before = world.cache.tags().len();
    let winner = pick_winner()
        .call(&alice, json!({ "id": id }))
        .await
        .into_result()
        .expect("winner drawn");
    assert!(["ann@example.com", "ben@example.com"].contains(&winner.email.as_str()));
    assert_eq!(winner.team_id, "team_123");
    assert_eq!(
        world.cache.tags()[before..].to_vec(),
        vec!["team-sweepstakes:team_123".to_string(), format!("sweepstakes:{id}")]
    );

    let stored = world.sweepstakes(&id).await.expect("still there");
    assert_eq!(stored.status, SweepstakesStatus::Ended);
    assert_eq!(stored.winner_entry_id.as_deref(), Some(winner.entry_id.as_str()));

    let again = pick_winner().call(&alice, json!({ "id": id })).await;
    assert_eq!(again.code(), Some(ErrorCode::Conflict));

    let late = enter_sweepstakes()
        .call(
            &public,
            json!({ "sweepstakesId": id, "email": "cat@example.com", "name": "Cat" }),
        )
        .await;
    assert_eq!(late.code(), Some(ErrorCode::BadRequest));
}

#[tokio::test]
async fn entry_window_follows_the_environment_clock() {
    let world = World::new().await;
    let alice = world.as_user("alice");
    let id = world.draft().await;
    let outcome = update_sweepstakes()
        .call(
            &alice,
            json!({
                "id": id,
                "startsAt": (epoch() + Duration::minutes(10)).to_rfc3339(),
                "endsAt": (epoch() + Duration::minutes(20)).to_rfc3339(),
            }),
        )
        .await;
    assert!(outcome.is_ok(), "update failed: {outcome:?}");
    assert!(publish_sweepstakes().call(&alice, json!({ "id": id })).await.is_ok());

    let enter = |email: &str| {
        json!({ "sweepstakesId": id, "email": email, "name": "Entrant" })
    };

    let early = enter_sweepstakes().call(&world.anonymous(), enter("a@example.com")).await;
    assert_eq!(early.code(), Some(ErrorCode::BadRequest));

    world.clock.advance(Duration::minutes(15));
    let open = enter_sweepstakes().call(&world.anonymous(), enter("b@example.com")).await;
    assert!(open.is_ok(), "entry inside the window: {open:?}");
    let stored = world.store.entries(&id).await.expect("store read");
    assert_eq!(stored[0].created_at, epoch() + Duration::minutes(15));

    world.clock.advance(Duration::minutes(5));
    let closed = enter_sweepstakes().call(&world.anonymous(), enter("c@example.com")).await;
    assert_eq!(closed.code(), Some(ErrorCode::BadRequest));
}

#[tokio::test]
async fn winner_needs_entries() {
    let world = World::new().await;
    let id = world.active().await;

    let outcome = pick_winner().call(&world.as_user("alice"), json!({ "id": id })).await;

    assert_eq!(outcome.code(), Some(ErrorCode::BadRequest));
    let stored = world.sweepstakes(&id).await.expect("still there");
    assert_eq!(stored.status, SweepstakesStatus::Active);
    assert!(stored.winner_entry_id.is_none());
}

#[tokio::test]
async fn drafts_are_hidden_from_the_public() {
    let world = World::new().await;
    let id = world.draft().await;

    let outcome = get_sweepstakes().call(&world.anonymous(), json!({ "id": id })).await;
    assert_eq!(outcome.code(), Some(ErrorCode::NotFound));

    let outcome = enter_sweepstakes()
        .call(
            &world.anonymous(),
            json!({ "sweepstakesId": id, "email": "ann@example.com", "name": "Ann" }),
        )
        .await;
    assert_eq!(outcome.code(), Some(ErrorCode::NotFound));

    let outcome = get_sweepstakes().call(&world.as_user("alice"), json!({ "id": id })).await;
    assert_eq!(outcome.ok().map(|v| v.status), Some(SweepstakesStatus::Draft));
}

#[tokio::test]
async fn entry_window_is_enforced() {
    let world = World::new().await;
    let alice = world.as_user("alice");
    let id = world.draft().await;

    let past_start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single().expect("valid");
    let past_end = past_start + Duration::days(30);
    update_sweepstakes()
        .call(
            &alice,
            json!({ "id": id, "startsAt": past_start, "endsAt": past_end }),
        )
        .await
        .into_result()
        .expect("dates set");
    publish_sweepstakes()
        .call(&alice, json!({ "id": id }))
        .await
        .into_result()
        .expect("published");

    let outcome = enter_sweepstakes()
        .call(
            &world.anonymous(),
            json!({ "sweepstakesId": id, "email": "ann@example.com", "name": "Ann" }),
        )
        .await;
    assert_eq!(outcome.code(), Some(ErrorCode::BadRequest));
    assert_eq!(outcome.message(), Some("This sweepstakes has ended"));
}

#[tokio::test]
async fn list_is_member_only() {
    let world = World::new().await;
    let first = world.draft().await;
    let second = world.draft().await;

    let outcome = list_sweepstakes()
        .call(&world.as_user("alice"), json!({ "teamId": "team_123" }))
        .await;
    let listed: Vec<String> = outcome
        .into_result()
        .expect("listed")
        .sweepstakes
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&first) && listed.contains(&second));

    let outcome = list_sweepstakes()
        .call(&world.as_user("bob"), json!({ "teamId": "team_123" }))
        .await;
    assert_eq!(outcome.code(), Some(ErrorCode::Forbidden));
}

#[tokio::test]
async fn registry_serves_the_json_envelope() {
    let world = World::new().await;
    let mut registry = ProcedureRegistry::<dyn Store>::new();
    register_all(&mut registry);

    let outcome = registry
        .invoke("createSweepstakes", &world.as_user("alice"), json!({ "id": "team_123" }))
        .await
        .expect("registered");
    let wire: Value = serde_json::to_value(&outcome).expect("json");
    assert_eq!(wire["ok"], true);
    assert_eq!(wire["id"].as_str().map(str::len), Some(6));

    assert!(registry
        .invoke("noSuchProcedure", &world.env, json!({}))
        .await
        .is_none());
}
