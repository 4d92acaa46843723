//! The call-site helper over both transports.

use std::sync::Arc;

use giveaway_actions::teams::{create_team, CreatedTeam};
use giveaway_actions::profiles::{update_profile, SavedProfile};
use giveaway_client::{CallState, HttpCaller, LocalCaller, ToastQueue, UseProcedure};
use giveaway_core::{ErrorCode, Session};
use giveaway_procedure::{Credentials, Environment, ProcedureRegistry};
use giveaway_server::{Server, ShutdownSignal, TokenSessions};
use giveaway_store::{MemoryStore, Store};
use serde_json::json;

fn environment() -> Environment<dyn Store> {
    let sessions = TokenSessions::new(chrono::Duration::hours(1));
    let mut alice = Session::default();
    alice.user.id = Some("alice".to_string());
    sessions.insert("tok_alice", alice);

    let db: Arc<dyn Store> = Arc::new(MemoryStore::new());
    Environment::builder(db).sessions(Arc::new(sessions)).build()
}

#[tokio::test]
async fn local_calls_route_conflicts_to_toasts() {
    let env = environment().with_credentials(Credentials::bearer("tok_alice"));
    let toasts = Arc::new(ToastQueue::default());
    let hook = UseProcedure::<SavedProfile>::new(Arc::new(LocalCaller::new(update_profile(), env)))
        .notifier(toasts.clone());
    let input = json!({ "userId": "alice", "displayName": "Alice" });

    let first = hook.run(&input).await;
    assert_eq!(first.ok().map(|saved| saved.user_id.as_str()), Some("alice"));
    assert!(toasts.messages().is_empty());

    let second = hook.run(&input).await;
    assert_eq!(second.code(), Some(ErrorCode::Conflict));
    assert_eq!(toasts.messages(), vec!["Profile already exists".to_string()]);
    assert_eq!(hook.current(), CallState::Settled(second));
}

#[tokio::test]
async fn http_calls_reach_the_server() {
    let mut registry = ProcedureRegistry::new();
    registry.register(create_team());
    let bound = Server::builder()
        .http_addr("127.0.0.1:0")
        .registry(registry)
        .environment(environment())
        .build()
        .expect("server builds")
        .bind()
        .await
        .expect("binds");
    let base = format!("http://{}", bound.local_addr().expect("local addr"));
    let shutdown = ShutdownSignal::new();
    let server = tokio::spawn(bound.run_with_shutdown(shutdown.clone()));

    let signed_in = UseProcedure::<CreatedTeam>::new(Arc::new(
        HttpCaller::new(&base, "createTeam").with_token("tok_alice"),
    ));
    let outcome = signed_in.run(&json!({ "name": "Acme" })).await;
    assert!(outcome.is_ok(), "unexpected outcome: {outcome:?}");

    let toasts = Arc::new(ToastQueue::default());
    let anonymous = UseProcedure::<CreatedTeam>::new(Arc::new(HttpCaller::new(&base, "createTeam")))
        .notifier(toasts.clone());
    let outcome = anonymous.run(&json!({ "name": "Acme" })).await;
    assert_eq!(outcome.code(), Some(ErrorCode::Unauthorized));
    assert_eq!(toasts.messages().len(), 1);

    shutdown.trigger();
    server
        .await
        .expect("server task")
        .expect("server stopped cleanly");

    let unreachable = anonymous.run(&json!({ "name": "Acme" })).await;
    assert_eq!(unreachable.code(), Some(ErrorCode::UnknownHttpError));
}
