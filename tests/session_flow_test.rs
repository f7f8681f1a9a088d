//! End-to-end scene sessions against the loopback director

use std::time::Duration;

use clap::Parser;
use playdirector::cli::Cli;
use playdirector::config::Config;
use playdirector::director::mock::{MockDirectorServer, ScriptStep};
use playdirector::director::types::{ConnectionStatus, Utterance};
use playdirector::session::{
    SceneUpdate, SessionController, SessionId, SessionManager, SessionState,
};

const WAIT: Duration = Duration::from_secs(5);

/// Apply transport events until `done` holds
async fn pump_until(
    controller: &mut SessionController,
    done: impl Fn(&SessionController) -> bool,
) -> Vec<SceneUpdate> {
    let mut updates = Vec::new();
    while !done(controller) {
        let event = tokio::time::timeout(WAIT, controller.next_transport_event())
            .await
            .expect("timed out waiting for a transport event");
        match event {
            Some(event) => updates.extend(controller.handle_transport_event(event)),
            None => break,
        }
    }
    updates
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn closed(controller: &SessionController) -> bool {
    controller.session_state() == SessionState::Closed
}

#[tokio::test]
async fn test_full_scene_is_assembled_in_order() {
    let server = MockDirectorServer::start(vec![
        ScriptStep::director("Keep it tense."),
        ScriptStep::status("Agents generated and saved."),
        ScriptStep::scene(&[Utterance::new("Alice", "Draw.", None)]),
        ScriptStep::scene(&[
            Utterance::new("Bruno", "Not yet.", Some("off the marked path".to_string())),
            Utterance::new("Alice", "Then at dawn.", None),
        ]),
        ScriptStep::Close,
    ])
    .await
    .unwrap();

    let mut controller = SessionController::new(server.endpoint(), false);
    controller.start_session("A duel at dawn").unwrap();
    assert!(controller.scene().is_loading());
    assert_eq!(
        controller.session().map(|s| s.connection().url().to_string()),
        Some(server.endpoint())
    );

    let updates = pump_until(&mut controller, closed).await;

    assert_eq!(
        server.received_prompts(),
        vec![r#"{"prompt":"A duel at dawn"}"#.to_string()]
    );
    assert!(updates.contains(&SceneUpdate::Status(Some(
        "Agents generated and saved.".to_string()
    ))));

    let scene = controller.scene();
    assert_eq!(scene.director_note(), Some("Keep it tense."));
    let speakers: Vec<&str> = scene
        .scene_log()
        .iter()
        .map(|u| u.speaker.as_str())
        .collect();
    assert_eq!(speakers, vec!["Alice", "Bruno", "Alice"]);
    assert_eq!(
        scene.scene_log()[1].stage_warning.as_deref(),
        Some("off the marked path")
    );
    assert!(!scene.is_loading());
}

#[tokio::test]
async fn test_loading_holds_until_first_scene_event() {
    let server = MockDirectorServer::start(vec![
        ScriptStep::director("Vision"),
        ScriptStep::status("Agents generated and saved."),
        ScriptStep::Pause(Duration::from_secs(30)),
    ])
    .await
    .unwrap();

    let mut controller = SessionController::new(server.endpoint(), false);
    controller.start_session("slow scene").unwrap();

    pump_until(&mut controller, |c| c.stats().panels_applied == 2).await;

    assert!(controller.scene().is_loading());
    assert_eq!(controller.session_state(), SessionState::Receiving);
    assert!(controller.scene().scene_log().is_empty());
    assert_eq!(
        controller.session().map(|s| s.connection().status()),
        Some(ConnectionStatus::Connected)
    );

    controller.close_session();
    assert!(!controller.scene().is_loading());
    assert_ne!(
        controller.session().map(|s| s.connection().status()),
        Some(ConnectionStatus::Connected)
    );
    wait_for(|| server.disconnect_count() == 1).await;
}

#[tokio::test]
async fn test_new_session_closes_previous_connection() {
    let server = MockDirectorServer::start(vec![
        ScriptStep::director("Vision"),
        ScriptStep::Pause(Duration::from_secs(30)),
    ])
    .await
    .unwrap();

    let mut controller = SessionController::new(server.endpoint(), false);
    controller.start_session("first").unwrap();
    pump_until(&mut controller, |c| {
        c.session_state() == SessionState::Receiving
    })
    .await;

    let updates = controller.start_session("second").unwrap();
    assert!(updates.contains(&SceneUpdate::Lifecycle {
        id: SessionId(1),
        state: SessionState::Closed
    }));

    pump_until(&mut controller, |c| {
        c.session_state() == SessionState::Receiving
    })
    .await;
    assert_eq!(controller.session().map(|s| s.id()), Some(SessionId(2)));

    wait_for(|| server.disconnect_count() == 1).await;
    assert_eq!(server.connection_count(), 2);
    assert_eq!(server.received_prompts().len(), 2);
}

#[tokio::test]
async fn test_open_failure_stops_loading_and_keeps_scene() {
    // Reserve a port, then free it so nothing listens there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut controller =
        SessionController::new(format!("ws://127.0.0.1:{}/ws/scene", port), false);
    controller.on_inbound_event(r#"{"panel":"director","content":{"message":"Earlier"}}"#);
    controller.on_inbound_event(r#"{"panel":"scene","content":[{"speaker":"A","content":"1"}]}"#);

    controller.start_session("unreachable").unwrap();
    let updates = pump_until(&mut controller, closed).await;

    assert!(
        updates
            .iter()
            .any(|u| matches!(u, SceneUpdate::TransportFailed(_)))
    );
    assert!(!controller.scene().is_loading());
    assert_eq!(controller.scene().director_note(), Some("Earlier"));
    assert_eq!(controller.scene().scene_log().len(), 1);
}

#[tokio::test]
async fn test_malformed_frame_keeps_session_open() {
    let server = MockDirectorServer::start(vec![
        ScriptStep::Raw("{not json".to_string()),
        ScriptStep::Pause(Duration::from_secs(30)),
    ])
    .await
    .unwrap();

    let mut controller = SessionController::new(server.endpoint(), false);
    controller.start_session("broken").unwrap();

    let updates = pump_until(&mut controller, |c| c.stats().malformed_payloads == 1).await;

    assert!(
        updates
            .iter()
            .any(|u| matches!(u, SceneUpdate::PayloadRejected(_)))
    );
    assert!(!controller.scene().is_loading());
    assert_eq!(controller.session_state(), SessionState::Receiving);
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_unknown_panel_is_ignored() {
    let server = MockDirectorServer::start(vec![
        ScriptStep::Json(serde_json::json!({ "panel": "lighting", "content": {} })),
        ScriptStep::scene(&[Utterance::new("A", "hello", None)]),
        ScriptStep::Close,
    ])
    .await
    .unwrap();

    let mut controller = SessionController::new(server.endpoint(), false);
    controller.start_session("lights").unwrap();
    pump_until(&mut controller, closed).await;

    assert_eq!(controller.stats().ignored_events, 1);
    assert_eq!(controller.scene().scene_log().len(), 1);
}

#[tokio::test]
async fn test_clear_scene_on_start_setting() {
    let script = vec![
        ScriptStep::scene(&[Utterance::new("A", "one", None)]),
        ScriptStep::Close,
    ];
    let server = MockDirectorServer::start(script).await.unwrap();

    let mut appending = SessionController::new(server.endpoint(), false);
    appending.start_session("first").unwrap();
    pump_until(&mut appending, closed).await;
    appending.start_session("second").unwrap();
    pump_until(&mut appending, closed).await;
    assert_eq!(appending.scene().scene_log().len(), 2);

    let mut clearing = SessionController::new(server.endpoint(), true);
    clearing.start_session("first").unwrap();
    pump_until(&mut clearing, closed).await;
    clearing.start_session("second").unwrap();
    pump_until(&mut clearing, closed).await;
    assert_eq!(clearing.scene().scene_log().len(), 1);
}

#[tokio::test]
async fn test_run_prompt_returns_final_scene() {
    let server = MockDirectorServer::start(vec![
        ScriptStep::director("Vision"),
        ScriptStep::scene(&[Utterance::new("A", "hello", None)]),
        ScriptStep::Close,
    ])
    .await
    .unwrap();

    let endpoint = server.endpoint();
    let cli = Cli::parse_from(["playdirector", "--endpoint", endpoint.as_str(), "run", "hi"]);
    let mut manager = SessionManager::new(&cli, Config::default()).unwrap();

    let scene = manager
        .run_prompt("hi", Some(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(scene.director_note(), Some("Vision"));
    assert_eq!(scene.scene_log().len(), 1);
    assert!(!scene.is_loading());
    assert_eq!(server.received_prompts(), vec![r#"{"prompt":"hi"}"#.to_string()]);
}

#[tokio::test]
async fn test_run_prompt_idle_timeout_closes_session() {
    let server = MockDirectorServer::start(vec![
        ScriptStep::director("Vision"),
        ScriptStep::Pause(Duration::from_secs(30)),
    ])
    .await
    .unwrap();

    let endpoint = server.endpoint();
    let cli = Cli::parse_from(["playdirector", "--endpoint", endpoint.as_str(), "run", "hi"]);
    let mut manager = SessionManager::new(&cli, Config::default()).unwrap();

    let scene = manager
        .run_prompt("hi", Some(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(scene.director_note(), Some("Vision"));
    assert!(!scene.is_loading());
    assert_eq!(manager.controller().session_state(), SessionState::Closed);
    wait_for(|| server.disconnect_count() == 1).await;
}
