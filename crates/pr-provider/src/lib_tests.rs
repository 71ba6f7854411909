use super::*;

fn sh(script: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(script);
    cmd
}

#[tokio::test]
async fn spawn_completes_and_reports_success() {
    let handle = spawn(sh("cat"), String::new(), SpawnOptions::default())
        .await
        .unwrap();
    let outcome = handle.exit().await.unwrap();
    assert!(matches!(outcome, ExitOutcome::Completed));
}

#[tokio::test]
async fn spawn_streams_suggestion_events_from_stdout() {
    let script = r#"cat <<'EOF'
{"kind":"file_start","file":"a.rs"}
{"kind":"suggestion","file":"a.rs","line":3,"type":"bug","title":"t","description":"d"}
{"kind":"file_end"}
EOF"#;
    let mut handle = spawn(sh(script), String::new(), SpawnOptions::default())
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    let outcome = handle.exit().await.unwrap();

    assert!(matches!(outcome, ExitOutcome::Completed));
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], SuggestionEvent::FileStart { file } if file == "a.rs"));
    assert!(matches!(&events[2], SuggestionEvent::FileEnd));
}

#[tokio::test]
async fn nonzero_exit_surfaces_failed_with_stderr_tail() {
    let handle = spawn(
        sh("echo boom 1>&2; exit 7"),
        String::new(),
        SpawnOptions::default(),
    )
    .await
    .unwrap();
    let outcome = handle.exit().await.unwrap();
    match outcome {
        ExitOutcome::Failed { stderr_tail } => assert!(stderr_tail.contains("boom")),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_exit_with_no_suggestions_is_not_a_failure() {
    let handle = spawn(sh("true"), String::new(), SpawnOptions::default())
        .await
        .unwrap();
    let outcome = handle.exit().await.unwrap();
    assert!(matches!(outcome, ExitOutcome::Completed));
}

#[tokio::test]
async fn cancel_terminates_and_reports_cancelled() {
    let options = SpawnOptions {
        cancel_grace: Duration::from_millis(200),
        ..SpawnOptions::default()
    };
    let handle = spawn(sh("sleep 30"), String::new(), options).await.unwrap();
    handle.cancel();
    let outcome = handle.exit().await.unwrap();
    assert!(matches!(outcome, ExitOutcome::Cancelled));
}

#[tokio::test]
async fn prompt_is_written_to_stdin() {
    let mut handle = spawn(sh("cat"), "hello-prompt".to_string(), SpawnOptions::default())
        .await
        .unwrap();
    // stdout here isn't valid suggestion JSON, so no events are expected;
    // the important assertion is the process completes cleanly.
    while handle.next_event().await.is_some() {}
    let outcome = handle.exit().await.unwrap();
    assert!(matches!(outcome, ExitOutcome::Completed));
}

#[tokio::test]
async fn check_tool_installed_finds_a_real_binary() {
    check_tool_installed("sh").await.unwrap();
}

#[tokio::test]
async fn check_tool_installed_errors_for_missing_binary() {
    let result = check_tool_installed("definitely-not-a-real-binary-xyz").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn run_and_capture_returns_stdout_and_exit_code() {
    let result = run_and_capture(sh("echo hi")).await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.output.trim(), "hi");
}
