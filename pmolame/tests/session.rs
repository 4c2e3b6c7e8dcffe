#![cfg(unix)]

mod common;

use std::time::Duration;

use pmolame::{
    process::LameInvocation, LameError, LameEvent, LameMode, LameSession, LameStatus,
    SessionPhase,
};
use tokio::sync::mpsc;

use common::{collect, fixture, percentages};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn invocation(script: &str, mode: LameMode) -> LameInvocation {
    LameInvocation {
        executable: fixture(script),
        args: vec!["in".into(), "out".into()],
        library_dir: None,
        mode,
        streaming: false,
    }
}

#[tokio::test]
async fn progress_never_goes_backwards() -> TestResult {
    let (tx, rx) = mpsc::unbounded_channel();
    let (mut session, _pipes) =
        LameSession::start(invocation("lame-progress.sh", LameMode::Encode), vec![tx]);

    session.wait().await?;

    let events = collect(rx).await;
    assert_eq!(percentages(&events), vec![10, 50, 50, 80, 100]);
    let etas: Vec<Option<&str>> = events
        .iter()
        .filter_map(|event| match event {
            LameEvent::Progress { eta, .. } => Some(eta.as_deref()),
            _ => None,
        })
        .collect();
    assert_eq!(
        etas,
        vec![Some("0:01"), Some("0:05"), Some("0:03"), Some("0:08"), Some("00:00")]
    );
    assert!(matches!(events.last(), Some(LameEvent::Finish)));
    assert_eq!(
        session.status(),
        LameStatus {
            started: true,
            finished: true,
            progress: 100,
            eta: Some("00:00".to_string()),
        }
    );
    assert!(matches!(session.phase(), SessionPhase::Succeeded));
    Ok(())
}

#[tokio::test]
async fn decode_ratio_with_zero_total_is_skipped() -> TestResult {
    let (tx, rx) = mpsc::unbounded_channel();
    let (mut session, _pipes) =
        LameSession::start(invocation("lame-decode-zero.sh", LameMode::Decode), vec![tx]);

    session.wait().await?;

    let events = collect(rx).await;
    assert_eq!(percentages(&events), vec![50, 100]);
    assert!(matches!(events.last(), Some(LameEvent::Finish)));
    Ok(())
}

#[tokio::test]
async fn kill_terminates_without_events() -> TestResult {
    let (tx, rx) = mpsc::unbounded_channel();
    let (mut session, _pipes) =
        LameSession::start(invocation("lame-sleep.sh", LameMode::Encode), vec![tx]);

    session.kill();
    session.kill();

    let outcome = tokio::time::timeout(Duration::from_secs(10), session.wait()).await?;
    assert!(matches!(outcome, Err(LameError::Terminated)));

    let events = collect(rx).await;
    assert!(events.is_empty());
    Ok(())
}

#[tokio::test]
async fn several_subscribers_see_the_same_events() -> TestResult {
    let (first_tx, first_rx) = mpsc::unbounded_channel();
    let (second_tx, second_rx) = mpsc::unbounded_channel();
    let (mut session, _pipes) = LameSession::start(
        invocation("lame-exit-3.sh", LameMode::Encode),
        vec![first_tx, second_tx],
    );

    let err = session.wait().await.unwrap_err();
    assert_eq!(err.to_string(), "lame: Process exited with code 3");

    for rx in [first_rx, second_rx] {
        let events = collect(rx).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], LameEvent::Error(LameError::ExitCode(3))));
    }
    Ok(())
}
