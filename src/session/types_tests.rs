//! Unit tests for session types.
//!
//! Tests the status machine, string round-trips, and session
//! construction defaults.

use super::*;

// ============================================================================
// SessionStatus tests
// ============================================================================

#[test]
fn test_status_display() {
    assert_eq!(SessionStatus::Created.to_string(), "created");
    assert_eq!(
        SessionStatus::StrategySelected.to_string(),
        "strategy_selected"
    );
    assert_eq!(SessionStatus::Processing.to_string(), "processing");
    assert_eq!(SessionStatus::Synthesizing.to_string(), "synthesizing");
    assert_eq!(SessionStatus::Finalized.to_string(), "finalized");
    assert_eq!(SessionStatus::Archived.to_string(), "archived");
    assert_eq!(SessionStatus::Purged.to_string(), "purged");
}

#[test]
fn test_status_from_str() {
    assert_eq!(
        "processing".parse::<SessionStatus>().unwrap(),
        SessionStatus::Processing
    );
    assert_eq!(
        "Strategy_Selected".parse::<SessionStatus>().unwrap(),
        SessionStatus::StrategySelected
    );
    assert!("suspended".parse::<SessionStatus>().is_err());
}

#[test]
fn test_status_serde_round_trip() {
    for status in [
        SessionStatus::Created,
        SessionStatus::StrategySelected,
        SessionStatus::Processing,
        SessionStatus::Synthesizing,
        SessionStatus::Finalized,
        SessionStatus::Archived,
        SessionStatus::Purged,
    ] {
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, format!("\"{}\"", status.as_str()));
        let back: SessionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }
}

#[test]
fn test_forward_transitions() {
    use SessionStatus::*;

    assert!(Created.can_transition(StrategySelected));
    assert!(StrategySelected.can_transition(Processing));
    assert!(Processing.can_transition(Processing));
    assert!(Processing.can_transition(Synthesizing));
    assert!(Synthesizing.can_transition(Finalized));
    assert!(Archived.can_transition(Purged));
}

#[test]
fn test_skipping_transitions_rejected() {
    use SessionStatus::*;

    assert!(!Created.can_transition(Processing));
    assert!(!Created.can_transition(Finalized));
    assert!(!StrategySelected.can_transition(Synthesizing));
    assert!(!Processing.can_transition(Finalized));
    assert!(!Finalized.can_transition(Processing));
    assert!(!Synthesizing.can_transition(Processing));
}

#[test]
fn test_any_live_status_can_archive() {
    use SessionStatus::*;

    for status in [
        Created,
        StrategySelected,
        Processing,
        Synthesizing,
        Finalized,
    ] {
        assert!(status.can_transition(Archived), "{status} should archive");
    }
    assert!(!Archived.can_transition(Archived));
    assert!(!Purged.can_transition(Archived));
}

#[test]
fn test_purged_is_terminal() {
    use SessionStatus::*;

    assert!(Purged.is_terminal());
    assert!(!Archived.is_terminal());
    for status in [Created, StrategySelected, Processing, Synthesizing, Finalized] {
        assert!(!status.is_terminal());
        assert!(!Purged.can_transition(status));
    }
}

#[test]
fn test_only_archived_purges() {
    use SessionStatus::*;

    for status in [Created, StrategySelected, Processing, Synthesizing, Finalized] {
        assert!(!status.can_transition(Purged));
    }
}

// ============================================================================
// Session tests
// ============================================================================

#[test]
fn test_session_new_defaults() {
    let now = chrono::Utc::now();
    let session = Session::new("Quarterly revenue grew 12%.", ProblemContext::default(), now);

    assert!(!session.id.is_empty());
    assert_eq!(session.content, "Quarterly revenue grew 12%.");
    assert_eq!(session.status, SessionStatus::Created);
    assert_eq!(session.created_at, now);
    assert_eq!(session.updated_at, now);
    assert!(session.state.tasks.is_empty());
    assert!(session.state.results.is_empty());
}

#[test]
fn test_session_ids_unique() {
    let now = chrono::Utc::now();
    let a = Session::new("a", ProblemContext::default(), now);
    let b = Session::new("b", ProblemContext::default(), now);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_session_state_default() {
    let state = SessionState::default();
    assert!(state.decisions.is_empty());
    assert!(state.quality_history.is_empty());
    assert_eq!(state.tasks_processed, 0);
    assert_eq!(state.processing_steps, 0);
    assert_eq!(state.iterations, 0);
}

#[test]
fn test_session_serde_round_trip() {
    let now = chrono::Utc::now();
    let mut session = Session::new("content", ProblemContext::default(), now);
    session.status = SessionStatus::Processing;
    session.state.iterations = 2;
    session.state.tasks_processed = 7;

    let json = serde_json::to_string(&session).unwrap();
    let back: Session = serde_json::from_str(&json).unwrap();
    assert_eq!(back.id, session.id);
    assert_eq!(back.status, SessionStatus::Processing);
    assert_eq!(back.state.iterations, 2);
    assert_eq!(back.state.tasks_processed, 7);
}
