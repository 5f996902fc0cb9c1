//! Tests for [`CheckRunHandler`].

use super::*;
use crate::test_fixtures::{check_run_event, empty_request, StaticAllowlist};

async fn handle(allowlisted: bool, action: CheckRunAction) -> Result<HandlerOutcome, GatewayError> {
    CheckRunHandler::new(Arc::new(StaticAllowlist(allowlisted)))
        .handle(&Context::background(), &empty_request(), check_run_event(action))
        .await
}

#[tokio::test]
async fn test_user_initiated_actions_are_processed() {
    let requested = CheckRunAction::RequestedAction {
        identifier: "plan".to_string(),
    };

    assert_eq!(handle(true, requested).await.unwrap(), HandlerOutcome::Processed);
    assert_eq!(
        handle(true, CheckRunAction::Rerequested).await.unwrap(),
        HandlerOutcome::Processed
    );
}

#[tokio::test]
async fn test_other_actions_are_ignored() {
    for action in [
        CheckRunAction::Created,
        CheckRunAction::Completed,
        CheckRunAction::Other("unknown".to_string()),
    ] {
        let outcome = handle(true, action).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Ignored { .. }));
    }
}

#[tokio::test]
async fn test_non_allowlisted_repo_is_rejected() {
    let result = handle(false, CheckRunAction::Rerequested).await;

    assert!(matches!(result, Err(GatewayError::RepoNotAllowlisted { .. })));
}
