//! Tests for [`PushHandler`].

use super::*;
use crate::test_fixtures::{empty_request, push_event, StaticAllowlist};

async fn handle(allowlisted: bool, event: Push) -> Result<HandlerOutcome, GatewayError> {
    PushHandler::new(Arc::new(StaticAllowlist(allowlisted)))
        .handle(&Context::background(), &empty_request(), event)
        .await
}

#[tokio::test]
async fn test_branch_updates_are_processed() {
    for action in [PushAction::Created, PushAction::Updated] {
        let outcome = handle(true, push_event(RefType::Branch, action)).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::Processed);
    }
}

#[tokio::test]
async fn test_tags_and_deletions_are_ignored() {
    let tag = handle(true, push_event(RefType::Tag, PushAction::Updated)).await.unwrap();
    let deleted = handle(true, push_event(RefType::Branch, PushAction::Deleted)).await.unwrap();

    assert!(matches!(tag, HandlerOutcome::Ignored { .. }));
    assert!(matches!(deleted, HandlerOutcome::Ignored { .. }));
}

#[tokio::test]
async fn test_non_allowlisted_repo_is_rejected() {
    let result = handle(false, push_event(RefType::Branch, PushAction::Updated)).await;

    assert!(matches!(result, Err(GatewayError::RepoNotAllowlisted { .. })));
}
