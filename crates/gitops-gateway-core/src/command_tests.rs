//! Tests for [`DefaultCommentParser`].

use super::*;

fn parser() -> DefaultCommentParser {
    DefaultCommentParser::new("atlantis", "gateway-bot")
}

fn parse(comment: &str) -> CommentParseResult {
    parser().parse(comment, VcsHostType::Github)
}

fn expect_command(comment: &str) -> CommentCommand {
    match parse(comment) {
        CommentParseResult::Command(command) => command,
        other => panic!("expected a command for {comment:?}, got {other:?}"),
    }
}

fn expect_response(comment: &str) -> String {
    match parse(comment) {
        CommentParseResult::CommentResponse(text) => text,
        other => panic!("expected a response for {comment:?}, got {other:?}"),
    }
}

// ============================================================================
// Ignore outcomes
// ============================================================================

mod ignore_tests {
    use super::*;

    #[test]
    fn test_empty_and_unrelated_comments_are_ignored() {
        for comment in ["", "   ", "LGTM", "please run plan", "@someone-else plan"] {
            assert_eq!(parse(comment), CommentParseResult::Ignore, "{comment:?}");
        }
    }

    #[test]
    fn test_multi_line_comment_is_ignored() {
        assert_eq!(
            parse("atlantis plan\nand then apply"),
            CommentParseResult::Ignore
        );
    }

    /// Trailing blank lines come from copy-pasting comments and are allowed.
    #[test]
    fn test_trailing_newlines_are_not_multi_line() {
        let command = expect_command("atlantis plan\r\n\r\n");
        assert_eq!(command.name, CommandName::Plan);
    }
}

// ============================================================================
// Direct responses
// ============================================================================

mod response_tests {
    use super::*;

    #[test]
    fn test_terraform_prefix_suggests_executable() {
        let text = expect_response("terraform plan");
        assert!(text.contains("`atlantis`"), "{text}");
    }

    #[test]
    fn test_bare_executable_and_help_return_help() {
        for comment in ["atlantis", "atlantis help", "run --help", "@gateway-bot -h"] {
            let text = expect_response(comment);
            assert!(text.contains("Commands:"), "{comment:?}: {text}");
        }
    }

    #[test]
    fn test_help_omits_apply_when_disabled() {
        let parser = parser().with_apply_disabled(true);

        let text = parser.help_comment();

        assert!(!text.contains("atlantis apply"));
        assert!(text.contains("atlantis plan"));
    }

    #[test]
    fn test_unknown_command_returns_error() {
        let text = expect_response("atlantis destroy");
        assert!(text.contains("unknown command \"destroy\""), "{text}");
    }

    #[test]
    fn test_apply_refused_when_disabled() {
        let result = parser()
            .with_apply_disabled(true)
            .parse("atlantis apply", VcsHostType::Github);

        match result {
            CommentParseResult::CommentResponse(text) => assert!(text.contains("disabled")),
            other => panic!("expected refusal, got {other:?}"),
        }
    }

    #[test]
    fn test_unexpected_argument_is_reported() {
        let text = expect_response("atlantis plan extra");
        assert!(text.contains("Error parsing plan command"), "{text}");
    }

    #[test]
    fn test_command_help_flag_returns_usage() {
        let text = expect_response("atlantis plan --help");
        assert!(text.contains("Usage of plan"), "{text}");
    }

    #[test]
    fn test_relative_dir_escaping_repo_is_rejected() {
        let text = expect_response("atlantis plan -d ../other");
        assert!(text.contains("relative path"), "{text}");
    }

    #[test]
    fn test_invalid_workspace_is_rejected() {
        for comment in ["atlantis plan -w ../etc", "atlantis plan -w a/b"] {
            let text = expect_response(comment);
            assert!(text.contains("invalid workspace"), "{comment:?}: {text}");
        }
    }

    #[test]
    fn test_project_with_dir_is_rejected() {
        let text = expect_response("atlantis plan -p core -d infra");
        assert!(text.contains("cannot use -p/--project"), "{text}");
    }

    #[test]
    fn test_unbalanced_quotes_are_reported() {
        let text = expect_response("atlantis plan -d \"infra");
        assert!(text.contains("unbalanced quotes"), "{text}");
    }
}

// ============================================================================
// Commands
// ============================================================================

mod command_tests {
    use super::*;

    #[test]
    fn test_every_invocation_name_is_accepted() {
        for comment in ["atlantis plan", "run plan", "@gateway-bot plan"] {
            assert_eq!(expect_command(comment).name, CommandName::Plan);
        }
    }

    #[test]
    fn test_plan_with_flags_and_extra_args() {
        let command = expect_command("atlantis plan -w staging -d infra/./app --verbose -- -target=aws_s3_bucket.b");

        assert_eq!(command.name, CommandName::Plan);
        assert_eq!(command.workspace.as_deref(), Some("staging"));
        assert_eq!(command.repo_rel_dir.as_deref(), Some("infra/app"));
        assert!(command.verbose);
        assert_eq!(command.flags, vec!["-target=aws_s3_bucket.b".to_string()]);
    }

    #[test]
    fn test_apply_auto_merge_disabled() {
        let command = expect_command("atlantis apply -p core --auto-merge-disabled");

        assert_eq!(command.name, CommandName::Apply);
        assert_eq!(command.project_name.as_deref(), Some("core"));
        assert!(command.auto_merge_disabled);
    }

    #[test]
    fn test_dir_root_normalises_to_dot() {
        let command = expect_command("atlantis plan -d /");
        assert_eq!(command.repo_rel_dir.as_deref(), Some("."));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(expect_command("atlantis unlock").name, CommandName::Unlock);
        assert_eq!(expect_command("atlantis version").name, CommandName::Version);

        let command = expect_command("atlantis approve_policies --verbose");
        assert_eq!(command.name, CommandName::ApprovePolicies);
        assert!(command.verbose);
    }

    #[test]
    fn test_quoted_dir_is_tokenised() {
        let command = expect_command("atlantis plan -d \"my dir\"");
        assert_eq!(command.repo_rel_dir.as_deref(), Some("my dir"));
    }
}
