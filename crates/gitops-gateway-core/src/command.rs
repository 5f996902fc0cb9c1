//! Comment commands and the parser that recognises them.
//!
//! The gateway only depends on the [`CommentParser`] trait. [`DefaultCommentParser`]
//! is the implementation wired into the service.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

use crate::VcsHostType;

// ============================================================================
// Commands
// ============================================================================

/// Commands a user can issue from a pull-request comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandName {
    Plan,
    Apply,
    Unlock,
    ApprovePolicies,
    Version,
}

impl CommandName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Unlock => "unlock",
            Self::ApprovePolicies => "approve_policies",
            Self::Version => "version",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "plan" => Some(Self::Plan),
            "apply" => Some(Self::Apply),
            "unlock" => Some(Self::Unlock),
            "approve_policies" => Some(Self::ApprovePolicies),
            "version" => Some(Self::Version),
            _ => None,
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured command parsed from a comment.
///
/// `None` for `repo_rel_dir`, `workspace` or `project_name` means the user did
/// not specify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentCommand {
    pub name: CommandName,
    pub repo_rel_dir: Option<String>,
    pub workspace: Option<String>,
    pub project_name: Option<String>,
    /// Extra arguments after `--`, passed through to the tool.
    pub flags: Vec<String>,
    pub verbose: bool,
    pub auto_merge_disabled: bool,
}

impl CommentCommand {
    pub fn new(name: CommandName) -> Self {
        Self {
            name,
            repo_rel_dir: None,
            workspace: None,
            project_name: None,
            flags: Vec::new(),
            verbose: false,
            auto_merge_disabled: false,
        }
    }
}

/// Result of parsing a comment; exactly one outcome applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentParseResult {
    /// Not addressed to the gateway.
    Ignore,
    /// Reply immediately with this text; nothing is executed.
    CommentResponse(String),
    Command(CommentCommand),
}

/// Turns comment text into a [`CommentParseResult`].
pub trait CommentParser: Send + Sync {
    fn parse(&self, comment: &str, vcs_host: VcsHostType) -> CommentParseResult;
}

// ============================================================================
// Default parser
// ============================================================================

#[derive(Debug, clap::Args)]
struct TargetArgs {
    /// Workspace to switch to before running the command.
    #[arg(short = 'w', long)]
    workspace: Option<String>,

    /// Directory to run in, relative to the repository root.
    #[arg(short = 'd', long)]
    dir: Option<String>,

    /// Project name from the repository configuration. Cannot be combined with -d or -w.
    #[arg(short = 'p', long)]
    project: Option<String>,

    /// Append the run log to the reply comment.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Parser)]
#[command(name = "plan", no_binary_name = true, disable_version_flag = true)]
struct PlanArgs {
    #[command(flatten)]
    target: TargetArgs,

    #[arg(last = true)]
    extra_args: Vec<String>,
}

#[derive(Debug, Parser)]
#[command(name = "apply", no_binary_name = true, disable_version_flag = true)]
struct ApplyArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Do not merge the pull request after a successful apply.
    #[arg(long)]
    auto_merge_disabled: bool,

    #[arg(last = true)]
    extra_args: Vec<String>,
}

#[derive(Debug, Parser)]
#[command(name = "version", no_binary_name = true, disable_version_flag = true)]
struct VersionArgs {
    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Debug, Parser)]
#[command(
    name = "approve_policies",
    no_binary_name = true,
    disable_version_flag = true
)]
struct ApprovePoliciesArgs {
    /// Append the run log to the reply comment.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Parser)]
#[command(name = "unlock", no_binary_name = true, disable_version_flag = true)]
struct UnlockArgs {}

/// Parser for `<executable> <command> [flags] [-- extra args]` comments.
///
/// The executable may be the configured name, `run`, or `@<bot-user>`.
/// Comments addressed to anything else are ignored, as are multi-line
/// comments.
#[derive(Debug, Clone)]
pub struct DefaultCommentParser {
    executable_name: String,
    bot_user: String,
    apply_disabled: bool,
}

impl DefaultCommentParser {
    pub fn new(executable_name: impl Into<String>, bot_user: impl Into<String>) -> Self {
        Self {
            executable_name: executable_name.into(),
            bot_user: bot_user.into(),
            apply_disabled: false,
        }
    }

    pub fn with_apply_disabled(mut self, apply_disabled: bool) -> Self {
        self.apply_disabled = apply_disabled;
        self
    }

    fn is_invocation(&self, word: &str, vcs_host: VcsHostType) -> bool {
        if word == "run" || word == self.executable_name {
            return true;
        }
        match vcs_host {
            VcsHostType::Github => {
                !self.bot_user.is_empty()
                    && word.strip_prefix('@') == Some(self.bot_user.as_str())
            }
        }
    }

    /// Reply for a bare executable or `help`.
    pub fn help_comment(&self) -> String {
        let exe = &self.executable_name;
        let mut text = format!(
            "```cmake\n{exe}\nTerraform Pull Request Automation\n\nUsage:\n  {exe} <command> [options] -- [terraform options]\n\nExamples:\n  # run plan in the root directory passing the -target flag to terraform\n  {exe} plan -d . -- -target=resource\n"
        );
        if !self.apply_disabled {
            text.push_str(&format!(
                "\n  # apply all unapplied plans from this pull request\n  {exe} apply\n\n  # apply the plan for the root directory and staging workspace\n  {exe} apply -d . -w staging\n"
            ));
        }
        text.push_str("\nCommands:\n  plan     Runs 'terraform plan' for the changes in this pull request.\n");
        if !self.apply_disabled {
            text.push_str(
                "  apply    Runs 'terraform apply' on all unapplied plans from this pull request.\n",
            );
        }
        text.push_str(&format!(
            "  unlock   Removes all locks and discards all plans for this pull request.\n  approve_policies\n           Approves all current policy checking failures for the pull request.\n  version  Print the output of 'terraform version'.\n  help     View help.\n\nUse \"{exe} [command] --help\" for more information about a command.\n```"
        ));
        text
    }

    fn did_you_mean_comment(&self) -> String {
        format!(
            "Did you mean to use `{}` instead of `terraform`?",
            self.executable_name
        )
    }

    fn parse_command(&self, name: CommandName, args: &[String]) -> CommentParseResult {
        let parsed = match name {
            CommandName::Plan => PlanArgs::try_parse_from(args).map(|a| {
                (a.target, false, a.extra_args)
            }),
            CommandName::Apply => ApplyArgs::try_parse_from(args)
                .map(|a| (a.target, a.auto_merge_disabled, a.extra_args)),
            CommandName::Version => {
                VersionArgs::try_parse_from(args).map(|a| (a.target, false, Vec::new()))
            }
            CommandName::ApprovePolicies => ApprovePoliciesArgs::try_parse_from(args).map(|a| {
                (
                    TargetArgs {
                        workspace: None,
                        dir: None,
                        project: None,
                        verbose: a.verbose,
                    },
                    false,
                    Vec::new(),
                )
            }),
            CommandName::Unlock => UnlockArgs::try_parse_from(args).map(|_| {
                (
                    TargetArgs {
                        workspace: None,
                        dir: None,
                        project: None,
                        verbose: false,
                    },
                    false,
                    Vec::new(),
                )
            }),
        };

        let (target, auto_merge_disabled, extra_args) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                let rendered = e.to_string();
                return match e.kind() {
                    clap::error::ErrorKind::DisplayHelp => CommentParseResult::CommentResponse(
                        format!("```\nUsage of {name}:\n{}\n```", rendered.trim_end()),
                    ),
                    _ => CommentParseResult::CommentResponse(format!(
                        "```\nError parsing {name} command:\n{}\n```",
                        rendered.trim_end()
                    )),
                };
            }
        };

        let repo_rel_dir = match target.dir.as_deref().map(clean_repo_rel_dir).transpose() {
            Ok(dir) => dir,
            Err(message) => return error_response(name, &message),
        };

        if let Some(workspace) = &target.workspace {
            if !is_valid_workspace(workspace) {
                return error_response(name, &format!("invalid workspace: {workspace:?}"));
            }
        }

        if target.project.is_some() && (target.workspace.is_some() || repo_rel_dir.is_some()) {
            return error_response(
                name,
                "cannot use -p/--project at same time as -d/--dir or -w/--workspace",
            );
        }

        CommentParseResult::Command(CommentCommand {
            name,
            repo_rel_dir,
            workspace: target.workspace,
            project_name: target.project,
            flags: extra_args,
            verbose: target.verbose,
            auto_merge_disabled,
        })
    }
}

impl CommentParser for DefaultCommentParser {
    fn parse(&self, comment: &str, vcs_host: VcsHostType) -> CommentParseResult {
        if is_multi_line(comment) {
            return CommentParseResult::Ignore;
        }
        let comment = comment.trim();

        let first_word = match comment.split_whitespace().next() {
            Some(word) => word,
            None => return CommentParseResult::Ignore,
        };

        if first_word == "terraform" {
            return CommentParseResult::CommentResponse(self.did_you_mean_comment());
        }

        if !self.is_invocation(first_word, vcs_host) {
            return CommentParseResult::Ignore;
        }

        let args = match shlex::split(comment) {
            Some(args) if !args.is_empty() => args,
            Some(_) => return CommentParseResult::Ignore,
            None => {
                return CommentParseResult::CommentResponse(
                    "```\nError parsing command: unbalanced quotes\n```".to_string(),
                )
            }
        };

        let keyword = match args.get(1) {
            Some(keyword) => keyword.as_str(),
            None => return CommentParseResult::CommentResponse(self.help_comment()),
        };

        if matches!(keyword, "help" | "-h" | "--help") {
            return CommentParseResult::CommentResponse(self.help_comment());
        }

        let name = match CommandName::from_keyword(keyword) {
            Some(name) => name,
            None => {
                return CommentParseResult::CommentResponse(format!(
                    "```\nError: unknown command {keyword:?}.\nRun '{} --help' for usage.\n```",
                    self.executable_name
                ))
            }
        };

        if name == CommandName::Apply && self.apply_disabled {
            return CommentParseResult::CommentResponse(format!(
                "**Error:** Running `{} apply` is disabled.",
                self.executable_name
            ));
        }

        self.parse_command(name, &args[2..])
    }
}

/// True when any line after the first has content.
fn is_multi_line(comment: &str) -> bool {
    comment
        .split('\n')
        .skip(1)
        .any(|line| line.chars().any(|c| c != '\r'))
}

fn error_response(name: CommandName, message: &str) -> CommentParseResult {
    CommentParseResult::CommentResponse(format!("```\nError: {message}.\nUsage of {name}: see --help\n```"))
}

/// Normalise a directory flag, rejecting paths that escape the repository.
fn clean_repo_rel_dir(dir: &str) -> Result<String, String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(dir).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().unwrap_or_default()),
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(format!(
                        "using a relative path {dir:?} with -d/--dir is not allowed"
                    ));
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if parts.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(parts.join("/"))
    }
}

/// Workspaces become file names, so only path-safe characters are allowed.
fn is_valid_workspace(workspace: &str) -> bool {
    !workspace.contains("..")
        && workspace.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '$' | '&' | '+' | ':' | '=' | '@')
        })
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
