//! CLI command definitions using clap.

use std::path::PathBuf;

use carequest_core::{GroupId, QuestionId, Target, UserId, ValidationError};
use clap::{Args, Parser, Subcommand};
use url::Url;

/// carequest - keep question assignments in the order operators want
#[derive(Parser, Debug)]
#[command(name = "carequest")]
#[command(version)]
#[command(about = "Reconcile priority-ordered question assignments for patients and groups")]
#[command(
    long_about = "carequest reads the assignments of a patient or group, computes the per-row creates, updates and deletes needed to reach a desired question order, applies them, and re-reads the result."
)]
pub struct Cli {
    /// Settings file (TOML, or JSON with a .json extension)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Assignment API base URL, overriding settings and environment
    #[arg(long, global = true)]
    pub base_url: Option<Url>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Exactly one of `--user` or `--group`.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Patient user id
    #[arg(long)]
    pub user: Option<u64>,

    /// Patient group id
    #[arg(long)]
    pub group: Option<u64>,
}

impl TargetArgs {
    /// The selected target.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::AmbiguousTarget`] unless exactly one id is set.
    pub fn target(&self) -> Result<Target, ValidationError> {
        Target::from_parts(self.user.map(UserId::new), self.group.map(GroupId::new))
    }
}

/// A desired question order.
#[derive(Args, Debug, Clone)]
pub struct OrderArgs {
    /// Question ids in priority order, comma separated
    #[arg(long, value_delimiter = ',')]
    pub questions: Vec<u64>,

    /// Allow an empty order, which removes every assignment
    #[arg(long, default_value_t = false)]
    pub allow_empty: bool,
}

impl OrderArgs {
    /// Question ids in the given order.
    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.questions.iter().copied().map(QuestionId::new).collect()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a target's assignments in priority order
    List {
        #[command(flatten)]
        target: TargetArgs,

        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the changes needed to reach an order, without sending them
    Plan {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        order: OrderArgs,

        /// Print JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Apply an order, then print the reloaded assignments
    Apply {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        order: OrderArgs,

        /// Print JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Assign every question in a category
    AssignCategory {
        #[command(flatten)]
        target: TargetArgs,

        /// Category id
        #[arg(long)]
        category: u64,

        /// Priority of the first added question
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        priority: u32,

        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() -> TestResult {
        let cli = Cli::try_parse_from([
            "carequest",
            "--base-url",
            "https://care.example.org/",
            "apply",
            "--group",
            "3",
            "--questions",
            "5,9,7",
        ])?;

        match cli.command {
            Commands::Apply { target, order, json } => {
                assert_eq!(target.target()?, Target::Group(GroupId::new(3)));
                assert_eq!(order.questions, vec![5, 9, 7]);
                assert!(!order.allow_empty);
                assert!(!json);
            }
            other => return Err(format!("unexpected command {other:?}").into()),
        }
        assert!(cli.base_url.is_some());
        Ok(())
    }

    #[test]
    fn test_target_is_required() {
        assert!(Cli::try_parse_from(["carequest", "list"]).is_err());
    }

    #[test]
    fn test_user_and_group_conflict() {
        let result = Cli::try_parse_from(["carequest", "list", "--user", "1", "--group", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_priority_is_rejected() {
        let result = Cli::try_parse_from([
            "carequest",
            "assign-category",
            "--user",
            "1",
            "--category",
            "8",
            "--priority",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["carequest", "list", "--user", "4", "--log-level", "debug"])?;
        assert_eq!(cli.log_level, "debug");
        Ok(())
    }
}
