use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use curator_match::similar::DEFAULT_SIMILARITY_THRESHOLD;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;

use commands::Settings;

#[derive(Parser, Debug)]
#[command(name = "curator")]
#[command(about = "Sort liked models into collections by rule, then push the result")]
#[command(version)]
struct Cli {
    /// Directory holding the workbook sheets
    #[arg(long, global = true, env = "CURATOR_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Term configuration (YAML)
    #[arg(
        long,
        global = true,
        env = "CURATOR_TERMS",
        default_value = "terms/collections_terms.yaml"
    )]
    terms: PathBuf,

    /// Platform API base URL
    #[arg(long, global = true, env = "CURATOR_API_BASE", default_value = curator_sync::DEFAULT_API_BASE)]
    api_base: String,

    /// API token; needed by collect, push and merge
    #[arg(long, global = true, env = "CURATOR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Minimum seconds between mutating API calls
    #[arg(long, global = true, env = "CURATOR_MIN_POST_INTERVAL", default_value_t = 1.0)]
    min_post_interval: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Fetch liked items and collections, keeping workbook annotations
    Collect,

    /// Refresh suggested and fuzzy-match columns
    Match,

    /// Apply the assignment policy to every item
    AutoAssign {
        /// Replace assignments that are already set
        #[arg(long)]
        overwrite: bool,
    },

    /// Copy non-blank Manual cells into Assigned Collection(s)
    ApplyManual,

    /// Add items to their assigned collections on the platform
    Push {
        /// Plan and count operations without sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Unassigned items and the most common words among them
    Report {
        #[arg(long, default_value_t = 25)]
        top: usize,
    },

    /// List collections whose names look alike
    Similar {
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: u8,
    },

    /// Copy every member of one collection into another
    Merge {
        /// Collection that receives the members
        #[arg(long)]
        keep: String,

        /// Collection whose members are copied (it is not deleted)
        #[arg(long)]
        drop: String,

        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the term configuration and print a summary
    Terms,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        if !self.min_post_interval.is_finite() || self.min_post_interval < 0.0 {
            bail!(
                "--min-post-interval must be a non-negative number of seconds, got {}",
                self.min_post_interval
            );
        }
        Ok(Settings {
            data_dir: self.data_dir.clone(),
            terms: self.terms.clone(),
            api_base: self.api_base.clone(),
            token: self.token.clone().filter(|t| !t.trim().is_empty()),
            min_post_interval: Duration::from_secs_f64(self.min_post_interval),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings()?;
    tracing::debug!(data_dir = %settings.data_dir.display(), "curator v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Collect => {
            let stats = commands::collect(&settings).await?;
            println!("{}", display::collect_summary(&stats));
        }
        Command::Match => {
            let stats = commands::refresh(&settings)?;
            println!("{}", display::match_summary(&stats));
        }
        Command::AutoAssign { overwrite } => {
            let stats = commands::auto_assign(&settings, overwrite)?;
            println!("{}", display::assign_summary(&stats));
        }
        Command::ApplyManual => {
            let stats = commands::apply_manual(&settings)?;
            println!("{}", display::manual_summary(&stats));
        }
        Command::Push { dry_run } => {
            let outcome = commands::push(&settings, dry_run).await?;
            println!("{}", display::push_summary(&outcome));
        }
        Command::Report { top } => {
            let report = commands::report(&settings, top)?;
            print!("{}", display::term_report(&report));
        }
        Command::Similar { threshold } => {
            let pairs = commands::similar(&settings, threshold)?;
            print!("{}", display::similar_pairs(&pairs, threshold));
        }
        Command::Merge {
            keep,
            drop,
            dry_run,
        } => {
            let outcome = commands::merge(&settings, &keep, &drop, dry_run).await?;
            println!("{}", display::merge_summary(&keep, &drop, &outcome));
        }
        Command::Terms => {
            let summary = commands::terms_summary(&settings)?;
            print!("{}", display::terms_summary(&settings.terms, &summary));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("curator").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&["match", "--token", "t"]);
        assert_eq!(cli.command, Command::Match);
        assert_eq!(cli.token.as_deref(), Some("t"));
        // Env may override paths in a developer shell; only check the command.
        let s = cli.settings().unwrap();
        assert!(s.min_post_interval <= Duration::from_secs(3600));
    }

    #[test]
    fn subcommand_flags() {
        assert_eq!(
            parse(&["auto-assign", "--overwrite"]).command,
            Command::AutoAssign { overwrite: true }
        );
        assert_eq!(
            parse(&["push", "--dry-run"]).command,
            Command::Push { dry_run: true }
        );
        assert_eq!(
            parse(&["report", "--top", "5"]).command,
            Command::Report { top: 5 }
        );
        assert_eq!(
            parse(&["similar"]).command,
            Command::Similar { threshold: 90 }
        );
        assert_eq!(
            parse(&["merge", "--keep", "hands", "--drop", "hand"]).command,
            Command::Merge {
                keep: "hands".into(),
                drop: "hand".into(),
                dry_run: false
            }
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["report", "--data-dir", "/tmp/wb", "--min-post-interval", "2.5"]);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/wb"));
        assert_eq!(cli.settings().unwrap().min_post_interval, Duration::from_millis(2500));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = Cli::try_parse_from(["curator", "similar", "--threshold", "101"]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_negative_interval() {
        let cli = parse(&["match", "--min-post-interval=-1"]);
        assert!(cli.settings().is_err());
    }

    #[test]
    fn blank_token_is_no_token() {
        let cli = parse(&["collect", "--token", "  "]);
        assert!(cli.settings().unwrap().token.is_none());
    }
}
