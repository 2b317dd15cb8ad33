//! CLI entry point: token/group/date-range plumbing around the pipeline.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Parser;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use gmharvest::classify::{
    Classifier, ClassifierKind, LexicalClassifier, ModelClassifier, find_aggressive_messages,
};
use gmharvest::config::Config;
use gmharvest::extract::{TimeWindow, extract_images};
use gmharvest::groupme::{Group, GroupMeClient, fetch_all_messages};
use gmharvest::logging::{self, LogConfig};

// ── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "gmharvest",
    version,
    about = "Flag aggressive messages in a GroupMe group and archive its unique images"
)]
struct Cli {
    /// GroupMe API access token (prompts when omitted)
    #[arg(long, env = "GROUPME_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Index of the group to analyze (prompts when omitted)
    #[arg(long, value_name = "INDEX")]
    group: Option<usize>,
    /// Window start date, YYYY-MM-DD (prompts when omitted)
    #[arg(long, value_name = "DATE")]
    start: Option<String>,
    /// Window end date, YYYY-MM-DD (prompts when omitted)
    #[arg(long, value_name = "DATE")]
    end: Option<String>,
    /// Path to the config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Classification strategy (overrides config)
    #[arg(long, value_enum)]
    classifier: Option<ClassifierKind>,
    /// Maximum messages to fetch (overrides config)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
    /// Append run logs to this file (overrides config)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

// ── Interactive boundary ────────────────────────────────────────────────────

fn resolve_token(flag: Option<String>) -> Result<String> {
    let token = match flag {
        Some(t) => t,
        None => rpassword::prompt_password("Enter your GroupMe access token: ")
            .context("failed to read token")?,
    };
    let token = token.trim().to_string();
    if token.is_empty() {
        bail!("missing GroupMe token");
    }
    Ok(token)
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(line.trim().to_string())
}

fn select_group(groups: &[Group], flag: Option<usize>) -> Result<&Group> {
    let index = match flag {
        Some(i) => i,
        None => prompt_line("\nEnter the index of the group to analyze: ")?
            .parse::<usize>()
            .context("invalid group selection")?,
    };
    groups.get(index).context("invalid group selection")
}

/// Turn two calendar dates into an inclusive epoch-second window:
/// start-of-day for the start date, end-of-day for the end date. This is
/// where the core's `start <= end` precondition gets enforced.
fn resolve_window(start: Option<String>, end: Option<String>) -> Result<TimeWindow> {
    let start_str = match start {
        Some(s) => s,
        None => prompt_line("Start date (YYYY-MM-DD): ")?,
    };
    let end_str = match end {
        Some(s) => s,
        None => prompt_line("End date   (YYYY-MM-DD): ")?,
    };

    let parse = |s: &str| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
    };
    let start_date = parse(&start_str)?;
    let end_date = parse(&end_str)?;
    if start_date > end_date {
        bail!("start date must not be after end date");
    }

    let start_ts = start_date
        .and_hms_opt(0, 0, 0)
        .context("invalid start of day")?
        .and_utc()
        .timestamp();
    let end_ts = end_date
        .and_hms_opt(23, 59, 59)
        .context("invalid end of day")?
        .and_utc()
        .timestamp();
    Ok(TimeWindow {
        start: start_ts,
        end: end_ts,
    })
}

fn build_classifier(kind: ClassifierKind, config: &Config) -> Result<Box<dyn Classifier>> {
    match kind {
        ClassifierKind::Lexical => Ok(Box::new(LexicalClassifier::new(&config.aggressive_words))),
        ClassifierKind::Model => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .context("the model strategy needs OPENAI_API_KEY to be set")?;
            Ok(Box::new(ModelClassifier::new(
                api_key,
                config.openai_api_base.clone(),
                config.model.clone(),
            )))
        }
    }
}

/// Group names become directory names; keep them filesystem-safe.
fn group_dir_name(name: &str) -> String {
    name.replace([' ', '/', '\\'], "_")
}

// ── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.clone())?;

    let mut log_config = LogConfig::from_env();
    log_config.log_file = cli.log_file.clone().or_else(|| config.log_file.clone());
    logging::init(&log_config)?;

    let token = resolve_token(cli.token.clone())?;
    let client = GroupMeClient::new(token, config.api_base.clone());

    let groups = client.fetch_groups().await?;
    if groups.is_empty() {
        bail!("this account has no group chats");
    }
    println!("\n{}", "Available group chats:".bold());
    for (i, group) in groups.iter().enumerate() {
        println!("  [{i}] {} ({} members)", group.name, group.members.len());
    }
    let group = select_group(&groups, cli.group)?;

    let max_messages = cli.limit.unwrap_or(config.max_messages);
    println!(
        "Fetching up to {} messages from '{}'…",
        max_messages,
        group.name.bold()
    );
    let messages = fetch_all_messages(&client, &group.id, max_messages).await?;
    println!("Fetched {} messages.", messages.len());

    let kind = cli.classifier.unwrap_or(config.classifier);
    let classifier = build_classifier(kind, &config)?;
    println!(
        "Scanning for aggressive messages ({} strategy)…",
        classifier.name()
    );
    let flagged =
        find_aggressive_messages(&messages, classifier.as_ref(), config.on_classify_error).await?;
    println!(
        "{}",
        format!("Found {} aggressive messages.", flagged.len()).yellow()
    );
    for message in flagged.iter().take(10) {
        println!(
            "- {}: {}",
            message.name.bold(),
            message.text.as_deref().unwrap_or_default()
        );
    }

    let window = resolve_window(cli.start.clone(), cli.end.clone())?;
    let group_dir = config.download_dir.join(group_dir_name(&group.name));

    // Ctrl-C stops extraction before the next attachment; the ledger is
    // still flushed with everything written so far.
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watcher.cancel();
        }
    });

    println!("Downloading images…");
    let count = extract_images(&messages, &client, &group_dir, window, &cancel).await?;
    println!(
        "{}",
        format!(
            "Downloaded {} new images to '{}'",
            count,
            group_dir.display()
        )
        .green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_dir_name_is_filesystem_safe() {
        assert_eq!(group_dir_name("Ski Trip 2024"), "Ski_Trip_2024");
        assert_eq!(group_dir_name("a/b\\c"), "a_b_c");
    }

    #[test]
    fn window_expands_to_whole_days() {
        let window = resolve_window(
            Some("2024-01-01".to_string()),
            Some("2024-01-02".to_string()),
        )
        .unwrap();
        assert_eq!(window.start, 1_704_067_200); // 2024-01-01T00:00:00Z
        assert_eq!(window.end, 1_704_239_999); // 2024-01-02T23:59:59Z
    }

    #[test]
    fn inverted_range_is_rejected() {
        let result = resolve_window(
            Some("2024-02-01".to_string()),
            Some("2024-01-01".to_string()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(resolve_token(Some("   ".to_string())).is_err());
        assert!(resolve_token(Some("abc123".to_string())).is_ok());
    }
}
