use crate::commands::DEFAULT_CONFIG_DIR;
use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lumen_core::data::Database;
use lumen_core::report::{
    ReportFormat, gather_report_data, generate_json_report, generate_markdown_report,
    generate_text_report, save_report,
};
use lumen_core::{ImpactLevel, ScanConfig, ScanOutcome, ScanSession};
use lumen_scanner::{CrawlConfig, HttpSessionConfig, HttpSessionProvider, StaticAuditor};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use url::Url;

pub const DB_FILE_NAME: &str = "lumen.db";

pub fn print_banner() {
    eprintln!(
        "{} {}",
        "lumen".bright_yellow().bold(),
        format!("v{} - web accessibility auditor", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

/// Install the log subscriber; `verbose` raises the level to debug.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    match Url::parse(&with_scheme) {
        Ok(url) if url.host_str().is_some() => Some(with_scheme),
        _ => None,
    }
}

/// `--db` may name the database file itself or the directory that holds it.
pub fn resolve_db_path(db: Option<&str>) -> PathBuf {
    let raw = db.unwrap_or(DEFAULT_CONFIG_DIR);
    let expanded = PathBuf::from(shellexpand::tilde(raw).into_owned());
    if expanded.extension().is_some_and(|ext| ext == "db") {
        expanded
    } else {
        expanded.join(DB_FILE_NAME)
    }
}

fn open_database(path: &Path) -> Result<Database> {
    if !Database::exists(path) {
        bail!(
            "No database found at {}. Run `lumen init` first.",
            path.display()
        );
    }
    Database::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

pub fn build_scan_config(args: &ArgMatches) -> ScanConfig {
    let defaults = CrawlConfig::default();
    let crawl = CrawlConfig {
        max_depth: args
            .get_one::<usize>("max-depth")
            .copied()
            .unwrap_or(defaults.max_depth),
        max_pages: args
            .get_one::<usize>("max-pages")
            .copied()
            .unwrap_or(defaults.max_pages),
        concurrency: args
            .get_one::<usize>("concurrency")
            .copied()
            .unwrap_or(defaults.concurrency),
        max_links_per_page: args
            .get_one::<usize>("max-links")
            .copied()
            .unwrap_or(defaults.max_links_per_page),
        navigation_timeout: args
            .get_one::<u64>("timeout")
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or(defaults.navigation_timeout),
        settle_delay: args
            .get_one::<u64>("settle-ms")
            .map(|millis| Duration::from_millis(*millis))
            .unwrap_or(defaults.settle_delay),
    };
    ScanConfig::default().with_crawl(crawl)
}

/// Plain-text summary of a finished scan.
pub fn format_outcome(outcome: &ScanOutcome) -> String {
    let mut summary = String::new();

    summary.push_str(&format!("Website ID:  {}\n", outcome.scanned_website.id));
    summary.push_str(&format!("URL:         {}\n", outcome.scanned_website.url));
    summary.push_str(&format!("Result:      {}\n", outcome.message));

    if let Some(score) = outcome.score {
        summary.push_str(&format!("Score:       {:.1} / 100\n", score));
    }
    if !outcome.success {
        return summary;
    }

    summary.push_str(&format!("\nIssues: {}\n", outcome.counts.total_issues));
    for level in ImpactLevel::ALL {
        summary.push_str(&format!(
            "  {:<9} {}\n",
            level.as_str(),
            outcome.counts.get(level)
        ));
    }

    summary.push_str(&format!("\nPages audited: {}\n", outcome.pages.len()));
    for page in &outcome.pages {
        summary.push_str(&format!(
            "  {:>4}  {} (depth {})\n",
            page.issue_count, page.url, page.depth
        ));
    }

    summary
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  LUMEN INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    // `PATH` wins over the global `--db`; both resolve like the other subcommands
    let target = args
        .get_one::<String>("PATH")
        .or_else(|| args.get_one::<String>("db"))
        .map(String::as_str);
    let force = args.get_flag("force");
    let db_path = resolve_db_path(target);

    println!(
        "{} Target: {}",
        "→".blue(),
        db_path.display().to_string().bright_white()
    );
    println!();

    if Database::exists(&db_path) {
        if !force {
            println!("{}", "⚠ WARNING".yellow().bold());
            println!("Database already exists at:");
            println!(
                "  {} {}",
                "•".yellow(),
                db_path.display().to_string().bright_white()
            );
            println!();

            let response = print_prompt("Would you like to overwrite it? [y/N]:")?;
            println!();
            if response != "y" && response != "yes" {
                println!("{} Keeping existing database", "→".blue());
                return Ok(());
            }
        }

        Database::remove(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
        println!("{} Existing database removed", "✓".green().bold());
    }

    if let Some(config_dir) = db_path.parent()
        && !config_dir.as_os_str().is_empty()
    {
        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    }

    println!("{} Creating database...", "→".blue());
    Database::new(&db_path)
        .with_context(|| format!("Failed to create database {}", db_path.display()))?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();
    Ok(())
}

pub fn handle_user_register(args: &ArgMatches) -> Result<()> {
    let email = args
        .get_one::<String>("email")
        .ok_or_else(|| anyhow!("--email is required"))?;
    let db = open_database(&resolve_db_path(args.get_one::<String>("db").map(String::as_str)))?;

    let user = db
        .register_user(email)
        .with_context(|| format!("Could not register '{}'", email))?;
    println!(
        "{} Registered {} (id {})",
        "✓".green().bold(),
        user.email.bright_white(),
        user.id
    );
    Ok(())
}

/// Runs a scan and prints its summary. `Ok(false)` means the crawl reached
/// no page.
pub async fn handle_scan(args: &ArgMatches) -> Result<bool> {
    init_tracing(args.get_flag("verbose"));

    let raw_url = args
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    let url = parse_url_line(raw_url).ok_or_else(|| anyhow!("Invalid URL '{}'", raw_url))?;
    let email = args
        .get_one::<String>("user")
        .ok_or_else(|| anyhow!("--user is required"))?;

    let db = Arc::new(open_database(&resolve_db_path(
        args.get_one::<String>("db").map(String::as_str),
    ))?);
    let config = build_scan_config(args);

    println!(
        "\n{} Scanning {} (depth {}, up to {} pages, {} at a time)\n",
        "→".blue(),
        url.bright_white(),
        config.crawl.max_depth,
        config.crawl.max_pages,
        config.crawl.concurrency
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Starting crawl...");

    let progress = spinner.clone();
    let session = ScanSession::new(
        db.clone(),
        db.clone(),
        Arc::new(HttpSessionProvider::new(HttpSessionConfig::default())),
        Arc::new(StaticAuditor::new()),
    )
    .with_config(config)
    .with_progress_callback(Arc::new(move |completed: usize, page_url: String| {
        progress.set_message(format!("{} pages audited, last: {}", completed, page_url));
    }));

    let outcome = session.perform_scan(&url, email).await;
    spinner.finish_and_clear();
    let outcome = outcome.context("Scan failed")?;

    if outcome.success {
        println!("{} {}\n", "✓".green().bold(), outcome.message);
    } else {
        println!("{} {}\n", "✗".red().bold(), outcome.message);
    }
    print!("{}", format_outcome(&outcome));

    Ok(outcome.success)
}

pub fn handle_report(args: &ArgMatches) -> Result<()> {
    let website_id = args
        .get_one::<String>("id")
        .ok_or_else(|| anyhow!("--id is required"))?;
    let format_name = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| anyhow!("Unknown report format '{}'", format_name))?;

    let db = open_database(&resolve_db_path(args.get_one::<String>("db").map(String::as_str)))?;
    let data = gather_report_data(&db, website_id)
        .with_context(|| format!("No report available for {}", website_id))?;

    let content = match format {
        ReportFormat::Text => generate_text_report(&data),
        ReportFormat::Json => generate_json_report(&data)?,
        ReportFormat::Markdown => generate_markdown_report(&data),
    };

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            save_report(&content, path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub fn handle_list(args: &ArgMatches) -> Result<()> {
    let db = open_database(&resolve_db_path(args.get_one::<String>("db").map(String::as_str)))?;
    let websites = db.list_scanned_websites()?;

    if websites.is_empty() {
        println!("No scans yet. Run `lumen scan --url <URL> --user <EMAIL>`.");
        return Ok(());
    }

    for website in websites {
        let status = match website.status {
            lumen_core::ScanStatus::Success => "success".green(),
            lumen_core::ScanStatus::Failed => "failed".red(),
        };
        let date = chrono::DateTime::from_timestamp(website.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{}  {:<7}  {}  {}", website.id, status, date, website.url);
    }
    Ok(())
}
