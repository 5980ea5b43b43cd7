//! Command-line front end for inbox-dl.
//!
//! With no arguments at all the program runs interactively and prompts for
//! everything it needs.

use chrono::{DateTime, Local, Utc};
use clap::Parser;
use inbox_dl::config::ExportFormat;
use inbox_dl::error::FetchError;
use inbox_dl::export::render_transcript;
use inbox_dl::pagination::{RunReport, StopReason};
use inbox_dl::progress::split_hms;
use inbox_dl::{Config, Error, InboxDownloader, ThreadId, cancel_on_signal, utils};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "inbox-dl", version)]
#[command(about = "Download the message history of a direct-message thread")]
struct Cli {
    /// Value of your account's `sessionid` cookie
    #[arg(short = 's', long = "sessionid", env = "INBOX_DL_SESSIONID", hide_env_values = true)]
    session_id: Option<String>,

    /// Thread to download
    #[arg(short = 't', long = "threadid")]
    thread_id: Option<String>,

    /// Debug logging and the full transcript on the console, no progress line
    #[arg(short, long)]
    verbose: bool,

    /// Write the transcript to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop at messages older than this date (dd/mm/YYYY or dd/mm/YYYY@HH:MM:SS, local time)
    #[arg(short = 'd', long = "date", value_parser = parse_date)]
    date: Option<DateTime<Utc>>,

    /// List the inbox threads and exit
    #[arg(short, long)]
    list: bool,

    /// Export raw messages as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Pause between page requests in milliseconds
    #[arg(long, default_value_t = 1000)]
    page_delay_ms: u64,

    /// API base URL
    #[arg(long)]
    base_url: Option<String>,
}

fn parse_date(input: &str) -> Result<DateTime<Utc>, String> {
    utils::parse_cutoff(input).map_err(|e| e.to_string())
}

/// What the program was asked to do
enum Action {
    List(Config),
    Fetch(Config),
}

impl Cli {
    fn into_action(self) -> inbox_dl::Result<Action> {
        let session_id = self
            .session_id
            .ok_or_else(|| Error::config("session_id", "a session id is required (-s or INBOX_DL_SESSIONID)"))?;

        let mut config = Config::new(session_id);
        config.verbose = self.verbose;
        config.thread_id = self.thread_id;
        config.pagination.page_delay = Duration::from_millis(self.page_delay_ms);
        config.pagination.cutoff = self.date;
        config.export.output = self.output;
        if self.json {
            config.export.format = ExportFormat::Json;
        }
        if let Some(base_url) = self.base_url {
            config.api.base_url = base_url;
        }

        if self.list {
            return Ok(Action::List(config));
        }
        if config.thread_id.is_none() {
            return Err(Error::config("thread_id", "a thread id is required (-t), or use -l to list threads"));
        }
        Ok(Action::Fetch(config))
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "warn,inbox_dl=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let interactive = std::env::args_os().len() <= 1;
    let cli = Cli::parse();

    let result = if interactive {
        run_interactive(cli.session_id).await
    } else {
        init_tracing(cli.verbose);
        match cli.into_action() {
            Ok(Action::List(config)) => list(config).await,
            Ok(Action::Fetch(config)) => fetch(config).await,
            Err(e) => Err(e),
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(code = e.error_code(), "Exiting with error");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn list(config: Config) -> inbox_dl::Result<ExitCode> {
    let downloader = InboxDownloader::new(config)?;
    print_threads(&downloader).await?;
    Ok(ExitCode::SUCCESS)
}

async fn print_threads(downloader: &InboxDownloader) -> inbox_dl::Result<()> {
    println!("Fetching your chats...");
    let threads = downloader.list_threads().await?;
    println!();
    println!("{:<45} Thread ID", "Name");
    println!("{}", "-".repeat(80));
    for thread in &threads {
        println!("{:<45} {}", thread.name, thread.thread_id);
    }
    println!();
    println!("Total: {} threads", threads.len());
    Ok(())
}

async fn fetch(config: Config) -> inbox_dl::Result<ExitCode> {
    let downloader = InboxDownloader::new(config)?;
    let config = downloader.config().clone();
    let thread = config
        .thread_id
        .as_deref()
        .map(ThreadId::new)
        .ok_or_else(|| Error::config("thread_id", "no thread id was provided"))?;

    tokio::spawn(cancel_on_signal(downloader.cancellation_token()));

    if config.verbose {
        println!("Starting in verbose mode...");
    }
    println!("Connecting...");

    let (report, failure) = match downloader.fetch_thread(&thread).await {
        Ok(report) => (report, None),
        Err(Error::Aborted(aborted)) => {
            let aborted = *aborted;
            (aborted.partial, Some(aborted.cause))
        }
        Err(e) => return Err(e),
    };

    if let Some(cause) = &failure {
        eprintln!();
        eprintln!("{}", describe_failure(cause));
        eprintln!("Keeping {} messages fetched before the error.", report.store.len());
    }
    if report.stop == Some(StopReason::Interrupted) {
        eprintln!(
            "\nProgram exit before time... Printing fetched messages... [{}]",
            Local::now().format(utils::TRANSCRIPT_TIME_FORMAT)
        );
    }

    if config.prints_transcript() {
        println!("\n----------- Messages -----------");
        for line in render_transcript(&report.store, &report.members, &Local) {
            println!("{}", line);
        }
    }

    if let Some(path) = &config.export.output {
        match downloader.export(&report).await {
            Ok(()) => println!("Writing to file completed, file located at {}", path.display()),
            Err(e) => {
                eprintln!("Error: could not write {}: {}", path.display(), e);
                print_summary(&report, downloader.stats().requests());
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    print_summary(&report, downloader.stats().requests());

    Ok(if failure.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn describe_failure(cause: &FetchError) -> String {
    match cause {
        FetchError::RateLimited => {
            "Error: rate limited by the server (HTTP 429). Wait a while before trying again.".to_string()
        }
        FetchError::Auth { reason } => format!(
            "Error: not authorized ({}). Your session id is probably invalid or expired; copy a fresh sessionid cookie from your browser.",
            reason
        ),
        FetchError::BadRequest { message } => format!(
            "Error: bad request ({}). Check the thread id and session id format.",
            message
        ),
        other => format!("Error: {}", other),
    }
}

fn print_summary(report: &RunReport, requests: u64) {
    let (hours, minutes, seconds) = split_hms(report.elapsed);
    println!();
    match report.stop {
        Some(_) => println!("Fetching complete!"),
        None => println!("Fetching stopped early."),
    }
    println!("Total messages: {}", report.store.len());
    println!("Time elapsed: {}h {}m {}s", hours, minutes, seconds);
    println!("API requests: {}", requests);
    println!("Average rate: {:.2} messages/second", report.average_rate());
}

// ---------------------------------------------------------------------------
// Interactive mode
// ---------------------------------------------------------------------------

fn prompt(question: &str) -> inbox_dl::Result<String> {
    print!("{}", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

fn confirm(question: &str) -> inbox_dl::Result<bool> {
    Ok(prompt(question)?.eq_ignore_ascii_case("y"))
}

async fn run_interactive(env_session: Option<String>) -> inbox_dl::Result<ExitCode> {
    println!("=== inbox-dl ===\n");

    let mut session_id = prompt("Your account's Sessionid: ")?;
    if session_id.is_empty()
        && let Some(env_session) = env_session
    {
        session_id = env_session;
    }
    let mut config = Config::new(session_id);

    if confirm("See chats list (y/N): ")? {
        init_tracing(false);
        print_threads(&InboxDownloader::new(config.clone())?).await?;
        config.thread_id = Some(prompt("Chat's Threadid: ")?);
        config.verbose = confirm("Verbose (y/N): ")?;
    } else {
        config.thread_id = Some(prompt("Chat's Threadid: ")?);
        config.verbose = confirm("Verbose (y/N): ")?;
        init_tracing(config.verbose);
    }

    if confirm("Export to file (y/N): ")? {
        let path = PathBuf::from(prompt("File path + name: ")?);
        if path.is_file() {
            println!("Entered path is a file, continuing");
            config.export.output = Some(path);
        } else if path.is_dir() {
            println!("Entered path is a directory. Saving to file omitted.");
        } else if confirm("Entered file does not exist, create it (y/N)? ")? {
            config.export.output = Some(path);
        } else {
            println!("Saving to file omitted.");
        }
    }

    let date = prompt("Limit date (dd/mm/yyyy[@hh:mm:ss]): ")?;
    if !date.is_empty() {
        config.pagination.cutoff = Some(utils::parse_cutoff(&date)?);
    }

    fetch(config).await
}
