use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use field_capture::capture::Console;
use field_capture::config::{ClientConfig, SessionIdentity};
use field_capture::core::record::{ImageSide, RecordField};
use field_capture::error::HasRecoverySuggestion;
use field_capture::logging::{self, LogFormat};
use field_capture::processing::{CompressionEngine, CompressionOutcome, EncodedImage};
use field_capture::session::{CaptureCoordinator, Confirmation, RefreshOutcome};
use field_capture::sync::{HttpRemoteSync, RemoteSync};
use field_capture::{CaptureError, RowBuffer};
use tokio::io::{AsyncBufRead, AsyncWrite};

/// Field capture client: barcode + front/back photos per product, appended to a
/// remote list.
#[derive(Parser, Debug)]
#[command(name = "fieldcap")]
#[command(about = "📦 Capture barcodes and product photos into a remote list")]
#[command(long_about = "Capture a barcode plus a front and a back photo for each product and
submit every record to the remote list for the current session.
Photos are compressed to fit a per-image size budget before upload.")]
struct Args {
    /// Remote list endpoint
    #[arg(long, env = "FIELDCAP_ENDPOINT", default_value = "http://localhost:8080/notfoundproductslist")]
    endpoint: String,

    /// File holding the persisted session identity
    #[arg(long, env = "FIELDCAP_SESSION_FILE", default_value = ".fieldcap-session")]
    session_file: PathBuf,

    /// Per-photo size budget in bytes
    #[arg(long, default_value_t = 51_200, help = "Per-photo size budget in bytes (estimated after base64 decoding)")]
    budget: usize,

    /// Compression attempts before the smallest candidate is kept
    #[arg(long, default_value_t = 10)]
    max_attempts: u32,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Log output format
    #[arg(long, default_value = "compact", help = "Log format: pretty, compact, json")]
    log_format: LogFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress one photo and write the result as JPEG
    Compress {
        /// Photo to compress
        input: PathBuf,
        /// Output path (defaults to <input>.compressed.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print how many records the remote list already holds for the session
    Baseline,
    /// Submit one record against a freshly fetched baseline
    Submit {
        #[arg(long)]
        barcode: Option<String>,
        #[arg(long)]
        front: Option<PathBuf>,
        #[arg(long)]
        back: Option<PathBuf>,
    },
    /// Store the session identity used by every other command
    Session {
        id: String,
    },
    /// Interactive capture session
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_format, args.verbose)?;

    let config = ClientConfig {
        endpoint: args.endpoint,
        session_file: args.session_file,
        budget_bytes: args.budget,
        max_attempts: args.max_attempts,
        request_timeout_secs: args.timeout,
        ..ClientConfig::default()
    };
    config.validate()?;

    match args.command {
        Command::Compress { input, output } => compress(&config, &input, output).await,
        Command::Baseline => baseline(&config).await,
        Command::Submit {
            barcode,
            front,
            back,
        } => submit_once(&config, barcode, front, back).await,
        Command::Session { id } => {
            let session = SessionIdentity::new(id)?;
            session.store(&config.session_file)?;
            println!(
                "Session '{}' stored in {}",
                session,
                config.session_file.display()
            );
            Ok(())
        }
        Command::Run => run(&config).await,
    }
}

async fn compress(config: &ClientConfig, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let outcome = compress_file(config, input).await?;
    for attempt in &outcome.attempts {
        println!(
            "  attempt {:>2}: width {:>4}, quality {:.1}",
            attempt.index + 1,
            attempt.width,
            attempt.quality_fraction()
        );
    }
    print_outcome(&outcome);

    let output = output.unwrap_or_else(|| input.with_extension("compressed.jpg"));
    let bytes = outcome
        .image
        .to_bytes()
        .context("compressed payload is not valid base64")?;
    tokio::fs::write(&output, bytes)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {}", output.display());
    Ok(())
}

async fn baseline(config: &ClientConfig) -> Result<()> {
    let session = SessionIdentity::load(&config.session_file)?;
    let remote = HttpRemoteSync::from_config(config)?;
    let baseline = remote.fetch_baseline(&session).await?;
    println!(
        "Session '{}' at {} holds {} record(s); the next record goes to row {}",
        session,
        remote.endpoint(),
        baseline.count(),
        baseline.position_of(0)
    );
    Ok(())
}

async fn submit_once(
    config: &ClientConfig,
    barcode: Option<String>,
    front: Option<PathBuf>,
    back: Option<PathBuf>,
) -> Result<()> {
    let session = SessionIdentity::load(&config.session_file)?;
    let remote = HttpRemoteSync::from_config(config)?;
    let mut buffer = RowBuffer::new(remote.fetch_baseline(&session).await?);

    if let Some(code) = barcode {
        buffer.update(0, RecordField::Barcode(code))?;
    }
    for (side, path) in [(ImageSide::Front, front), (ImageSide::Back, back)] {
        if let Some(path) = path {
            let outcome = compress_file(config, &path).await?;
            print_outcome(&outcome);
            buffer.update(0, RecordField::Image(side, outcome.image))?;
        }
    }

    let receipt = buffer.submit(0, &remote, &session).await?;
    println!(
        "Submitted '{}' at row {} (HTTP {})",
        receipt.identifier.value, receipt.position, receipt.ack.status
    );
    Ok(())
}

async fn run(config: &ClientConfig) -> Result<()> {
    let session = SessionIdentity::load(&config.session_file)?;
    let remote: Arc<dyn RemoteSync> = Arc::new(HttpRemoteSync::from_config(config)?);
    let engine = CompressionEngine::jpeg(config.compression_options());
    let mut coordinator = CaptureCoordinator::start(session, remote, engine).await?;
    let mut console = Console::stdio();

    console
        .say(&format!(
            "Session '{}': {} record(s) on the remote list. Type 'help' for commands.",
            coordinator.session(),
            coordinator.buffer().baseline().count()
        ))
        .await?;

    while let Some(line) = console.prompt("> ").await? {
        let command = match ReplCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                console.say(&message).await?;
                continue;
            }
        };
        if command == ReplCommand::Quit {
            break;
        }
        if let Err(e) = execute(&mut coordinator, &mut console, command).await {
            console.say(&format!("error: {e}")).await?;
            if let Some(hint) = e.recovery_suggestion() {
                console.say(&format!("hint: {hint}")).await?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplCommand {
    List,
    Scan(usize),
    Photo(usize, ImageSide),
    Edit(usize),
    Submit(usize),
    Refresh,
    Help,
    Quit,
}

const HELP: &str = "commands: list | scan <row> | photo <row> front|back | edit <row> | submit <row> | refresh | quit";

impl ReplCommand {
    /// `Ok(None)` for a blank line, `Err` with a message for anything unparseable.
    fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let command = match verb {
            "list" | "ls" => Self::List,
            "scan" => Self::Scan(row_arg(verb, &mut words)?),
            "edit" => Self::Edit(row_arg(verb, &mut words)?),
            "submit" => Self::Submit(row_arg(verb, &mut words)?),
            "photo" => {
                let index = row_arg(verb, &mut words)?;
                let side = words
                    .next()
                    .ok_or_else(|| "'photo' needs a side: front or back".to_string())?
                    .parse::<ImageSide>()
                    .map_err(|e| e.to_string())?;
                Self::Photo(index, side)
            }
            "refresh" => Self::Refresh,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command '{other}'. {HELP}")),
        };
        Ok(Some(command))
    }
}

fn row_arg<'a>(
    verb: &str,
    words: &mut impl Iterator<Item = &'a str>,
) -> std::result::Result<usize, String> {
    let raw = words
        .next()
        .ok_or_else(|| format!("'{verb}' needs a row number"))?;
    raw.parse().map_err(|_| format!("'{raw}' is not a row number"))
}

async fn execute<R, W>(
    coordinator: &mut CaptureCoordinator,
    console: &mut Console<R, W>,
    command: ReplCommand,
) -> Result<(), CaptureError>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    match command {
        ReplCommand::List => {
            let baseline = coordinator.buffer().baseline();
            for (index, record) in coordinator.buffer().records().enumerate() {
                let line = format!(
                    "{index:>3}  row {:>5}  {:<20} front:{} back:{}{}",
                    baseline.position_of(index),
                    record.operator_barcode().unwrap_or("-"),
                    mark(record.front_image.as_ref()),
                    mark(record.back_image.as_ref()),
                    if coordinator.buffer().is_submitted(index) {
                        "  sent"
                    } else {
                        ""
                    }
                );
                console.say(&line).await?;
            }
        }
        ReplCommand::Scan(index) => {
            if let Some(code) = coordinator.scan(index, console).await?.captured() {
                console.say(&format!("row {index}: barcode {code}")).await?;
            }
        }
        ReplCommand::Photo(index, side) => {
            if let Some(outcome) = coordinator.photograph(index, side, console).await?.captured() {
                console
                    .say(&format!(
                        "row {index}: {side} photo {}x{}, ~{} bytes{}",
                        outcome.image.width,
                        outcome.image.height,
                        outcome.image.estimated_bytes(),
                        if outcome.within_budget() {
                            ""
                        } else {
                            " (over budget)"
                        }
                    ))
                    .await?;
            }
        }
        ReplCommand::Edit(index) => {
            if let Some(receipt) = coordinator.edit_barcode(index, console).await?.captured() {
                console
                    .say(&format!(
                        "submitted '{}' at row {}",
                        receipt.identifier.value, receipt.position
                    ))
                    .await?;
            }
        }
        ReplCommand::Submit(index) => {
            let receipt = coordinator.submit(index).await?;
            console
                .say(&format!(
                    "submitted '{}' at row {}",
                    receipt.identifier.value, receipt.position
                ))
                .await?;
        }
        ReplCommand::Refresh => {
            let prompt = coordinator.request_refresh()?;
            let answer = console.prompt(&format!("{} [y/N] ", prompt.message())).await?;
            let confirmation = match answer.as_deref().map(str::trim) {
                Some("y" | "Y" | "yes") => Confirmation::Confirmed,
                _ => Confirmation::Declined,
            };
            if let RefreshOutcome::Refreshed { baseline } =
                coordinator.refresh(prompt, confirmation).await?
            {
                console
                    .say(&format!("list refreshed: {} remote record(s)", baseline.count()))
                    .await?;
            }
        }
        ReplCommand::Help => console.say(HELP).await?,
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn mark(image: Option<&EncodedImage>) -> &'static str {
    if image.is_some() { "yes" } else { "no " }
}

async fn compress_file(config: &ClientConfig, path: &Path) -> Result<CompressionOutcome> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let engine = CompressionEngine::jpeg(config.compression_options());
    let outcome = tokio::task::spawn_blocking(move || engine.compress(&raw))
        .await
        .map_err(|e| anyhow!("compression task failed: {e}"))??;
    Ok(outcome)
}

fn print_outcome(outcome: &CompressionOutcome) {
    let image = &outcome.image;
    match outcome.budget_miss {
        None => println!(
            "Compressed to {}x{} at quality {:.1}: ~{} bytes",
            image.width,
            image.height,
            image.quality_fraction(),
            image.estimated_bytes()
        ),
        Some(miss) => {
            println!(
                "⚠️  Budget of {} bytes not reached after {} attempts; keeping {}x{} at ~{} bytes",
                miss.budget_bytes,
                outcome.attempts.len(),
                image.width,
                image.height,
                miss.achieved_bytes
            );
            let warning = miss.warning();
            if let Some(hint) = warning.recovery_suggestion() {
                println!("   {hint}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repl_commands() {
        assert_eq!(ReplCommand::parse("  "), Ok(None));
        assert_eq!(ReplCommand::parse("scan 2"), Ok(Some(ReplCommand::Scan(2))));
        assert_eq!(
            ReplCommand::parse("photo 0 back"),
            Ok(Some(ReplCommand::Photo(0, ImageSide::Back)))
        );
        assert_eq!(ReplCommand::parse("q"), Ok(Some(ReplCommand::Quit)));
        assert!(ReplCommand::parse("scan").is_err());
        assert!(ReplCommand::parse("submit x").is_err());
        assert!(ReplCommand::parse("photo 1 side").is_err());
        assert!(ReplCommand::parse("dance").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = Args::try_parse_from(["fieldcap", "-vv", "compress", "in.jpg", "-o", "out.jpg"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.command, Command::Compress { output: Some(_), .. }));

        let args = Args::try_parse_from(["fieldcap", "session", "store-17"]).unwrap();
        assert!(matches!(args.command, Command::Session { id } if id == "store-17"));
    }
}
