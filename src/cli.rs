use crate::engine::QueryClient;
use crate::form::{DraftEntry, FormDraft};
use crate::model::{OutputTone, SubmitConfig, PROCESS_QUERY_PATH};
use crate::orchestrator::{self, SubmissionController, UiHandle};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "query-submit",
    version,
    about = "Submit form fields and file attachments to a process_query backend"
)]
pub struct Cli {
    /// Backend origin; forms are posted to <BASE_URL>/api/process_query
    #[arg(long, env = "QUERY_SUBMIT_BASE_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Question sent as the `prompt` field
    #[arg(long)]
    pub prompt: Option<String>,

    /// Continue an existing conversation (sent as the `thread_id` field)
    #[arg(long)]
    pub thread_id: Option<i64>,

    /// Text field as NAME=VALUE (repeatable)
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = DraftEntry::parse_text)]
    pub fields: Vec<DraftEntry>,

    /// File part as [NAME=]PATH; NAME defaults to `files` (repeatable)
    #[arg(long = "file", value_name = "[NAME=]PATH", value_parser = DraftEntry::parse_file)]
    pub files: Vec<DraftEntry>,

    /// Submit once, print the submission record as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Submit once, print the output and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Path to an extra trusted root certificate (PEM or DER format)
    #[arg(long)]
    pub certificate: Option<std::path::PathBuf>,

    /// Use --auto-save true or --auto-save false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_save: bool,

    /// Export the submission record as JSON
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Log file used in TUI mode (defaults to the application data directory)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        cfg!(feature = "tui") && !self.json && !self.text
    }
}

/// How a non-interactive run ended, for the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Settled,
    Failed,
}

pub async fn run(args: Cli) -> Result<RunStatus> {
    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            crate::tui::run(args).await?;
            return Ok(RunStatus::Settled);
        }
    }

    run_once(args).await
}

/// Build a `SubmitConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<SubmitConfig> {
    let base = reqwest::Url::parse(&args.base_url)
        .with_context(|| format!("invalid base URL {:?}", args.base_url))?;
    if !matches!(base.scheme(), "http" | "https") {
        anyhow::bail!("base URL must use http or https, got {:?}", base.scheme());
    }
    Ok(SubmitConfig {
        base_url: args.base_url.clone(),
        endpoint: format!("{}{}", args.base_url.trim_end_matches('/'), PROCESS_QUERY_PATH),
        user_agent: format!("query-submit-cli/{}", env!("CARGO_PKG_VERSION")),
        certificate_path: args.certificate.clone(),
    })
}

/// Form draft from CLI arguments: prompt, thread id, fields, then files.
pub fn build_draft(args: &Cli) -> FormDraft {
    let mut draft = FormDraft::default();
    if let Some(prompt) = args.prompt.as_deref() {
        draft.push(DraftEntry::text("prompt", prompt));
    }
    if let Some(thread_id) = args.thread_id {
        draft.push(DraftEntry::text("thread_id", thread_id.to_string()));
    }
    for entry in args.fields.iter().chain(args.files.iter()) {
        draft.push(entry.clone());
    }
    draft
}

/// UI surface for one-shot modes. The output element is written out when the
/// busy state clears: neutral text to stdout, error text to stderr.
struct ConsoleUi {
    out_tx: Option<mpsc::UnboundedSender<OutputLine>>,
    output: Mutex<Option<(String, OutputTone)>>,
}

impl ConsoleUi {
    fn new(out_tx: Option<mpsc::UnboundedSender<OutputLine>>) -> Self {
        Self {
            out_tx,
            output: Mutex::new(None),
        }
    }
}

impl UiHandle for ConsoleUi {
    fn set_busy(&self, busy: bool) {
        let Some(tx) = self.out_tx.as_ref() else {
            return;
        };
        if busy {
            let _ = tx.send(OutputLine::Stderr("Waiting for the server…".into()));
            return;
        }
        let shown = self.output.lock().ok().and_then(|mut g| g.take());
        if let Some((text, tone)) = shown {
            let line = match tone {
                OutputTone::Neutral => OutputLine::Stdout(text),
                OutputTone::Error => OutputLine::Stderr(text),
            };
            let _ = tx.send(line);
        }
    }

    fn set_output(&self, text: &str, tone: OutputTone) {
        if let Ok(mut g) = self.output.lock() {
            *g = Some((text.to_string(), tone));
        }
    }
}

/// Submit once in text or JSON mode.
async fn run_once(args: Cli) -> Result<RunStatus> {
    let cfg = build_config(&args)?;
    // Captured before anything is sent; unreadable files abort the run here.
    let form = build_draft(&args).capture().context("capture form")?;
    let (out_tx, out_handle) = spawn_output_writer();

    let console_tx = if args.json { None } else { Some(out_tx.clone()) };
    let controller = SubmissionController::new(QueryClient::new(&cfg)?, ConsoleUi::new(console_tx));
    let record = controller
        .submit_recorded(form)
        .await
        .context("submission was not started")?;
    drop(controller);

    let processed = orchestrator::process_submission(&args, 0, args.auto_save, &record);

    if args.json {
        let out = serde_json::to_string_pretty(&record)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        for line in crate::text_summary::build_text_summary(&record).lines {
            let _ = out_tx.send(OutputLine::Stderr(line));
        }
    }
    if let Some(p) = processed.auto_saved_path.as_ref() {
        let _ = out_tx.send(OutputLine::Stderr(format!("Saved: {}", p.display())));
    }
    for msg in processed.export_messages {
        let _ = out_tx.send(OutputLine::Stderr(msg));
    }

    drop(out_tx);
    let _ = out_handle.await;

    Ok(if record.outcome.is_success() {
        RunStatus::Settled
    } else {
        RunStatus::Failed
    })
}
