//! qetag: print Qiniu-compatible etags for files
//!
//! Usage:
//!   qetag [FILE]...                 - one `<etag>  <path>` line per input
//!   qetag -                         - read standard input
//!   qetag --check <ETAG> <FILE>     - exit 1 if the file's etag differs
//!   qetag --json [FILE]...          - one JSON object per input

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use qetag_core::config::OutputFormat;
use qetag_core::{etag_file, etag_reader, Etag, QetagConfig};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "qetag",
    version,
    about = "Compute Qiniu-compatible etags",
    long_about = "qetag: compute the 4 MiB block-chunked SHA-1 etag used by Qiniu object storage"
)]
struct Cli {
    /// Files to hash ("-" or nothing for standard input)
    files: Vec<PathBuf>,

    /// Path to qetag.toml configuration file
    #[arg(long, short = 'c', env = "QETAG_CONFIG", default_value = "qetag.toml")]
    config: PathBuf,

    /// Expected etag; requires exactly one input
    #[arg(long)]
    check: Option<Etag>,

    /// Print one JSON object per input
    #[arg(long)]
    json: bool,

    /// Show a progress bar while hashing files
    #[arg(long)]
    progress: bool,

    /// Bytes per read (overrides config hash.read_buffer_size)
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long, env = "QETAG_LOG")]
    log: Option<String>,

    /// Log format; overrides config
    #[arg(long, env = "QETAG_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

/// One result record for `--json`
#[derive(Debug, Serialize)]
struct Record {
    path: String,
    etag: Etag,
    size: u64,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("qetag: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let loaded = QetagConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;
    let config_found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format)?;
    report_config_source(&cli.config, config_found);

    let buffer_size = cli.buffer_size.unwrap_or(config.hash.read_buffer_size);
    anyhow::ensure!(buffer_size > 0, "--buffer-size must be > 0");

    let output = if cli.json {
        OutputFormat::Json
    } else {
        config.output.format
    };

    let inputs = if cli.files.is_empty() {
        vec![PathBuf::from("-")]
    } else {
        cli.files.clone()
    };

    if cli.check.is_some() && inputs.len() != 1 {
        anyhow::bail!("--check requires exactly one input, got {}", inputs.len());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        inputs = inputs.len(),
        buffer_size,
        "qetag starting"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut matched = true;

    for input in &inputs {
        let (etag, size) = hash_input(input, buffer_size, cli.progress)?;
        print_record(&mut out, output, input, &etag, size)?;

        if let Some(expected) = &cli.check {
            if etag != *expected {
                tracing::warn!(path = %input.display(), %expected, actual = %etag, "etag mismatch");
                matched = false;
            }
        }
    }

    out.flush().context("flushing stdout")?;
    Ok(if matched {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn report_config_source(path: &Path, found: bool) {
    if found {
        tracing::debug!(config = %path.display(), "loaded config");
    } else {
        tracing::warn!("config file not found: {}  (using defaults)", path.display());
    }
}

// ── Hashing ───────────────────────────────────────────────────────────────────

fn hash_input(path: &Path, buffer_size: usize, progress: bool) -> Result<(Etag, u64)> {
    if path == Path::new("-") {
        return etag_reader(std::io::stdin().lock(), buffer_size, |_| {})
            .context("hashing standard input");
    }

    if !progress {
        return etag_file(path, buffer_size, |_| {});
    }

    let len = std::fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    let bar = progress_bar(path, len);
    let result = etag_file(path, buffer_size, |n| bar.inc(n));
    bar.finish_and_clear();
    result
}

fn progress_bar(path: &Path, len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::with_template(
        "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    bar.set_style(style);
    bar.set_message(path.display().to_string());
    bar
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_record<W: Write>(
    out: &mut W,
    format: OutputFormat,
    path: &Path,
    etag: &Etag,
    size: u64,
) -> Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{etag}  {}", path.display())?,
        OutputFormat::Json => {
            let record = Record {
                path: path.display().to_string(),
                etag: *etag,
                size,
            };
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

// ── Logging ───────────────────────────────────────────────────────────────────

fn parse_level(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("invalid log level: {level:?}"))
}

/// Filter from `RUST_LOG` if set and valid, else from `level`.
fn log_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env().or_else(|_| parse_level(level))
}

fn init_logging(level: &str, format: &LogFormat) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = log_filter(level)?;

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::sync::{Arc, Mutex};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_flag_parses_etag() {
        let cli = Cli::try_parse_from([
            "qetag",
            "--check",
            "FowfKPwvSMJx1sSY8PJJzd42XFTF",
            "file.bin",
        ])
        .unwrap();
        assert_eq!(
            cli.check.unwrap().to_string(),
            "FowfKPwvSMJx1sSY8PJJzd42XFTF"
        );
        assert_eq!(cli.files, vec![PathBuf::from("file.bin")]);
    }

    #[test]
    fn check_flag_rejects_garbage() {
        assert!(Cli::try_parse_from(["qetag", "--check", "not-an-etag", "f"]).is_err());
    }

    #[test]
    fn missing_file_error_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash_input(&dir.path().join("absent.bin"), 4096, false).unwrap_err();
        assert!(format!("{err:#}").contains("absent.bin"));
    }

    #[test]
    fn progress_path_hashes_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seven.bin");
        std::fs::write(&path, [1u8, 2, 3, 4, 5, 6, 7]).unwrap();
        let (etag, size) = hash_input(&path, 2, true).unwrap();
        assert_eq!(size, 7);
        assert_eq!(etag.to_string(), "FowfKPwvSMJx1sSY8PJJzd42XFTF");
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let err = parse_level("qetag=loud").unwrap_err();
        assert!(err.to_string().contains("qetag=loud"));
        assert!(parse_level("debug").is_ok());
        assert!(parse_level("warn,qetag_core=trace").is_ok());
    }

    #[test]
    fn missing_config_warns_once_logging_is_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let loaded = QetagConfig::load(&path).unwrap();
        assert!(loaded.is_none());

        let logs = capture_logs(|| report_config_source(&path, loaded.is_some()));
        assert!(logs.contains("WARN"), "logs: {logs}");
        assert!(logs.contains("config file not found"), "logs: {logs}");
        assert!(logs.contains("absent.toml"), "logs: {logs}");
    }

    #[test]
    fn present_config_does_not_warn() {
        let logs = capture_logs(|| report_config_source(Path::new("qetag.toml"), true));
        assert!(!logs.contains("config file not found"), "logs: {logs}");
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(f: impl FnOnce()) -> String {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buf.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn text_output_format() {
        let etag: Etag = "FowfKPwvSMJx1sSY8PJJzd42XFTF".parse().unwrap();
        let mut out = Vec::new();
        print_record(&mut out, OutputFormat::Text, Path::new("a.bin"), &etag, 7).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "FowfKPwvSMJx1sSY8PJJzd42XFTF  a.bin\n"
        );
    }

    #[test]
    fn json_output_format() {
        let etag: Etag = "FowfKPwvSMJx1sSY8PJJzd42XFTF".parse().unwrap();
        let mut out = Vec::new();
        print_record(&mut out, OutputFormat::Json, Path::new("a.bin"), &etag, 7).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["etag"], "FowfKPwvSMJx1sSY8PJJzd42XFTF");
        assert_eq!(value["size"], 7);
        assert_eq!(value["path"], "a.bin");
    }

    #[test]
    fn file_input_hashes_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seven.bin");
        std::fs::write(&path, [1u8, 2, 3, 4, 5, 6, 7]).unwrap();
        let (etag, size) = hash_input(&path, 4096, false).unwrap();
        assert_eq!(size, 7);
        assert_eq!(etag.to_string(), "FowfKPwvSMJx1sSY8PJJzd42XFTF");
    }
}
