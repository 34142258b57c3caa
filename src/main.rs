// fplift: mark calls made through function pointers in C source

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fplift::LiftConfig;

/// Stack for the annotating thread; parsing recurses once per nesting level
const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// C source text to annotate
    #[arg(conflicts_with = "file")]
    source: Option<String>,

    /// Read the source from a file instead (`-` for stdin)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Treat NAME as a typedef name from an unseen header (repeatable)
    #[arg(long = "assume-type", value_name = "NAME")]
    assume_types: Vec<String>,

    /// Log more to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> LiftConfig {
        self.assume_types
            .iter()
            .fold(LiftConfig::default(), |config, name| config.with_type_name(name.as_str()))
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// The unit of source to process, if one was supplied
fn read_input(cli: &Cli) -> Result<Option<String>> {
    if let Some(source) = &cli.source {
        return Ok(Some(source.clone()));
    }

    match &cli.file {
        Some(path) if path.as_os_str() == "-" => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read source from stdin")?;
            Ok(Some(text))
        }
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
            .map(Some),
        None => Ok(None),
    }
}

/// Annotate `text` on a thread with a stack sized for the deepest nesting
/// the parser accepts
fn annotate_on_worker(text: String, config: LiftConfig) -> Result<String> {
    let worker = thread::Builder::new()
        .name("fplift-worker".to_string())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || fplift::annotate_source(&text, &config))
        .context("failed to start the annotating thread")?;

    match worker.join() {
        Ok(result) => result.context("failed to parse source"),
        Err(_) => anyhow::bail!("annotating thread panicked"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(text) = read_input(&cli)? else {
        tracing::debug!("no input supplied");
        return Ok(());
    };

    let output = annotate_on_worker(text, cli.config())?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write output")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("fplift").chain(args.iter().copied()))
    }

    #[test]
    fn test_no_input() {
        assert_eq!(read_input(&cli(&[])).unwrap(), None);
    }

    #[test]
    fn test_positional_source() {
        let input = read_input(&cli(&["int x;"])).unwrap();
        assert_eq!(input.as_deref(), Some("int x;"));
    }

    #[test]
    fn test_file_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"void (*cb)(void);\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let input = read_input(&cli(&["--file", &path])).unwrap();
        assert_eq!(input.as_deref(), Some("void (*cb)(void);\n"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.c");

        let err = read_input(&cli(&["--file", path.to_str().unwrap()])).unwrap_err();
        assert!(err.to_string().starts_with("failed to read"));
    }

    #[test]
    fn test_source_and_file_conflict() {
        let result = Cli::try_parse_from(["fplift", "int x;", "--file", "a.c"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_worker_annotates_and_reports_parse_errors() {
        let output = annotate_on_worker("int (*fp)(void); int x = fp();".to_string(), LiftConfig::default()).unwrap();
        assert_eq!(output, "int (*fp)(void); int x = fp() /*FP*/;");

        let err = annotate_on_worker("int x = ;".to_string(), LiftConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "failed to parse source");
    }

    #[test]
    fn test_assumed_types_reach_the_config() {
        let config = cli(&["--assume-type", "handle_t", "--assume-type", "ctx_t"]).config();
        assert_eq!(config.extra_type_names, vec!["handle_t", "ctx_t"]);
    }
}
