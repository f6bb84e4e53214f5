use antiprime::{DEFAULT_NUM_WORKERS, DEFAULT_THREAD_NAME, EngineConfig, MAX_WORKERS};
use anyhow::bail;
use clap::{Parser, ValueEnum};

/// Runtime configuration for the `antiprimes` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "antiprimes",
    version,
    about = "Searches the antiprime (highly composite number) sequence in parallel"
)]
pub struct CliArgs {
    /// Number of worker threads counting divisors concurrently.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = DEFAULT_NUM_WORKERS)]
    pub num_workers: usize,

    /// Prefix for worker thread names; each worker appends its index.
    ///
    /// Environment variable: `THREAD_NAME`
    #[arg(long, env = "THREAD_NAME", default_value_t = String::from(DEFAULT_THREAD_NAME))]
    pub thread_name: String,

    /// How many of the most recent terms are shown after every change.
    ///
    /// Environment variable: `SHOW_LAST`
    #[arg(long, env = "SHOW_LAST", default_value_t = 5)]
    pub show_last: usize,

    /// Compute this many terms, print the history and exit instead of
    /// starting an interactive session.
    ///
    /// Environment variable: `COUNT`
    #[arg(short, long, env = "COUNT")]
    pub count: Option<usize>,

    /// Output format of batch mode.
    ///
    /// Environment variable: `OUTPUT`
    #[arg(short, long, env = "OUTPUT", value_enum, default_value_t = OutputFormat::Plain)]
    pub output: OutputFormat,

    /// Format of the log lines written to stderr. Verbosity follows
    /// `RUST_LOG` (default `info`).
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One `<value> (<divisors>)` line per term.
    Plain,
    /// A JSON array of `{ "value", "divisors" }` objects.
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Batch { count: usize, output: OutputFormat },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub show_last: usize,
    pub mode: Mode,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.num_workers > MAX_WORKERS {
            bail!(
                "NUM_WORKERS ({}) exceeds the maximum pool size (max = {})",
                args.num_workers,
                MAX_WORKERS
            );
        }

        if args.show_last == 0 {
            bail!("SHOW_LAST must be greater than 0");
        }

        let mode = match args.count {
            Some(0) => bail!("COUNT must be greater than 0"),
            Some(count) => Mode::Batch {
                count,
                output: args.output,
            },
            None => Mode::Interactive,
        };

        let engine = EngineConfig::default()
            .with_num_workers(args.num_workers)
            .with_thread_name(args.thread_name);
        engine.validate()?;

        Ok(Self {
            engine,
            show_last: args.show_last,
            mode,
            log_format: args.log_format,
        })
    }
}
