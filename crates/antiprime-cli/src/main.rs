#![doc = include_str!("../README.md")]

mod command;
mod config;
mod session;
mod telemetry;
mod view;

use antiprime::{Engine, ScoredNumber};
use clap::Parser;
use command::{Command, HELP};
use config::{AppConfig, CliArgs, Mode, OutputFormat};
use session::{Flow, Session};
use std::{
    io::{self, Write},
    sync::Arc,
    thread,
};
use telemetry::init_telemetry;
use tokio::{
    signal,
    sync::mpsc::{self, UnboundedReceiver},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = AppConfig::try_from(args)?;

    init_telemetry(config.log_format)?;
    log_startup_info(&config);

    let engine = Arc::new(Engine::new(config.engine.clone())?);
    match config.mode {
        Mode::Batch { count, output } => run_batch(engine, count, output).await,
        Mode::Interactive => run_interactive(engine, config.show_last).await,
    }
}

fn log_startup_info(config: &AppConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting antiprime search with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting antiprime search with {} workers",
            config.engine.num_workers
        );
    }
}

/// Extends the sequence `count` times, then prints the whole history.
///
/// Ctrl+C stops the search early; the terms found so far are still printed.
async fn run_batch(engine: Arc<Engine>, count: usize, output: OutputFormat) -> anyhow::Result<()> {
    let mut search = {
        let engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || -> antiprime::Result<()> {
            for _ in 0..count {
                engine.extend_and_wait()?;
            }
            Ok(())
        })
    };

    let finished = tokio::select! {
        joined = &mut search => Some(joined),
        res = signal::ctrl_c() => {
            res?;
            tracing::info!("Received Ctrl+C signal, keeping the terms found so far");
            None
        }
    };

    let searched = match finished {
        Some(joined) => joined?,
        None => {
            engine.coordinator().shutdown();
            // Resolves promptly: every wait in the engine observes shutdown.
            let _ = search.await?;
            Ok(())
        }
    };

    let history = engine.snapshot();
    stop_engine(engine).await?;
    searched?;
    print_history(&history, output)
}

fn print_history(history: &[ScoredNumber], output: OutputFormat) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match output {
        OutputFormat::Plain => {
            for term in history {
                writeln!(out, "{term}")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, history)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Reads commands from stdin and re-renders the most recent terms after every
/// change to the sequence, until `quit`, end of input or Ctrl+C.
async fn run_interactive(engine: Arc<Engine>, show_last: usize) -> anyhow::Result<()> {
    let (subscription, mut updates) = view::attach(&engine, show_last);
    println!(
        "{}",
        view::render_terms(&engine.last_k(show_last), engine.store().len())
    );
    println!("{HELP}");

    let mut session = Session::new(engine, show_last);
    let mut lines = read_lines()?;

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if session.apply(command) == Flow::Quit {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{e:#}"),
                }
            }
            Some(update) = updates.recv() => println!("{}", view::render_update(&update)),
            Some(joined) = session.search_finished() => session.finish(joined),
            res = signal::ctrl_c() => {
                res?;
                tracing::info!("Received Ctrl+C signal");
                break;
            }
        }
    }

    tracing::info!("Shutdown requested, stopping workers...");
    session.engine().unsubscribe(subscription);
    session.shutdown().await?;
    tracing::info!("Workers stopped");
    Ok(())
}

/// Forwards stdin lines from a dedicated thread.
///
/// A blocking read cannot be cancelled, so the reader lives outside the
/// runtime and is simply abandoned at exit.
fn read_lines() -> anyhow::Result<UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("stdin-reader".to_owned())
        .spawn(move || {
            for line in io::stdin().lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Shuts the engine down and joins its workers off the async runtime.
pub(crate) async fn stop_engine(engine: Arc<Engine>) -> anyhow::Result<()> {
    engine.coordinator().shutdown();
    tokio::task::spawn_blocking(move || match Arc::try_unwrap(engine) {
        Ok(engine) => engine.stop(),
        // The last holder joins the pool when it drops its handle.
        Err(shared) => drop(shared),
    })
    .await?;
    Ok(())
}
