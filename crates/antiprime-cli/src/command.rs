use anyhow::{Context, bail};
use core::str::FromStr;

pub const HELP: &str = "\
commands:
  next [n]  extend the sequence by n terms (default 1)
  reset     cancel any search and clear the sequence back to 1 (1)
  show      print the most recent terms
  stats     print engine counters
  cancel    cancel the running search and any queued terms
  help      print this message
  quit      stop the workers and exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next(u64),
    Reset,
    Show,
    Stats,
    Cancel,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            bail!("empty command");
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "next" | "n" => {
                let count = match words.next() {
                    Some(count) => count
                        .parse::<u64>()
                        .with_context(|| format!("invalid term count `{count}`"))?,
                    None => 1,
                };
                if count == 0 {
                    bail!("term count must be greater than 0");
                }
                Self::Next(count)
            }
            "reset" | "r" => Self::Reset,
            "show" | "s" => Self::Show,
            "stats" => Self::Stats,
            "cancel" | "c" => Self::Cancel,
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => bail!("unknown command `{other}`, try `help`"),
        };

        if let Some(extra) = words.next() {
            bail!("unexpected argument `{extra}` for `{name}`");
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!("next".parse::<Command>().unwrap(), Command::Next(1));
        assert_eq!("next 12".parse::<Command>().unwrap(), Command::Next(12));
        assert_eq!("  N   3 ".parse::<Command>().unwrap(), Command::Next(3));
        assert_eq!("reset".parse::<Command>().unwrap(), Command::Reset);
        assert_eq!("show".parse::<Command>().unwrap(), Command::Show);
        assert_eq!("stats".parse::<Command>().unwrap(), Command::Stats);
        assert_eq!("cancel".parse::<Command>().unwrap(), Command::Cancel);
        assert_eq!("?".parse::<Command>().unwrap(), Command::Help);
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_malformed_input() {
        for line in ["", "   ", "next 0", "next -1", "next two", "show 5", "launch"] {
            assert!(line.parse::<Command>().is_err(), "{line:?} should not parse");
        }
    }
}
