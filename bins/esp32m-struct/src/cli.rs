//! Command-line parsing.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

pub const USAGE: &str = "\
Usage: esp32m-struct <command> --schema <file> [--pretty] <inputs...>

Commands:
  unfold <record>       Print the record in map form
  fold <record>         Print the record in array form
  diff <prev> <next>    Print the wire diff turning prev into next
  apply <base> <diff>   Apply a wire diff and print the result in map form
  hash <record>         Print the record hash as hex

Inputs are JSON files; use - to read one from stdin.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Unfold,
    Fold,
    Diff,
    Apply,
    Hash,
}

impl Command {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "unfold" => Some(Command::Unfold),
            "fold" => Some(Command::Fold),
            "diff" => Some(Command::Diff),
            "apply" => Some(Command::Apply),
            "hash" => Some(Command::Hash),
            _ => None,
        }
    }

    /// Number of input documents the command takes.
    pub fn arity(self) -> usize {
        match self {
            Command::Unfold | Command::Fold | Command::Hash => 1,
            Command::Diff | Command::Apply => 2,
        }
    }
}

/// Options shared by all commands.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Schema file in tuple notation.
    pub schema: PathBuf,
    /// Pretty-print JSON output.
    pub pretty: bool,
    /// Log filter used when RUST_LOG is not set.
    pub log_filter: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            schema: PathBuf::from("schema.json"),
            pretty: false,
            log_filter: "info,esp32m_sync=debug".to_string(),
        }
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: Command,
    pub inputs: Vec<PathBuf>,
    pub config: CliConfig,
}

/// Parse arguments, excluding the program name.
pub fn parse_args<I>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let name = args.next().ok_or_else(|| anyhow!("missing command\n\n{USAGE}"))?;
    let command =
        Command::parse(&name).ok_or_else(|| anyhow!("unknown command '{name}'\n\n{USAGE}"))?;

    let mut config = CliConfig::default();
    let mut schema = None;
    let mut inputs = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--schema" | "-s" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--schema requires a file"))?;
                schema = Some(PathBuf::from(path));
            }
            "--pretty" | "-p" => config.pretty = true,
            flag if flag.starts_with("--") => bail!("unknown option '{flag}'\n\n{USAGE}"),
            _ => inputs.push(PathBuf::from(&arg)),
        }
    }

    config.schema = schema.ok_or_else(|| anyhow!("--schema is required\n\n{USAGE}"))?;
    if inputs.len() != command.arity() {
        bail!(
            "'{name}' takes {} input(s), got {}\n\n{USAGE}",
            command.arity(),
            inputs.len()
        );
    }
    if inputs.iter().filter(|p| p.as_os_str() == "-").count() > 1 {
        bail!("only one input can be read from stdin");
    }

    Ok(Invocation {
        command,
        inputs,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_diff() {
        let invocation = parse_args(args("diff --schema wifi.json a.json b.json")).unwrap();
        assert_eq!(invocation.command, Command::Diff);
        assert_eq!(
            invocation.inputs,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
        assert_eq!(invocation.config.schema, PathBuf::from("wifi.json"));
        assert!(!invocation.config.pretty);
    }

    #[test]
    fn test_parse_flags_anywhere() {
        let invocation = parse_args(args("fold - -p -s wifi.json")).unwrap();
        assert_eq!(invocation.command, Command::Fold);
        assert_eq!(invocation.inputs, vec![PathBuf::from("-")]);
        assert!(invocation.config.pretty);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(args("")).is_err());
        assert!(parse_args(args("merge --schema s.json a.json")).is_err());
        assert!(parse_args(args("fold a.json")).is_err());
        assert!(parse_args(args("fold --schema")).is_err());
        assert!(parse_args(args("diff --schema s.json a.json")).is_err());
        assert!(parse_args(args("diff --schema s.json - -")).is_err());
        assert!(parse_args(args("hash --schema s.json --verbose a.json")).is_err());
    }
}
