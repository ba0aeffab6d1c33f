//! `esp32m-struct`: convert, diff and patch device records from the
//! command line.

mod cli;

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use esp32m_core::{Schema, StructCodec};

use crate::cli::{Command, Invocation};

fn main() -> Result<()> {
    let invocation = cli::parse_args(std::env::args().skip(1))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| invocation.config.log_filter.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let output = run(&invocation)?;
    println!("{output}");
    Ok(())
}

fn run(invocation: &Invocation) -> Result<String> {
    let schema_json = read_json(&invocation.config.schema)?;
    let schema = Schema::from_json(&schema_json)
        .with_context(|| format!("invalid schema in {}", invocation.config.schema.display()))?;
    tracing::debug!(
        "Loaded schema with {} fields, depth {}",
        schema.len(),
        schema.depth()
    );
    let codec = StructCodec::new(schema);

    let inputs = invocation
        .inputs
        .iter()
        .map(|p| read_json(p))
        .collect::<Result<Vec<_>>>()?;

    let output = execute(&codec, invocation.command, &inputs)?;
    render(&output, invocation.config.pretty)
}

/// Run one command against already parsed inputs.
fn execute(codec: &StructCodec, command: Command, inputs: &[Value]) -> Result<Value> {
    let output = match (command, inputs) {
        (Command::Unfold, [record]) => Value::Object(codec.unfold(record)?),
        (Command::Fold, [record]) => codec.fold_json(record)?,
        (Command::Diff, [prev, next]) => {
            let diff = codec.diff(prev, next)?;
            tracing::info!("{} changed field(s) at top level", diff.len());
            codec.encode_diff(&diff)
        }
        (Command::Apply, [base, diff]) => {
            let diff = codec.decode_diff(diff).context("invalid diff")?;
            Value::Object(codec.apply_diff(base, &diff)?)
        }
        (Command::Hash, [record]) => Value::String(format!("{:08x}", codec.hash(record)?)),
        (command, inputs) => bail!("{:?} cannot take {} input(s)", command, inputs.len()),
    };
    Ok(output)
}

fn render(output: &Value, pretty: bool) -> Result<String> {
    Ok(match output {
        Value::String(text) => text.clone(),
        other if pretty => serde_json::to_string_pretty(other)?,
        other => other.to_string(),
    })
}

fn read_json(path: &Path) -> Result<Value> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}
