use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::de::DeserializeOwned;
use stock_spread_core::config::OptimizerConfig;
use tracing::debug;

/// What a command reads and the top-level keys its JSON document carries.
#[derive(Debug, Clone, Copy)]
pub struct InputShape {
    pub what: &'static str,
    pub keys: &'static [&'static str],
}

pub const ALLOCATION: InputShape = InputShape {
    what: "portfolio optimization",
    keys: &["request", "dataset"],
};

pub const PAIRWISE: InputShape = InputShape {
    what: "pairwise statistics",
    keys: &["dataset", "symbols"],
};

pub const TWO_ASSET: InputShape = InputShape {
    what: "two-asset screening",
    keys: &["request", "dataset"],
};

const CONFIG: InputShape = InputShape {
    what: "optimizer configuration",
    keys: &[
        "assumed_correlation",
        "risk_band",
        "max_iterations",
        "bisection_iterations",
        "tolerance",
    ],
};

/// Deserialize a command's input from `--input <file>` or, failing that,
/// from piped stdin.
pub fn load_input<T: DeserializeOwned>(
    path: Option<&str>,
    shape: &InputShape,
) -> Result<T, Box<dyn std::error::Error>> {
    let (source, text) = match path {
        Some(path) => (format!("'{}'", path), read_file(path, shape)?),
        None => match read_piped()? {
            Some(text) => ("stdin".to_string(), text),
            None => {
                return Err(format!(
                    "--input <file.json> or stdin required for {}",
                    shape.what
                )
                .into())
            }
        },
    };
    Ok(parse_input(&text, &source, shape)?)
}

/// Optimizer configuration from `--config`, validated. Defaults when absent.
pub fn load_config(path: Option<&str>) -> Result<OptimizerConfig, Box<dyn std::error::Error>> {
    let config: OptimizerConfig = match path {
        Some(path) => {
            debug!("Loading optimizer configuration from {}", path);
            parse_input(&read_file(path, &CONFIG)?, &format!("'{}'", path), &CONFIG)?
        }
        None => OptimizerConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn read_file(path: &str, shape: &InputShape) -> Result<String, String> {
    let p = Path::new(path);
    if !p.is_file() {
        return Err(format!("{} input '{}' is not a readable file", shape.what, path));
    }
    fs::read_to_string(p)
        .map_err(|e| format!("Failed to read '{}' for {}: {}", path, shape.what, e))
}

/// Piped stdin, trimmed. None for an interactive terminal or empty input.
fn read_piped() -> io::Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    let trimmed = buffer.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

fn parse_input<T: DeserializeOwned>(
    text: &str,
    source: &str,
    shape: &InputShape,
) -> Result<T, String> {
    serde_json::from_str(text).map_err(|e| {
        format!(
            "Failed to parse {} as {} input (top-level keys: {}): {}",
            source,
            shape.what,
            shape.keys.join(", "),
            e
        )
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
