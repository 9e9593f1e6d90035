//! Core logic behind the `binpack-pack` and `binpack-unpack` binaries.
//!
//! - `binpack-pack`   reads JSON on stdin and writes binpack bytes to stdout
//! - `binpack-unpack` reads binpack bytes on stdin and writes pretty JSON

use thiserror::Error;

use crate::codec::BinPack;
use crate::decoder::DecodeOptions;
use crate::error::BinPackError;
use crate::json::{from_json, to_json_with_limits, JsonError, JsonLimits, DEFAULT_JSON_LEN};

/// Nesting bound applied when `--max-depth` is not given. It bounds both
/// decoding and the rendered JSON, which handle chains can nest deeper
/// than the bytes themselves.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Rendered JSON bound applied when `--max-json-len` is not given.
pub const DEFAULT_MAX_JSON_LEN: usize = DEFAULT_JSON_LEN;

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Codec(#[from] BinPackError),
    #[error("{0}")]
    Convert(#[from] JsonError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid value for {flag}: {value:?}")]
    InvalidArgument { flag: &'static str, value: String },
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

// ── Options ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliOptions {
    pub max_depth: usize,
    pub max_json_len: usize,
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_json_len: DEFAULT_MAX_JSON_LEN,
            verbose: false,
            quiet: false,
        }
    }
}

impl CliOptions {
    /// Parses flags, excluding the program name.
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--verbose" | "-v" => options.verbose = true,
                "--quiet" | "-q" => options.quiet = true,
                "--max-depth" => {
                    let value = args.next().unwrap_or_default();
                    options.max_depth =
                        value.parse().map_err(|_| CliError::InvalidArgument {
                            flag: "--max-depth",
                            value,
                        })?;
                }
                "--max-json-len" => {
                    let value = args.next().unwrap_or_default();
                    options.max_json_len =
                        value.parse().map_err(|_| CliError::InvalidArgument {
                            flag: "--max-json-len",
                            value,
                        })?;
                }
                _ => return Err(CliError::UnknownArgument(arg)),
            }
        }
        Ok(options)
    }

    fn codec(&self) -> BinPack {
        BinPack::with_options(DecodeOptions {
            max_depth: Some(self.max_depth),
        })
    }

    fn json_limits(&self) -> JsonLimits {
        JsonLimits {
            max_depth: Some(self.max_depth),
            max_len: Some(self.max_json_len),
        }
    }

    /// Installs the stderr subscriber.
    ///
    /// `--quiet` silences everything, `--verbose` honours `RUST_LOG` and
    /// falls back to `info`, otherwise only warnings are shown.
    pub fn init_tracing(&self) {
        let filter = if self.quiet {
            tracing_subscriber::EnvFilter::new("off")
        } else if self.verbose {
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into())
        } else {
            tracing_subscriber::EnvFilter::new("warn")
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

// ── binpack-pack ──────────────────────────────────────────────────────────

/// Encodes a JSON document.
pub fn pack(json: &str, options: &CliOptions) -> Result<Vec<u8>, CliError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let doc = from_json(&value);
    let bytes = options.codec().encode(&doc.graph, doc.root)?;
    tracing::info!(target: "binpack", bytes = bytes.len(), "packed document");
    Ok(bytes)
}

// ── binpack-unpack ────────────────────────────────────────────────────────

/// Decodes bytes and renders them as pretty-printed JSON.
pub fn unpack(bytes: &[u8], options: &CliOptions) -> Result<String, CliError> {
    let doc = options.codec().decode(bytes)?;
    let value = to_json_with_limits(&doc.graph, doc.root, options.json_limits())?;
    tracing::info!(target: "binpack", nodes = doc.graph.len(), "unpacked document");
    Ok(serde_json::to_string_pretty(&value)?)
}
