use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::io_utils::InputFormat;

#[derive(Debug, Parser)]
#[command(author, version, about = "Reshape record streams with a declarative pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run records through the pipeline; pipeline flags follow `--`
    Process(ProcessArgs),
    /// List the parameters declared in a definition document
    Params(ParamsArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum InputFormatArg {
    Csv,
    Json,
    Yaml,
}

impl From<InputFormatArg> for InputFormat {
    fn from(value: InputFormatArg) -> Self {
        match value {
            InputFormatArg::Csv => InputFormat::Csv,
            InputFormatArg::Json => InputFormat::Json,
            InputFormatArg::Yaml => InputFormat::Yaml,
        }
    }
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Input file (`-` reads stdin)
    #[arg(short = 'i', long = "input", default_value = "-")]
    pub input: PathBuf,
    /// Input format (defaults from the file extension, then csv)
    #[arg(long = "input-format", value_enum)]
    pub input_format: Option<InputFormatArg>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML mapping of pipeline parameter values; flags after `--` override it
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Extra parameter definitions accepted after `--`
    #[arg(long)]
    pub definitions: Option<PathBuf>,
    /// Pipeline flags such as `--fields a,b --sort-by -a --output json`
    #[arg(last = true, allow_hyphen_values = true)]
    pub pipeline: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ParamsArgs {
    /// Definition document to list; the built-in pipeline flags when omitted
    pub file: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
