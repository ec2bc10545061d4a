pub mod ast;
pub mod cli;
pub mod commands;
pub mod config;
pub mod convert;
pub mod converter;
pub mod csv_commands;
pub mod csv_formatter;
pub mod csv_lexer;
pub mod error;
pub mod formatter;
pub mod ini_commands;
pub mod ini_formatter;
pub mod ini_lexer;
pub mod install;
pub mod io_utils;
pub mod json_lexer;
pub mod lexer;
pub mod params;
pub mod parser;
pub mod projection;
pub mod syntax;
pub mod token;
pub mod tokenizer;

use std::{env, fs, sync::OnceLock, time::Instant};

use anyhow::{Context, Result, anyhow};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use log::{LevelFilter, error, info};
use serde_json::Value as JsonValue;

use crate::cli::{Cli, Commands, ConvertArgs, DataFormat, DialectsArgs, DialectsMode};
use crate::config::DialectFile;
use crate::convert::HeaderSource;
use crate::syntax::Syntax;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("synform", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => run_operation("convert", || handle_convert(&args)),
        Commands::Dialects(args) => run_operation("dialects", || handle_dialects(&args)),
        Commands::Install(args) => run_operation("install", || install::execute(&args)),
    }
}

fn run_operation<F>(name: &str, op: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let start_clock = Utc::now();
    let start_instant = Instant::now();
    let result = op();
    let end_clock = Utc::now();
    let duration_secs = start_instant.elapsed().as_secs_f64();
    let start_str = start_clock.to_rfc3339_opts(SecondsFormat::Millis, true);
    let end_str = end_clock.to_rfc3339_opts(SecondsFormat::Millis, true);

    match &result {
        Ok(_) => info!(
            "Operation '{name}' completed (status=ok)\nstart: {start_str}\nend: {end_str}\nduration_secs: {duration_secs:.3}"
        ),
        Err(err) => error!(
            "Operation '{name}' failed (status=error)\nstart: {start_str}\nend: {end_str}\nduration_secs: {duration_secs:.3}\nerror: {err:?}"
        ),
    }

    result
}

/// Resolves one side of a conversion's dialect: an explicit dialect
/// file wins over a named preset, matching spec.md §6 "Construct a
/// `Syntax` via its builder or choose a preset."
fn resolve_side_syntax(preset: Option<&str>, file: Option<&std::path::Path>, format: DataFormat, fallback_preset: &str) -> Result<Syntax> {
    if let Some(path) = file {
        return DialectFile::load(path).with_context(|| format!("loading dialect from {path:?}"));
    }
    let name = preset.unwrap_or(fallback_preset);
    let name = if format == DataFormat::Ini && !name.starts_with("ini-") {
        format!("ini-{name}")
    } else {
        name.to_string()
    };
    config::resolve_preset(&name).map_err(Into::into)
}

fn default_preset_for(format: DataFormat) -> &'static str {
    match format {
        DataFormat::Csv => "rfc4180",
        DataFormat::Ini => "ini-generic",
        DataFormat::Json => "rfc4180",
    }
}

fn handle_convert(args: &ConvertArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let header = if args.header.is_empty() {
        HeaderSource::FirstRow
    } else {
        HeaderSource::Explicit(args.header.clone())
    };

    let text_format = match (args.from, args.to) {
        (DataFormat::Json, other) | (other, DataFormat::Json) => other,
        (a, _) => a,
    };

    let (from_preset, to_preset) = match &args.dialect {
        Some(name) => (Some(name.as_str()), Some(name.as_str())),
        None => (args.from_dialect.as_deref(), args.to_dialect.as_deref()),
    };

    info!("Converting '{}' from {:?} to {:?}", args.input.display(), args.from, args.to);

    match (args.from, args.to) {
        (DataFormat::Csv, DataFormat::Json) => {
            let syntax = resolve_side_syntax(from_preset, args.from_dialect_file.as_deref(), DataFormat::Csv, default_preset_for(text_format))?;
            let bytes = io_utils::read_all(&args.input)?;
            let text = io_utils::decode_bytes(&bytes, encoding)?;
            let rows = convert::csv_text_to_json(&text, &syntax, header)?;
            write_json(&JsonValue::Array(rows), args.output.as_deref())
        }
        (DataFormat::Json, DataFormat::Csv) => {
            let syntax = resolve_side_syntax(to_preset, args.to_dialect_file.as_deref(), DataFormat::Csv, default_preset_for(text_format))?;
            let value = read_json(&args.input)?;
            let rows = as_record_array(value)?;
            let mut syntax = syntax;
            syntax.bom = args.bom;
            let text = convert::json_to_csv_text(&rows, &syntax, header, args.headerless)?;
            write_text(&text, args.output.as_deref(), encoding_or_default(args.output_encoding.as_deref())?)
        }
        (DataFormat::Ini, DataFormat::Json) => {
            let syntax = resolve_side_syntax(from_preset, args.from_dialect_file.as_deref(), DataFormat::Ini, default_preset_for(text_format))?;
            let bytes = io_utils::read_all(&args.input)?;
            let text = io_utils::decode_bytes(&bytes, encoding)?;
            let value = convert::ini_text_to_json(&text, &syntax)?;
            write_json(&value, args.output.as_deref())
        }
        (DataFormat::Json, DataFormat::Ini) => {
            let syntax = resolve_side_syntax(to_preset, args.to_dialect_file.as_deref(), DataFormat::Ini, default_preset_for(text_format))?;
            let value = read_json(&args.input)?;
            let mut syntax = syntax;
            syntax.bom = args.bom;
            let text = convert::json_to_ini_text(&value, &syntax)?;
            write_text(&text, args.output.as_deref(), encoding_or_default(args.output_encoding.as_deref())?)
        }
        (DataFormat::Csv, DataFormat::Csv) => {
            let from = resolve_side_syntax(from_preset, args.from_dialect_file.as_deref(), DataFormat::Csv, "rfc4180")?;
            let mut to = resolve_side_syntax(to_preset, args.to_dialect_file.as_deref(), DataFormat::Csv, "rfc4180")?;
            to.bom = args.bom;
            let bytes = io_utils::read_all(&args.input)?;
            let text = io_utils::decode_bytes(&bytes, encoding)?;
            let out = convert::csv_text_to_csv_text(&text, &from, &to, header, args.headerless)?;
            write_text(&out, args.output.as_deref(), encoding_or_default(args.output_encoding.as_deref())?)
        }
        (DataFormat::Ini, DataFormat::Ini) => {
            let from = resolve_side_syntax(from_preset, args.from_dialect_file.as_deref(), DataFormat::Ini, "ini-generic")?;
            let mut to = resolve_side_syntax(to_preset, args.to_dialect_file.as_deref(), DataFormat::Ini, "ini-generic")?;
            to.bom = args.bom;
            let bytes = io_utils::read_all(&args.input)?;
            let text = io_utils::decode_bytes(&bytes, encoding)?;
            let out = convert::ini_text_to_ini_text(&text, &from, &to)?;
            write_text(&out, args.output.as_deref(), encoding_or_default(args.output_encoding.as_deref())?)
        }
        (DataFormat::Json, DataFormat::Json) => Err(anyhow!("--from json --to json is not a conversion")),
        (DataFormat::Csv, DataFormat::Ini) | (DataFormat::Ini, DataFormat::Csv) => {
            Err(anyhow!("direct CSV<->INI conversion is not supported; convert through json"))
        }
    }
}

fn encoding_or_default(label: Option<&str>) -> Result<&'static encoding_rs::Encoding> {
    io_utils::resolve_encoding(label)
}

fn read_json(path: &std::path::Path) -> Result<JsonValue> {
    let bytes = io_utils::read_all(path)?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing JSON from {path:?}"))
}

fn as_record_array(value: JsonValue) -> Result<Vec<JsonValue>> {
    match value {
        JsonValue::Array(items) => Ok(items),
        other => Ok(vec![other]),
    }
}

fn write_json(value: &JsonValue, output: Option<&std::path::Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serializing JSON output")?;
    let mut writer = io_utils::open_writer(output)?;
    use std::io::Write;
    writeln!(writer, "{text}").context("writing JSON output")
}

fn write_text(text: &str, output: Option<&std::path::Path>, encoding: &'static encoding_rs::Encoding) -> Result<()> {
    let mut writer = io_utils::open_writer(output)?;
    use std::io::Write;
    if encoding == encoding_rs::UTF_8 {
        writer.write_all(text.as_bytes()).context("writing text output")
    } else {
        let (bytes, _, had_errors) = encoding.encode(text);
        if had_errors {
            return Err(anyhow!("failed to encode output using {}", encoding.name()));
        }
        writer.write_all(&bytes).context("writing text output")
    }
}

fn handle_dialects(args: &DialectsArgs) -> Result<()> {
    match &args.mode {
        DialectsMode::List => {
            for name in config::PRESET_NAMES {
                println!("{name}");
            }
            Ok(())
        }
        DialectsMode::Show(show) => {
            let syntax = config::resolve_preset(&show.name)?;
            let file = DialectFile::from_syntax(&syntax);
            let is_json = show.output.as_deref().is_some_and(|p| p.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json")));
            let rendered = if is_json {
                serde_json::to_string_pretty(&file).context("rendering dialect as JSON")?
            } else {
                serde_yaml::to_string(&file).context("rendering dialect as YAML")?
            };
            match &show.output {
                Some(path) => fs::write(path, rendered).with_context(|| format!("writing {path:?}")),
                None => {
                    println!("{rendered}");
                    Ok(())
                }
            }
        }
        DialectsMode::Validate(validate) => {
            DialectFile::load(&validate.path).with_context(|| format!("validating dialect file {:?}", validate.path))?;
            info!("{:?} is a valid dialect file", validate.path);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_record_array_wraps_a_bare_object_as_one_record() {
        let wrapped = as_record_array(serde_json::json!({"a": 1})).unwrap();
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn as_record_array_passes_through_an_existing_array() {
        let records = as_record_array(serde_json::json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn default_preset_for_picks_the_generic_ini_preset() {
        assert_eq!(default_preset_for(DataFormat::Ini), "ini-generic");
        assert_eq!(default_preset_for(DataFormat::Csv), "rfc4180");
    }
}
