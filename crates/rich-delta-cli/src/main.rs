use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rich_delta_config::Config;
use rich_delta_engine::{
    AttributeOverrides, AttributeValue, Delta, Selection, TextChangeEvent, TextLineType,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "rich-delta")]
#[command(about = "Apply editor events to rich-text delta documents", long_about = None)]
struct Args {
    /// Config file (default: ~/.config/rich-delta/config.toml)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write compact JSON regardless of the config
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile a raw text-change event with a delta
    Diff {
        /// Delta JSON file
        delta: PathBuf,
        /// Text-change event JSON file
        event: PathBuf,
        /// Attributes armed at the caret, as a JSON object (null disarms)
        #[arg(long, value_name = "JSON")]
        cursor: Option<String>,
    },
    /// Toggle a text attribute over a selection
    Format {
        delta: PathBuf,
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
        /// Attribute name
        #[arg(long)]
        name: String,
        /// Attribute value; JSON literals (true, 12) keep their type
        #[arg(long, default_value = "true")]
        value: String,
    },
    /// Set the line type of every line touched by a selection
    LineType {
        delta: PathBuf,
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
        /// normal, ol, ul or any custom tag
        line_type: TextLineType,
    },
    /// Print the lines of a delta and what a selection covers
    Inspect {
        delta: PathBuf,
        #[arg(long, default_value = "0")]
        start: usize,
        #[arg(long)]
        end: Option<usize>,
    },
    /// Rewrite a delta in canonical form
    Canonicalize { delta: PathBuf },
    /// Write a config file with the default settings
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    }
    .unwrap_or_default();
    init_logging(&config);

    let pretty = config.pretty && !args.compact;
    match args.command {
        Commands::Diff {
            delta,
            event,
            cursor,
        } => {
            let delta = read_delta(&delta)?;
            let event = read_event(&event)?;
            let cursor = match cursor {
                Some(json) => serde_json::from_str::<AttributeOverrides>(&json)
                    .context("Invalid cursor attributes")?,
                None => AttributeOverrides::new(),
            };
            let update = delta.apply_text_diff(&event.new_text, &event.context, &cursor)?;
            report_selection(update.overriding_selection);
            print_delta(&update.final_delta, pretty)
        }
        Commands::Format {
            delta,
            start,
            end,
            name,
            value,
        } => {
            let delta = read_delta(&delta)?;
            let update = delta.apply_text_transform_to_selection(
                Selection::new(start, end),
                &name,
                parse_value(&value)?,
            )?;
            print_delta(&update.final_delta, pretty)
        }
        Commands::LineType {
            delta,
            start,
            end,
            line_type,
        } => {
            let delta = read_delta(&delta)?;
            let update =
                delta.apply_line_type_to_selection(Selection::new(start, end), &line_type)?;
            report_selection(update.overriding_selection);
            print_delta(&update.final_delta, pretty)
        }
        Commands::Inspect { delta, start, end } => {
            let delta = read_delta(&delta)?;
            let selection = Selection::new(start, end.unwrap_or(start));
            inspect(&delta, selection, pretty)
        }
        Commands::Canonicalize { delta } => {
            let delta = read_delta(&delta)?;
            print_delta(&delta.canonicalize(), pretty)
        }
        Commands::InitConfig { force } => init_config(args.config.as_deref(), force),
    }
}

fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let target = path.map_or_else(Config::config_path, Path::to_path_buf);
    if target.exists() && !force {
        anyhow::bail!(
            "Config file {} already exists, pass --force to overwrite it",
            target.display()
        );
    }

    let config = Config::default();
    match path {
        Some(path) => config.save_to_path(path)?,
        None => config.save()?,
    }
    log::info!("Wrote default config to {}", target.display());
    Ok(())
}

fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info);
    if let Some(level) = &config.log_level {
        builder.parse_filters(level);
    }
    builder.parse_default_env();
    builder.init();
}

fn read_delta(path: &Path) -> Result<Delta> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read delta file {}", path.display()))?;
    let delta = Delta::from_json(&json)
        .with_context(|| format!("Failed to parse delta file {}", path.display()))?;
    log::debug!("Loaded {} runs from {}", delta.runs().len(), path.display());
    Ok(delta)
}

fn read_event(path: &Path) -> Result<TextChangeEvent> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file {}", path.display()))?;
    TextChangeEvent::from_json(&json)
        .with_context(|| format!("Failed to parse event file {}", path.display()))
}

/// JSON literals keep their type; anything else is taken as text. `null` is
/// rejected: applying the current value again is what clears an attribute.
fn parse_value(raw: &str) -> Result<AttributeValue> {
    if raw.trim() == "null" {
        anyhow::bail!("null is not an attribute value, format with the current value to clear it");
    }
    Ok(serde_json::from_str(raw).unwrap_or_else(|_| AttributeValue::from(raw)))
}

fn report_selection(selection: Option<Selection>) {
    if let Some(selection) = selection {
        log::info!("Selection moved to {}..{}", selection.start, selection.end);
    }
}

fn print_delta(delta: &Delta, pretty: bool) -> Result<()> {
    println!("{}", delta.to_json(pretty)?);
    Ok(())
}

fn inspect(delta: &Delta, selection: Selection, pretty: bool) -> Result<()> {
    for line in delta.lines() {
        let marker = if rich_delta_engine::is_line_in_selection(&selection, &line) {
            '*'
        } else {
            ' '
        };
        println!(
            "{marker} {:>3} [{}..{}] {:<8} {:?}",
            line.index,
            line.start,
            line.end,
            line.line_type(),
            line.content
        );
    }

    let attributes = delta.selected_text_attributes(selection)?;
    let attributes = if pretty {
        serde_json::to_string_pretty(&attributes)?
    } else {
        serde_json::to_string(&attributes)?
    };
    let lines = delta.selection_encompassing_lines(selection)?;
    println!("selection: {}..{}", selection.start, selection.end);
    println!("lines: {}..{}", lines.start, lines.end);
    println!("line type: {}", delta.line_type_in_selection(selection)?);
    println!("attributes: {attributes}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_keeps_json_types() {
        assert_eq!(parse_value("true").unwrap(), AttributeValue::Bool(true));
        assert_eq!(parse_value("12").unwrap(), AttributeValue::from(12));
        assert_eq!(parse_value("\"red\"").unwrap(), AttributeValue::from("red"));
        assert_eq!(parse_value("underline").unwrap(), AttributeValue::from("underline"));
    }

    #[test]
    fn test_parse_value_rejects_null() {
        let error = parse_value("null").unwrap_err();

        assert!(error.to_string().contains("null"));
    }

    #[test]
    fn test_init_config_writes_defaults_once() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_file = temp_dir.path().join("rich-delta").join("config.toml");

        init_config(Some(&config_file), false).unwrap();
        let loaded = Config::load_from_path(&config_file).unwrap();

        assert_eq!(loaded, Some(Config::default()));
        assert!(init_config(Some(&config_file), false).is_err());
        assert!(init_config(Some(&config_file), true).is_ok());
    }

    #[test]
    fn test_args_parse_line_type() {
        let args = Args::parse_from([
            "rich-delta",
            "line-type",
            "doc.json",
            "--start",
            "0",
            "--end",
            "4",
            "ol",
        ]);

        match args.command {
            Commands::LineType { line_type, .. } => {
                assert_eq!(line_type, TextLineType::OrderedList)
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
