//! oxide-dict CLI
//!
//! Shows the SQL a database dictionary generates: DDL for a schema file,
//! pagination windows and substring calls.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

use oxide_dict::{
    DBDictionary, DictionaryConfig, DictionaryFactory, FilterValue, Select, SelectExecutor,
    SqlBuffer, Table, UNBOUNDED,
};

/// Inspect the SQL generated for each supported database.
#[derive(Parser, Debug)]
#[command(name = "oxide-dict")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dictionary configuration file (JSON).
    #[arg(short, long, global = true, env = "OXIDE_DICT_CONFIG")]
    config: Option<PathBuf>,

    /// Database platform; overrides the configuration file.
    #[arg(short, long, global = true, env = "OXIDE_DICT_DIALECT")]
    dialect: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the supported platforms.
    Dialects,

    /// Print CREATE TABLE and foreign key statements for a schema file.
    Ddl {
        /// JSON file holding an array of tables.
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Print a paginated select.
    Range {
        /// First row, 0-based.
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// Row after the last one; unbounded if not specified.
        #[arg(long)]
        end: Option<u64>,

        /// Table to select from.
        #[arg(long, default_value = "T")]
        table: String,
    },

    /// Print a substring call.
    Substring {
        /// First character, 0-based.
        #[arg(long)]
        start: i64,

        /// Character after the last one; to the end if not specified.
        #[arg(long)]
        end: Option<i64>,

        /// String expression.
        #[arg(long, default_value = "s")]
        source: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    run(cli, &mut io::stdout().lock())
}

fn run(cli: Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    if let Commands::Dialects = cli.command {
        let factory = DictionaryFactory::new();
        for name in DictionaryFactory::list() {
            let dict = factory.for_name(name)?;
            writeln!(out, "{name:<10} {}", dict.platform)?;
        }
        return Ok(());
    }

    let dict = dictionary(cli.config.as_deref(), cli.dialect.as_deref())?;
    debug!(platform = %dict.platform, "using dictionary");

    match cli.command {
        Commands::Dialects => {}

        Commands::Ddl { schema } => {
            let text = std::fs::read_to_string(&schema)
                .with_context(|| format!("reading {}", schema.display()))?;
            let tables: Vec<Table> = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", schema.display()))?;
            for table in &tables {
                for sql in dict.create_table_sql(table) {
                    writeln!(out, "{sql};")?;
                }
            }
            for table in &tables {
                for fk in &table.foreign_keys {
                    for sql in dict.add_foreign_key_sql(table, fk) {
                        writeln!(out, "{sql};")?;
                    }
                }
            }
        }

        Commands::Range { start, end, table } => {
            let end = end.unwrap_or(UNBOUNDED);
            let mut select = Select::new(Arc::new(dict), Arc::new(Table::new(table)), "t0");
            select.set_range(start, end)?;
            writeln!(out, "{}", select.to_select(false)?.to_sql())?;
        }

        Commands::Substring { start, end, source } => {
            if end.is_some_and(|e| e < start) {
                bail!("--end must not be before --start");
            }
            let mut buf = SqlBuffer::new();
            let end = end.map(FilterValue::Number);
            dict.substring(
                &mut buf,
                &FilterValue::expr(&source),
                &FilterValue::Number(start),
                end.as_ref(),
            );
            writeln!(out, "{}", buf.to_sql())?;
        }
    }
    Ok(())
}

/// The dictionary named by `--dialect`, else the one the configuration file
/// selects.
fn dictionary(config: Option<&Path>, dialect: Option<&str>) -> anyhow::Result<DBDictionary> {
    let factory = DictionaryFactory::new();
    let mut config = match config {
        Some(path) => DictionaryConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DictionaryConfig::default(),
    };
    if let Some(name) = dialect {
        config.platform = Some(String::from(name));
    }
    if config.platform.is_none() && config.url.is_none() {
        bail!("no database platform given; use --dialect or --config");
    }
    Ok(config.build(&factory)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(args)?;
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_dialects_lists_every_platform() {
        let text = output(&["oxide-dict", "dialects"]).unwrap();
        assert_eq!(text.lines().count(), DictionaryFactory::list().len());
        assert!(text.contains("Microsoft SQL Server"));
    }

    #[test]
    fn test_range() {
        let text = output(&[
            "oxide-dict", "range", "--dialect", "mysql", "--start", "5", "--end", "15",
        ])
        .unwrap();
        assert_eq!(text.trim(), "SELECT * FROM T t0 LIMIT 5, 10");

        let text = output(&["oxide-dict", "range", "--dialect", "generic"]).unwrap();
        assert_eq!(text.trim(), "SELECT * FROM T t0");
    }

    #[test]
    fn test_substring() {
        let text = output(&[
            "oxide-dict", "substring", "--dialect", "access", "--start", "0", "--end", "4",
        ])
        .unwrap();
        assert_eq!(text.trim(), "MID(s, 1, 4)");
        assert!(output(&[
            "oxide-dict", "substring", "--dialect", "access", "--start", "4", "--end", "1",
        ])
        .is_err());
    }

    #[test]
    fn test_ddl_with_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("dict.json");
        std::fs::write(&config, r#"{"platform": "mysql", "table_type": "myisam"}"#).unwrap();
        let schema = dir.path().join("schema.json");
        std::fs::write(
            &schema,
            r#"[{
                "name": "BOOK",
                "columns": [
                    {"name": "ID", "type": "integer", "nullable": false},
                    {"name": "AUTHOR_ID", "type": "integer"}
                ],
                "primary_key": {"columns": ["ID"]},
                "foreign_keys": [{
                    "name": "FK_AUTHOR",
                    "columns": ["AUTHOR_ID"],
                    "referenced_table": "AUTHOR",
                    "referenced_columns": ["ID"]
                }]
            }]"#,
        )
        .unwrap();

        let text = output(&[
            "oxide-dict",
            "--config",
            config.to_str().unwrap(),
            "ddl",
            "--schema",
            schema.to_str().unwrap(),
        ])
        .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("CREATE TABLE BOOK ("));
        assert!(lines[0].ends_with("ENGINE = myisam;"));
        assert!(lines[1].starts_with("ALTER TABLE BOOK ADD"));
    }

    #[test]
    fn test_platform_is_required() {
        assert!(output(&["oxide-dict", "range"]).is_err());
        assert!(output(&["oxide-dict", "range", "--dialect", "oracle"]).is_err());
    }
}
