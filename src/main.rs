use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};

use colordb::config::DEFAULT_CONFIG_PATH;
use colordb::utils::{self, format_count, format_elapsed, DbInspector};
use colordb::{
    BulkColorStore, ColorRecord, Config, Database, ImportMode, OperationKind, OperationLock,
    Progress,
};

const USAGE: &str = "usage: colordb [--config FILE] <command>

commands:
  init                      create the color table if needed
  import <file> [--replace] import a .csv or .json file
  export <file>             export to a .csv or .json file
  add <r> <g> <b> <name>    insert or overwrite one color
  get <r> <g> <b>           look up one color
  clear --yes               delete every color
  info                      show row count and schema health";

#[derive(Debug, PartialEq)]
enum Command {
    Init,
    Import { path: PathBuf, mode: ImportMode },
    Export { path: PathBuf },
    Add { r: String, g: String, b: String, name: String },
    Get { r: String, g: String, b: String },
    Clear { confirmed: bool },
    Info,
}

impl Command {
    fn kind(&self) -> Option<OperationKind> {
        match self {
            Command::Import { .. } => Some(OperationKind::Import),
            Command::Export { .. } => Some(OperationKind::Export),
            Command::Add { .. } => Some(OperationKind::Add),
            Command::Clear { .. } => Some(OperationKind::Clear),
            Command::Init | Command::Get { .. } | Command::Info => None,
        }
    }
}

fn parse_args(args: &[String]) -> Result<(Option<PathBuf>, Command)> {
    let mut config_path = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let value = iter.next().ok_or_else(|| anyhow!("--config needs a file path"))?;
            config_path = Some(PathBuf::from(value));
        } else {
            rest.push(arg.as_str());
        }
    }

    let command = match rest.as_slice() {
        ["init"] => Command::Init,
        ["import", path] => Command::Import {
            path: PathBuf::from(path),
            mode: ImportMode::Append,
        },
        ["import", path, "--replace"] | ["import", "--replace", path] => Command::Import {
            path: PathBuf::from(path),
            mode: ImportMode::Replace,
        },
        ["export", path] => Command::Export {
            path: PathBuf::from(path),
        },
        ["add", r, g, b, name @ ..] if !name.is_empty() => Command::Add {
            r: r.to_string(),
            g: g.to_string(),
            b: b.to_string(),
            name: name.join(" "),
        },
        ["get", r, g, b] => Command::Get {
            r: r.to_string(),
            g: g.to_string(),
            b: b.to_string(),
        },
        ["clear"] => Command::Clear { confirmed: false },
        ["clear", "--yes"] => Command::Clear { confirmed: true },
        ["info"] => Command::Info,
        _ => bail!("{}", USAGE),
    };
    Ok((config_path, command))
}

fn log_progress(label: &'static str) -> impl FnMut(Progress) {
    move |progress: Progress| {
        info!(
            "{}: {}/{} ({:.1}%)",
            label,
            format_count(progress.done),
            format_count(progress.total),
            progress.percent()
        )
    }
}

fn run(store: &BulkColorStore, config: &Config, command: Command) -> Result<()> {
    let started = utils::current_timestamp();
    match command {
        Command::Init => {
            info!("Color table ready at {}", config.database_path.display());
        }
        Command::Import { path, mode } => {
            let result = store
                .import_file(&path, mode, log_progress("Importing"))
                .with_context(|| format!("Import of {} failed", path.display()))?;
            info!(
                "Imported {} of {} colors ({} skipped) in {}",
                format_count(result.succeeded),
                format_count(result.total),
                format_count(result.skipped()),
                format_elapsed(started)
            );
        }
        Command::Export { path } => {
            let count = store
                .export_file(&path, log_progress("Exporting"))
                .with_context(|| format!("Export to {} failed", path.display()))?;
            info!("Exported {} colors in {}", format_count(count), format_elapsed(started));
        }
        Command::Add { r, g, b, name } => {
            let record = ColorRecord::parse(&r, &g, &b, &name)?;
            store.add_one(&record)?;
        }
        Command::Get { r, g, b } => {
            let key = ColorRecord::parse(&r, &g, &b, "lookup")?.rgb();
            match store.get(key)? {
                Some(record) => println!("{}\t{}", record.rgb().to_hex(), record.name),
                None => bail!("No color stored for {}", key),
            }
        }
        Command::Clear { confirmed } => {
            if !confirmed {
                bail!("Refusing to delete every color without --yes");
            }
            let removed = store.clear_all()?;
            info!(
                "Database cleared: {} colors removed in {}",
                format_count(removed),
                format_elapsed(started)
            );
        }
        Command::Info => {
            let stats = store.stats()?;
            println!("Colors: {}", format_count(stats.count));
            if let Some(latest) = stats.latest {
                println!("Latest: {} {}", latest.rgb().to_hex(), latest);
            }

            let inspector = DbInspector::new(&config.database_path)?;
            inspector.print_database_report()?;
            for issue in inspector.check_colors_table()? {
                warn!("Schema issue: {}", issue);
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (config_path, command) = parse_args(&args)?;

    let config_path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path)?;

    utils::ensure_directory_exists(&config.database_path)?;
    let database = Database::open(&config.database_path, config.busy_timeout())
        .context("Failed to open color database")?;
    let store = BulkColorStore::from_config(&database, &config);
    store.ensure_schema().context("Failed to initialize color database")?;

    let lock = OperationLock::new();
    let _guard = match command.kind() {
        Some(kind) => Some(lock.try_begin(kind)?),
        None => None,
    };
    run(&store, &config, command)
}
