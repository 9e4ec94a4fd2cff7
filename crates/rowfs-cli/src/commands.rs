use std::path::Path;

use anyhow::{anyhow, Context};
use colored::Colorize;
use rowfs_fs::{FileAttr, FileHandle, FileKind, FlushOutcome, FsResult, NodeId, TableFs};
use rowfs_store::InMemoryDataStore;
use rowfs_types::RowId;
use serde_json::{json, Value};
use tracing::info;

use crate::cli::*;
use crate::config::{RowfsConfig, ValidatedConfig};
use crate::seed::Fixture;

type Fs = TableFs<InMemoryDataStore>;

const READ_CHUNK: u32 = 64 * 1024;

/// Layer config file, `ROWFS_*` environment, then command-line flags.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<ValidatedConfig> {
    let cwd = std::env::current_dir().context("reading working directory")?;
    let mut config = RowfsConfig::discover(cli.config.as_deref(), &cwd)?;
    config.apply_env(|var| std::env::var(var).ok())?;
    if !cli.fields.is_empty() {
        config.fields = cli.fields.clone();
    }
    if let Some(dsn) = &cli.dsn {
        config.dsn = dsn.clone();
    }
    if cli.debug {
        config.debug = true;
    }
    Ok(config.validate()?)
}

pub fn run_command(cli: Cli, config: ValidatedConfig) -> anyhow::Result<()> {
    let format = cli.format;
    let seed = cli.seed.as_deref();
    match cli.command {
        Command::Check => cmd_check(&config, format),
        Command::Inode(args) => cmd_inode(&config, &args, format),
        Command::Ls(args) => cmd_ls(&open_table(&config, seed)?, &args.path, format),
        Command::Cat(args) => cmd_cat(&open_table(&config, seed)?, &args.path, format),
        Command::Stat(args) => cmd_stat(&open_table(&config, seed)?, &args.path, format),
        Command::Write(args) => cmd_write(&open_table(&config, seed)?, &args, format),
        Command::Mkdir(args) => cmd_mkdir(&open_table(&config, seed)?, &args.name, format),
    }
}

fn open_table(config: &ValidatedConfig, seed: Option<&Path>) -> anyhow::Result<Fs> {
    let store = InMemoryDataStore::new(config.catalog.clone());
    if let Some(path) = seed {
        Fixture::load(path)?.seed(&store)?;
    }
    info!(table = %config.table, "serving in-memory table");
    Ok(TableFs::new(store))
}

/// Run `f` inside an open session, releasing it whatever `f` returns.
fn with_session<T>(
    fs: &Fs,
    node: NodeId,
    f: impl FnOnce(FileHandle) -> FsResult<T>,
) -> anyhow::Result<(T, FlushOutcome)> {
    let fh = fs.open(node)?;
    let result = f(fh);
    let outcome = fs.release(fh);
    let value = result?;
    Ok((value, outcome?))
}

fn read_all(fs: &Fs, node: NodeId) -> anyhow::Result<Vec<u8>> {
    let (content, _) = with_session(fs, node, |fh| {
        let mut content = Vec::new();
        loop {
            let chunk = fs.read(fh, content.len() as u64, READ_CHUNK)?;
            if chunk.is_empty() {
                return Ok(content);
            }
            content.extend_from_slice(&chunk);
        }
    })?;
    Ok(content)
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn kind_str(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Directory => "directory",
        FileKind::RegularFile => "file",
    }
}

fn cmd_check(config: &ValidatedConfig, format: OutputFormat) -> anyhow::Result<()> {
    let base = config.catalog.base();
    if format == OutputFormat::Json {
        let fields: Vec<Value> = config
            .catalog
            .iter()
            .map(|(id, name)| json!({"name": name.as_str(), "offset": id.index()}))
            .collect();
        return print_json(&json!({
            "table": config.table.as_str(),
            "dsn": config.config.dsn,
            "mount_point": config.config.mount_point,
            "inode_base": base.get(),
            "fields": fields,
        }));
    }

    println!("{} Configuration valid", "✓".green().bold());
    println!("  Table: {}", config.table.as_str().bold());
    println!("  DSN: {}", config.config.dsn);
    match &config.config.mount_point {
        Some(p) => println!("  Mount point: {}", p.display()),
        None => println!("  Mount point: {}", "(none)".dimmed()),
    }
    println!(
        "  Inode base: {} (up to {} fields)",
        base.get().to_string().cyan(),
        base.max_fields()
    );
    println!("  Fields:");
    for (id, name) in config.catalog.iter() {
        println!("    {:>4}  {}", format!("+{}", id.index()).yellow(), name);
    }
    Ok(())
}

fn cmd_inode(config: &ValidatedConfig, args: &InodeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let row = RowId::new(args.row)?;
    let alloc = config.catalog.allocator();
    let ino = match &args.field {
        Some(name) => {
            let field = config
                .catalog
                .lookup(name)
                .ok_or_else(|| anyhow!("unknown field {name:?}"))?;
            alloc.data_ino(row, field)?
        }
        None => alloc.group_ino(row)?,
    };

    if format == OutputFormat::Json {
        return print_json(&json!({"row": row.get(), "field": args.field, "ino": ino.get()}));
    }
    println!("{}", ino.to_string().cyan());
    Ok(())
}

fn cmd_ls(fs: &Fs, path: &str, format: OutputFormat) -> anyhow::Result<()> {
    let node = fs.resolve_path(path)?;
    let attr = fs.getattr(node)?;
    let entries = match attr.kind {
        FileKind::Directory => fs.readdir(node)?,
        FileKind::RegularFile => {
            let name = path.rsplit('/').find(|p| !p.is_empty()).unwrap_or(path);
            vec![rowfs_fs::DirEntry {
                ino: attr.ino,
                name: name.to_string(),
                kind: attr.kind,
            }]
        }
    };

    if format == OutputFormat::Json {
        let list: Vec<Value> = entries
            .iter()
            .map(|e| json!({"ino": e.ino.get(), "name": e.name, "kind": kind_str(e.kind)}))
            .collect();
        return print_json(&Value::Array(list));
    }
    for entry in &entries {
        match entry.kind {
            FileKind::Directory => println!(
                "{:>10}  {}/",
                entry.ino.to_string().dimmed(),
                entry.name.blue().bold()
            ),
            FileKind::RegularFile => {
                println!("{:>10}  {}", entry.ino.to_string().dimmed(), entry.name)
            }
        }
    }
    Ok(())
}

fn cmd_cat(fs: &Fs, path: &str, format: OutputFormat) -> anyhow::Result<()> {
    let node = fs.resolve_path(path)?;
    let content = read_all(fs, node)?;
    if format == OutputFormat::Json {
        let parsed = serde_json::from_slice::<Value>(&content)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&content).into_owned()));
        return print_json(&json!({"path": path, "content": parsed}));
    }
    println!("{}", String::from_utf8_lossy(&content));
    Ok(())
}

fn print_attr(path: &str, attr: &FileAttr) {
    println!("  Path:  {}", path.bold());
    println!("  Inode: {}", attr.ino.to_string().cyan());
    println!("  Kind:  {}", kind_str(attr.kind));
    println!("  Mode:  {:o}", attr.mode());
    println!("  Size:  {}", attr.size);
    println!("  Links: {}", attr.nlink);
}

fn cmd_stat(fs: &Fs, path: &str, format: OutputFormat) -> anyhow::Result<()> {
    let attr = fs.stat_path(path)?;
    if format == OutputFormat::Json {
        return print_json(&json!({
            "path": path,
            "ino": attr.ino.get(),
            "kind": kind_str(attr.kind),
            "mode": format!("{:o}", attr.mode()),
            "size": attr.size,
            "nlink": attr.nlink,
        }));
    }
    print_attr(path, &attr);
    Ok(())
}

fn cmd_write(fs: &Fs, args: &WriteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let node = fs.resolve_path(&args.path)?;
    let (written, outcome) = with_session(fs, node, |fh| fs.write(fh, 0, args.data.as_bytes()))?;
    let stored = read_all(fs, node)?;
    let stored = String::from_utf8_lossy(&stored);

    if format == OutputFormat::Json {
        let persisted = matches!(outcome, FlushOutcome::Persisted { .. });
        return print_json(&json!({
            "path": args.path,
            "written": written,
            "persisted": persisted,
            "stored": stored,
        }));
    }
    match outcome {
        FlushOutcome::Persisted { bytes } => println!(
            "{} Wrote {} bytes to {}",
            "✓".green().bold(),
            bytes,
            args.path.bold()
        ),
        FlushOutcome::Clean => println!("Nothing written to {}", args.path.bold()),
    }
    println!("  Stored: {}", stored.yellow());
    Ok(())
}

fn cmd_mkdir(fs: &Fs, name: &str, format: OutputFormat) -> anyhow::Result<()> {
    let (_, attr) = fs.mkdir(NodeId::ROOT, name)?;
    if format == OutputFormat::Json {
        return print_json(&json!({"name": name, "ino": attr.ino.get()}));
    }
    println!(
        "{} Created group {} (inode {})",
        "✓".green().bold(),
        name.bold(),
        attr.ino.to_string().cyan()
    );
    Ok(())
}
