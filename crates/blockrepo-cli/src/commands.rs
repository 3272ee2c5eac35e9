use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::Context;
use blockrepo::{HashAlgorithm, Repo, RepoOptions};
use colored::Colorize;
use serde_json::Value;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let root = cli.repo.as_path();
    let mut out = io::stdout().lock();
    match cli.command {
        Command::Init(args) => cmd_init(root, args, &mut out),
        Command::Put(args) => cmd_put(root, args, &mut out),
        Command::Get(args) => cmd_get(root, args, &mut out),
        Command::Has(args) => cmd_has(root, args, &mut out),
        Command::Rm(args) => cmd_rm(root, args, &mut out),
        Command::Ls(args) => cmd_ls(root, args, &mut out),
        Command::Config(args) => cmd_config(root, args, &mut out),
    }
}

fn open(root: &Path) -> anyhow::Result<Repo> {
    debug!(root = %root.display(), "opening repository");
    Repo::open(root).with_context(|| format!("cannot open repository at {}", root.display()))
}

fn open_read_only(root: &Path) -> anyhow::Result<Repo> {
    debug!(root = %root.display(), "opening repository read-only");
    Repo::open_read_only(root)
        .with_context(|| format!("cannot open repository at {}", root.display()))
}

fn cmd_init(root: &Path, args: InitArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let hash: HashAlgorithm = args
        .hash
        .parse()
        .with_context(|| format!("unknown hash function {:?}", args.hash))?;
    let options = RepoOptions {
        hash,
        fsync: args.fsync,
        ..Default::default()
    };
    Repo::init(root, options)?;
    writeln!(
        out,
        "{} Initialized blockrepo in {}",
        "✓".green().bold(),
        root.display().to_string().bold()
    )?;
    writeln!(out, "  Hash: {}", hash.to_string().cyan())?;
    Ok(())
}

fn cmd_put(root: &Path, args: PutArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let repo = open(root)?;
    let data = if args.input == "-" {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(&args.input).with_context(|| format!("cannot read {}", args.input))?
    };
    let cid = repo.blocks().put_bytes(data)?;
    writeln!(out, "{cid}")?;
    Ok(())
}

fn cmd_get(root: &Path, args: CidArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let repo = open_read_only(root)?;
    let block = repo.blocks().get(args.cid.as_str())?;
    out.write_all(block.data())?;
    out.flush()?;
    Ok(())
}

fn cmd_has(root: &Path, args: CidArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let repo = open_read_only(root)?;
    if repo.blocks().has(args.cid.as_str())? {
        writeln!(out, "{} {}", "✓".green(), args.cid)?;
    } else {
        writeln!(out, "{} {} not found", "✗".red(), args.cid)?;
    }
    Ok(())
}

fn cmd_rm(root: &Path, args: CidArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let repo = open(root)?;
    repo.blocks().delete(args.cid.as_str())?;
    writeln!(out, "Removed {}", args.cid.yellow())?;
    Ok(())
}

fn cmd_ls(root: &Path, args: LsArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let repo = open_read_only(root)?;
    for cid in repo.blocks().cids()? {
        if args.long {
            let size = repo.blocks().get(&cid)?.len();
            writeln!(out, "{cid} {}", size.to_string().dimmed())?;
        } else {
            writeln!(out, "{cid}")?;
        }
    }
    Ok(())
}

fn cmd_config(root: &Path, args: ConfigArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let repo = match args.action {
        ConfigAction::Get { .. } => open_read_only(root)?,
        ConfigAction::Set { .. } => open(root)?,
    };
    match args.action {
        ConfigAction::Get { key: None } => {
            let doc = repo.config().get()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        }
        ConfigAction::Get { key: Some(key) } => {
            let value = repo.config().get_value(&key)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
        ConfigAction::Set { key, value } => {
            // Bare words are stored as strings.
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            repo.config().set_value(&key, value)?;
            writeln!(out, "Set {}", key.bold())?;
        }
    }
    Ok(())
}
