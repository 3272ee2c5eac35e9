use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blockrepo",
    about = "Content-addressed block repository",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository root
    #[arg(long, global = true, default_value = ".blockrepo")]
    pub repo: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new repository
    Init(InitArgs),
    /// Store a file (or stdin) as a block and print its identifier
    Put(PutArgs),
    /// Write a block's payload to stdout
    Get(CidArgs),
    /// Report whether a block is stored
    Has(CidArgs),
    /// Remove a block
    Rm(CidArgs),
    /// List stored blocks
    Ls(LsArgs),
    /// Read or write the configuration document
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Hash function for new blocks (blake3 or sha2-256)
    #[arg(long, default_value = "blake3")]
    pub hash: String,
    /// fsync every block before it becomes visible
    #[arg(long)]
    pub fsync: bool,
}

#[derive(Args)]
pub struct PutArgs {
    /// File to store, or `-` for stdin
    pub input: String,
}

#[derive(Args)]
pub struct CidArgs {
    pub cid: String,
}

#[derive(Args)]
pub struct LsArgs {
    /// Print payload sizes
    #[arg(short, long)]
    pub long: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the whole document, or the value at a dotted key
    Get { key: Option<String> },
    /// Set a dotted key to a JSON value
    Set { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["blockrepo", "init"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert_eq!(args.hash, "blake3");
            assert!(!args.fsync);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_repo_flag() {
        let cli = Cli::try_parse_from(["blockrepo", "--repo", "/tmp/r", "ls"]).unwrap();
        assert_eq!(cli.repo, PathBuf::from("/tmp/r"));
        assert!(matches!(cli.command, Command::Ls(_)));
    }

    #[test]
    fn parse_repo_flag_after_command() {
        let cli = Cli::try_parse_from(["blockrepo", "has", "fabc", "--repo", "r"]).unwrap();
        assert_eq!(cli.repo, PathBuf::from("r"));
    }

    #[test]
    fn parse_put_stdin() {
        let cli = Cli::try_parse_from(["blockrepo", "put", "-"]).unwrap();
        if let Command::Put(args) = cli.command {
            assert_eq!(args.input, "-");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_get() {
        let cli = Cli::try_parse_from(["blockrepo", "get", "f01551e20ab"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert_eq!(args.cid, "f01551e20ab");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_config_get_all() {
        let cli = Cli::try_parse_from(["blockrepo", "config", "get"]).unwrap();
        if let Command::Config(args) = cli.command {
            assert!(matches!(args.action, ConfigAction::Get { key: None }));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_config_set() {
        let cli = Cli::try_parse_from(["blockrepo", "config", "set", "Addresses.API", "\"/ip4\""]).unwrap();
        if let Command::Config(args) = cli.command {
            match args.action {
                ConfigAction::Set { key, value } => {
                    assert_eq!(key, "Addresses.API");
                    assert_eq!(value, "\"/ip4\"");
                }
                _ => panic!("wrong action"),
            }
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["blockrepo", "-v", "ls", "--long"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn put_requires_input() {
        assert!(Cli::try_parse_from(["blockrepo", "put"]).is_err());
    }
}
