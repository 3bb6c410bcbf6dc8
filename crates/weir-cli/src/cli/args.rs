use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "weir",
    version,
    about = "Introspect, manipulate and monitor the kernel packet filtering engine"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List installed filters across the authorization layers
    List(ListArgs),
    /// Delete filters by id, or every weir-owned filter
    Delete(DeleteArgs),
    /// Install the built-in demo filter
    Create(CreateArgs),
    /// Load filter rules from a file and install them
    Load(LoadArgs),
    /// Stream live classification events until Enter or Ctrl-C
    Monitor(MonitorArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Show only filters whose provider, sublayer or layer name matches
    /// any pattern (case-insensitive regex; the literal 'all' disables
    /// filtering)
    #[arg(short = 's', long = "search")]
    pub search: Vec<String>,

    /// Limit output to layers whose name matches any pattern
    #[arg(short = 'L', long = "layer")]
    pub layer: Vec<String>,

    /// Show only filters installed by this tool
    #[arg(long)]
    pub owned: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Filter ids to delete; 'owned' or 'all' (or no ids at all) deletes
    /// every weir-owned filter after confirmation
    #[arg(short = 'f', long = "filter")]
    pub filter: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {}

#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// File containing filter rules
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_requires_a_file() {
        assert!(Cli::try_parse_from(["weir", "load"]).is_err());
        assert!(Cli::try_parse_from(["weir", "load", "-f", "rules.weir"]).is_ok());
    }

    #[test]
    fn search_patterns_accumulate() {
        let cli = Cli::try_parse_from(["weir", "list", "-s", "vpn", "-s", "base"]).unwrap();
        match cli.cmd {
            Command::List(args) => assert_eq!(args.search, vec!["vpn", "base"]),
            _ => panic!("expected the list command"),
        }
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(Cli::try_parse_from(["weir", "frobnicate"]).is_err());
    }
}
