use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "terraform-provider-smallstep")]
#[command(version)]
#[command(
    about = "Inspect and exercise the Smallstep provider outside a host runtime",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Provider config file (default: provider.toml in the config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Smallstep API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub server_url: Option<String>,

    /// Static API token
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List resource and data source type names
    Resources,

    /// Print the schema of a resource or data source as JSON
    Schema {
        /// Type name, with or without the smallstep_ prefix
        type_name: String,
    },

    /// Import an existing object by id and print its state as JSON
    Read {
        /// Resource type name, with or without the smallstep_ prefix
        type_name: String,

        /// Import id, e.g. <authority_id>/<name> for provisioners
        id: String,
    },

    /// Look an object up with a data source and print its state as JSON
    Data {
        /// Data source type name, with or without the smallstep_ prefix
        type_name: String,

        /// Lookup attributes
        #[arg(short, long = "attr", value_name = "NAME=VALUE", value_parser = parse_attr)]
        attrs: Vec<(String, String)>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_attr(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "terraform-provider-smallstep",
            "read",
            "authority",
            "a1",
            "-vv",
            "--token",
            "t",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.token.as_deref(), Some("t"));
        assert!(matches!(cli.command, Command::Read { ref id, .. } if id == "a1"));
    }

    #[test]
    fn test_data_attributes() {
        let cli = Cli::parse_from([
            "terraform-provider-smallstep",
            "data",
            "provisioner",
            "--attr",
            "authority_id=a1",
            "-a",
            "name=acme",
        ]);
        let Command::Data { attrs, .. } = cli.command else {
            panic!("expected data");
        };
        assert_eq!(
            attrs,
            vec![
                ("authority_id".to_string(), "a1".to_string()),
                ("name".to_string(), "acme".to_string()),
            ]
        );
        assert!(parse_attr("=x").is_err());
        assert!(parse_attr("novalue").is_err());
    }
}
