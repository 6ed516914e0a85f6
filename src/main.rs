mod cli;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use declarative::Value;
use std::io;
use terraform_provider_smallstep::{Provider, ProviderConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "terraform-provider-smallstep", &mut io::stdout());
            Ok(())
        }
        Command::Resources => {
            // Listing needs no credentials
            let provider = Provider::unconfigured();
            for resource in provider.resources() {
                println!("resource     {}", resource.type_name());
            }
            for source in provider.data_sources() {
                println!("data source  {}", source.type_name());
            }
            Ok(())
        }
        Command::Schema { ref type_name } => {
            let provider = Provider::unconfigured();
            print_json(&provider.schema_json(type_name)?)
        }
        Command::Read {
            ref type_name,
            ref id,
        } => {
            let provider = Provider::configure(load_config(&cli)?)?;
            print_json(&provider.import_and_read(type_name, id)?.to_json())
        }
        Command::Data {
            ref type_name,
            ref attrs,
        } => {
            let provider = Provider::configure(load_config(&cli)?)?;
            let config = Value::object(
                attrs
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::string(value.clone()))),
            );
            print_json(&provider.read_data(type_name, config)?.to_json())
        }
    }
}

/// File config, with command-line flags on top.
fn load_config(cli: &Cli) -> Result<ProviderConfig> {
    let file = match &cli.config {
        Some(path) => ProviderConfig::load(path)?,
        None => ProviderConfig::load_default()?,
    };
    let flags = ProviderConfig {
        bearer_token: cli.token.clone(),
        server_url: cli.server_url.clone(),
        client_certificate: None,
    };
    Ok(file.merge(flags))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
