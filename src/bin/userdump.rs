//! Minimal companion tool: enumerates user objects only and writes a
//! flat JSON list, for quick account reviews without a full collection.

use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;

use adenum::collector::{Collector, CollectorConfig, Method, QueryConfig};
use adenum::directory::{BindMethod, ConnectionConfig, LdapDirectory};
use adenum::dump::generate_timestamp;

#[derive(Parser)]
#[command(version, about = "Dump user accounts from Active Directory", long_about = None)]
struct Cli {
    /// Domain controller address to connect to.
    #[arg(short, long)]
    domain_controller: String,

    /// Use plaintext LDAP instead of LDAPS.
    #[arg(long)]
    no_ssl: bool,

    /// Port to connect to. Determined automatically if not specified.
    #[arg(long)]
    port: Option<u16>,

    /// JSON file overriding the user query and attribute list.
    #[arg(long)]
    query_config: Option<PathBuf>,

    /// Comma separated list of object attributes to return.
    #[arg(long)]
    attributes: Option<String>,

    #[arg(short, long)]
    username: Option<String>,
    #[arg(short, long)]
    password: Option<String>,

    /// Output filename. Generated from the timestamp if not provided.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let bind = match &cli.username {
        Some(username) => {
            let password = match &cli.password {
                Some(password) => password.clone(),
                None => rpassword::prompt_password(format!(
                    "Please enter the password for {username}: "
                ))?,
            };
            BindMethod::Simple {
                username: username.clone(),
                password,
            }
        }
        None => BindMethod::Anonymous,
    };

    let connection = ConnectionConfig {
        host: cli.domain_controller.clone(),
        target_ip: None,
        port: cli.port,
        ssl: !cli.no_ssl,
        start_tls: false,
        bind,
    };
    let directory = LdapDirectory::connect(&connection)?;

    let attributes: Option<Vec<String>> = cli
        .attributes
        .as_ref()
        .map(|a| a.split(',').map(|s| s.trim().to_string()).collect());
    let config = CollectorConfig {
        methods: vec![Method::Users],
        query_config: cli
            .query_config
            .as_deref()
            .map(QueryConfig::load)
            .transpose()?,
        attributes: attributes.clone(),
        ..Default::default()
    };
    let username = cli.username.clone().unwrap_or_default();
    let mut collector = Collector::new(directory, config, username);
    let dump = collector.run()?;

    // Flatten to one object per user, collapsing single-valued lists.
    let flatten = |value: &Value| match value {
        Value::Array(items) if items.len() == 1 => items[0].clone(),
        Value::Array(items) if items.is_empty() => Value::from(""),
        other => other.clone(),
    };
    let users: Vec<Value> = dump
        .records("users")
        .into_iter()
        .map(|record| {
            Value::Object(
                record
                    .iter()
                    .filter(|(key, _)| match &attributes {
                        Some(requested) => {
                            requested.iter().any(|a| a.eq_ignore_ascii_case(key))
                        }
                        None => true,
                    })
                    .map(|(key, value)| (key.clone(), flatten(value)))
                    .collect(),
            )
        })
        .collect();

    let output = cli.output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "{}_{}_User_Dump.json",
            generate_timestamp(),
            cli.domain_controller
        ))
    });
    std::fs::write(&output, serde_json::to_string_pretty(&users)?)?;
    log::info!("Wrote output to {}", output.display());
    Ok(())
}
