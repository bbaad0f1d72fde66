use std::path::{Path, PathBuf};

use clap::Parser;

use adenum::collector::{Collector, CollectorConfig, Method, QueryConfig};
use adenum::directory::{BindMethod, ConnectionConfig, LdapDirectory};
use adenum::dump::{generate_timestamp, Dump};
use adenum::graph::GraphAssembler;

#[derive(Parser)]
#[command(version, about = "Active Directory LDAP collector", long_about = None)]
struct Cli {
    /// Domain controller to collect from. Use a resolvable domain name
    /// when authenticating with Kerberos.
    #[arg(short, long, conflicts_with = "input_file")]
    domain_controller: Option<String>,

    /// Convert a previously written dump file instead of collecting.
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    /// IP address of the target machine, when the controller name does
    /// not resolve.
    #[arg(long)]
    target_ip: Option<String>,

    /// Force LDAPS.
    #[arg(long)]
    ssl: bool,

    /// Upgrade the plaintext connection with StartTLS.
    #[arg(long)]
    start_tls: bool,

    /// Port to connect to. Determined automatically if not specified.
    #[arg(long)]
    port: Option<u16>,

    /// Comma separated list of collection methods to use.
    #[arg(long)]
    methods: Option<String>,

    /// Seconds to sleep between each paged request and each method.
    #[arg(long, default_value_t = 0)]
    sleep: u64,

    /// Adds a random value of up to this many seconds to each sleep.
    #[arg(long, default_value_t = 0)]
    jitter: u64,

    /// Page size for LDAP requests.
    #[arg(long, default_value_t = 500)]
    page_size: i32,

    /// Run a single custom LDAP filter instead of the normal enumeration.
    #[arg(long)]
    custom_query: Option<String>,

    /// JSON file overriding per-method queries and attribute lists.
    #[arg(long)]
    query_config: Option<PathBuf>,

    /// Comma separated list of attributes to request for all queries.
    #[arg(long, conflicts_with = "all_attributes")]
    attributes: Option<String>,

    /// Request every attribute instead of the per-method sets.
    #[arg(long)]
    all_attributes: bool,

    /// Only perform schema extraction.
    #[arg(long, conflicts_with = "no_schema")]
    only_schema: bool,

    /// Skip schema extraction.
    #[arg(long)]
    no_schema: bool,

    /// Username: DOMAIN\user or user@domain for simple binds.
    #[arg(short, long, conflicts_with = "kerberos")]
    username: Option<String>,

    /// Password; prompted for when a username is given without one.
    #[arg(short, long)]
    password: Option<String>,

    /// Authenticate with Kerberos from the ambient ticket cache.
    #[arg(short, long)]
    kerberos: bool,

    /// Client certificate (PEM) for SASL/EXTERNAL authentication.
    #[arg(long, requires = "client_key")]
    client_cert: Option<PathBuf>,

    /// Client key (PEM) for SASL/EXTERNAL authentication.
    #[arg(long, requires = "client_cert")]
    client_key: Option<PathBuf>,

    /// Output filename. Generated from the timestamp if not provided.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write attack-graph ingest files.
    #[arg(short, long)]
    graph: bool,

    /// Emit Unix epochs instead of rendered timestamps.
    #[arg(long)]
    timestamp: bool,

    /// Exclude raw binary field data from output.
    #[arg(long)]
    exclude_raw: bool,
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
    if let Some(input) = &cli.input_file {
        if !cli.graph {
            return Err("the graph export must be enabled in import mode, use the -g option".into());
        }
        let dump = Dump::load(input)?;
        let timestamp = dump
            .meta()
            .and_then(|m| m.get("end_time"))
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(generate_timestamp);
        let base = output_base(cli.output.as_deref());
        let assembler = GraphAssembler::from_dump(&dump);
        assembler.convert(Path::new("."), &base, &timestamp)?;
        return Ok(());
    }

    let Some(host) = cli.domain_controller.clone() else {
        return Err("either a domain controller (-d) or an input file (-i) is required".into());
    };

    let (bind, meta_username) = bind_method(&cli)?;
    let query_config = cli
        .query_config
        .as_deref()
        .map(QueryConfig::load)
        .transpose()?;

    let methods = match &cli.methods {
        Some(list) => {
            let mut methods = Vec::new();
            for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                match Method::from_name(name) {
                    Some(method) => methods.push(method),
                    None => {
                        let valid: Vec<&str> =
                            Method::all().iter().map(|m| m.name()).collect();
                        return Err(format!(
                            "invalid method {name} requested; valid methods are: {}",
                            valid.join(", ")
                        )
                        .into());
                    }
                }
            }
            methods
        }
        None => Method::all().to_vec(),
    };

    let connection = ConnectionConfig {
        host: host.clone(),
        target_ip: cli.target_ip.clone(),
        port: cli.port,
        ssl: cli.ssl,
        start_tls: cli.start_tls,
        bind,
    };
    let directory = LdapDirectory::connect(&connection)?;

    let config = CollectorConfig {
        methods,
        delay: cli.sleep,
        jitter: cli.jitter,
        page_size: cli.page_size,
        query_config: query_config.clone(),
        all_attributes: cli.all_attributes,
        attributes: cli
            .attributes
            .as_ref()
            .map(|a| a.split(',').map(|s| s.trim().to_string()).collect()),
        timestamp_mode: cli.timestamp,
        raw: !cli.exclude_raw,
        no_schema: cli.no_schema,
        only_schema: cli.only_schema,
    };
    let mut collector = Collector::new(directory, config, meta_username);

    let mut dump = match &cli.custom_query {
        Some(query) => collector.run_custom_query(
            query,
            cli.attributes
                .as_ref()
                .map(|a| a.split(',').map(|s| s.trim().to_string()).collect()),
        )?,
        None => collector.run()?,
    };

    let launch_arguments = std::env::args().collect::<Vec<_>>().join(" ");
    let query_config_value = query_config
        .as_ref()
        .and_then(|c| serde_json::to_value(c).ok());
    dump.annotate_meta(launch_arguments, query_config_value);

    let timestamp = generate_timestamp();
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{timestamp}_{host}_AD_Dump.json")));
    dump.write(&output)?;
    log::info!("Wrote output to {}", output.display());

    if cli.graph {
        let base = output_base(cli.output.as_deref());
        let assembler = GraphAssembler::from_dump(&dump);
        assembler.convert(Path::new("."), &base, &timestamp)?;
    }
    Ok(())
}

fn output_base(output: Option<&Path>) -> String {
    output
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Chooses the bind mode the way the argument surface implies, and the
/// username string recorded in the dump meta.
fn bind_method(cli: &Cli) -> Result<(BindMethod, String), Box<dyn std::error::Error>> {
    if cli.kerberos {
        let ccache = std::env::var("KRB5CCNAME").unwrap_or_default();
        return Ok((BindMethod::Kerberos, format!("Kerberos {ccache}")));
    }
    if let (Some(cert), Some(key)) = (&cli.client_cert, &cli.client_key) {
        return Ok((
            BindMethod::ClientCertificate {
                cert: cert.clone(),
                key: key.clone(),
            },
            format!("Certificate {}", cert.display()),
        ));
    }
    if let Some(username) = &cli.username {
        let password = match &cli.password {
            Some(password) => password.clone(),
            None => rpassword::prompt_password(format!("Please enter the password for {username}: "))?,
        };
        return Ok((
            BindMethod::Simple {
                username: username.clone(),
                password,
            },
            username.clone(),
        ));
    }
    Ok((BindMethod::Anonymous, String::new()))
}
