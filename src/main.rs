use anyhow::{anyhow, Context, Result};
use clap::{Arg, Command};
use ldap_login::auth::ldap::LdapClient;
use ldap_login::{Config, CredentialVerifier, LoginServer};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("ldap-login")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Verifies username/password pairs against an LDAP directory over HTTP")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.yml"),
        )
        .arg(
            Arg::new("env-file")
                .short('e')
                .long("env-file")
                .value_name("FILE")
                .help("Environment override file")
                .default_value(".env"),
        )
        .arg(
            Arg::new("generate-config")
                .short('g')
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .conflicts_with("config"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .num_args(0)
                .help("Enable verbose logging")
                .action(clap::ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .num_args(0)
                .help("Suppress all output except errors")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .get_matches();

    if let Some(config_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(config_path)?;
        return Ok(());
    }

    // Variables already set in the process environment take precedence.
    let env_file = matches
        .get_one::<String>("env-file")
        .ok_or_else(|| anyhow!("missing --env-file value"))?;
    let env_file_result = dotenvy::from_path(env_file);

    let config_path = matches
        .get_one::<String>("config")
        .ok_or_else(|| anyhow!("missing --config value"))?;

    let (mut config, from_file) = if Path::new(config_path).exists() {
        let config = Config::load_from_file(config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path))?;
        (config, true)
    } else {
        (Config::default(), false)
    };
    config.apply_env()?;

    let _log_guard = setup_logging(&config, &matches)?;

    match env_file_result {
        Ok(()) => info!("Loaded environment overrides from {}", env_file),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Failed to read environment file {}: {}", env_file, e),
    }
    if from_file {
        info!("Loaded configuration from {}", config_path);
    } else {
        info!("Configuration file {} not found, using defaults and environment", config_path);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e);
    }

    info!("Starting LDAP login server");
    info!("Directory: {} (base {})", config.ldap.url, config.ldap.base_dn);

    let config = Arc::new(config);
    let client = LdapClient::from_config(&config.ldap);
    let verifier = CredentialVerifier::new(Arc::new(config.ldap.clone()), client)?;

    let server = LoginServer::new(Arc::clone(&config), Arc::new(verifier));

    if let Err(e) = server.start().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn generate_default_config(path: &str) -> Result<()> {
    let config = Config::default();
    config.save_to_file(path)?;

    println!("Generated default configuration file: {}", path);
    println!("Edit this file or set LDAP_* environment variables to point at your directory.");

    Ok(())
}

/// Pick the log filter: `-q`, then `-v`/`-vv`, then `RUST_LOG`, then the configured level.
fn log_directive(level: &str, quiet: bool, verbose: u8, rust_log: Option<String>) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => rust_log
            .filter(|directive| !directive.trim().is_empty())
            .unwrap_or_else(|| level.to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn setup_logging(config: &Config, matches: &clap::ArgMatches) -> Result<Option<WorkerGuard>> {
    let directive = log_directive(
        &config.logging.level,
        matches.get_flag("quiet"),
        matches.get_count("verbose"),
        std::env::var("RUST_LOG").ok(),
    );
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| anyhow!("Invalid log filter {:?}: {}", directive, e))?;

    let console = config.logging.console.then(|| {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let (file, guard) = match &config.logging.file {
        Some(path) => {
            let path = Path::new(path);
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("Invalid log file path: {}", path.display()))?;
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(guard)
}
