//! Dirauth - LDAP login from the command line
//!
//! Runs the same login sequence a host application would, against the
//! directory server described in the configuration.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dirauth_auth::{
    LdapAuthPlugin, LdapConfig, LoginContext, LoginForm, SessionOutcome, StaticUserStore,
};
use dirauth_core::config::{DirauthConfig, LoggingConfig};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirauth")]
#[command(author = "Dirauth Team")]
#[command(version = dirauth_core::VERSION)]
#[command(about = "Directory (LDAP) authentication", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DIRAUTH_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate a user against the directory
    Login {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long, env = "DIRAUTH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Validate the configuration and show the settings in effect
    CheckConfig,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging);

    match cli.command {
        Commands::Version => {
            println!("dirauth {}", dirauth_core::VERSION);
            Ok(())
        }
        Commands::CheckConfig => check_config(&config),
        Commands::Login { user, password } => login(config, user, password).await,
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<DirauthConfig> {
    match path {
        Some(path) => {
            let mut config = DirauthConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path))?;
            config.apply_env();
            Ok(config)
        }
        None => Ok(DirauthConfig::from_env()),
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn ldap_config(config: &DirauthConfig) -> anyhow::Result<LdapConfig> {
    let ldap = LdapConfig::try_from(&config.ldap).context("Invalid [ldap] section")?;
    ldap.validate().context("Invalid LDAP configuration")?;
    Ok(ldap)
}

fn check_config(config: &DirauthConfig) -> anyhow::Result<()> {
    let ldap = ldap_config(config)?;

    println!("LDAP configuration is valid");
    println!("  url = {}", ldap.server_url()?);
    for (key, value) in ldap.relevant_settings() {
        println!("  {} = {}", key, value);
    }
    println!("  known users = {}", config.users.len());

    Ok(())
}

async fn login(
    config: DirauthConfig,
    user: String,
    password: Option<String>,
) -> anyhow::Result<()> {
    let ldap = ldap_config(&config)?;
    let users = StaticUserStore::new(config.users);

    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let plugin = LdapAuthPlugin::new(ldap);

    let mut ctx = LoginContext::new();
    plugin.before_login(&mut ctx);
    debug!("Default login method: {:?}", ctx.default_method());

    let form = LoginForm::post([("user", user), ("password", password)]);
    let creds = match plugin.after_login_form_submit(&form) {
        Some(creds) => creds,
        None => bail!("Login form was not submitted"),
    };

    info!("Authenticating {} via {}", creds.username, plugin.name());

    match plugin.new_user_session(&creds, &users).await {
        SessionOutcome::Authenticated(user) => {
            match user.display_name.as_deref() {
                Some(name) => println!("Authenticated {} ({})", user.username, name),
                None => println!("Authenticated {}", user.username),
            }
            Ok(())
        }
        SessionOutcome::Rejected { code, message } => match message {
            Some(message) => bail!("Authentication failed: {} ({})", code, message),
            None => bail!("Authentication failed: {}", code),
        },
    }
}

fn read_password() -> anyhow::Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(trim_line(&line).to_string())
}

fn trim_line(line: &str) -> &str {
    line.trim_end_matches(&['\r', '\n'][..])
}
