use clap::{Parser, Subcommand};
use cms_core::{
    has_permission, ApiClient, ApiError, Capability, ClientConfig, ConfigError, CredentialError,
    CredentialStore, Credentials, FileCredentialStore, Guard, GuardBehavior, GuardOutcome,
    Guardable, PermissionSet, RevocationChannel, SessionContext,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Credentials file used when the configuration names none.
const DEFAULT_CREDENTIALS_PATH: &str = ".cms/credentials.json";

#[derive(Error, Debug)]
enum CliError {
    #[error("Invalid permission set JSON: {0}")]
    Permissions(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("{0}")]
    Api(#[from] ApiError),
}

#[derive(Debug, Parser)]
#[command(name = "cms-cli", version, about = "CMS dashboard permission tooling")]
struct Cli {
    /// Path to the client configuration file
    #[arg(long, global = true, default_value = "cms.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the capability vocabulary
    Capabilities,
    /// Check a permission set against required capabilities (any of)
    Check {
        /// Permission set as JSON, e.g. '{"users_view": true}'; 'null' for none
        #[arg(long)]
        permissions: String,
        /// Required capability; repeat for "any of"
        #[arg(long = "require", required = true)]
        require: Vec<Capability>,
    },
    /// Preview how a guard presents an element
    Guard {
        #[arg(long)]
        permissions: String,
        #[arg(long = "require", required = true)]
        require: Vec<Capability>,
        /// hide, disable or lock
        #[arg(long, default_value = "hide")]
        behavior: GuardBehavior,
        /// Label of the guarded element
        #[arg(long, default_value = "element")]
        label: String,
        /// Label shown instead when hidden
        #[arg(long)]
        fallback: Option<String>,
        /// The element cannot be rendered disabled
        #[arg(long)]
        no_disabled_state: bool,
    },
    /// Store an API token
    Login {
        #[arg(long)]
        token: String,
    },
    /// Clear the stored API token
    Logout,
    /// Fetch the current profile from the backend
    Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliElement {
    label: String,
    disabled_state: bool,
}

impl Guardable for CliElement {
    fn supports_disabled(&self) -> bool {
        self.disabled_state
    }
}

fn parse_permissions(json: &str) -> Result<Option<PermissionSet>, CliError> {
    Ok(serde_json::from_str(json)?)
}

fn credential_store(config: &ClientConfig) -> FileCredentialStore {
    let path = config
        .credentials_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH));
    FileCredentialStore::new(path)
}

fn describe_outcome(outcome: &GuardOutcome<CliElement>) -> String {
    match outcome {
        GuardOutcome::Render(element) => format!("render: {}", element.label),
        GuardOutcome::Fallback(Some(fallback)) => format!("fallback: {}", fallback.label),
        GuardOutcome::Fallback(None) => "hidden".to_string(),
        GuardOutcome::Disabled { element, title } => {
            format!("disabled: {} (title: {})", element.label, title)
        }
        GuardOutcome::Locked { element, title } => {
            format!("locked: {} (title: {})", element.label, title)
        }
    }
}

/// Runs a command. `Ok(false)` means "denied" and maps to exit status 1.
async fn run(cli: Cli) -> Result<bool, CliError> {
    match cli.command {
        Commands::Capabilities => {
            for capability in Capability::ALL {
                println!("{}", capability);
            }
            Ok(true)
        }
        Commands::Check {
            permissions,
            require,
        } => {
            let set = parse_permissions(&permissions)?;
            let allowed = has_permission(set.as_ref(), require);
            println!("{}", if allowed { "allowed" } else { "denied" });
            Ok(allowed)
        }
        Commands::Guard {
            permissions,
            require,
            behavior,
            label,
            fallback,
            no_disabled_state,
        } => {
            let set = parse_permissions(&permissions)?;
            let disabled_state = !no_disabled_state;
            let mut guard = Guard::new(require).behavior(behavior);
            if let Some(fallback) = fallback {
                guard = guard.fallback(CliElement {
                    label: fallback,
                    disabled_state,
                });
            }
            let outcome = guard.evaluate(
                CliElement {
                    label,
                    disabled_state,
                },
                set.as_ref(),
            );
            println!("{}", describe_outcome(&outcome));
            Ok(outcome.is_rendered())
        }
        Commands::Login { token } => {
            let config = ClientConfig::load_or_default(&cli.config)?;
            let store = credential_store(&config);
            store.save(&Credentials::new(token))?;
            info!("Stored credentials at {}", store.path().display());
            println!("Logged in.");
            Ok(true)
        }
        Commands::Logout => {
            let config = ClientConfig::load_or_default(&cli.config)?;
            credential_store(&config).clear()?;
            println!("Logged out.");
            Ok(true)
        }
        Commands::Profile => {
            let config = ClientConfig::load_or_default(&cli.config)?;
            let store: Arc<dyn CredentialStore> = Arc::new(credential_store(&config));
            let client = ApiClient::new(config, store.clone(), RevocationChannel::default())?;
            let session = SessionContext::new(store);

            match session.ensure_loaded(&client).await {
                Ok(current) => {
                    println!("Role: {}", current.role_name.as_deref().unwrap_or("(none)"));
                    let granted = current
                        .permissions
                        .as_ref()
                        .map(|p| p.granted())
                        .unwrap_or_default();
                    if current.permissions.as_ref().is_some_and(|p| p.is_wildcard()) {
                        println!("Permissions: all");
                    } else if granted.is_empty() {
                        println!("Permissions: none");
                    } else {
                        println!("Permissions:");
                        for capability in granted {
                            println!("  {}", capability);
                        }
                    }
                    Ok(true)
                }
                Err(ApiError::Revoked(message)) => {
                    eprintln!("{}: stored credentials cleared, log in again.", message);
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}
