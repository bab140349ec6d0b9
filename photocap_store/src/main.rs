//! PhotoCap - CLI
//!
//! Command-line front end for accounts, profiles and uploads.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use photocap_auth::ThrottleState;
use photocap_store::api::{ApiConfig, PhotoCapApi};
use photocap_store::MediaType;

#[derive(Parser)]
#[command(name = "photocap")]
#[command(version = photocap_store::VERSION)]
#[command(about = "PhotoCap - local accounts and capture storage")]
struct Cli {
    /// Data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account, or reset its PIN
    Register {
        mobile: String,
        #[arg(short, long)]
        pin: String,
        /// Display name stored in the profile
        #[arg(short, long, default_value = "")]
        name: String,
    },

    /// Sign in
    Login {
        mobile: String,
        #[arg(short, long)]
        pin: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List registered users
    Users,

    /// Switch the session to another user (no PIN)
    Switch { mobile: String },

    /// Change a PIN
    ChangePin {
        mobile: String,
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },

    /// Archive a user to trash, or delete it with --purge
    DeleteUser {
        mobile: String,
        #[arg(long)]
        purge: bool,
    },

    /// Show or edit the active profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Store a file for the active user
    Upload {
        path: PathBuf,
        #[arg(short = 'm', long, default_value = "")]
        description: String,
        /// Day key YYYYMMDD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List the active user's uploads
    Uploads,

    /// Remove old capture temp files from a directory
    Prune {
        dir: PathBuf,
        #[arg(short, long)]
        keep: Option<usize>,
    },

    /// Disk usage of the active user
    Usage,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the profile as JSON
    Show,
    /// Fill blank fields from the old single-user profile.json
    ImportLegacy,
    /// Set fields, e.g. `name=Asha email=asha@example.com`
    Set {
        #[arg(required = true)]
        fields: Vec<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ApiConfig> {
    let mut config = match &cli.config {
        Some(path) => ApiConfig::load_or_default(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ApiConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.credentials.base_dir = dir.clone();
    }
    Ok(config)
}

fn parse_fields(pairs: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut fields = Map::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("expected key=value, got '{}'", pair);
        };
        fields.insert(key.trim().to_string(), Value::from(value));
    }
    Ok(fields)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let api = PhotoCapApi::open(config).context("opening data directory")?;
    let auth = api.credentials();

    match cli.command {
        Commands::Register { mobile, pin, name } => {
            let identity = api.register_account(&mobile, &pin, &name)?;
            println!("✅ Registered {}", identity.mobile);
        }

        Commands::Login { mobile, pin } => {
            let identity = api.sign_in(&mobile, &pin)?;
            println!("🔓 Signed in as {}", identity.mobile);
        }

        Commands::Logout => {
            api.sign_out()?;
            println!("🔒 Signed out");
        }

        Commands::Whoami => match api.active_mobile() {
            Some(mobile) => println!("{}", mobile),
            None => println!("Not signed in"),
        },

        Commands::Users => {
            let users = auth.list_users();
            if users.is_empty() {
                println!("📭 No users");
            }
            for mobile in users {
                let note = match auth.throttle_state(mobile.as_str()) {
                    Ok(ThrottleState::Throttled { retry_after_secs }) => {
                        format!(" (locked {}s)", retry_after_secs)
                    }
                    _ => String::new(),
                };
                println!("{}{}", mobile, note);
            }
        }

        Commands::Switch { mobile } => {
            let identity = auth.set_current_user(&mobile)?;
            println!("Switched to {}", identity.mobile);
        }

        Commands::ChangePin { mobile, old, new } => {
            auth.change_pin(&mobile, &old, &new)?;
            println!("✅ PIN changed");
        }

        Commands::DeleteUser { mobile, purge } => {
            if api.delete_account(&mobile, !purge)? {
                println!("🗑️ {} {}", mobile, if purge { "deleted" } else { "archived" });
            } else {
                println!("No such user: {}", mobile);
            }
        }

        Commands::Profile { action } => {
            let profile = match action {
                ProfileAction::Show => api.active_profile()?,
                ProfileAction::ImportLegacy => {
                    if !api.import_legacy_profile()? {
                        println!("Nothing to import");
                    }
                    api.active_profile()?
                }
                ProfileAction::Set { fields } => api.update_active_profile(parse_fields(&fields)?)?,
            };
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }

        Commands::Upload {
            path,
            description,
            date,
        } => {
            let record = api.capture_upload(&path, &description, date.as_deref())?;
            println!("📥 Stored {} ({})", record.filename, record.media_type);
        }

        Commands::Uploads => {
            let uploads = api.upload_details()?;
            if uploads.is_empty() {
                println!("📭 No uploads");
            } else {
                println!("📷 Uploads ({}):", uploads.len());
                println!("{:-<60}", "");
                for (record, sidecar) in uploads {
                    let description = sidecar.map(|s| s.description).unwrap_or_default();
                    println!(
                        "{} {:<32} {}  {}",
                        if record.media_type == MediaType::Video { "🎬" } else { "🖼️" },
                        record.filename,
                        record.created_at.format("%Y-%m-%d %H:%M"),
                        description
                    );
                }
            }
        }

        Commands::Prune { dir, keep } => {
            let removed = api.prune_capture_temp(&dir, keep);
            println!("🧹 Removed {} temp file(s)", removed);
        }

        Commands::Usage => {
            let usage = api.active_storage_usage()?;
            println!("Files: {}", usage.files);
            println!("Size:  {:.1} MB", usage.bytes as f64 / 1024.0 / 1024.0);
        }
    }

    Ok(())
}
