mod appointments;
mod cache;
mod config;
mod error;
mod logging;
mod schedule;
mod server;
mod settings;
mod shop;
mod shortcode;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::cache::{AppointmentCache, SqliteStorage};
use crate::config::Config;
use crate::settings::{DisplayMode, SettingsInput, SettingsStore};

#[derive(Parser, Debug)]
#[command(name = "appointment-updater")]
#[command(about = "Shows upcoming training appointments from a WooCommerce shop")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/appointment-updater/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Serve the appointments and the admin endpoints over HTTP
  Serve {
    /// Address to listen on (overrides server.listen)
    #[arg(short, long)]
    listen: Option<String>,
  },
  /// Print the rendered appointments once
  Render,
  /// Delete cached appointments so the next render fetches them again
  ClearCache,
  /// Update the shop settings
  Configure {
    #[arg(long)]
    consumer_key: Option<String>,
    #[arg(long)]
    consumer_secret: Option<String>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long, value_enum)]
    display_mode: Option<DisplayMode>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(config.log_dir.as_deref())?;

  let settings = Arc::new(SettingsStore::open(&config.settings_path()?)?);

  match args.command {
    Command::Serve { listen } => {
      let cache = Arc::new(open_cache(&config, Arc::clone(&settings))?);
      let admin_token: Option<Arc<str>> = match Config::get_admin_token() {
        Ok(token) => Some(Arc::from(token)),
        Err(e) => {
          warn!("{}; admin routes are disabled", e);
          None
        }
      };
      tokio::spawn(Arc::clone(&cache).watch_settings(settings.subscribe()));

      let listen = listen.unwrap_or_else(|| config.server.listen.clone());
      server::serve(server::AppState { cache, admin_token }, &listen).await?;
    }
    Command::Render => {
      let cache = open_cache(&config, Arc::clone(&settings))?;
      let appointments = cache.get_appointments().await?;
      println!("{}", shortcode::render(&appointments, settings.display_mode()));
    }
    Command::ClearCache => {
      open_cache(&config, settings)?.clear()?;
      println!("Appointment cache cleared.");
    }
    Command::Configure {
      consumer_key,
      consumer_secret,
      base_url,
      display_mode,
    } => {
      let change = settings.set(&SettingsInput {
        consumer_key,
        consumer_secret,
        base_url,
        appointments_dropdown: display_mode,
      })?;
      // No background refresh outlives this process, so clear right away.
      if change.connection_changed() {
        open_cache(&config, settings)?.clear()?;
      }
      println!("{}", serde_yaml::to_string(&change.new.masked())?);
    }
  }

  Ok(())
}

fn open_cache(
  config: &Config,
  settings: Arc<SettingsStore>,
) -> Result<AppointmentCache<SqliteStorage>> {
  let storage = SqliteStorage::open(&config.cache_path()?)?;
  AppointmentCache::new(storage, settings, config.cache_options())
}
