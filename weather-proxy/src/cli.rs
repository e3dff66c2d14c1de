use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use weather_proxy_core::{
    Config, RedisConfig, WeatherParams, WeatherService, cache_from_config, provider_from_config,
};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-proxy", version, about = "Caching proxy for the Visual Crossing weather API")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP proxy.
    Serve {
        /// Listen address, overriding config and WEATHER_PROXY_LISTEN.
        #[arg(long)]
        listen: Option<String>,
    },

    /// Fetch weather once through the cache and print the JSON payload.
    Get(LocationArgs),

    /// Interactively set the API key and cache connection.
    Configure,
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    #[arg(long)]
    pub city: Option<String>,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<String>,

    /// "metric" (default) or "us".
    #[arg(long)]
    pub unit: Option<String>,
}

impl From<LocationArgs> for WeatherParams {
    fn from(args: LocationArgs) -> Self {
        WeatherParams {
            city: args.city,
            country: args.country,
            latitude: args.latitude,
            longitude: args.longitude,
            unit: args.unit,
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Serve { listen } => {
                let mut config = Config::load_from(&path)?;
                if let Some(addr) = listen {
                    config.server.listen_addr = addr;
                }

                let service = build_service(&config).await?;
                server::serve(&config.server.listen_addr, service).await?;
            }
            Command::Get(args) => {
                let config = Config::load_from(&path)?;
                let service = build_service(&config).await?;

                let payload = service.handle(&args.into()).await?;
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
            Command::Configure => {
                configure(&path)?;
            }
        }

        Ok(())
    }
}

async fn build_service(config: &Config) -> anyhow::Result<WeatherService> {
    let cache = cache_from_config(config)
        .await
        .context("Invalid cache configuration")?;
    let provider = provider_from_config(config)?;

    Ok(WeatherService::new(cache, provider))
}

fn configure(path: &std::path::Path) -> anyhow::Result<()> {
    let mut config = Config::load_file(path)?;

    let api_key = inquire::Password::new("Visual Crossing API key:")
        .without_confirmation()
        .prompt()?;
    if !api_key.trim().is_empty() {
        config.upstream.api_key = Some(api_key.trim().to_string());
    }

    let current_host = config
        .redis
        .as_ref()
        .map(|r| r.host.clone())
        .unwrap_or_default();
    let host = inquire::Text::new("Redis host (empty for in-process cache):")
        .with_default(&current_host)
        .prompt()?;

    if host.trim().is_empty() {
        config.redis = None;
    } else {
        let port = inquire::CustomType::<u16>::new("Redis port:")
            .with_default(config.redis.as_ref().map_or(6379, |r| r.port))
            .prompt()?;
        let password = inquire::Password::new("Redis password (empty for none):")
            .without_confirmation()
            .prompt()?;

        config.redis = Some(RedisConfig {
            host: host.trim().to_string(),
            port,
            password: Some(password).filter(|p| !p.is_empty()),
        });
    }

    config.save_to(path)?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}
