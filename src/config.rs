//! Command line and environment configuration.

use crate::infrastructure::mercadopago::DEFAULT_API_URL;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about = "Meu Cupcake storefront", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the storefront HTTP server.
    Serve(ServeArgs),
    /// Load products from a CSV file and print the resulting catalog.
    ImportProducts(ImportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Key that signs session cookies.
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: String,

    /// Mark session cookies `Secure`; enable behind HTTPS.
    #[arg(long, env = "SECURE_COOKIES", default_value_t = false)]
    pub secure_cookies: bool,

    #[arg(long, env = "MP_ACCESS_TOKEN", hide_env_values = true)]
    pub mp_access_token: String,

    /// Public key handed to the checkout page for card tokenization.
    #[arg(long, env = "MP_PUBLIC_KEY")]
    pub mp_public_key: Option<String>,

    #[arg(long, env = "MP_API_URL", default_value = DEFAULT_API_URL)]
    pub mp_api_url: String,

    /// URL Mercado Pago should notify about payment changes.
    #[arg(long, env = "MP_NOTIFICATION_URL")]
    pub mp_notification_url: Option<String>,

    /// When set, webhook notifications must carry a valid `x-signature`.
    #[arg(long, env = "MP_WEBHOOK_SECRET", hide_env_values = true)]
    pub mp_webhook_secret: Option<String>,

    /// RocksDB directory. Data is kept in memory when absent.
    #[arg(long, env = "DATABASE_PATH")]
    pub database_path: Option<PathBuf>,

    #[arg(long, env = "UPLOADS_DIR", default_value = "uploads")]
    pub uploads_dir: PathBuf,

    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    #[arg(long, env = "MERCHANT_EMAIL", default_value = "lojista@meucupcake.com")]
    pub merchant_email: String,

    #[arg(
        long,
        env = "MERCHANT_PASSWORD",
        default_value = "senhaforte123",
        hide_env_values = true
    )]
    pub merchant_password: String,
}

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    /// CSV with `name,description,price,available,image_url` columns.
    #[arg(long)]
    pub input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
