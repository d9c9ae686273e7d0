use clap::Parser;
use meu_cupcake::application::Storefront;
use meu_cupcake::config::{Cli, Command, ImportArgs, ServeArgs};
use meu_cupcake::domain::ports::{OrderStoreBox, PaymentGatewayBox, ProductStoreBox, UserStoreBox};
use meu_cupcake::infrastructure::in_memory::{
    InMemoryOrderStore, InMemoryProductStore, InMemoryUserStore,
};
use meu_cupcake::infrastructure::mercadopago::MercadoPagoGateway;
use meu_cupcake::infrastructure::uploads::ImageStore;
use meu_cupcake::interfaces::csv::product_reader::ProductReader;
use meu_cupcake::interfaces::csv::product_writer::ProductWriter;
use meu_cupcake::interfaces::http::session::SessionConfig;
use meu_cupcake::interfaces::http::{AppState, build_router};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MERCHANT_NAME: &str = "Lojista";

type Stores = (ProductStoreBox, UserStoreBox, OrderStoreBox);

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    use meu_cupcake::infrastructure::rocksdb::RocksDBStore;

    let Some(db_path) = db_path else {
        return Ok(in_memory_stores());
    };
    info!(path = %db_path.display(), "opening RocksDB store");
    let store = RocksDBStore::open(db_path).into_diagnostic()?;
    Ok((
        Box::new(store.clone()),
        Box::new(store.clone()),
        Box::new(store),
    ))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    if db_path.is_some() {
        miette::bail!("a database path was given but this build lacks the `storage-rocksdb` feature");
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> Stores {
    warn!("using in-memory storage; data is lost on exit");
    (
        Box::new(InMemoryProductStore::new()),
        Box::new(InMemoryUserStore::new()),
        Box::new(InMemoryOrderStore::new()),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve(args) => serve(args).await,
        Command::ImportProducts(args) => import_products(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let (products, users, orders) = open_stores(args.database_path.clone())?;
    let gateway: PaymentGatewayBox = Box::new(
        MercadoPagoGateway::new(&args.mp_api_url, &args.mp_access_token).into_diagnostic()?,
    );
    let shop = Storefront::new(products, users, orders, gateway)
        .with_notification_url(args.mp_notification_url.clone());

    shop.seed_merchant(MERCHANT_NAME, &args.merchant_email, &args.merchant_password)
        .await
        .into_diagnostic()?;

    tokio::fs::create_dir_all(&args.uploads_dir)
        .await
        .into_diagnostic()?;
    if args.mp_public_key.is_none() {
        warn!("MP_PUBLIC_KEY not set; the checkout page cannot tokenize cards");
    }

    let state = Arc::new(AppState {
        shop,
        images: ImageStore::new(&args.uploads_dir),
        sessions: SessionConfig::new(&args.session_secret, args.secure_cookies),
        public_key: args.mp_public_key,
        webhook_secret: args.mp_webhook_secret,
        static_dir: args.static_dir,
    });
    let app = build_router(state);

    let address = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&address).await.into_diagnostic()?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    info!("Server shut down");
    Ok(())
}

/// Loads a CSV catalog into the store and prints what the store now holds.
async fn import_products(args: ImportArgs) -> Result<()> {
    let (products, _, _) = open_stores(args.db_path)?;

    let file = File::open(&args.input).into_diagnostic()?;
    let reader = ProductReader::new(file);
    let mut imported = 0usize;
    for (line, draft) in reader.products().enumerate() {
        match draft {
            Ok(draft) => {
                if let Err(e) = products.insert(draft).await {
                    warn!(row = line + 1, error = %e, "could not store product");
                } else {
                    imported += 1;
                }
            }
            Err(e) => warn!(row = line + 1, error = %e, "skipping malformed product row"),
        }
    }
    info!(imported, "catalog import finished");

    let catalog = products.list(false).await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ProductWriter::new(stdout.lock());
    writer.write_products(&catalog).into_diagnostic()?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
