//! HTTP interface: routing, sessions and request handlers.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod session;
pub mod views;

use crate::application::Storefront;
use crate::infrastructure::uploads::ImageStore;
use auth::{require_merchant, require_user};
use axum::Router;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::middleware;
use axum::routing::{get, post};
use handlers::{auth as account, cart, customer, home, merchant, profile, webhook};
use session::SessionConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Largest accepted request body, product images included.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub struct AppState {
    pub shop: Storefront,
    pub images: ImageStore,
    pub sessions: SessionConfig,
    /// Mercado Pago public key handed to the checkout page.
    pub public_key: Option<String>,
    /// Secret used to verify webhook signatures; unsigned notifications are
    /// accepted when absent.
    pub webhook_secret: Option<String>,
    pub static_dir: PathBuf,
}

impl FromRef<Arc<AppState>> for SessionConfig {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.sessions.clone()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let customer_routes = Router::new()
        .route("/perfil", get(profile::show))
        .route("/perfil/editar", get(profile::edit_form).post(profile::update))
        .route("/cliente/dashboard", get(customer::dashboard))
        .route("/cliente/checkout", get(customer::checkout))
        .route("/cliente/pedidos", get(customer::orders))
        .route("/cliente/pedido/pagamento/{id}", get(customer::pix_payment))
        .route("/cliente/processar-pagamento", post(customer::pay_with_card))
        .route("/cliente/processar-pagamento-pix", post(customer::pay_with_pix))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let merchant_routes = Router::new()
        .route("/lojista/dashboard", get(merchant::dashboard))
        .route("/lojista/cupcakes", get(merchant::products))
        .route("/lojista/cupcakes/novo", post(merchant::create_product))
        .route("/lojista/cupcakes/editar/{id}", post(merchant::update_product))
        .route("/lojista/cupcakes/excluir/{id}", get(merchant::delete_product))
        .route("/lojista/vendas", get(merchant::sales))
        .route("/lojista/vendas/status/{id}", post(merchant::update_order_status))
        .route_layer(middleware::from_fn(require_merchant))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    Router::new()
        .route("/", get(home::index))
        .route("/vitrine", get(home::showcase))
        .route("/pagamento/sucesso", get(home::payment_success))
        .route("/carrinho", get(cart::show))
        .route("/carrinho/adicionar/{id}", post(cart::add))
        .route("/carrinho/remover/{id}", post(cart::remove))
        .route("/carrinho/diminuir/{id}", post(cart::decrease))
        .route("/carrinho/limpar", post(cart::clear))
        .route("/cadastro", get(account::register_form).post(account::register))
        .route("/login", get(account::login_form).post(account::login))
        .route("/logout", get(account::logout))
        .route("/webhooks/mercadopago", post(webhook::mercadopago))
        .merge(customer_routes)
        .merge(merchant_routes)
        .nest_service("/uploads", ServeDir::new(state.images.dir()))
        .nest_service("/static", ServeDir::new(&state.static_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
