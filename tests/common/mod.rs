#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use meu_cupcake::application::Storefront;
use meu_cupcake::domain::money::Price;
use meu_cupcake::domain::product::{Product, ProductDraft};
use meu_cupcake::infrastructure::in_memory::{
    InMemoryOrderStore, InMemoryPaymentGateway, InMemoryProductStore, InMemoryUserStore,
};
use meu_cupcake::infrastructure::uploads::ImageStore;
use meu_cupcake::interfaces::http::session::{SESSION_COOKIE, SessionConfig};
use meu_cupcake::interfaces::http::{AppState, build_router};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const MERCHANT_EMAIL: &str = "lojista@meucupcake.com";
pub const MERCHANT_PASSWORD: &str = "senhaforte123";
pub const CUSTOMER_PASSWORD: &str = "segredo123";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub gateway: InMemoryPaymentGateway,
    pub uploads: TempDir,
    _static_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_webhook_secret(None).await
    }

    pub async fn with_webhook_secret(secret: Option<&str>) -> Self {
        let gateway = InMemoryPaymentGateway::new();
        let shop = Storefront::new(
            Box::new(InMemoryProductStore::new()),
            Box::new(InMemoryUserStore::new()),
            Box::new(InMemoryOrderStore::new()),
            Box::new(gateway.clone()),
        )
        .with_password_cost(4);
        shop.seed_merchant("Lojista", MERCHANT_EMAIL, MERCHANT_PASSWORD)
            .await
            .unwrap();

        let uploads = TempDir::new().unwrap();
        let static_dir = TempDir::new().unwrap();
        let state = Arc::new(AppState {
            shop,
            images: ImageStore::new(uploads.path()),
            sessions: SessionConfig::new("test-session-secret", false),
            public_key: Some("TEST-public-key".to_string()),
            webhook_secret: secret.map(str::to_string),
            static_dir: static_dir.path().to_path_buf(),
        });

        Self {
            router: build_router(state.clone()),
            state,
            gateway,
            uploads,
            _static_dir: static_dir,
        }
    }

    pub async fn product(&self, name: &str, price: Decimal) -> Product {
        self.state
            .shop
            .add_product(ProductDraft {
                name: name.to_string(),
                description: format!("Cupcake de {name}"),
                price: Price::new(price).unwrap(),
                available: true,
                image_url: None,
            })
            .await
            .unwrap()
    }

    pub fn browser(&self) -> Browser {
        Browser {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// A browser signed in as a freshly registered customer.
    pub async fn customer(&self, email: &str) -> Browser {
        let mut browser = self.browser();
        let response = browser
            .post_form(
                "/cadastro",
                &format!(
                    "nome=Ana&email={email}&senha={CUSTOMER_PASSWORD}&confirmar_senha={CUSTOMER_PASSWORD}"
                ),
            )
            .await;
        assert_eq!(location(&response), "/login");
        browser.login(email, CUSTOMER_PASSWORD).await;
        browser
    }

    pub async fn merchant(&self) -> Browser {
        let mut browser = self.browser();
        browser.login(MERCHANT_EMAIL, MERCHANT_PASSWORD).await;
        browser
    }
}

/// Replays the session cookie across requests.
pub struct Browser {
    router: Router,
    pub cookie: Option<String>,
}

impl Browser {
    pub async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> Response<Body> {
        let builder = match &self.cookie {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        if let Some(set_cookie) = response.headers().get(SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            let value = pair.trim_start_matches(&format!("{SESSION_COOKIE}="));
            self.cookie = (!value.is_empty()).then(|| pair.to_string());
        }
        response
    }

    pub async fn get(&mut self, path: &str) -> Response<Body> {
        self.send(Request::get(path), Body::empty()).await
    }

    pub async fn post(&mut self, path: &str) -> Response<Body> {
        self.send(Request::post(path), Body::empty()).await
    }

    pub async fn post_form(&mut self, path: &str, form: &str) -> Response<Body> {
        let builder = Request::post(path).header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(form.to_string())).await
    }

    pub async fn post_json(&mut self, path: &str, json: &Value) -> Response<Body> {
        let builder = Request::post(path).header(CONTENT_TYPE, "application/json");
        self.send(builder, Body::from(json.to_string())).await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Response<Body> {
        self.post_form("/login", &format!("email={email}&senha={password}"))
            .await
    }

    /// Fetches a page and returns its JSON view model.
    pub async fn page(&mut self, path: &str) -> Value {
        let response = self.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        body_json(response).await
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => raw.parse().unwrap(),
        Value::Number(number) => number.to_string().parse().unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}
