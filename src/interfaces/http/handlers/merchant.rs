use crate::domain::money::Price;
use crate::domain::order::{OrderId, OrderStatus};
use crate::domain::product::{ProductDraft, ProductId};
use crate::error::ShopError;
use crate::interfaces::http::AppState;
use crate::interfaces::http::auth::CurrentUser;
use crate::interfaces::http::session::Session;
use crate::interfaces::http::views::{NoContent, Page, ProductsView, SalesView};
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

const PRODUCTS_PAGE: &str = "/lojista/cupcakes";
const SALES_PAGE: &str = "/lojista/vendas";

/// Product form fields as posted by the back office.
#[derive(Debug, Default)]
struct ProductForm {
    name: String,
    description: String,
    price: String,
    available: bool,
    image: Option<(String, Vec<u8>)>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

fn malformed_form(e: impl std::fmt::Display) -> ShopError {
    warn!(error = %e, "malformed product form");
    ShopError::ValidationError("Erro ao processar o formulário.".to_string())
}

async fn read_product_form(mut multipart: Multipart) -> Result<ProductForm, ShopError> {
    let mut form = ProductForm::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "nome" => form.name = field.text().await.map_err(malformed_form)?,
            "descricao" => form.description = field.text().await.map_err(malformed_form)?,
            "preco" => form.price = field.text().await.map_err(malformed_form)?,
            "disponivel" => form.available = field.text().await.map_err(malformed_form)? == "true",
            "imagem" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed_form)?;
                // Browsers send an empty part when no file was chosen.
                if !bytes.is_empty() {
                    form.image = Some((filename, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

impl ProductForm {
    /// Validates the fields and stores the uploaded image, if any.
    async fn into_draft(self, state: &AppState) -> Result<ProductDraft, ShopError> {
        let price = Price::parse(&self.price)?;
        let image_url = match self.image {
            Some((filename, bytes)) => Some(state.images.save(&filename, &bytes).await?),
            None => None,
        };
        Ok(ProductDraft {
            name: self.name,
            description: self.description,
            price,
            available: self.available,
            image_url,
        })
    }
}

/// Redirects back to a back-office page with the error as a flash.
fn back_with_error(mut session: Session, location: &str, e: ShopError) -> Response {
    if e.status_code().is_server_error() {
        tracing::error!(error = %e, "back office action failed");
    }
    session.error(e.public_message());
    (session, Redirect::to(location)).into_response()
}

fn parse_id<T: std::str::FromStr>(raw: &str) -> Result<T, ShopError> {
    raw.parse()
        .map_err(|_| ShopError::ValidationError("ID inválido.".to_string()))
}

pub async fn dashboard(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
) -> Response {
    let page = Page::new("lojista_dashboard", &mut session, Some(&user), NoContent {});
    (session, Json(page)).into_response()
}

/// Every product, hidden ones included.
pub async fn products(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
) -> Result<Response, ShopError> {
    let products = state.shop.all_products().await?;
    let page = Page::new("lojista_cupcakes", &mut session, Some(&user), ProductsView { products });
    Ok((session, Json(page)).into_response())
}

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    multipart: Multipart,
) -> Response {
    let draft = match read_product_form(multipart).await {
        Ok(form) => form.into_draft(&state).await,
        Err(e) => Err(e),
    };
    let draft = match draft {
        Ok(draft) => draft,
        Err(e) => return back_with_error(session, PRODUCTS_PAGE, e),
    };

    let uploaded = draft.image_url.clone();
    match state.shop.add_product(draft).await {
        Ok(_) => {
            session.success("Cupcake cadastrado com sucesso!");
            (session, Redirect::to(PRODUCTS_PAGE)).into_response()
        }
        Err(e) => {
            if let Some(url) = uploaded {
                state.images.remove(&url).await;
            }
            back_with_error(session, PRODUCTS_PAGE, e)
        }
    }
}

/// Edits a product. A new image replaces the old file on disk.
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    Path(raw_id): Path<String>,
    multipart: Multipart,
) -> Response {
    let id: ProductId = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(e) => return back_with_error(session, PRODUCTS_PAGE, e),
    };
    if let Err(e) = state.shop.product(id).await {
        return back_with_error(session, PRODUCTS_PAGE, e);
    }

    let draft = match read_product_form(multipart).await {
        Ok(form) => form.into_draft(&state).await,
        Err(e) => Err(e),
    };
    let draft = match draft {
        Ok(draft) => draft,
        Err(e) => return back_with_error(session, PRODUCTS_PAGE, e),
    };

    let uploaded = draft.image_url.clone();
    match state.shop.update_product(id, draft).await {
        Ok((_, replaced)) => {
            if let Some(old) = replaced {
                state.images.remove(&old).await;
            }
            session.success("Cupcake atualizado com sucesso!");
            (session, Redirect::to(PRODUCTS_PAGE)).into_response()
        }
        Err(e) => {
            if let Some(url) = uploaded {
                state.images.remove(&url).await;
            }
            back_with_error(session, PRODUCTS_PAGE, e)
        }
    }
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    Path(raw_id): Path<String>,
) -> Response {
    let result = match parse_id::<ProductId>(&raw_id) {
        Ok(id) => state.shop.delete_product(id).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(product) => {
            if product.has_custom_image() {
                state.images.remove(&product.image_url).await;
            }
            session.success("Cupcake excluído com sucesso!");
            (session, Redirect::to(PRODUCTS_PAGE)).into_response()
        }
        Err(e) => back_with_error(session, PRODUCTS_PAGE, e),
    }
}

/// Every order with its customer, newest first.
pub async fn sales(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
) -> Result<Response, ShopError> {
    let sales = state.shop.sales().await?;
    let content = SalesView {
        sales,
        statuses: OrderStatus::ALL.iter().map(OrderStatus::as_str).collect(),
    };
    let page = Page::new("lojista_vendas", &mut session, Some(&user), content);
    Ok((session, Json(page)).into_response())
}

pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    Path(raw_id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let result = async {
        let id: OrderId = parse_id(&raw_id)?;
        let status: OrderStatus = form.status.parse()?;
        state.shop.set_order_status(id, status).await
    }
    .await;

    match result {
        Ok(order) => {
            info!(order_id = order.id, status = %order.status, "order status updated");
            session.success("Status do pedido atualizado.");
            (session, Redirect::to(SALES_PAGE)).into_response()
        }
        Err(e) => back_with_error(session, SALES_PAGE, e),
    }
}
