//! REST API for the packaging optimizer.
//!
//! Exposes the optimizer over HTTP with Axum. Field names on the wire follow
//! the established client contract (`pedidos`, `produtos`, `caixas`, ...).

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::config::ApiConfig;
use crate::model::{Identifier, Order, Product, ValidationError};
use crate::orchestrator::Optimizer;
use crate::result::{PackedBox, PackingResult};
use crate::types::Dimensions;

#[derive(Clone)]
struct ApiState {
    optimizer: Arc<Optimizer>,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>packaging-optimizer API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Edge lengths of a product as sent by the client.
#[derive(Deserialize, Clone, ToSchema)]
pub struct DimensionsRequest {
    #[serde(rename = "altura")]
    pub height: f64,
    #[serde(rename = "largura")]
    pub width: f64,
    #[serde(rename = "comprimento")]
    pub length: f64,
}

#[derive(Deserialize, Clone, ToSchema)]
pub struct ProductRequest {
    #[serde(rename = "produto_id")]
    #[schema(value_type = String, example = "PROD001")]
    pub id: Identifier,
    #[serde(rename = "dimensoes")]
    pub dimensions: DimensionsRequest,
}

#[derive(Deserialize, Clone, ToSchema)]
pub struct OrderRequest {
    #[serde(rename = "pedido_id")]
    #[schema(value_type = String, example = "12345")]
    pub id: Identifier,
    #[serde(rename = "produtos")]
    pub products: Vec<ProductRequest>,
}

/// Request body of `POST /packaging/optimize`.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(
    example = json!({
        "pedidos": [
            {
                "pedido_id": 12345,
                "produtos": [
                    { "produto_id": "PROD001", "dimensoes": { "altura": 5, "largura": 10, "comprimento": 3 } },
                    { "produto_id": "PROD002", "dimensoes": { "altura": 8, "largura": 4, "comprimento": 2 } }
                ]
            }
        ]
    })
)]
pub struct OptimizeRequest {
    #[serde(rename = "pedidos")]
    pub orders: Vec<OrderRequest>,
}

#[derive(Debug, Error, PartialEq)]
enum RequestValidationError {
    #[error("pedidos[{order}].pedido_id must not be empty")]
    BlankOrderId { order: usize },
    #[error("pedidos[{order}].produtos[{product}].produto_id must not be empty")]
    BlankProductId { order: usize, product: usize },
    #[error("pedidos[{order}].produtos[{product}].dimensoes: {source}")]
    InvalidDimensions {
        order: usize,
        product: usize,
        source: ValidationError,
    },
}

impl OptimizeRequest {
    fn into_validated(self) -> Result<Vec<Order>, RequestValidationError> {
        self.orders
            .into_iter()
            .enumerate()
            .map(|(order_idx, order)| order.into_order(order_idx))
            .collect()
    }

    fn product_count(&self) -> usize {
        self.orders.iter().map(|o| o.products.len()).sum()
    }
}

impl OrderRequest {
    fn into_order(self, order: usize) -> Result<Order, RequestValidationError> {
        if self.id.is_blank() {
            return Err(RequestValidationError::BlankOrderId { order });
        }

        let products = self
            .products
            .into_iter()
            .enumerate()
            .map(|(product, spec)| {
                if spec.id.is_blank() {
                    return Err(RequestValidationError::BlankProductId { order, product });
                }
                let DimensionsRequest {
                    height,
                    width,
                    length,
                } = spec.dimensions;
                let dims = Dimensions::new(height, width, length).map_err(|source| {
                    RequestValidationError::InvalidDimensions {
                        order,
                        product,
                        source,
                    }
                })?;
                Ok(Product::new(spec.id, dims))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Order::new(self.id, products))
    }
}

/// One box of an optimized order.
#[derive(Serialize, Debug, PartialEq, ToSchema)]
pub struct OptimizedBox {
    /// Name of the box, `null` if the product fits no box.
    #[serde(rename = "caixa_id")]
    #[schema(example = "Caixa 1", nullable = true)]
    pub box_id: Option<String>,
    /// Product ids in placement order.
    #[serde(rename = "produtos")]
    pub products: Vec<String>,
    /// Diagnostic note, only present for unassignable products.
    #[serde(rename = "observacao", skip_serializing_if = "Option::is_none")]
    #[schema(example = "Produto não cabe em nenhuma caixa disponível.")]
    pub note: Option<String>,
}

/// Packing result of one order.
#[derive(Serialize, Debug, PartialEq, ToSchema)]
pub struct OptimizedOrder {
    #[serde(rename = "pedido_id")]
    #[schema(example = "12345")]
    pub order_id: String,
    #[serde(rename = "caixas")]
    pub boxes: Vec<OptimizedBox>,
}

impl From<PackedBox> for OptimizedBox {
    fn from(packed: PackedBox) -> Self {
        Self {
            box_id: packed.box_id().map(str::to_string),
            products: packed.product_ids(),
            note: packed.note(),
        }
    }
}

impl From<PackingResult> for OptimizedOrder {
    fn from(result: PackingResult) -> Self {
        Self {
            order_id: result.order_id,
            boxes: result.boxes.into_iter().map(OptimizedBox::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: &'static str,
    boxes: usize,
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn parse_optimize_request(
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<Vec<Order>, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Invalid JSON data",
                err.body_text(),
            ));
        }
    };

    payload.into_validated().map_err(|err| {
        error_response(StatusCode::BAD_REQUEST, "Invalid input data", err.to_string())
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_optimize, handle_health),
    components(
        schemas(
            OptimizeRequest,
            OrderRequest,
            ProductRequest,
            DimensionsRequest,
            OptimizedOrder,
            OptimizedBox,
            ErrorResponse,
            HealthResponse
        )
    ),
    tags((name = "packaging", description = "Box optimization for orders"))
)]
struct ApiDoc;

/// Errors that stop the API server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not bind API server to {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("API server terminated with an error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Builds the application router.
pub fn router(optimizer: Optimizer) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState {
        optimizer: Arc::new(optimizer),
    };

    Router::new()
        .route("/packaging/optimize", post(handle_optimize))
        .route("/health", get(handle_health))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(config: ApiConfig, optimizer: Optimizer) -> Result<(), ServerError> {
    let app = router(optimizer);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API endpoint: POST /packaging/optimize");
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Handler for POST /packaging/optimize.
///
/// Packs the products of every order into the fewest boxes the heuristic finds.
#[utoipa::path(
    post,
    path = "/packaging/optimize",
    request_body = OptimizeRequest,
    responses(
        (status = 200, description = "Orders optimized", body = [OptimizedOrder]),
        (status = BAD_REQUEST, description = "Invalid input data", body = ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Optimization failed", body = ErrorResponse)
    ),
    tag = "packaging"
)]
async fn handle_optimize(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let product_count = match &payload {
        Ok(Json(request)) => request.product_count(),
        Err(_) => 0,
    };
    let orders = match parse_optimize_request(payload) {
        Ok(orders) => orders,
        Err(response) => return response,
    };

    let order_count = orders.len();
    info!(
        orders = order_count,
        products = product_count,
        "📥 New optimize request"
    );

    let optimizer = Arc::clone(&state.optimizer);
    let results = match tokio::task::spawn_blocking(move || optimizer.optimize(orders)).await {
        Ok(results) => results,
        Err(err) => {
            error!("❌ Optimization task failed: {err}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Optimization failed",
                err.to_string(),
            );
        }
    };

    let box_count: usize = results.iter().map(PackingResult::box_count).sum();
    let unassignable: usize = results.iter().map(PackingResult::unassignable_count).sum();
    info!(
        orders = order_count,
        boxes = box_count,
        unassignable,
        "📦 Optimization finished"
    );

    let body: Vec<OptimizedOrder> = results.into_iter().map(OptimizedOrder::from).collect();
    (StatusCode::OK, Json(body)).into_response()
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "packaging"
)]
async fn handle_health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        boxes: state.optimizer.catalog().len(),
    })
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
