//! REST API layer: identity extractors, route handlers, DTOs, and router
//! composition.
//!
//! Cart and product endpoints are nested under the configured base path
//! (`/ezelectronics` by default); `/health` stays at the root.

pub mod auth;
pub mod doc;
pub mod dto;
pub mod handlers;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the API router with all REST endpoints.
///
/// An empty `base_path` mounts the resource routes at the root.
pub fn build_router(base_path: &str) -> Router<AppState> {
    let resources = handlers::routes();
    let router = if base_path.is_empty() || base_path == "/" {
        Router::new().merge(resources)
    } else {
        Router::new().nest(base_path, resources)
    };
    router.merge(handlers::system::routes())
}

/// Builds the complete application: routes, Swagger UI when enabled, HTTP
/// tracing and CORS, bound to `state`.
pub fn build_app(state: AppState, base_path: &str) -> Router {
    let router = build_router(base_path);

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", doc::ApiDoc::with_base_path(base_path)),
    );

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use super::auth::{ROLE_HEADER, USER_HEADER};
    use super::*;
    use crate::domain::{Cart, Category, Product};

    const BASE: &str = "/ezelectronics";

    async fn seeded_app() -> Router {
        let state = AppState::in_memory(8);
        for (model, price, quantity) in [("m1", 50.0, 50), ("m2", 600.0, 100), ("m3", 1000.0, 0)] {
            let product = Product {
                model: model.to_string(),
                category: Category::Smartphone,
                selling_price: price,
                quantity,
                details: None,
                arrival_date: None,
            };
            let Ok(()) = state.product_service.register_product(&product).await else {
                panic!("seeding {model} failed");
            };
        }
        build_app(state, BASE)
    }

    fn request(
        method: Method,
        path: &str,
        who: Option<(&str, &str)>,
        body: Option<&str>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(format!("{BASE}{path}"));
        if let Some((user, role)) = who {
            builder = builder.header(USER_HEADER, user).header(ROLE_HEADER, role);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let Ok(request) = builder.body(body) else {
            panic!("request must build");
        };
        request
    }

    const ALICE: Option<(&str, &str)> = Some(("alice", "Customer"));
    const ADMIN: Option<(&str, &str)> = Some(("root", "Admin"));

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let Ok(response) = app.clone().oneshot(req).await;
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn cart_flow_over_http() {
        let app = seeded_app().await;

        for model in ["m1", "m1", "m2"] {
            let body = format!(r#"{{"model":"{model}"}}"#);
            let (status, _) = send(&app, request(Method::POST, "/carts", ALICE, Some(&body))).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, json) = send(&app, request(Method::GET, "/carts", ALICE, None)).await;
        assert_eq!(status, StatusCode::OK);
        let Ok(cart) = serde_json::from_value::<Cart>(json) else {
            panic!("cart json expected");
        };
        assert!(!cart.paid);
        assert!(cart.payment_date.is_none());
        assert!((cart.total - 700.0).abs() < f64::EPSILON);

        let (status, _) = send(&app, request(Method::PATCH, "/carts", ALICE, None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, request(Method::GET, "/carts/history", ALICE, None)).await;
        assert_eq!(status, StatusCode::OK);
        let Ok(history) = serde_json::from_value::<Vec<Cart>>(json) else {
            panic!("cart list expected");
        };
        assert_eq!(history.len(), 1);
        assert!(history.iter().all(|c| c.paid));
    }

    #[tokio::test]
    async fn domain_errors_render_as_json() {
        let app = seeded_app().await;

        let (status, json) = send(
            &app,
            request(Method::POST, "/carts", ALICE, Some(r#"{"model":"m3"}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["status"], 409);

        let (status, json) = send(
            &app,
            request(Method::POST, "/carts", ALICE, Some(r#"{"model":"nope"}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Product not found");

        let (status, _) = send(&app, request(Method::PATCH, "/carts", ALICE, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, request(Method::DELETE, "/carts/current", ALICE, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            send(&app, request(Method::DELETE, "/carts/products/m1", ALICE, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_cart_checkout_is_bad_request() {
        let app = seeded_app().await;
        let (status, _) = send(
            &app,
            request(Method::POST, "/carts", ALICE, Some(r#"{"model":"m1"}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, request(Method::DELETE, "/carts/current", ALICE, None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, request(Method::PATCH, "/carts", ALICE, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Cart is empty");
    }

    #[tokio::test]
    async fn roles_gate_routes() {
        let app = seeded_app().await;

        let (status, _) = send(&app, request(Method::GET, "/carts", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, request(Method::GET, "/carts", ADMIN, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, request(Method::GET, "/carts/all", ALICE, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, request(Method::DELETE, "/carts", ALICE, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, json) = send(&app, request(Method::GET, "/carts/all", ADMIN, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!([]));
    }

    #[tokio::test]
    async fn malformed_body_is_unprocessable() {
        let app = seeded_app().await;
        let (status, json) = send(
            &app,
            request(Method::POST, "/carts", ALICE, Some(r#"{"modle":"m1"}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["status"], 422);

        let (status, _) = send(
            &app,
            request(Method::POST, "/carts", ALICE, Some(r#"{"model":"   "}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn admin_reset_empties_listing() {
        let app = seeded_app().await;
        let (status, _) = send(
            &app,
            request(Method::POST, "/carts", ALICE, Some(r#"{"model":"m1"}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, request(Method::GET, "/carts/all", ADMIN, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(1));

        let (status, _) = send(&app, request(Method::DELETE, "/carts", ADMIN, None)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, json) = send(&app, request(Method::GET, "/carts/all", ADMIN, None)).await;
        assert_eq!(json, serde_json::json!([]));
    }

    #[tokio::test]
    async fn product_routes_register_and_sell() {
        let app = seeded_app().await;
        let body = r#"{"model":"x1","category":"Laptop","sellingPrice":999.5,"quantity":4}"#;

        let (status, json) = send(&app, request(Method::POST, "/products", ADMIN, Some(body))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["model"], "x1");

        let (status, _) = send(&app, request(Method::POST, "/products", ADMIN, Some(body))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = send(
            &app,
            request(Method::PATCH, "/products/x1/sell", ADMIN, Some(r#"{"quantity":3}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["quantity"], 1);

        let (status, _) = send(&app, request(Method::GET, "/products/x1", ALICE, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_is_outside_base_path() {
        let app = seeded_app().await;
        let Ok(req) = Request::builder().uri("/health").body(Body::empty()) else {
            panic!("request must build");
        };
        let (status, json) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["storage"], "memory");
    }

    #[cfg(feature = "swagger-ui")]
    #[tokio::test]
    async fn served_document_uses_configured_base_path() {
        let app = build_app(AppState::in_memory(4), "/shop");
        let Ok(req) = Request::builder()
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
        else {
            panic!("request must build");
        };
        let (status, json) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["paths"].get("/shop/carts").is_some());
        assert!(json["paths"].get("/ezelectronics/carts").is_none());
    }
}
