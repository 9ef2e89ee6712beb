//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::Redirect,
    routing::{get, post},
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};

use crate::{
    AppState,
    auth::{auth_guard, auth_guard_hx, redirect_if_logged_in},
    dashboard::{get_analytics_page, get_dashboard_page},
    endpoints,
    forgot_password::{
        get_forgot_password_page, get_reset_password_page, post_forgot_password,
        post_reset_password,
    },
    internal_server_error::get_internal_server_error_page,
    log_in::{get_log_in_page, post_log_in},
    log_out::get_log_out,
    logging::logging_middleware,
    not_found::get_404_not_found,
    settings::{
        delete_account_endpoint, get_settings_page, request_password_change_endpoint,
        update_settings_endpoint,
    },
    sign_up::{get_sign_up_page, sign_up},
    transaction::{
        create_transaction_endpoint, get_category_options, get_receipt, get_transactions_page,
    },
};

/// The largest request body accepted when adding a transaction with a receipt.
///
/// No route accepts a larger body than this.
const MAX_RECEIPT_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let guest_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::SIGN_UP_VIEW, get(get_sign_up_page))
        .route(
            endpoints::FORGOT_PASSWORD_VIEW,
            get(get_forgot_password_page),
        )
        .route(endpoints::RESET_PASSWORD_VIEW, get(get_reset_password_page))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            redirect_if_logged_in,
        ));

    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::USERS, post(sign_up))
        .route(endpoints::PASSWORD_RESET_API, post(post_forgot_password))
        .route(endpoints::RESET_PASSWORD_API, post(post_reset_password))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::ANALYTICS_VIEW, get(get_analytics_page))
        .route(endpoints::SETTINGS_VIEW, get(get_settings_page))
        .route(endpoints::RECEIPT, get(get_receipt))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes use the HX-REDIRECT header so auth redirects work for htmx requests.
    let protected_hx_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            post(create_transaction_endpoint)
                .layer(DefaultBodyLimit::max(MAX_RECEIPT_UPLOAD_BYTES)),
        )
        .route(endpoints::CATEGORIES_API, get(get_category_options))
        .route(endpoints::SETTINGS_API, post(update_settings_endpoint))
        .route(
            endpoints::SETTINGS_PASSWORD_RESET,
            post(request_password_change_endpoint),
        )
        .route(endpoints::DELETE_ACCOUNT, post(delete_account_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    protected_routes
        .merge(protected_hx_routes)
        .merge(guest_routes)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_RECEIPT_UPLOAD_BYTES))
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}


#[cfg(test)]
mod router_tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use axum::{
        body::{Body, Bytes},
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use axum_test::{TestResponse, TestServer};
    use tower::ServiceExt;

    use crate::{
        AppState, endpoints,
        routing::build_router,
        test_utils::{create_test_user, get_test_app_state},
    };

    fn get_test_server(state: AppState) -> TestServer {
        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    async fn log_in(server: &TestServer, email: &str, password: &str) -> TestResponse {
        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("email", email), ("password", password)])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        response
    }

    fn location(response: &TestResponse) -> String {
        response
            .headers()
            .get("location")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    }

    #[tokio::test]
    async fn protected_pages_redirect_to_log_in() {
        let dir = tempfile::tempdir().unwrap();
        let server = get_test_server(get_test_app_state(dir.path()));

        for page in [
            endpoints::DASHBOARD_VIEW,
            endpoints::TRANSACTIONS_VIEW,
            endpoints::ANALYTICS_VIEW,
            endpoints::SETTINGS_VIEW,
        ] {
            let response = server.get(page).await;

            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(location(&response), endpoints::LOG_IN_VIEW, "for {page}");
        }
    }

    #[tokio::test]
    async fn htmx_endpoints_use_hx_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let server = get_test_server(get_test_app_state(dir.path()));

        let response = server
            .post(endpoints::SETTINGS_API)
            .form(&[("full_name", "Ann")])
            .await;

        response.assert_status_ok();
        assert_eq!(
            response
                .headers()
                .get("hx-redirect")
                .and_then(|value| value.to_str().ok()),
            Some(endpoints::LOG_IN_VIEW)
        );
    }

    #[tokio::test]
    async fn logged_in_user_can_view_protected_pages() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;
        let server = get_test_server(state);

        let jar = log_in(&server, "ann@example.com", "hunter2").await.cookies();

        for page in [
            endpoints::DASHBOARD_VIEW,
            endpoints::TRANSACTIONS_VIEW,
            endpoints::ANALYTICS_VIEW,
            endpoints::SETTINGS_VIEW,
        ] {
            server
                .get(page)
                .add_cookies(jar.clone())
                .await
                .assert_status_ok();
        }
    }

    #[tokio::test]
    async fn logged_in_user_is_sent_away_from_guest_pages() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;
        let server = get_test_server(state);

        let jar = log_in(&server, "ann@example.com", "hunter2").await.cookies();

        for page in [endpoints::LOG_IN_VIEW, endpoints::SIGN_UP_VIEW] {
            let response = server.get(page).add_cookies(jar.clone()).await;

            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(location(&response), endpoints::DASHBOARD_VIEW, "for {page}");
        }
    }

    #[tokio::test]
    async fn log_out_ends_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;
        let server = get_test_server(state);
        let jar = log_in(&server, "ann@example.com", "hunter2").await.cookies();

        let response = server.get(endpoints::LOG_OUT).add_cookies(jar).await;
        assert_eq!(location(&response), endpoints::LOG_IN_VIEW);

        let response = server
            .get(endpoints::DASHBOARD_VIEW)
            .add_cookies(response.cookies())
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), endpoints::LOG_IN_VIEW);
    }

    #[tokio::test]
    async fn guest_pages_are_public() {
        let dir = tempfile::tempdir().unwrap();
        let server = get_test_server(get_test_app_state(dir.path()));

        for page in [
            endpoints::LOG_IN_VIEW,
            endpoints::SIGN_UP_VIEW,
            endpoints::FORGOT_PASSWORD_VIEW,
        ] {
            server.get(page).await.assert_status_ok();
        }
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let server = get_test_server(get_test_app_state(dir.path()));

        server
            .get("/no/such/page")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    const CHUNK_BYTES: usize = 1024 * 1024;
    const CHUNK_COUNT: usize = 64;

    /// A 64 MiB body that counts how many bytes have been pulled from it.
    fn counted_stream_body(bytes_read: Arc<AtomicUsize>) -> Body {
        let chunks = futures::stream::iter((0..CHUNK_COUNT).map(move |_| {
            bytes_read.fetch_add(CHUNK_BYTES, Ordering::SeqCst);
            Ok::<_, std::io::Error>(Bytes::from(vec![b'a'; CHUNK_BYTES]))
        }));

        Body::from_stream(chunks)
    }

    #[tokio::test]
    async fn large_multipart_upload_is_not_buffered_before_auth() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(get_test_app_state(dir.path()));
        let bytes_read = Arc::new(AtomicUsize::new(0));
        let request = Request::post(endpoints::TRANSACTIONS_API)
            .header(CONTENT_TYPE, "multipart/form-data; boundary=xyz")
            .body(counted_stream_body(bytes_read.clone()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response
                .headers()
                .get("hx-redirect")
                .and_then(|value| value.to_str().ok()),
            Some(endpoints::LOG_IN_VIEW)
        );
        assert!(bytes_read.load(Ordering::SeqCst) <= CHUNK_BYTES);
    }

    #[tokio::test]
    async fn oversized_form_body_is_rejected_without_reading_it_all() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(get_test_app_state(dir.path()));
        let bytes_read = Arc::new(AtomicUsize::new(0));
        let request = Request::post(endpoints::LOG_IN_API)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(counted_stream_body(bytes_read.clone()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(bytes_read.load(Ordering::SeqCst) < CHUNK_BYTES * CHUNK_COUNT);
    }

    #[tokio::test]
    async fn declared_length_over_the_limit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(get_test_app_state(dir.path()));
        let bytes_read = Arc::new(AtomicUsize::new(0));
        let request = Request::post(endpoints::TRANSACTIONS_API)
            .header(CONTENT_TYPE, "multipart/form-data; boundary=xyz")
            .header("content-length", (CHUNK_BYTES * CHUNK_COUNT).to_string())
            .body(counted_stream_body(bytes_read.clone()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(bytes_read.load(Ordering::SeqCst), 0);
    }
}
