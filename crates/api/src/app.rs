use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_admin, require_user_auth,
    security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{
    admin, auth, groups, health, invitations, payments, reservations, subscriptions, tickets,
};
use crate::services::EmailService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
    pub email: EmailService,
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let email = EmailService::new(config.email.clone());
    let config = Arc::new(config);

    // Rate limiting is disabled when the per-minute budget is zero
    let rate_limiter = if config.security.rate_limit_per_minute > 0 {
        Some(Arc::new(RateLimiterState::new(
            config.security.rate_limit_per_minute,
        )))
    } else {
        None
    };

    let state = AppState {
        pool,
        config: config.clone(),
        rate_limiter,
        email,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Member routes (require a bearer token)
    // Middleware order: auth runs first, then rate limiting (keyed by user)
    let member_routes = Router::new()
        // Reservation lifecycle
        .route("/api/reservations", post(reservations::create_reservation))
        .route("/api/reservations", get(reservations::list_reservations))
        .route(
            "/api/reservations/upcoming",
            get(reservations::list_upcoming_reservations),
        )
        .route("/api/reservations/:id", get(reservations::get_reservation))
        .route(
            "/api/reservations/:id",
            put(reservations::update_reservation),
        )
        .route(
            "/api/reservations/:id/submit",
            post(reservations::submit_reservation),
        )
        .route(
            "/api/reservations/:id/settle/ticket",
            post(reservations::settle_with_ticket),
        )
        .route(
            "/api/reservations/:id/settle/subscription",
            post(reservations::settle_with_subscription),
        )
        .route(
            "/api/reservations/:id/cancel",
            post(reservations::cancel_reservation),
        )
        .route(
            "/api/reservations/:id/invitations",
            get(invitations::list_reservation_invitations),
        )
        // Ticket credits
        .route("/api/tickets", get(tickets::list_tickets))
        .route("/api/tickets/:id", get(tickets::get_ticket))
        // Subscriptions
        .route(
            "/api/subscriptions",
            post(subscriptions::create_subscription),
        )
        .route("/api/subscriptions", get(subscriptions::list_subscriptions))
        .route(
            "/api/subscriptions/current",
            get(subscriptions::current_subscription),
        )
        .route(
            "/api/subscriptions/:id/cancel",
            post(subscriptions::cancel_subscription),
        )
        // Event groups
        .route("/api/groups/mine", get(groups::list_my_groups))
        .route("/api/groups/:id", get(groups::get_group))
        // Friend invitations
        .route("/api/invitations", post(invitations::create_invitation))
        .route(
            "/api/invitations/materialize",
            post(invitations::materialize_invitation),
        )
        // Rate limiting runs after auth (keyed by the authenticated user)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        // Auth runs first (outermost layer = runs first)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // Admin routes (require the admin token)
    let admin_routes = Router::new()
        .route("/api/admin/stats", get(admin::platform_stats))
        .route("/api/admin/users", get(admin::list_users))
        .route(
            "/api/admin/users/:id/activity",
            get(admin::user_activity),
        )
        .route("/api/admin/reservations", get(admin::list_reservations))
        .route("/api/admin/groups", post(admin::create_group))
        .route("/api/admin/groups", get(admin::list_groups))
        .route("/api/admin/groups/batch", post(admin::batch_groups))
        .route(
            "/api/admin/groups/:id/location",
            put(admin::set_group_location),
        )
        .route(
            "/api/admin/groups/:id/confirm",
            post(admin::confirm_group),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler))
        // Account endpoints
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        // Payment provider webhook (HMAC-signed)
        .route("/api/payments/webhook", post(payments::payment_webhook))
        // Invitation token endpoints, usable without an account
        .route(
            "/api/invitations/:token",
            get(invitations::preview_invitation),
        )
        .route(
            "/api/invitations/:token/accept",
            post(invitations::accept_invitation),
        );

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
