use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use domain::services::{
    GroupAssigner, GuardianApprovalMachine, GuardianApprovals, MemberApprovalMachine,
    MemberApprovals, Notifier, RegistrationService, RequestService,
};
use domain::store::Stores;
use shared::jwt::{JwtConfig, JwtError};
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
    metrics_handler, metrics_middleware, rate_limit_middleware, security_headers_middleware,
    trace_id, RateLimiterState,
};
use crate::routes::{approvals, events, guardians, health, regions, requests};

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub requests: Arc<RequestService>,
    pub member_approvals: Arc<MemberApprovalMachine>,
    pub guardian_approvals: Arc<GuardianApprovalMachine>,
    pub registration: Arc<RegistrationService>,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    pub fn new(
        config: Config,
        stores: Stores,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, JwtError> {
        let jwt = JwtConfig::with_leeway(
            &config.jwt.secret,
            config.jwt.access_token_expiry_secs,
            config.jwt.leeway_secs,
        )?;

        let assigner = match config.assignment.seed {
            Some(seed) => GroupAssigner::seeded(seed),
            None => GroupAssigner::from_entropy(),
        };

        // Create rate limiter if rate limiting is enabled (rate_limit_per_minute > 0)
        let rate_limiter = (config.security.rate_limit_per_minute > 0).then(|| {
            Arc::new(RateLimiterState::new(
                config.security.rate_limit_per_minute,
                config.security.trust_forwarded_headers,
            ))
        });

        let requests = RequestService::new(
            stores.requests.clone(),
            stores.groups.clone(),
            Arc::new(assigner),
        );
        let member_approvals = MemberApprovalMachine::new(MemberApprovals::new(
            stores.approvals.clone(),
            stores.groups.clone(),
            stores.users.clone(),
        ));
        let guardian_approvals = GuardianApprovalMachine::new(GuardianApprovals::new(
            stores.guardians.clone(),
            stores.requests.clone(),
            stores.groups.clone(),
        ));
        let registration = RegistrationService::new(
            stores.events.clone(),
            stores.templates.clone(),
            stores.users.clone(),
            notifier,
            config.registration.settings(),
        );

        Ok(Self {
            stores,
            requests: Arc::new(requests),
            member_approvals: Arc::new(member_approvals),
            guardian_approvals: Arc::new(guardian_approvals),
            registration: Arc::new(registration),
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            rate_limiter,
        })
    }
}

pub fn create_app(
    config: Config,
    stores: Stores,
    notifier: Arc<dyn Notifier>,
) -> Result<Router, JwtError> {
    let state = AppState::new(config, stores, notifier)?;
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
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

    // Public registration routes, limited per client IP
    let event_routes = Router::new()
        .route("/api/v1/events/:slug/register", post(events::register))
        .route("/api/v1/events/accept", get(events::accept))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    // Authorization is decided per operation from the optional caller
    let api_routes = Router::new()
        .route("/api/v1/regions", get(regions::list_regions))
        .route(
            "/api/v1/requests",
            post(requests::create_request).get(requests::list_requests),
        )
        .route("/api/v1/requests/check-email", post(requests::check_email))
        .route("/api/v1/requests/:id", get(requests::get_request))
        .route(
            "/api/v1/requests/:id/status",
            patch(requests::update_request_status),
        )
        .route(
            "/api/v1/approvals/leader-approve",
            post(approvals::leader_approve),
        )
        .route(
            "/api/v1/approvals/admin-approve",
            post(approvals::admin_approve),
        )
        .route("/api/v1/approvals/:user", get(approvals::get_approval))
        .route(
            "/api/v1/guardians/leader-approve",
            post(guardians::leader_approve),
        )
        .route(
            "/api/v1/guardians/admin-confirm",
            post(guardians::admin_confirm),
        )
        .route("/api/v1/guardians/:request", get(guardians::get_guardian));

    let health_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/api/health/ready", get(health::ready))
        .route("/metrics", get(metrics_handler));

    let app = Router::new()
        .merge(health_routes)
        .merge(api_routes)
        .merge(event_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state);

    Ok(app)
}
