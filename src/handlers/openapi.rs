//! OpenAPI specification, shared application state and the app factory.

use crate::{
    backend::{SharedBackend, backend_from_config},
    config::{
        AiAssistConfig, AuthConfig, BackendConfig, ConfigError, MetricsConfig, RateLimitConfig,
        SecurityHeadersConfig,
    },
    error::{json_error_handler, query_error_handler},
    handlers::{ai, auth, health, iban, kb, metrics, notes, pages, profile},
    middleware::{MetricsMiddleware, RequestIdMiddleware, SecurityHeaders, SessionMiddleware},
    services::{AiAssistError, AiAssistant, AppMetrics, RateLimiter, UsageTracker},
};
use actix_web::App;
use paperclip::actix::{OpenApiExt, web};
use paperclip::v2::models::{DefaultApiRaw, Info};

/// Creates the shared OpenAPI specification for the API
pub fn create_openapi_spec() -> DefaultApiRaw {
    DefaultApiRaw {
        info: Info {
            title: "QA Toolsmith API".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: Some(
                "Everyday helpers for software testers: a shared knowledge base of testing \
                resources, IBAN test data, and an AI assistant.\n\n\
                ## Sessions\n\
                Sign in with `POST /api/auth/signin`. The session is carried in the \
                `sb-access-token` and `sb-refresh-token` cookies and refreshed transparently.\n\
                \n\
                ## Envelopes\n\
                Successful JSON responses are wrapped as `{\"data\": ...}`. Errors are returned as\n\
                ```json\n\
                {\"error\": {\"code\": \"VALIDATION_ERROR\", \"message\": \"...\", \"details\": {}}}\n\
                ```\n\
                \n\
                ## Rate limiting\n\
                Sign-in, sign-up, password reset and the IBAN tools are limited per client IP. \
                Rejected requests receive `429` with a `Retry-After` header."
                    .into(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Errors raised while assembling [`AppState`]
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("failed to create AI client: {0}")]
    AiAssist(#[from] AiAssistError),
}

/// Everything the app factory registers as app data
///
/// Cloned once per worker; the stores inside are shared.
#[derive(Clone)]
pub struct AppState {
    pub backend: SharedBackend,
    pub backend_config: BackendConfig,
    pub auth_config: AuthConfig,
    pub rate_limiter: RateLimiter,
    pub security_config: SecurityHeadersConfig,
    pub metrics_config: MetricsConfig,
    pub metrics: AppMetrics,
    pub assistant: web::Data<AiAssistant>,
    pub usage: UsageTracker,
}

impl AppState {
    /// Load every configuration struct from the environment
    pub fn from_env() -> Result<Self, StartupError> {
        let backend_config = BackendConfig::from_env()?;
        let backend = backend_from_config(&backend_config)?;
        let ai_config = AiAssistConfig::from_env();

        Ok(Self {
            backend,
            backend_config,
            auth_config: AuthConfig::from_env(),
            rate_limiter: RateLimiter::new(RateLimitConfig::from_env()),
            security_config: SecurityHeadersConfig::from_env(),
            metrics_config: MetricsConfig::from_env(),
            metrics: AppMetrics::new()?,
            usage: UsageTracker::new(ai_config.daily_limit),
            assistant: web::Data::new(AiAssistant::new(ai_config)?),
        })
    }

    /// State around an existing backend with default configuration
    pub fn with_backend(backend: SharedBackend) -> Result<Self, StartupError> {
        let ai_config = AiAssistConfig::default();
        Ok(Self {
            backend,
            backend_config: BackendConfig::default(),
            auth_config: AuthConfig::default(),
            rate_limiter: RateLimiter::new(RateLimitConfig::default()),
            security_config: SecurityHeadersConfig::default(),
            metrics_config: MetricsConfig::default(),
            metrics: AppMetrics::new()?,
            usage: UsageTracker::new(ai_config.daily_limit),
            assistant: web::Data::new(AiAssistant::new(ai_config)?),
        })
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limiter = RateLimiter::new(config);
        self
    }

    pub fn with_auth_config(mut self, config: AuthConfig) -> Self {
        self.auth_config = config;
        self
    }

    pub fn with_metrics_config(mut self, config: MetricsConfig) -> Self {
        self.metrics_config = config;
        self
    }

    /// Replace the AI client; the daily counters restart with the new limit
    pub fn with_ai_config(mut self, config: AiAssistConfig) -> Result<Self, StartupError> {
        self.usage = UsageTracker::new(config.daily_limit);
        self.assistant = web::Data::new(AiAssistant::new(config)?);
        Ok(self)
    }
}

/// Creates the application with every route and middleware
///
/// Used by the server binary and by the integration tests.
pub fn create_app(
    state: AppState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let json_config = actix_web::web::JsonConfig::default().error_handler(json_error_handler);
    let query_config = actix_web::web::QueryConfig::default().error_handler(query_error_handler);

    App::new()
        .wrap(SessionMiddleware)
        .wrap(SecurityHeaders::new(state.security_config.clone()))
        .wrap(RequestIdMiddleware)
        .wrap(MetricsMiddleware)
        .wrap_api_with_spec(create_openapi_spec())
        .app_data(json_config)
        .app_data(query_config)
        .app_data(web::Data::new(state.backend))
        .app_data(web::Data::new(state.backend_config))
        .app_data(web::Data::new(state.auth_config))
        .app_data(web::Data::new(state.rate_limiter))
        .app_data(web::Data::new(state.metrics_config))
        .app_data(web::Data::new(state.metrics))
        .app_data(state.assistant)
        .app_data(web::Data::new(state.usage))
        // Pages
        .service(web::resource("/").route(web::get().to(pages::index)))
        .service(web::resource("/auth/login").route(web::get().to(pages::login)))
        .service(web::resource(pages::LOGIN_SCRIPT_PATH).route(web::get().to(pages::login_script)))
        .service(web::resource("/profile").route(web::get().to(pages::profile)))
        .service(web::resource("/admin").route(web::get().to(pages::admin)))
        // Operations
        .service(web::resource("/api/health").route(web::get().to(health::health)))
        .service(web::resource("/api/metrics").route(web::get().to(metrics::get_metrics)))
        // Authentication
        .service(web::resource("/api/auth/signin").route(web::post().to(auth::signin)))
        .service(web::resource("/api/auth/signup").route(web::post().to(auth::signup)))
        .service(web::resource("/api/auth/signout").route(web::post().to(auth::signout)))
        .service(web::resource("/api/auth/reset-request").route(web::post().to(auth::reset_request)))
        .service(web::resource("/api/auth/reset-change").route(web::post().to(auth::reset_change)))
        // Profile
        .service(web::resource("/api/profile").route(web::get().to(profile::get_profile)))
        .service(web::resource("/api/profile/email").route(web::put().to(profile::update_email)))
        // Knowledge base
        .service(
            web::resource("/api/kb/entries")
                .route(web::get().to(kb::list_entries))
                .route(web::post().to(kb::create_entry)),
        )
        .service(
            web::resource("/api/kb/entries/{id}")
                .route(web::get().to(kb::get_entry))
                .route(web::put().to(kb::update_entry))
                .route(web::delete().to(kb::delete_entry)),
        )
        .service(
            web::resource("/api/kb/entries/{id}/notes")
                .route(web::get().to(notes::list_notes))
                .route(web::post().to(notes::create_note)),
        )
        .service(web::resource("/api/kb/notes/{id}").route(web::delete().to(notes::delete_note)))
        // IBAN tools
        .service(web::resource("/api/generators/iban").route(web::get().to(iban::generate)))
        .service(
            web::resource("/api/validators/iban")
                .route(web::get().to(iban::validate_get))
                .route(web::post().to(iban::validate_post)),
        )
        // AI assist
        .service(web::resource("/api/ai/assist").route(web::post().to(ai::assist)))
        .service(web::resource("/api/ai/usage").route(web::get().to(ai::usage)))
        .with_json_spec_at("/api/spec/v2")
        .build()
}
