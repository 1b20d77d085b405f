pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod openapi;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use application::{CheckoutService, OrderService, WebhookService};

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

/// Everything the handlers reach through `web::Data`.
pub struct AppState {
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub webhooks: WebhookService,
    pub admin_api_key: String,
}

/// Mounts every API route. Shared by the server and the HTTP tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health::health))
        .service(
            web::scope("/payment")
                .route("/session", web::post().to(handlers::payment::create_session))
                .route("/verify", web::post().to(handlers::payment::verify_payment)),
        )
        .route(
            "/webhooks/payment-gateway",
            web::post().to(handlers::webhooks::payment_gateway),
        )
        .service(
            web::scope("/orders")
                .route("", web::post().to(handlers::orders::place_order))
                .route("/{id}", web::get().to(handlers::orders::get_order)),
        )
        .route(
            "/coupons/validate",
            web::post().to(handlers::coupons::validate_coupon),
        )
        .service(
            web::scope("/admin/orders/{id}")
                .route("", web::patch().to(handlers::admin::update_order))
                .route("/status", web::post().to(handlers::admin::change_status))
                .route("/cancel", web::post().to(handlers::admin::cancel_order)),
        );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(routes)
            .service(openapi::swagger_ui())
    })
    .bind((host.to_string(), port))?
    .run())
}
