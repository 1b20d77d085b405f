use std::sync::Arc;

use dotenvy::dotenv;
use order_settlement::application::{CheckoutService, OrderService, WebhookService};
use order_settlement::config::Settings;
use order_settlement::infrastructure::assets::FsAssetStore;
use order_settlement::infrastructure::catalog_repo::{DieselAddressStore, DieselCatalogReader};
use order_settlement::infrastructure::coupon_repo::DieselCouponRepository;
use order_settlement::infrastructure::gateway::HttpPaymentGateway;
use order_settlement::infrastructure::order_repo::DieselOrderRepository;
use order_settlement::{build_server, create_pool, run_migrations, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::from_env().map_err(startup_error)?;

    let pool = create_pool(&settings.database_url).map_err(startup_error)?;
    run_migrations(&pool).map_err(startup_error)?;

    let catalog = Arc::new(DieselCatalogReader::new(pool.clone()));
    let addresses = Arc::new(DieselAddressStore::new(pool.clone()));
    let coupons = Arc::new(DieselCouponRepository::new(pool.clone()));
    let orders = Arc::new(DieselOrderRepository::new(pool));
    let gateway = Arc::new(HttpPaymentGateway::new(settings.gateway.clone()).map_err(startup_error)?);
    let assets = Arc::new(FsAssetStore::new(settings.uploads_dir.clone()));

    let state = AppState {
        checkout: CheckoutService::new(
            catalog.clone(),
            addresses.clone(),
            coupons,
            orders.clone(),
            gateway.clone(),
        ),
        orders: OrderService::new(orders.clone(), catalog, addresses, assets),
        webhooks: WebhookService::new(orders, gateway),
        admin_api_key: settings.admin_api_key.clone(),
    };

    log::info!("Starting server at http://{}:{}", settings.host, settings.port);

    build_server(state, &settings.host, settings.port)?.await
}

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    log::error!("Startup failed: {}", e);
    std::io::Error::other(e.to_string())
}
