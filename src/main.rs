use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use chainboard::inmem::InMemLedger;
use chainboard::openapi::ApiDoc;
use chainboard::probe::HttpProbe;
use chainboard::{config, AppState, Dispatcher, FeedConfig, Renderer, SecurityHeaders};

const LOCAL_ACCOUNT: &str = "0x000000000000000000000000000000000000c0de";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping chainboard");
    let cfg = FeedConfig::from_env();
    if std::env::var("FORUM_BASE_URL").is_err() {
        warn!("FORUM_BASE_URL not set; permalinks point at {}", cfg.forum_base_url);
    }
    info!(
        "Forum base: {} | display offset: {} | probe timeout: {:?}",
        cfg.forum_base_url, cfg.display_offset, cfg.probe_timeout
    );

    let ledger = match std::env::var("CHAINBOARD_DATA_DIR") {
        Ok(dir) => InMemLedger::with_snapshot_dir(LOCAL_ACCOUNT, dir),
        Err(_) => InMemLedger::new(LOCAL_ACCOUNT),
    };
    if cfg.seed_demo_posts {
        ledger.seed_demo()?;
        info!("Seeded demo posts");
    }
    let ledger = Arc::new(ledger);

    let renderer = Arc::new(Renderer {
        ledger: ledger.clone(),
        blocks: ledger.clone(),
        names: ledger.clone(),
        tag_directory: Some(ledger.clone()),
        probe: Arc::new(HttpProbe::new(cfg.probe_timeout)),
        config: cfg.clone(),
    });
    let dispatcher = Arc::new(Dispatcher::new(ledger, cfg.forum_base_url.clone()));
    let state = AppState { renderer, dispatcher };

    let openapi = ApiDoc::openapi();
    let security = SecurityHeaders::from_env();
    let bind_addr = cfg.bind_addr.clone();

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:5173")
            .allow_any_header()
            .allowed_methods(["GET", "POST", "OPTIONS"])
            .max_age(3600);
        if let Ok(front) = std::env::var("FRONTEND_URL") {
            cors = cors.allowed_origin(&front);
        }

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(&bind_addr)?;

    info!("Listening on http://{bind_addr}");
    server.run().await?;
    Ok(())
}
