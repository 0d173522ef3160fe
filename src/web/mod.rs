mod handlers;
mod state;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use tracing::info;
use tracing_actix_web::TracingLogger;

pub use state::AppState;

/// Same-origin only: the bundled UI is served by this process.
fn cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|origin, head| {
            let Some(host) = head.headers().get(header::HOST).and_then(|h| h.to_str().ok())
            else {
                return false;
            };
            origin
                .to_str()
                .ok()
                .and_then(|o| o.split_once("://"))
                .is_some_and(|(_, rest)| rest == host)
        })
        .allowed_methods(vec!["GET", "POST"])
        .allowed_header(header::CONTENT_TYPE)
        .max_age(3600)
}

pub async fn start_server(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let regions = state.tables.num_regions();
    let data = web::Data::new(state);

    info!(host, port, regions, "starting EV forecast web server");
    println!("Starting EV Forecast web server on http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors())
            .app_data(data.clone())
            // Static files
            .route("/", web::get().to(handlers::index_html))
            .route("/app.js", web::get().to(handlers::app_js))
            .route("/style.css", web::get().to(handlers::style_css))
            // API routes
            .route("/api/forecast", web::post().to(handlers::forecast))
            .route("/api/statewide", web::get().to(handlers::statewide))
            .route("/api/regions", web::get().to(handlers::regions))
            // Images
            .route("/chart/{file}", web::get().to(handlers::chart))
            .route("/map/{file}", web::get().to(handlers::map))
    })
    .bind((host, port))?
    .run()
    .await
}
