use std::path::Path;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ForecastError;
use crate::forecast::Forecaster;
use crate::io::find_image_for_region;
use crate::models::{ForecastRequest, RegionForecast};

use super::state::AppState;

// ---------------------------------------------------------------------------
// Error wrapper
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    details: String,
}

#[derive(Debug)]
pub(crate) struct WebError(ForecastError);

impl From<ForecastError> for WebError {
    fn from(e: ForecastError) -> Self {
        WebError(e)
    }
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl actix_web::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type) = match &self.0 {
            ForecastError::EmptyRegion
            | ForecastError::YearOutOfRange(_)
            | ForecastError::ParseError(_) => {
                (actix_web::http::StatusCode::BAD_REQUEST, "Bad Request")
            }
            ForecastError::RegionNotFound(_) | ForecastError::NotFound(_) => {
                (actix_web::http::StatusCode::NOT_FOUND, "Not Found")
            }
            ForecastError::ModelEvaluationFailed { .. } => (
                actix_web::http::StatusCode::UNPROCESSABLE_ENTITY,
                "Unprocessable Entity",
            ),
            _ => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
            ),
        };
        HttpResponse::build(status).json(ErrorBody {
            error: error_type.to_string(),
            details: self.0.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct ForecastResponse {
    #[serde(flatten)]
    forecast: RegionForecast,
    /// URL of the county's chart image, if one exists
    chart: Option<String>,
    map: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RegionEntry {
    region: String,
    region_key: String,
    population: Option<f64>,
    existing_infrastructure_count: Option<u64>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip anything that could escape the image directory.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect::<String>()
        .replace("..", "")
}

fn serve_png(dir: &Path, requested: &str) -> Result<HttpResponse, WebError> {
    let file = sanitize_filename(requested);
    if file.is_empty() || !file.to_lowercase().ends_with(".png") {
        return Err(WebError(ForecastError::ParseError(format!(
            "Invalid image name: {requested}"
        ))));
    }
    let path = dir.join(&file);
    if !path.is_file() {
        return Err(WebError(ForecastError::NotFound(format!("Image {file} not found"))));
    }
    debug!(path = %path.display(), "serving image");
    let bytes = std::fs::read(&path).map_err(ForecastError::from)?;
    Ok(HttpResponse::Ok().content_type("image/png").body(bytes))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn forecast(
    state: web::Data<AppState>,
    body: web::Json<ForecastRequest>,
) -> Result<HttpResponse, WebError> {
    let forecaster = Forecaster::new(&state.tables);
    let forecast = forecaster.forecast(&body)?;
    let chart = find_image_for_region(&state.charts_dir, &forecast.region)
        .map(|f| format!("/chart/{f}"));
    let map = find_image_for_region(&state.maps_dir, &forecast.region)
        .map(|f| format!("/map/{f}"));
    Ok(HttpResponse::Ok().json(ForecastResponse {
        forecast,
        chart,
        map,
    }))
}

#[derive(Deserialize)]
pub struct YearQuery {
    year: i32,
}

pub async fn statewide(
    state: web::Data<AppState>,
    query: web::Query<YearQuery>,
) -> Result<HttpResponse, WebError> {
    let forecaster = Forecaster::new(&state.tables);
    let result = forecaster.forecast_statewide(query.year)?;
    Ok(HttpResponse::Ok().json(RegionForecast::statewide(result)))
}

pub async fn regions(state: web::Data<AppState>) -> HttpResponse {
    let tables = &state.tables;
    let entries: Vec<RegionEntry> = tables
        .regions()
        .iter()
        .filter(|r| {
            tables
                .region(&r.normalized_key)
                .is_some_and(|first| std::ptr::eq(first, *r))
        })
        .map(|r| RegionEntry {
            region: r.raw_name.clone(),
            region_key: r.normalized_key.clone(),
            population: r.population,
            existing_infrastructure_count: tables
                .summary(&r.normalized_key)
                .and_then(|s| s.current_count),
        })
        .collect();
    HttpResponse::Ok().json(entries)
}

pub async fn chart(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, WebError> {
    serve_png(&state.charts_dir, &path.into_inner())
}

pub async fn map(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, WebError> {
    serve_png(&state.maps_dir, &path.into_inner())
}

// ---------------------------------------------------------------------------
// Static file handlers
// ---------------------------------------------------------------------------

pub async fn index_html() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(include_str!("../../static/index.html"))
}

pub async fn app_js() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/javascript; charset=utf-8")
        .body(include_str!("../../static/app.js"))
}

pub async fn style_css() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/css; charset=utf-8")
        .body(include_str!("../../static/style.css"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;
    use actix_web::App;

    use crate::config::DataConfig;
    use crate::models::{InfrastructureSummaryRecord, ReferenceTables, RegionRecord};

    fn sample_tables() -> ReferenceTables {
        ReferenceTables::new(
            vec![
                RegionRecord::new(
                    "Alameda County",
                    Some(1_000_000.0),
                    Some("sc = 2*(x - 2024) + 40".to_string()),
                    Some("adopt = sigmoid((x - 2030)/5)".to_string()),
                ),
                RegionRecord::new(
                    "Kern County",
                    Some(900_000.0),
                    Some("sc = secret(x)".to_string()),
                    Some("adopt = 0.1".to_string()),
                ),
                RegionRecord::new("ALAMEDA", Some(5.0), None, None),
            ],
            vec![
                InfrastructureSummaryRecord::new("Alameda County", Some(57)),
                InfrastructureSummaryRecord::new("Total", Some(1432)),
            ],
        )
    }

    fn sample_state(images: &Path) -> AppState {
        let data = DataConfig {
            charts_dir: images.join("charts"),
            maps_dir: images.join("maps"),
            ..DataConfig::default()
        };
        AppState::new(sample_tables(), &data)
    }

    fn image_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("charts")).unwrap();
        std::fs::create_dir(dir.path().join("maps")).unwrap();
        std::fs::write(dir.path().join("charts/alameda_forecast.png"), b"\x89PNG chart").unwrap();
        std::fs::write(dir.path().join("maps/alameda_sites.png"), b"\x89PNG map").unwrap();
        dir
    }

    fn make_app(
        state: AppState,
    ) -> actix_web::App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::new(state))
            .route("/api/forecast", web::post().to(forecast))
            .route("/api/statewide", web::get().to(statewide))
            .route("/api/regions", web::get().to(regions))
            .route("/chart/{file}", web::get().to(chart))
            .route("/map/{file}", web::get().to(map))
    }

    // -----------------------------------------------------------------------
    // Forecast endpoint
    // -----------------------------------------------------------------------

    #[actix_web::test]
    async fn test_forecast_success() {
        let dir = image_dir();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::post()
            .uri("/api/forecast")
            .set_json(serde_json::json!({ "region": "alameda county ", "year": 2030 }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["region"], "Alameda County");
        assert_eq!(body["year"], 2030);
        assert_eq!(body["infrastructure_forecast"].as_f64().unwrap(), 52.0);
        assert!((body["adoption_rate"].as_f64().unwrap() - 0.5).abs() < 1e-9);
        assert!((body["projected_adopters"].as_f64().unwrap() - 500_000.0).abs() < 1e-3);
        assert_eq!(body["existing_infrastructure_count"], 57);
        assert_eq!(body["chart"], "/chart/alameda_forecast.png");
        assert_eq!(body["map"], "/map/alameda_sites.png");
    }

    #[actix_web::test]
    async fn test_forecast_without_images() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::post()
            .uri("/api/forecast")
            .set_json(serde_json::json!({ "region": "Alameda", "year": 2024 }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert!(body["chart"].is_null());
        assert!(body["map"].is_null());
    }

    #[actix_web::test]
    async fn test_forecast_empty_region() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::post()
            .uri("/api/forecast")
            .set_json(serde_json::json!({ "region": " County ", "year": 2030 }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["details"], "Please enter a county name");
    }

    #[actix_web::test]
    async fn test_forecast_year_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::post()
            .uri("/api/forecast")
            .set_json(serde_json::json!({ "region": "Atlantis", "year": 2051 }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_forecast_region_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::post()
            .uri("/api/forecast")
            .set_json(serde_json::json!({ "region": "Atlantis", "year": 2030 }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], "Not Found");
    }

    #[actix_web::test]
    async fn test_forecast_model_failure_hides_expression() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::post()
            .uri("/api/forecast")
            .set_json(serde_json::json!({ "region": "Kern", "year": 2030 }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        let details = body["details"].as_str().unwrap();
        assert!(details.contains("Could not evaluate equations"));
        assert!(!details.contains("secret"));
    }

    #[actix_web::test]
    async fn test_unprocessable_body_names_no_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let nested = format!("sc = {}x{}", "(".repeat(5_000), ")".repeat(5_000));
        let tables = ReferenceTables::new(
            vec![
                RegionRecord::new(
                    "Inyo County",
                    Some(18_000.0),
                    Some("sc = 3".to_string()),
                    Some("adopt = internal_coeff * (x - 2024)".to_string()),
                ),
                RegionRecord::new(
                    "Mono County",
                    Some(13_000.0),
                    Some(nested),
                    Some("adopt = 0.1".to_string()),
                ),
            ],
            Vec::new(),
        );
        let data = DataConfig {
            charts_dir: dir.path().join("charts"),
            maps_dir: dir.path().join("maps"),
            ..DataConfig::default()
        };
        let app = actix_test::init_service(make_app(AppState::new(tables, &data))).await;

        for region in ["Inyo", "Mono"] {
            let req = actix_test::TestRequest::post()
                .uri("/api/forecast")
                .set_json(serde_json::json!({ "region": region, "year": 2030 }))
                .to_request();
            let resp = actix_test::call_service(&app, req).await;

            assert_eq!(resp.status(), 422, "{region}");
            let body: serde_json::Value = actix_test::read_body_json(resp).await;
            let details = body["details"].as_str().unwrap();
            assert_eq!(details, "Could not evaluate equations for this county");
            assert!(!details.contains("internal_coeff"));
            assert!(!details.contains("adopt"));
        }
    }

    #[actix_web::test]
    async fn test_forecast_malformed_body() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::post()
            .uri("/api/forecast")
            .set_json(serde_json::json!({ "region": "Alameda", "year": "soon" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    // -----------------------------------------------------------------------
    // Statewide and regions endpoints
    // -----------------------------------------------------------------------

    #[actix_web::test]
    async fn test_statewide_success() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::get()
            .uri("/api/statewide?year=2024")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["region"], "Statewide");
        assert_eq!(body["infrastructure_forecast"].as_f64().unwrap(), 50.0);
        assert!((body["adoption_rate"].as_f64().unwrap() - 0.05271194).abs() < 1e-9);
        assert_eq!(body["existing_infrastructure_count"], 1432);
    }

    #[actix_web::test]
    async fn test_statewide_year_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::get()
            .uri("/api/statewide?year=2023")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_statewide_missing_year() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::get().uri("/api/statewide").to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_regions_lists_first_match_only() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::get().uri("/api/regions").to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        let body: Vec<RegionEntry> = actix_test::read_body_json(resp).await;
        assert_eq!(body.len(), 2);
        assert_eq!(body[0].region, "Alameda County");
        assert_eq!(body[0].existing_infrastructure_count, Some(57));
        assert_eq!(body[1].region_key, "kern");
        assert_eq!(body[1].existing_infrastructure_count, None);
    }

    // -----------------------------------------------------------------------
    // Image endpoints
    // -----------------------------------------------------------------------

    #[actix_web::test]
    async fn test_chart_served() {
        let dir = image_dir();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::get()
            .uri("/chart/alameda_forecast.png")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("content-type").unwrap().to_str().unwrap(),
            "image/png"
        );
        let body = actix_test::read_body(resp).await;
        assert_eq!(&body[..], b"\x89PNG chart");
    }

    #[actix_web::test]
    async fn test_map_missing_is_404() {
        let dir = image_dir();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::get()
            .uri("/map/fresno_sites.png")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_image_rejects_non_png() {
        let dir = image_dir();
        let app = actix_test::init_service(make_app(sample_state(dir.path()))).await;
        let req = actix_test::TestRequest::get()
            .uri("/chart/equation.xlsx")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[test]
    fn test_sanitize_filename_strips_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("..%2Fsecret.png"), "2Fsecret.png");
        assert_eq!(sanitize_filename("los_angeles.png"), "los_angeles.png");
    }

    // -----------------------------------------------------------------------
    // Static file handlers
    // -----------------------------------------------------------------------

    #[actix_web::test]
    async fn test_static_html() {
        let resp = index_html().await;
        assert_eq!(resp.status(), 200);
        assert!(resp
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("text/html"));
    }

    #[actix_web::test]
    async fn test_static_js() {
        let resp = app_js().await;
        assert_eq!(resp.status(), 200);
        assert!(resp
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("javascript"));
    }

    #[actix_web::test]
    async fn test_static_css() {
        let resp = style_css().await;
        assert_eq!(resp.status(), 200);
        assert!(resp
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("text/css"));
    }
}
