mod catalog;
mod email;
mod handlers;
mod i18n;
mod images;
mod inquiry;
mod language;
mod models;
mod persistence;
mod seed;
mod store;

use crate::email::EmailService;
use crate::handlers::AppState;
use crate::language::{geoip_timeout, IpApiLocator, LanguageResolver};
use crate::persistence::{BlobStore, FileBlobStore, MemoryBlobStore};

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        handlers::get_products,
        handlers::get_product_by_id,
        handlers::get_news,
        handlers::submit_inquiry,
        handlers::resolve_language,
        handlers::language_url,
        handlers::get_stats
    ),
    components(schemas(
        models::ApiError,
        models::Product,
        models::ProductApiResponse,
        models::ProductsApiResponse,
        models::NewsArticle,
        models::NewsListApiResponse,
        models::InquiryFormData,
        models::InquiryType,
        models::InquiryStatus,
        models::CustomerInquiry,
        models::CatalogStats,
        inquiry::SubmissionOutcome,
        language::Language,
        language::LanguageInfo,
        handlers::HealthCheckResponse,
        handlers::LanguageResolution,
        images::UploadedImage
    ))
)]
struct ApiDoc;

fn blob_store() -> Arc<dyn BlobStore> {
    match env::var("STORAGE").as_deref() {
        Ok("memory") => {
            log::warn!("STORAGE=memory, data will not survive a restart");
            Arc::new(MemoryBlobStore::new())
        }
        _ => {
            let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
            log::info!("Persisting data under {}", data_dir);
            Arc::new(FileBlobStore::new(data_dir))
        }
    }
}

fn language_resolver() -> LanguageResolver {
    match IpApiLocator::from_env() {
        Ok(locator) => LanguageResolver::new(Arc::new(locator), geoip_timeout()),
        Err(e) => {
            log::warn!("Geolocation disabled: {:?}", e);
            LanguageResolver::without_geolocation()
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    dotenv::from_filename(format!("{}/.env.local", manifest_dir)).ok();
    dotenv::from_filename(format!("{}/.env", manifest_dir)).ok();
    dotenv::from_filename(".env.local").ok();
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("{}:{}", host, port);

    let email = EmailService::from_env().map_err(std::io::Error::other)?;
    log::info!("Inquiry mail dispatch enabled: {}", email.is_enabled());
    let state = web::Data::new(AppState::open(blob_store(), language_resolver(), email).await);

    log::info!("Starting Jiehan Hydraulic API server at http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .service(SwaggerUi::new("/api/docs/{_:.*}").url("/api/openapi.json", ApiDoc::openapi()))
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}
