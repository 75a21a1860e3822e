use crate::catalog::{product_matches, Catalog};
use crate::email::EmailService;
use crate::i18n::I18n;
use crate::images::{ImageLibrary, NewImage, MAX_IMAGE_BYTES};
use crate::inquiry::{validate_inquiry, InquiryService, SubmissionOutcome};
use crate::language::{
    should_redirect, url_for, Language, LanguageResolver, LanguageSignals, LANGUAGE_COOKIE,
};
use crate::models::{
    ApiResponse, CatalogStats, InquiryFormData, InquiryStatusUpdate, NewsInput,
    NewsListApiResponse, NewsPatch, NewsQuery, ProductApiResponse, ProductInput, ProductPatch,
    ProductQuery, ProductsApiResponse,
};
use crate::persistence::BlobStore;
use crate::store::MockStore;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie};
use actix_web::{get, http::header, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

pub struct AppState {
    pub catalog: Catalog,
    pub inquiries: InquiryService,
    pub images: ImageLibrary,
    pub resolver: LanguageResolver,
    pub i18n: I18n,
}

impl AppState {
    pub async fn open(
        port: Arc<dyn BlobStore>,
        resolver: LanguageResolver,
        email: EmailService,
    ) -> Self {
        let store = Arc::new(MockStore::open(port.clone()).await);
        let catalog = Catalog::new(store);
        Self {
            inquiries: InquiryService::new(catalog.clone(), Arc::new(email)),
            images: ImageLibrary::new(port),
            catalog,
            resolver,
            i18n: I18n::new(),
        }
    }

    fn t(&self, req: &HttpRequest, key: &str) -> String {
        self.i18n.t(request_language(req), key)
    }
}

fn saved_language(req: &HttpRequest) -> Option<String> {
    req.cookie(LANGUAGE_COOKIE).map(|c| c.value().to_string())
}

fn accept_language(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|h| h.to_str().ok())
}

/**
 * request_language
 * 用于接口提示语：language cookie → Accept-Language → 默认中文。
 */
fn request_language(req: &HttpRequest) -> Language {
    let saved = saved_language(req);
    let signals = LanguageSignals {
        saved: saved.as_deref(),
        path: None,
        accept_language: accept_language(req),
        client_ip: None,
    };
    LanguageResolver::detect_local(&signals).unwrap_or_default()
}

fn client_ip(req: &HttpRequest) -> Option<String> {
    let info = req.connection_info();
    let raw = info.realip_remote_addr()?;
    Some(
        raw.parse::<SocketAddr>()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|_| raw.to_string()),
    )
}

fn not_found(state: &AppState, req: &HttpRequest, key: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<()>::error("not_found", state.t(req, key)))
}

fn server_error(state: &AppState, req: &HttpRequest, err: anyhow::Error) -> HttpResponse {
    log::error!("Request failed: {:?}", err);
    HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
        "server_error",
        format!("{}: {}", state.t(req, "api.server_error"), err),
    ))
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthCheckResponse))
)]
#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthCheckResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses((status = 200, description = "Products in display order", body = ProductsApiResponse))
)]
pub async fn get_products(
    query: web::Query<ProductQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let query = query.into_inner();
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let term = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let mut products = match (category, term) {
        (Some(category), _) => state.catalog.products_by_category(category).await,
        (None, Some(term)) => state.catalog.search_products(term).await,
        _ if query.featured == Some(true) => state.catalog.featured_products().await,
        _ => state.catalog.all_products().await,
    };
    if let (Some(_), Some(term)) = (category, term) {
        products.retain(|p| product_matches(p, term));
    }
    if let Some(featured) = query.featured {
        products.retain(|p| p.is_featured == featured);
    }
    HttpResponse::Ok().json(ApiResponse::success(products))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ProductApiResponse),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_product_by_id(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state.catalog.product_by_id(&path.into_inner()).await {
        Some(product) => HttpResponse::Ok().json(ApiResponse::success(product)),
        None => not_found(&state, &req, "api.product_not_found"),
    }
}

pub async fn create_product(
    req: HttpRequest,
    input: web::Json<ProductInput>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state.catalog.create_product(input.into_inner()).await {
        Ok(product) => HttpResponse::Created().json(ApiResponse::success_with_message(
            product,
            state.t(&req, "api.product_created"),
        )),
        Err(e) => server_error(&state, &req, e),
    }
}

pub async fn update_product(
    req: HttpRequest,
    path: web::Path<String>,
    patch: web::Json<ProductPatch>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state
        .catalog
        .update_product(&path.into_inner(), patch.into_inner())
        .await
    {
        Ok(Some(product)) => HttpResponse::Ok().json(ApiResponse::success_with_message(
            product,
            state.t(&req, "api.product_updated"),
        )),
        Ok(None) => not_found(&state, &req, "api.product_not_found"),
        Err(e) => server_error(&state, &req, e),
    }
}

pub async fn delete_product(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    let id = path.into_inner();
    match state.catalog.delete_product(&id).await {
        Ok(true) => HttpResponse::Ok().json(ApiResponse::success_with_message(
            serde_json::json!({ "id": id }),
            state.t(&req, "api.product_deleted"),
        )),
        Ok(false) => not_found(&state, &req, "api.product_not_found"),
        Err(e) => server_error(&state, &req, e),
    }
}

#[utoipa::path(
    get,
    path = "/api/news",
    params(NewsQuery),
    responses((status = 200, description = "Published news, newest first", body = NewsListApiResponse))
)]
pub async fn get_news(query: web::Query<NewsQuery>, state: web::Data<AppState>) -> impl Responder {
    let limit = query.limit.map(|l| l.clamp(1, 50));
    let news = match (query.q.as_deref(), limit) {
        (Some(term), limit) => {
            let mut news = state.catalog.search_news(term).await;
            if let Some(limit) = limit {
                news.truncate(limit);
            }
            news
        }
        (None, Some(limit)) => state.catalog.latest_news(limit).await,
        (None, None) => state.catalog.published_news().await,
    };
    HttpResponse::Ok().json(ApiResponse::success(news))
}

pub async fn get_news_by_id(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state.catalog.news_by_id(&path.into_inner()).await {
        Some(article) => HttpResponse::Ok().json(ApiResponse::success(article)),
        None => not_found(&state, &req, "api.news_not_found"),
    }
}

pub async fn admin_list_news(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(state.catalog.all_news().await))
}

pub async fn create_news(
    req: HttpRequest,
    input: web::Json<NewsInput>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state.catalog.create_news(input.into_inner()).await {
        Ok(article) => HttpResponse::Created().json(ApiResponse::success_with_message(
            article,
            state.t(&req, "api.news_created"),
        )),
        Err(e) => server_error(&state, &req, e),
    }
}

pub async fn update_news(
    req: HttpRequest,
    path: web::Path<String>,
    patch: web::Json<NewsPatch>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state
        .catalog
        .update_news(&path.into_inner(), patch.into_inner())
        .await
    {
        Ok(Some(article)) => HttpResponse::Ok().json(ApiResponse::success_with_message(
            article,
            state.t(&req, "api.news_updated"),
        )),
        Ok(None) => not_found(&state, &req, "api.news_not_found"),
        Err(e) => server_error(&state, &req, e),
    }
}

pub async fn delete_news(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    let id = path.into_inner();
    match state.catalog.delete_news(&id).await {
        Ok(true) => HttpResponse::Ok().json(ApiResponse::success_with_message(
            serde_json::json!({ "id": id }),
            state.t(&req, "api.news_deleted"),
        )),
        Ok(false) => not_found(&state, &req, "api.news_not_found"),
        Err(e) => server_error(&state, &req, e),
    }
}

#[utoipa::path(
    post,
    path = "/api/inquiries",
    request_body = InquiryFormData,
    responses(
        (status = 201, description = "Inquiry stored", body = SubmissionOutcome),
        (status = 400, description = "Missing required fields")
    )
)]
pub async fn submit_inquiry(
    req: HttpRequest,
    form: web::Json<InquiryFormData>,
    state: web::Data<AppState>,
) -> impl Responder {
    let lang = request_language(&req);
    let form = form.into_inner();

    let errors = validate_inquiry(&form, lang, &state.i18n);
    if !errors.is_empty() {
        return HttpResponse::BadRequest().json(ApiResponse {
            success: false,
            data: Some(errors),
            message: Some(state.i18n.t(lang, "api.validation_error")),
            error: None,
        });
    }

    match state.inquiries.submit(form).await {
        Ok(outcome) => HttpResponse::Created().json(ApiResponse::success_with_message(
            outcome,
            state.i18n.t(lang, "form.success"),
        )),
        Err(e) => {
            log::error!("Error submitting inquiry: {:?}", e);
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "server_error",
                state.i18n.t(lang, "form.error"),
            ))
        }
    }
}

pub async fn list_inquiries(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(state.catalog.all_inquiries().await))
}

pub async fn update_inquiry_status(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<InquiryStatusUpdate>,
    state: web::Data<AppState>,
) -> impl Responder {
    let id = path.into_inner();
    match state.catalog.update_inquiry_status(&id, body.status).await {
        Ok(true) => HttpResponse::Ok().json(ApiResponse::success(
            serde_json::json!({ "id": id, "status": body.status }),
        )),
        Ok(false) => not_found(&state, &req, "api.inquiry_not_found"),
        Err(e) => server_error(&state, &req, e),
    }
}

pub async fn delete_inquiry(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    let id = path.into_inner();
    match state.catalog.delete_inquiry(&id).await {
        Ok(true) => HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "id": id }))),
        Ok(false) => not_found(&state, &req, "api.inquiry_not_found"),
        Err(e) => server_error(&state, &req, e),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses((status = 200, description = "Dashboard counters", body = CatalogStats))
)]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(state.catalog.stats().await))
}

pub async fn reset_data(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    state.catalog.store().reset().await;
    HttpResponse::Ok().json(ApiResponse::success_with_message(
        serde_json::json!({ "reset": true }),
        state.t(&req, "api.data_reset"),
    ))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResolveQuery {
    /// Path taking part in detection.
    pub path: Option<String>,
    /// Page the visitor is on, for the first-visit redirect check.
    pub current: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LanguageResolution {
    pub language: Language,
    pub redirect: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

/**
 * resolve_language
 * 汇总 cookie、路径、Accept-Language 与来访 IP，给出当前语言以及是否需要首访跳转。
 */
#[utoipa::path(
    get,
    path = "/api/language/resolve",
    params(ResolveQuery),
    responses((status = 200, description = "Resolved language", body = LanguageResolution))
)]
pub async fn resolve_language(
    req: HttpRequest,
    query: web::Query<ResolveQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let saved = saved_language(&req);
    let ip = client_ip(&req);
    let signals = LanguageSignals {
        saved: saved.as_deref(),
        path: query.path.as_deref(),
        accept_language: accept_language(&req),
        client_ip: ip.as_deref(),
    };
    let language = state.resolver.resolve(&signals).await;

    let current = query.current.as_deref().or(query.path.as_deref());
    let redirect = current
        .map(|p| should_redirect(language, p, saved.is_some()))
        .unwrap_or(false);
    let redirect_to = if redirect {
        current.map(|p| url_for(language, p))
    } else {
        None
    };

    HttpResponse::Ok().json(ApiResponse::success(LanguageResolution {
        language,
        redirect,
        redirect_to,
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LanguageUrlQuery {
    pub target: String,
    pub path: String,
}

#[utoipa::path(
    get,
    path = "/api/language/url",
    params(LanguageUrlQuery),
    responses(
        (status = 200, description = "Path in the target language"),
        (status = 400, description = "Unsupported language")
    )
)]
pub async fn language_url(
    req: HttpRequest,
    query: web::Query<LanguageUrlQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    match Language::parse(&query.target) {
        Some(target) => HttpResponse::Ok().json(ApiResponse::success(
            serde_json::json!({ "url": url_for(target, &query.path) }),
        )),
        None => HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "unsupported_language",
            state.t(&req, "api.validation_error"),
        )),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetLanguageRequest {
    pub language: Language,
}

pub async fn set_language(body: web::Json<SetLanguageRequest>) -> impl Responder {
    let language = body.language;
    let cookie = Cookie::build(LANGUAGE_COOKIE, language.code())
        .path("/")
        .max_age(CookieDuration::days(365))
        .finish();
    HttpResponse::Ok()
        .cookie(cookie)
        .json(ApiResponse::success(serde_json::json!({ "language": language })))
}

pub async fn list_languages() -> impl Responder {
    let languages: Vec<_> = Language::ALL.into_iter().map(Language::info).collect();
    HttpResponse::Ok().json(ApiResponse::success(languages))
}

pub async fn get_translations(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    match Language::from_tag(&path.into_inner()) {
        Some(lang) => HttpResponse::Ok().json(ApiResponse::success(state.i18n.catalog(lang))),
        None => HttpResponse::NotFound().json(ApiResponse::<()>::error(
            "unsupported_language",
            state.t(&req, "api.validation_error"),
        )),
    }
}

pub async fn list_images(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(state.images.list().await))
}

#[derive(Debug, Deserialize)]
pub struct ImageUploadQuery {
    pub filename: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Raw image bytes in the body, mime type from `Content-Type`.
pub async fn upload_image(
    req: HttpRequest,
    query: web::Query<ImageUploadQuery>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> impl Responder {
    let mime = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    let image = NewImage {
        filename: &query.filename,
        mime,
        bytes: &body,
        description: query.description.as_deref().unwrap_or(""),
        category: query.category.as_deref(),
    };
    match state.images.upload(image).await {
        Ok(Ok(uploaded)) => HttpResponse::Created().json(ApiResponse::success(uploaded)),
        Ok(Err(rejection)) => HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "invalid_image",
            state.t(&req, rejection.message_key()),
        )),
        Err(e) => server_error(&state, &req, e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageDescriptionUpdate {
    pub description: String,
}

pub async fn update_image(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<ImageDescriptionUpdate>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state
        .images
        .update_description(&path.into_inner(), &body.description)
        .await
    {
        Ok(Some(image)) => HttpResponse::Ok().json(ApiResponse::success(image)),
        Ok(None) => not_found(&state, &req, "api.image_not_found"),
        Err(e) => server_error(&state, &req, e),
    }
}

pub async fn delete_image(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    let id = path.into_inner();
    match state.images.delete(&id).await {
        Ok(true) => HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "id": id }))),
        Ok(false) => not_found(&state, &req, "api.image_not_found"),
        Err(e) => server_error(&state, &req, e),
    }
}

async fn api_not_found() -> impl Responder {
    HttpResponse::NotFound().json(ApiResponse::<()>::error("not_found", "Not found".to_string()))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health_check)
            .service(
                web::scope("/products")
                    .route("", web::get().to(get_products))
                    .route("/{id}", web::get().to(get_product_by_id)),
            )
            .service(
                web::scope("/news")
                    .route("", web::get().to(get_news))
                    .route("/{id}", web::get().to(get_news_by_id)),
            )
            .service(web::scope("/inquiries").route("", web::post().to(submit_inquiry)))
            .service(
                web::scope("/language")
                    .route("", web::post().to(set_language))
                    .route("/resolve", web::get().to(resolve_language))
                    .route("/url", web::get().to(language_url)),
            )
            .route("/languages", web::get().to(list_languages))
            .route("/i18n/{lang}", web::get().to(get_translations))
            .service(
                web::scope("/admin")
                    .app_data(web::PayloadConfig::new(MAX_IMAGE_BYTES * 2))
                    .route("/stats", web::get().to(get_stats))
                    .route("/reset", web::post().to(reset_data))
                    .route("/products", web::post().to(create_product))
                    .route("/products/{id}", web::put().to(update_product))
                    .route("/products/{id}", web::delete().to(delete_product))
                    .route("/news", web::get().to(admin_list_news))
                    .route("/news", web::post().to(create_news))
                    .route("/news/{id}", web::put().to(update_news))
                    .route("/news/{id}", web::delete().to(delete_news))
                    .route("/inquiries", web::get().to(list_inquiries))
                    .route(
                        "/inquiries/{id}/status",
                        web::put().to(update_inquiry_status),
                    )
                    .route("/inquiries/{id}", web::delete().to(delete_inquiry))
                    .route("/images", web::get().to(list_images))
                    .route("/images", web::post().to(upload_image))
                    .route("/images/{id}", web::put().to(update_image))
                    .route("/images/{id}", web::delete().to(delete_image)),
            )
            .default_service(web::to(api_not_found)),
    );
}
