// Language detection and language-qualified paths.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

/// Cookie carrying the saved language preference of a visitor.
pub const LANGUAGE_COOKIE: &str = "language";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

pub struct LanguageConfig {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    pub countries: &'static [&'static str],
    pub browser_languages: &'static [&'static str],
}

static ZH: LanguageConfig = LanguageConfig {
    code: "zh",
    name: "Chinese",
    native_name: "中文",
    countries: &["CN", "TW", "HK", "MO", "SG"],
    browser_languages: &["zh", "zh-CN", "zh-TW", "zh-HK", "zh-SG"],
};

static EN: LanguageConfig = LanguageConfig {
    code: "en",
    name: "English",
    native_name: "English",
    countries: &["US", "GB", "CA", "AU", "NZ", "IE", "ZA"],
    browser_languages: &["en", "en-US", "en-GB", "en-CA", "en-AU", "en-NZ"],
};

/// Display data for a language switcher.
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct LanguageInfo {
    pub code: Language,
    pub name: String,
    pub native_name: String,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Zh, Language::En];

    pub fn info(self) -> LanguageInfo {
        let config = self.config();
        LanguageInfo {
            code: self,
            name: config.name.to_string(),
            native_name: config.native_name.to_string(),
        }
    }

    pub fn code(self) -> &'static str {
        self.config().code
    }

    pub fn config(self) -> &'static LanguageConfig {
        match self {
            Language::Zh => &ZH,
            Language::En => &EN,
        }
    }

    /// Strict parse of a stored language code.
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.code() == code.trim())
    }

    /**
     * from_tag
     * 解析 BCP 47 标签（如 zh-Hant-TW、en_US），只取主语言子标签。
     */
    pub fn from_tag(tag: &str) -> Option<Self> {
        let id: unic_langid::LanguageIdentifier = tag.trim().replace('_', "-").parse().ok()?;
        Self::parse(id.language.as_str())
    }

    /// The default language is served without a path prefix.
    pub fn path_prefix(self) -> Option<String> {
        match self {
            Language::Zh => None,
            other => Some(format!("/{}", other.code())),
        }
    }
}

/**
 * country_to_language
 * 国家代码映射到语言；未收录的国家按英语处理。
 */
pub fn country_to_language(country_code: &str) -> Language {
    let code = country_code.trim().to_ascii_uppercase();
    Language::ALL
        .into_iter()
        .find(|l| l.config().countries.contains(&code.as_str()))
        .unwrap_or(Language::En)
}

pub fn detect_from_saved(saved: Option<&str>) -> Option<Language> {
    saved.and_then(Language::parse)
}

/// Remainder of `path` after an `/en` segment, if it has one.
fn strip_en_prefix(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/en")?;
    match rest.chars().next() {
        None | Some('/') | Some('?') | Some('#') => Some(rest),
        Some(_) => None,
    }
}

pub fn detect_from_path(path: &str) -> Language {
    if strip_en_prefix(path).is_some() {
        Language::En
    } else {
        Language::Zh
    }
}

/// Header entries ordered by descending `q` (stable for ties), `q=0` dropped.
fn by_quality(header: &str) -> Vec<&str> {
    let mut entries: Vec<(f32, &str)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() {
                return None;
            }
            let quality = parts
                .find_map(|p| p.trim().strip_prefix("q="))
                .map(|q| q.trim().parse::<f32>().unwrap_or(0.0))
                .unwrap_or(1.0);
            (quality > 0.0).then_some((quality, tag))
        })
        .collect();
    entries.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    entries.into_iter().map(|(_, tag)| tag).collect()
}

/**
 * detect_from_browser
 * 按 Accept-Language 的 q 值从高到低逐个比对，前缀命中任一已知标签即返回。
 */
pub fn detect_from_browser(accept_language: Option<&str>) -> Option<Language> {
    let header = accept_language?.trim();
    if header.is_empty() {
        return None;
    }
    let ordered = by_quality(header).join(",");
    fluent_langneg::accepted_languages::parse(&ordered)
        .into_iter()
        .map(|tag| tag.to_string())
        .find_map(|tag| {
            Language::ALL.into_iter().find(|l| {
                l.config()
                    .browser_languages
                    .iter()
                    .any(|known| tag.starts_with(known))
            })
        })
}

/**
 * url_for
 * 去掉已有的 /en 前缀，再按目标语言补回前缀；中文为默认语言不带前缀。
 */
pub fn url_for(target: Language, current_path: &str) -> String {
    let base = strip_en_prefix(current_path).unwrap_or(current_path);
    let base = if base.is_empty() || base.starts_with('?') || base.starts_with('#') {
        format!("/{}", base)
    } else if base.starts_with('/') {
        base.to_string()
    } else {
        format!("/{}", base)
    };

    match target.path_prefix() {
        None => base,
        Some(prefix) if base == "/" => prefix,
        Some(prefix) if base.starts_with("/?") || base.starts_with("/#") => {
            format!("{}{}", prefix, &base[1..])
        }
        Some(prefix) => format!("{}{}", prefix, base),
    }
}

/// First visit only: no saved preference, English detected, bare root.
pub fn should_redirect(detected: Language, current_path: &str, has_saved_preference: bool) -> bool {
    !has_saved_preference && detected == Language::En && current_path == "/"
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageSignals<'a> {
    pub saved: Option<&'a str>,
    pub path: Option<&'a str>,
    pub accept_language: Option<&'a str>,
    pub client_ip: Option<&'a str>,
}

#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// Country code of `client_ip`, or of the caller when `None`.
    async fn country_code(&self, client_ip: Option<&str>) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    country_code: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

pub struct IpApiLocator {
    client: Client,
    endpoint: String,
}

impl IpApiLocator {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let endpoint = env::var("GEOIP_ENDPOINT").unwrap_or_else(|_| "https://ipapi.co".to_string());
        Self::new(&endpoint, geoip_timeout())
    }

    fn lookup_url(&self, client_ip: Option<&str>) -> String {
        match client_ip.and_then(public_ip) {
            Some(ip) => format!("{}/{}/json/", self.endpoint, urlencoding::encode(ip)),
            None => format!("{}/json/", self.endpoint),
        }
    }
}

pub fn geoip_timeout() -> Duration {
    let secs = env::var("GEOIP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(3);
    Duration::from_secs(secs)
}

/// Loopback and private peers share the server's location.
fn public_ip(raw: &str) -> Option<&str> {
    let ip: IpAddr = raw.trim().parse().ok()?;
    let local = match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_unspecified(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    };
    if local {
        None
    } else {
        Some(raw.trim())
    }
}

#[async_trait]
impl GeoLocator for IpApiLocator {
    async fn country_code(&self, client_ip: Option<&str>) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.lookup_url(client_ip))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Geolocation lookup failed: {}. Body: {}",
                status,
                body
            ));
        }

        let payload: IpApiResponse = response.json().await?;
        if payload.error {
            return Err(anyhow::anyhow!(
                "Geolocation lookup rejected: {}",
                payload.reason.unwrap_or_default()
            ));
        }
        Ok(payload.country_code.filter(|c| !c.trim().is_empty()))
    }
}

/**
 * LanguageResolver
 * 依次检查：已保存偏好 → URL 前缀 → 浏览器语言 → IP 地理位置 → 默认中文。
 * 任何一步失败都只视为“无信号”，解析总能得到受支持的语言。
 */
pub struct LanguageResolver {
    geo: Option<Arc<dyn GeoLocator>>,
    geo_timeout: Duration,
}

impl LanguageResolver {
    pub fn new(geo: Arc<dyn GeoLocator>, geo_timeout: Duration) -> Self {
        Self {
            geo: Some(geo),
            geo_timeout,
        }
    }

    pub fn without_geolocation() -> Self {
        Self {
            geo: None,
            geo_timeout: Duration::ZERO,
        }
    }

    /// Steps that need no network.
    pub fn detect_local(signals: &LanguageSignals<'_>) -> Option<Language> {
        detect_from_saved(signals.saved)
            .or_else(|| signals.path.map(detect_from_path))
            .or_else(|| detect_from_browser(signals.accept_language))
    }

    pub async fn detect_from_location(&self, client_ip: Option<&str>) -> Option<Language> {
        let geo = self.geo.as_ref()?;
        match tokio::time::timeout(self.geo_timeout, geo.country_code(client_ip)).await {
            Ok(Ok(Some(code))) => Some(country_to_language(&code)),
            Ok(Ok(None)) => {
                log::warn!("Geolocation response carried no country code");
                None
            }
            Ok(Err(e)) => {
                log::warn!("Geolocation lookup failed: {:?}", e);
                None
            }
            Err(_) => {
                log::warn!("Geolocation lookup timed out after {:?}", self.geo_timeout);
                None
            }
        }
    }

    pub async fn resolve(&self, signals: &LanguageSignals<'_>) -> Language {
        if let Some(language) = Self::detect_local(signals) {
            return language;
        }
        if let Some(language) = self.detect_from_location(signals.client_ip).await {
            return language;
        }
        Language::default()
    }
}
