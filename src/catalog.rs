use crate::models::{
    from_record, to_record, CatalogStats, CustomerInquiry, InquiryFormData, InquiryStatus, NewsArticle,
    NewsInput, NewsPatch, Product, ProductInput, ProductPatch,
};
use crate::store::{now_iso, MockStore, OrderOptions, Query, Record, StoreResponse};
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub const PRODUCTS: &str = "products";
pub const NEWS: &str = "news";
pub const INQUIRIES: &str = "customer_inquiries";

/**
 * Catalog
 * 站点数据的类型化访问层（产品、新闻、客户咨询），底层为 MockStore。
 * 读操作出错时降级为空结果并记录日志；写操作把错误交给调用方。
 */
#[derive(Clone)]
pub struct Catalog {
    store: Arc<MockStore>,
}

fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Record>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match from_record::<T>(row) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Skipping malformed {} record: {}", table, e);
                None
            }
        })
        .collect()
}

fn first_row<T: DeserializeOwned>(response: StoreResponse<Vec<Record>>) -> Result<T> {
    let row = response
        .into_result()?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("insert returned no rows"))?;
    from_record(row)
}

fn contains_term(fields: &[&str], term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty() || fields.iter().any(|f| f.to_lowercase().contains(&term))
}

/// Keyword match over both languages' names and descriptions plus the specifications.
pub fn product_matches(product: &Product, term: &str) -> bool {
    contains_term(
        &[
            &product.name_zh,
            &product.name_en,
            &product.description_zh,
            &product.description_en,
            &product.specifications,
        ],
        term,
    )
}

pub fn news_matches(article: &NewsArticle, term: &str) -> bool {
    contains_term(
        &[
            &article.title_zh,
            &article.title_en,
            &article.summary_zh,
            &article.summary_en,
            &article.content_zh,
            &article.content_en,
        ],
        term,
    )
}

impl Catalog {
    pub fn new(store: Arc<MockStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MockStore {
        &self.store
    }

    async fn read<T: DeserializeOwned>(&self, table: &str, query: Query<'_>) -> Vec<T> {
        match query.execute().await.into_result() {
            Ok(rows) => decode_rows(table, rows),
            Err(e) => {
                log::error!("Error fetching {}: {:?}", table, e);
                Vec::new()
            }
        }
    }

    async fn exists(&self, table: &str, id: &str) -> bool {
        let rows: Vec<Record> = self
            .read(table, self.store.from(table).select("id").eq("id", id).limit(1))
            .await;
        !rows.is_empty()
    }

    async fn patch_by_id(&self, table: &str, id: &str, mut patch: Record) -> Result<bool> {
        if !self.exists(table, id).await {
            return Ok(false);
        }
        patch.insert("updated_at".to_string(), Value::String(now_iso()));
        self.store
            .from(table)
            .update(patch)
            .eq("id", id)
            .execute()
            .await
            .into_result()?;
        Ok(true)
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> Result<bool> {
        let removed = self
            .store
            .from(table)
            .delete()
            .eq("id", id)
            .execute()
            .await
            .into_result()?;
        Ok(removed > 0)
    }

    pub async fn all_products(&self) -> Vec<Product> {
        let query = self
            .store
            .from(PRODUCTS)
            .select("*")
            .order("sort_order", OrderOptions::ascending());
        self.read(PRODUCTS, query).await
    }

    pub async fn products_by_category(&self, category: &str) -> Vec<Product> {
        let query = self
            .store
            .from(PRODUCTS)
            .select("*")
            .eq("category", category)
            .order("sort_order", OrderOptions::ascending());
        self.read(PRODUCTS, query).await
    }

    pub async fn featured_products(&self) -> Vec<Product> {
        let query = self
            .store
            .from(PRODUCTS)
            .select("*")
            .eq("is_featured", true)
            .order("sort_order", OrderOptions::ascending());
        self.read(PRODUCTS, query).await
    }

    pub async fn product_by_id(&self, id: &str) -> Option<Product> {
        let query = self
            .store
            .from(PRODUCTS)
            .select("*")
            .eq("id", id)
            .limit(1);
        self.read(PRODUCTS, query).await.into_iter().next()
    }

    pub async fn search_products(&self, term: &str) -> Vec<Product> {
        let mut products = self.all_products().await;
        products.retain(|p| product_matches(p, term));
        products
    }

    async fn next_sort_order(&self) -> i64 {
        let query = self
            .store
            .from(PRODUCTS)
            .select("sort_order")
            .order("sort_order", OrderOptions::descending())
            .limit(1);
        let top: Vec<Record> = self.read(PRODUCTS, query).await;
        top.first()
            .and_then(|row| row.get("sort_order"))
            .and_then(Value::as_i64)
            .unwrap_or(0)
            + 1
    }

    /// New products go to the end of the list unless a sort order is given.
    pub async fn create_product(&self, input: ProductInput) -> Result<Product> {
        let mut record = to_record(&input)?;
        if input.sort_order.is_none() {
            let next = self.next_sort_order().await;
            record.insert("sort_order".to_string(), Value::from(next));
        }
        let response = self
            .store
            .from(PRODUCTS)
            .insert(vec![record])
            .select("*")
            .execute()
            .await;
        first_row(response)
    }

    pub async fn update_product(&self, id: &str, patch: ProductPatch) -> Result<Option<Product>> {
        if !self.patch_by_id(PRODUCTS, id, to_record(&patch)?).await? {
            return Ok(None);
        }
        Ok(self.product_by_id(id).await)
    }

    pub async fn delete_product(&self, id: &str) -> Result<bool> {
        self.delete_by_id(PRODUCTS, id).await
    }

    pub async fn published_news(&self) -> Vec<NewsArticle> {
        let query = self
            .store
            .from(NEWS)
            .select("*")
            .eq("is_published", true)
            .order("published_at", OrderOptions::descending());
        self.read(NEWS, query).await
    }

    pub async fn latest_news(&self, limit: usize) -> Vec<NewsArticle> {
        let query = self
            .store
            .from(NEWS)
            .select("*")
            .eq("is_published", true)
            .order("published_at", OrderOptions::descending())
            .limit(limit);
        self.read(NEWS, query).await
    }

    pub async fn search_news(&self, term: &str) -> Vec<NewsArticle> {
        let mut news = self.published_news().await;
        news.retain(|n| news_matches(n, term));
        news
    }

    pub async fn all_news(&self) -> Vec<NewsArticle> {
        let query = self
            .store
            .from(NEWS)
            .select("*")
            .order("created_at", OrderOptions::descending());
        self.read(NEWS, query).await
    }

    pub async fn news_by_id(&self, id: &str) -> Option<NewsArticle> {
        let query = self
            .store
            .from(NEWS)
            .select("*")
            .eq("id", id)
            .eq("is_published", true)
            .limit(1);
        self.read(NEWS, query).await.into_iter().next()
    }

    pub async fn create_news(&self, input: NewsInput) -> Result<NewsArticle> {
        let mut record = to_record(&input)?;
        record.insert("published_at".to_string(), Value::String(now_iso()));
        let response = self
            .store
            .from(NEWS)
            .insert(vec![record])
            .select("*")
            .execute()
            .await;
        first_row(response)
    }

    pub async fn update_news(&self, id: &str, patch: NewsPatch) -> Result<Option<NewsArticle>> {
        if !self.patch_by_id(NEWS, id, to_record(&patch)?).await? {
            return Ok(None);
        }
        let query = self.store.from(NEWS).select("*").eq("id", id).limit(1);
        Ok(self.read(NEWS, query).await.into_iter().next())
    }

    pub async fn delete_news(&self, id: &str) -> Result<bool> {
        self.delete_by_id(NEWS, id).await
    }

    /**
     * submit_inquiry
     * 写入一条客户咨询（状态 pending），返回带 id 与时间戳的完整记录。
     */
    pub async fn submit_inquiry(&self, form: &InquiryFormData) -> Result<CustomerInquiry> {
        let mut record = to_record(form)?;
        record.insert(
            "status".to_string(),
            serde_json::to_value(InquiryStatus::Pending)?,
        );
        let response = self
            .store
            .from(INQUIRIES)
            .insert(vec![record])
            .select("*")
            .order("id", OrderOptions::ascending())
            .limit(1)
            .execute()
            .await;
        first_row(response)
    }

    pub async fn all_inquiries(&self) -> Vec<CustomerInquiry> {
        let query = self
            .store
            .from(INQUIRIES)
            .select("*")
            .order("created_at", OrderOptions::descending());
        self.read(INQUIRIES, query).await
    }

    pub async fn update_inquiry_status(&self, id: &str, status: InquiryStatus) -> Result<bool> {
        let mut patch = Record::new();
        patch.insert("status".to_string(), serde_json::to_value(status)?);
        self.patch_by_id(INQUIRIES, id, patch).await
    }

    pub async fn delete_inquiry(&self, id: &str) -> Result<bool> {
        self.delete_by_id(INQUIRIES, id).await
    }

    /**
     * stats
     * 后台概览：产品总数、推荐产品数、新闻总数（含未发布）、咨询总数。
     */
    pub async fn stats(&self) -> CatalogStats {
        let products = self.all_products().await;
        CatalogStats {
            total_products: products.len(),
            featured_products: products.iter().filter(|p| p.is_featured).count(),
            total_news: self.all_news().await.len(),
            total_inquiries: self.all_inquiries().await.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InquiryType;
    use crate::persistence::MemoryBlobStore;

    async fn catalog() -> Catalog {
        let store = MockStore::open(Arc::new(MemoryBlobStore::new())).await;
        Catalog::new(Arc::new(store))
    }

    fn pump_input() -> ProductInput {
        ProductInput {
            name_zh: "柱塞泵".to_string(),
            name_en: "Piston Pump".to_string(),
            description_zh: String::new(),
            description_en: String::new(),
            category: "液压泵".to_string(),
            specifications: "排量: 28 ml/r".to_string(),
            features: vec!["高压".to_string()],
            applications: vec![],
            image_url: None,
            is_featured: false,
            sort_order: None,
        }
    }

    fn inquiry_form() -> InquiryFormData {
        InquiryFormData {
            name: "张三".to_string(),
            company: Some("某机械厂".to_string()),
            phone: "13800000000".to_string(),
            email: None,
            product_interest: None,
            message: Some("需要齿轮泵报价".to_string()),
            inquiry_type: InquiryType::Consultation,
        }
    }

    #[tokio::test]
    async fn product_queries() {
        let catalog = catalog().await;
        assert_eq!(catalog.all_products().await.len(), 5);
        assert_eq!(catalog.products_by_category("液压泵").await.len(), 2);
        assert_eq!(catalog.featured_products().await.len(), 2);
        assert_eq!(
            catalog.product_by_id("3").await.map(|p| p.name_en),
            Some("Relief Valve".to_string())
        );
        assert!(catalog.product_by_id("missing").await.is_none());
    }

    #[tokio::test]
    async fn create_update_delete_product() {
        let catalog = catalog().await;
        let created = catalog.create_product(pump_input()).await.unwrap();
        assert_eq!(created.sort_order, 6);
        assert_eq!(catalog.all_products().await.last().unwrap().id, created.id);

        let updated = catalog
            .update_product(
                &created.id,
                ProductPatch {
                    is_featured: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(updated.is_featured);
        assert_eq!(updated.name_en, "Piston Pump");
        assert!(updated.updated_at >= created.updated_at);

        assert!(catalog
            .update_product("missing", ProductPatch::default())
            .await
            .unwrap()
            .is_none());

        assert!(catalog.delete_product(&created.id).await.unwrap());
        assert!(!catalog.delete_product(&created.id).await.unwrap());
        assert!(catalog.product_by_id(&created.id).await.is_none());
    }

    #[tokio::test]
    async fn unpublished_news_is_hidden() {
        let catalog = catalog().await;
        let draft = catalog
            .create_news(NewsInput {
                title_zh: "草稿".to_string(),
                title_en: "Draft".to_string(),
                content_zh: String::new(),
                content_en: String::new(),
                summary_zh: String::new(),
                summary_en: String::new(),
                category: "行业新闻".to_string(),
                image_url: None,
                is_featured: false,
                is_published: false,
            })
            .await
            .unwrap();

        assert_eq!(catalog.published_news().await.len(), 1);
        assert_eq!(catalog.all_news().await.len(), 2);
        assert!(catalog.news_by_id(&draft.id).await.is_none());
        assert!(catalog.news_by_id("1").await.is_some());

        let published = catalog
            .update_news(
                &draft.id,
                NewsPatch {
                    is_published: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(published.is_published);
        assert_eq!(catalog.latest_news(1).await.len(), 1);
        assert_eq!(catalog.latest_news(10).await.len(), 2);
    }

    #[tokio::test]
    async fn inquiry_lifecycle() {
        let catalog = catalog().await;
        let inquiry = catalog.submit_inquiry(&inquiry_form()).await.unwrap();
        assert_eq!(inquiry.status, InquiryStatus::Pending);
        assert_eq!(inquiry.company.as_deref(), Some("某机械厂"));

        let all = catalog.all_inquiries().await;
        assert_eq!(all, vec![inquiry.clone()]);

        assert!(catalog
            .update_inquiry_status(&inquiry.id, InquiryStatus::Completed)
            .await
            .unwrap());
        assert_eq!(
            catalog.all_inquiries().await[0].status,
            InquiryStatus::Completed
        );
        assert!(!catalog
            .update_inquiry_status("missing", InquiryStatus::Processing)
            .await
            .unwrap());

        assert!(catalog.delete_inquiry(&inquiry.id).await.unwrap());
        assert!(catalog.all_inquiries().await.is_empty());
    }

    #[tokio::test]
    async fn sort_order_follows_the_highest_after_deletes() {
        let catalog = catalog().await;
        assert!(catalog.delete_product("2").await.unwrap());
        let created = catalog.create_product(pump_input()).await.unwrap();
        assert_eq!(created.sort_order, 6);

        let explicit = catalog
            .create_product(ProductInput {
                sort_order: Some(40),
                ..pump_input()
            })
            .await
            .unwrap();
        assert_eq!(explicit.sort_order, 40);
        assert_eq!(catalog.create_product(pump_input()).await.unwrap().sort_order, 41);
    }

    #[tokio::test]
    async fn keyword_search() {
        let catalog = catalog().await;
        let hits = catalog.search_products("GEAR pump").await;
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|p| p.category == "液压泵"));
        assert_eq!(catalog.search_products("溢流").await.len(), 1);
        assert_eq!(catalog.search_products("  ").await.len(), 5);
        assert!(catalog.search_products("turbine").await.is_empty());

        let article = &catalog.published_news().await[0];
        let word = article.title_en.split_whitespace().next().unwrap().to_uppercase();
        assert_eq!(catalog.search_news(&word).await.len(), 1);
        assert!(catalog.search_news("no such headline").await.is_empty());
    }

    #[tokio::test]
    async fn dashboard_stats() {
        let catalog = catalog().await;
        catalog.submit_inquiry(&inquiry_form()).await.unwrap();
        assert_eq!(
            catalog.stats().await,
            CatalogStats {
                total_products: 5,
                featured_products: 2,
                total_news: 1,
                total_inquiries: 1,
            }
        );
    }

    #[tokio::test]
    async fn malformed_rows_are_skipped() {
        let catalog = catalog().await;
        let mut junk = Record::new();
        junk.insert("category".to_string(), Value::from("液压泵"));
        catalog
            .store()
            .from(PRODUCTS)
            .insert(vec![junk])
            .execute()
            .await;
        assert_eq!(catalog.products_by_category("液压泵").await.len(), 2);
    }
}
