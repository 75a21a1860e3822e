use crate::persistence::{BlobStore, TABLES_KEY};
use crate::seed;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub type Record = serde_json::Map<String, Value>;
pub type Tables = BTreeMap<String, Vec<Record>>;

/**
 * MockStore
 * 本地表存储：以默认数据或持久化快照启动，每次写操作后整体写回持久化端口。
 * 对外暴露与远程 REST 客户端相同的链式接口（select/insert/update/delete）。
 */
pub struct MockStore {
    tables: Mutex<Tables>,
    port: Arc<dyn BlobStore>,
    // Held across snapshot and write so an older snapshot never lands last.
    persist_lock: tokio::sync::Mutex<()>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreError {
    pub code: String,
    pub message: String,
}

/// `{ data, error }` result shape shared with a real remote backend.
#[derive(Debug, Clone, Serialize)]
pub struct StoreResponse<T> {
    pub data: Option<T>,
    pub error: Option<StoreError>,
}

impl<T> StoreResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn into_result(self) -> anyhow::Result<T> {
        if let Some(err) = self.error {
            return Err(anyhow::anyhow!("{}: {}", err.code, err.message));
        }
        self.data
            .ok_or_else(|| anyhow::anyhow!("store returned neither data nor error"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderOptions {
    pub ascending: bool,
}

impl OrderOptions {
    pub fn ascending() -> Self {
        Self { ascending: true }
    }

    pub fn descending() -> Self {
        Self { ascending: false }
    }
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self::ascending()
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/**
 * generate_id
 * 当前毫秒时间戳 + 9 位随机后缀。
 */
pub fn generate_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", Utc::now().timestamp_millis(), &suffix[..9])
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn stamp_record(mut record: Record, now: &str) -> Record {
    if is_blank(record.get("id")) {
        record.insert("id".to_string(), Value::String(generate_id()));
    }
    for field in ["created_at", "updated_at"] {
        if is_blank(record.get(field)) {
            record.insert(field.to_string(), Value::String(now.to_string()));
        }
    }
    record
}

/// Field equality with scalar semantics: numbers compare by value,
/// arrays and objects never match.
fn field_matches(field: Option<&Value>, expected: &Value) -> bool {
    match (field, expected) {
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(Value::Array(_)) | Some(Value::Object(_)), _) => false,
        (Some(actual), expected) => actual == expected,
        (None, _) => false,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_present(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Missing and null values sort last in either direction.
fn compare_field(a: Option<&Value>, b: Option<&Value>, ascending: bool) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = compare_present(x, y);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Criteria {
    columns: Option<Vec<String>>,
    filters: Vec<(String, Value)>,
    order: Option<(String, OrderOptions)>,
    limit: Option<usize>,
}

impl Criteria {
    fn with_columns(columns: &str) -> Self {
        let list: Vec<String> = columns
            .split(',')
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect();
        let columns = if list.is_empty() || list.iter().any(|c| c == "*") {
            None
        } else {
            Some(list)
        };
        Self {
            columns,
            ..Default::default()
        }
    }

    /// filter -> stable sort -> limit -> projection
    fn evaluate(&self, rows: &[Record]) -> Vec<Record> {
        let mut matched: Vec<&Record> = rows
            .iter()
            .filter(|row| {
                self.filters
                    .iter()
                    .all(|(field, value)| field_matches(row.get(field), value))
            })
            .collect();

        if let Some((field, options)) = &self.order {
            matched.sort_by(|a, b| compare_field(a.get(field), b.get(field), options.ascending));
        }
        if let Some(n) = self.limit {
            matched.truncate(n);
        }

        matched.into_iter().map(|row| self.project(row)).collect()
    }

    fn project(&self, row: &Record) -> Record {
        match &self.columns {
            None => row.clone(),
            Some(columns) => columns
                .iter()
                .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                .collect(),
        }
    }
}

impl MockStore {
    /**
     * open
     * 读取持久化快照；不存在或无法解析时使用默认数据。
     */
    pub async fn open(port: Arc<dyn BlobStore>) -> Self {
        let tables = load_tables(port.as_ref()).await;
        Self {
            tables: Mutex::new(tables),
            port,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from(&self, table: &str) -> TableRef<'_> {
        TableRef {
            store: self,
            table: table.to_string(),
        }
    }

    /// Discards the working set, restores the seed data and persists it.
    pub async fn reset(&self) {
        *self.lock() = seed::default_tables();
        log::info!("Store reset to default seed data");
        self.persist().await;
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Tables {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /**
     * persist
     * 整体覆盖写入；失败时仅记录日志，内存数据继续生效。
     * 写入串行化，快照在持锁后才取，最后落盘的总是最新状态。
     */
    async fn persist(&self) {
        let _writing = self.persist_lock.lock().await;
        let serialized = serde_json::to_string(&*self.lock());
        let raw = match serialized {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("Failed to serialize store: {}", e);
                return;
            }
        };
        match self.port.set(TABLES_KEY, &raw).await {
            Ok(()) => log::debug!("Store persisted ({} bytes)", raw.len()),
            Err(e) => log::error!("Failed to persist store, keeping in-memory data: {:?}", e),
        }
    }
}

async fn load_tables(port: &dyn BlobStore) -> Tables {
    match port.get(TABLES_KEY).await {
        Ok(Some(raw)) => match serde_json::from_str::<Tables>(&raw) {
            Ok(tables) => {
                log::info!("Loaded persisted store with {} tables", tables.len());
                return tables;
            }
            Err(e) => log::error!("Persisted store is unreadable: {}", e),
        },
        Ok(None) => {}
        Err(e) => log::error!("Failed to load persisted store: {:?}", e),
    }
    log::info!("Using default seed data");
    seed::default_tables()
}

pub struct TableRef<'a> {
    store: &'a MockStore,
    table: String,
}

impl<'a> TableRef<'a> {
    /// `columns` is a comma separated projection; `*` returns full records.
    pub fn select(self, columns: &str) -> Query<'a> {
        Query {
            store: self.store,
            table: self.table,
            criteria: Criteria::with_columns(columns),
        }
    }

    pub fn insert(self, records: Vec<Record>) -> Insert<'a> {
        Insert {
            store: self.store,
            table: self.table,
            records,
        }
    }

    pub fn update(self, patch: Record) -> Update<'a> {
        Update {
            store: self.store,
            table: self.table,
            patch,
        }
    }

    pub fn delete(self) -> Delete<'a> {
        Delete {
            store: self.store,
            table: self.table,
        }
    }
}

#[must_use = "a query does nothing until executed"]
pub struct Query<'a> {
    store: &'a MockStore,
    table: String,
    criteria: Criteria,
}

impl<'a> Query<'a> {
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.criteria.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order(mut self, field: &str, options: OrderOptions) -> Self {
        self.criteria.order = Some((field.to_string(), options));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.criteria.limit = Some(count);
        self
    }

    pub async fn execute(self) -> StoreResponse<Vec<Record>> {
        let rows = {
            let tables = self.store.lock();
            match tables.get(&self.table) {
                Some(rows) => self.criteria.evaluate(rows),
                None => Vec::new(),
            }
        };
        log::debug!(
            "select {} filters={:?} -> {} rows",
            self.table,
            self.criteria.filters,
            rows.len()
        );
        StoreResponse::ok(rows)
    }
}

#[must_use = "an insert does nothing until executed"]
pub struct Insert<'a> {
    store: &'a MockStore,
    table: String,
    records: Vec<Record>,
}

impl<'a> Insert<'a> {
    /// Chains a read over the inserted records only.
    pub fn select(self, columns: &str) -> InsertSelect<'a> {
        InsertSelect {
            insert: self,
            criteria: Criteria::with_columns(columns),
        }
    }

    pub async fn execute(self) -> StoreResponse<Vec<Record>> {
        let now = now_iso();
        let inserted: Vec<Record> = self
            .records
            .into_iter()
            .map(|r| stamp_record(r, &now))
            .collect();
        {
            let mut tables = self.store.lock();
            tables
                .entry(self.table.clone())
                .or_default()
                .extend(inserted.iter().cloned());
        }
        log::debug!("insert {} -> {} rows", self.table, inserted.len());
        self.store.persist().await;
        StoreResponse::ok(inserted)
    }
}

#[must_use = "an insert does nothing until executed"]
pub struct InsertSelect<'a> {
    insert: Insert<'a>,
    criteria: Criteria,
}

impl<'a> InsertSelect<'a> {
    pub fn order(mut self, field: &str, options: OrderOptions) -> Self {
        self.criteria.order = Some((field.to_string(), options));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.criteria.limit = Some(count);
        self
    }

    pub async fn execute(self) -> StoreResponse<Vec<Record>> {
        let criteria = self.criteria;
        let response = self.insert.execute().await;
        match response.data {
            Some(rows) => StoreResponse::ok(criteria.evaluate(&rows)),
            None => StoreResponse {
                data: None,
                error: response.error,
            },
        }
    }
}

pub struct Update<'a> {
    store: &'a MockStore,
    table: String,
    patch: Record,
}

impl<'a> Update<'a> {
    pub fn eq(self, field: &str, value: impl Into<Value>) -> UpdateEq<'a> {
        UpdateEq {
            update: self,
            field: field.to_string(),
            value: value.into(),
        }
    }
}

#[must_use = "an update does nothing until executed"]
pub struct UpdateEq<'a> {
    update: Update<'a>,
    field: String,
    value: Value,
}

impl UpdateEq<'_> {
    /**
     * execute
     * 浅合并到第一条匹配记录；无匹配时不改动也不写回。返回值携带 patch 本身。
     */
    pub async fn execute(self) -> StoreResponse<Record> {
        let Update {
            store,
            table,
            patch,
        } = self.update;
        let matched = {
            let mut tables = store.lock();
            let row = tables.get_mut(&table).and_then(|rows| {
                rows.iter_mut()
                    .find(|row| field_matches(row.get(&self.field), &self.value))
            });
            match row {
                Some(row) => {
                    for (k, v) in &patch {
                        row.insert(k.clone(), v.clone());
                    }
                    true
                }
                None => false,
            }
        };
        log::debug!(
            "update {} where {}={} matched={}",
            table,
            self.field,
            self.value,
            matched
        );
        if matched {
            store.persist().await;
        }
        StoreResponse::ok(patch)
    }
}

pub struct Delete<'a> {
    store: &'a MockStore,
    table: String,
}

impl<'a> Delete<'a> {
    pub fn eq(self, field: &str, value: impl Into<Value>) -> DeleteEq<'a> {
        DeleteEq {
            delete: self,
            field: field.to_string(),
            value: value.into(),
        }
    }
}

#[must_use = "a delete does nothing until executed"]
pub struct DeleteEq<'a> {
    delete: Delete<'a>,
    field: String,
    value: Value,
}

impl DeleteEq<'_> {
    /// Removes every match and reports how many rows went away.
    pub async fn execute(self) -> StoreResponse<usize> {
        let store = self.delete.store;
        let table = self.delete.table;
        let removed = {
            let mut tables = store.lock();
            match tables.get_mut(&table) {
                Some(rows) => {
                    let before = rows.len();
                    rows.retain(|row| !field_matches(row.get(&self.field), &self.value));
                    Some(before - rows.len())
                }
                None => None,
            }
        };
        log::debug!(
            "delete {} where {}={} removed={:?}",
            table,
            self.field,
            self.value,
            removed
        );
        if removed.is_some() {
            store.persist().await;
        }
        StoreResponse::ok(removed.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBlobStore;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    async fn seeded() -> (MockStore, Arc<MemoryBlobStore>) {
        let port = Arc::new(MemoryBlobStore::new());
        let store = MockStore::open(port.clone()).await;
        (store, port)
    }

    fn persisted(port_raw: Option<String>) -> Tables {
        serde_json::from_str(&port_raw.expect("store was persisted")).unwrap()
    }

    #[tokio::test]
    async fn open_without_snapshot_uses_seed() {
        let (store, _) = seeded().await;
        let products = store
            .from("products")
            .select("*")
            .order("sort_order", OrderOptions::ascending())
            .execute()
            .await
            .into_result()
            .unwrap();
        assert_eq!(products.len(), 5);
        assert!(store.snapshot().contains_key("customer_inquiries"));
    }

    #[tokio::test]
    async fn open_prefers_persisted_snapshot() {
        let port = Arc::new(MemoryBlobStore::new());
        port.set(TABLES_KEY, r#"{"products":[{"id":"x","category":"液压泵"}]}"#)
            .await
            .unwrap();
        let store = MockStore::open(port).await;
        let rows = store.from("products").select("*").execute().await.data.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("x"));
    }

    #[tokio::test]
    async fn open_falls_back_to_seed_on_corrupt_snapshot() {
        let port = Arc::new(MemoryBlobStore::new());
        port.set(TABLES_KEY, "{not json").await.unwrap();
        let store = MockStore::open(port).await;
        assert_eq!(store.snapshot()["products"].len(), 5);
    }

    #[tokio::test]
    async fn limit_returns_first_rows_in_storage_order() {
        let (store, _) = seeded().await;
        let all = store.snapshot()["products"].clone();
        let rows = store
            .from("products")
            .select("*")
            .limit(3)
            .order("sort_order", OrderOptions::ascending())
            .execute()
            .await
            .data
            .unwrap();
        assert_eq!(rows, all[..3].to_vec());
    }

    #[tokio::test]
    async fn eq_filters_on_exact_value() {
        let (store, _) = seeded().await;
        let rows = store
            .from("products")
            .select("*")
            .eq("category", "液压泵")
            .order("created_at", OrderOptions::descending())
            .execute()
            .await
            .data
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["category"] == json!("液压泵")));

        let none = store
            .from("products")
            .select("*")
            .eq("category", "液压")
            .execute()
            .await
            .data
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn repeated_eq_filters_are_combined() {
        let (store, _) = seeded().await;
        let rows = store
            .from("products")
            .select("*")
            .eq("category", "液压泵")
            .eq("is_featured", true)
            .eq("sort_order", 2)
            .execute()
            .await
            .data
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("2"));
    }

    #[tokio::test]
    async fn order_sorts_and_keeps_missing_last() {
        let (store, _) = seeded().await;
        store
            .from("scores")
            .insert(vec![
                record(json!({"id": "a", "n": 2})),
                record(json!({"id": "b"})),
                record(json!({"id": "c", "n": 10})),
                record(json!({"id": "d", "n": 2.5})),
            ])
            .execute()
            .await;

        let ids = |rows: Vec<Record>| -> Vec<String> {
            rows.iter()
                .map(|r| r["id"].as_str().unwrap().to_string())
                .collect()
        };
        let asc = store
            .from("scores")
            .select("id")
            .order("n", OrderOptions::ascending())
            .execute()
            .await
            .data
            .unwrap();
        assert_eq!(ids(asc), vec!["a", "d", "c", "b"]);

        let desc = store
            .from("scores")
            .select("id")
            .order("n", OrderOptions::descending())
            .limit(2)
            .execute()
            .await
            .data
            .unwrap();
        assert_eq!(ids(desc), vec!["c", "d"]);
    }

    #[tokio::test]
    async fn select_projects_requested_columns() {
        let (store, _) = seeded().await;
        let rows = store
            .from("products")
            .select("id, name_en")
            .limit(1)
            .execute()
            .await
            .data
            .unwrap();
        assert_eq!(rows[0].len(), 2);
        assert!(rows[0].contains_key("name_en"));
        assert!(!rows[0].contains_key("category"));
    }

    #[tokio::test]
    async fn unknown_table_reads_empty_and_insert_creates_it() {
        let (store, _) = seeded().await;
        let rows = store.from("ghosts").select("*").execute().await;
        assert_eq!(rows.data, Some(vec![]));
        assert!(rows.error.is_none());

        store
            .from("ghosts")
            .insert(vec![record(json!({"name": "boo"}))])
            .execute()
            .await;
        assert_eq!(store.snapshot()["ghosts"].len(), 1);
    }

    #[tokio::test]
    async fn insert_then_select_by_id_round_trips() {
        let (store, port) = seeded().await;
        let inserted = store
            .from("customer_inquiries")
            .insert(vec![record(json!({
                "name": "李四",
                "phone": "13900000000",
                "inquiry_type": "general"
            }))])
            .select("*")
            .order("id", OrderOptions::ascending())
            .limit(1)
            .execute()
            .await
            .into_result()
            .unwrap();
        assert_eq!(inserted.len(), 1);
        let row = &inserted[0];
        let id = row["id"].as_str().unwrap().to_string();
        assert!(id.len() > 9);
        assert!(row.contains_key("created_at"));
        assert!(row.contains_key("updated_at"));

        let found = store
            .from("customer_inquiries")
            .select("*")
            .eq("id", id.as_str())
            .execute()
            .await
            .data
            .unwrap();
        assert_eq!(found, inserted);

        let saved = persisted(port.get(TABLES_KEY).await.unwrap());
        assert_eq!(saved["customer_inquiries"], found);
    }

    #[tokio::test]
    async fn insert_keeps_caller_supplied_id_and_timestamps() {
        let (store, _) = seeded().await;
        let rows = store
            .from("products")
            .insert(vec![record(json!({
                "id": "custom",
                "created_at": "2024-01-01T00:00:00.000Z"
            }))])
            .execute()
            .await
            .data
            .unwrap();
        assert_eq!(rows[0]["id"], json!("custom"));
        assert_eq!(rows[0]["created_at"], json!("2024-01-01T00:00:00.000Z"));
        assert_ne!(rows[0]["updated_at"], json!("2024-01-01T00:00:00.000Z"));
    }

    #[tokio::test]
    async fn insert_select_only_sees_new_rows() {
        let (store, _) = seeded().await;
        let rows = store
            .from("products")
            .insert(vec![
                record(json!({"name_en": "A"})),
                record(json!({"name_en": "B"})),
            ])
            .select("name_en")
            .execute()
            .await
            .data
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(store.snapshot()["products"].len(), 7);
    }

    #[tokio::test]
    async fn generated_ids_are_unique() {
        let (store, _) = seeded().await;
        let rows = store
            .from("customer_inquiries")
            .insert((0..50).map(|i| record(json!({ "n": i }))).collect())
            .execute()
            .await
            .data
            .unwrap();
        let mut ids: Vec<_> = rows.iter().map(|r| r["id"].clone().to_string()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[tokio::test]
    async fn update_merges_into_first_match_and_returns_patch() {
        let (store, port) = seeded().await;
        let patch = record(json!({"is_featured": false, "sort_order": 9}));
        let response = store
            .from("products")
            .update(patch.clone())
            .eq("id", "1")
            .execute()
            .await;
        assert_eq!(response.data, Some(patch));

        let row = store
            .from("products")
            .select("*")
            .eq("id", "1")
            .execute()
            .await
            .data
            .unwrap()
            .remove(0);
        assert_eq!(row["is_featured"], json!(false));
        assert_eq!(row["sort_order"], json!(9));
        assert_eq!(row["name_en"], json!("Single Gear Pump"));

        let saved = persisted(port.get(TABLES_KEY).await.unwrap());
        assert_eq!(saved["products"][0]["sort_order"], json!(9));
    }

    #[tokio::test]
    async fn update_missing_row_leaves_table_unchanged() {
        let (store, port) = seeded().await;
        let before = store.snapshot();
        let response = store
            .from("products")
            .update(record(json!({"name_en": "x"})))
            .eq("id", "does-not-exist")
            .execute()
            .await;
        assert!(response.error.is_none());
        assert_eq!(store.snapshot(), before);
        assert_eq!(port.get(TABLES_KEY).await.unwrap(), None);

        store
            .from("nowhere")
            .update(record(json!({"a": 1})))
            .eq("id", "1")
            .execute()
            .await;
        assert!(!store.snapshot().contains_key("nowhere"));
    }

    #[tokio::test]
    async fn delete_removes_every_match() {
        let (store, _) = seeded().await;
        let removed = store
            .from("products")
            .delete()
            .eq("category", "液压泵")
            .execute()
            .await
            .into_result()
            .unwrap();
        assert_eq!(removed, 2);

        let gone = store
            .from("products")
            .select("*")
            .eq("id", "1")
            .execute()
            .await
            .data
            .unwrap();
        assert!(gone.is_empty());
        assert_eq!(store.snapshot()["products"].len(), 3);
    }

    #[tokio::test]
    async fn delete_on_unknown_table_is_noop() {
        let (store, _) = seeded().await;
        let removed = store.from("nope").delete().eq("id", "1").execute().await;
        assert_eq!(removed.data, Some(0));
    }

    #[tokio::test]
    async fn persistence_failure_keeps_in_memory_state() {
        let port = Arc::new(MemoryBlobStore::failing_writes());
        let store = MockStore::open(port.clone()).await;
        let response = store
            .from("customer_inquiries")
            .insert(vec![record(json!({"name": "王五"}))])
            .execute()
            .await;
        assert!(response.error.is_none());
        assert_eq!(store.snapshot()["customer_inquiries"].len(), 1);
        assert_eq!(port.get(TABLES_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reset_restores_seed_and_persists() {
        let (store, port) = seeded().await;
        store.from("products").delete().eq("id", "1").execute().await;
        store
            .from("customer_inquiries")
            .insert(vec![record(json!({"name": "x"}))])
            .execute()
            .await;

        store.reset().await;
        let snapshot = store.snapshot();
        assert_eq!(snapshot["products"].len(), 5);
        assert!(snapshot["customer_inquiries"].is_empty());

        let saved = persisted(port.get(TABLES_KEY).await.unwrap());
        assert_eq!(saved["products"].len(), 5);
    }

    #[test]
    fn numeric_equality_ignores_representation() {
        assert!(field_matches(Some(&json!(1)), &json!(1.0)));
        assert!(!field_matches(Some(&json!("1")), &json!(1)));
        assert!(!field_matches(Some(&json!(["a"])), &json!(["a"])));
        assert!(!field_matches(None, &Value::Null));
    }

    #[test]
    fn into_result_surfaces_error() {
        let response: StoreResponse<Vec<Record>> = StoreResponse {
            data: None,
            error: Some(StoreError {
                code: "PGRST116".to_string(),
                message: "network down".to_string(),
            }),
        };
        let err = response.into_result().unwrap_err();
        assert!(err.to_string().contains("network down"));
    }
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_keep_file_snapshot_readable() {
        use crate::persistence::FileBlobStore;

        let root = std::env::temp_dir().join(format!(
            "jiehan-store-{}",
            uuid::Uuid::new_v4().simple()
        ));
        let port: Arc<dyn BlobStore> = Arc::new(FileBlobStore::new(&root));
        let store = Arc::new(MockStore::open(port.clone()).await);

        let mut tasks = Vec::new();
        for worker in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                for round in 0..10 {
                    let id = format!("{}-{}", worker, round);
                    store
                        .from("visits")
                        .insert(vec![record(json!({ "id": id.as_str(), "worker": worker }))])
                        .execute()
                        .await;
                    if round % 3 == 0 {
                        store.from("visits").delete().eq("id", id).execute().await;
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let expected = store.snapshot();
        assert_eq!(expected["visits"].len(), 8 * 6);

        let raw = port.get(TABLES_KEY).await.unwrap().unwrap();
        let on_disk: Tables = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk, expected);

        let reopened = MockStore::open(port).await;
        assert_eq!(reopened.snapshot()["visits"].len(), 8 * 6);
        assert_eq!(reopened.snapshot()["products"].len(), 5);
        let _ = std::fs::remove_dir_all(root);
    }
}
