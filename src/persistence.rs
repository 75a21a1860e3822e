use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub const TABLES_KEY: &str = "mockDataStore";
pub const IMAGES_KEY: &str = "uploaded_images";

/**
 * BlobStore
 * 以字符串为键、字符串为值的持久化端口，语义等同浏览器 localStorage。
 */
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<bool>;
}

/**
 * FileBlobStore
 * 每个键对应 DATA_DIR 下的一个文件。
 */
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", name))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to read {}: {}", key, e)),
        }
    }

    /// Writes a sibling temp file and renames it over the target, so readers
    /// only ever see a complete value.
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let target = self.path_for(key);
        let tmp = target.with_extension(format!(
            "json.{}.tmp",
            uuid::Uuid::new_v4().simple()
        ));
        if let Err(e) = tokio::fs::write(&tmp, value).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(anyhow::anyhow!("Failed to write {}: {}", key, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(anyhow::anyhow!("Failed to replace {}: {}", key, e));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    data: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `set` fails until re-enabled, the way a full quota would.
    #[cfg(test)]
    pub fn failing_writes() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::Relaxed);
        store
    }

    #[cfg(test)]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("storage quota exceeded for {}", key));
        }
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.lock().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("jiehan-blob-{}", uuid::Uuid::new_v4().simple()))
    }

    #[tokio::test]
    async fn file_store_missing_key_is_none() {
        let store = FileBlobStore::new(temp_root());
        assert_eq!(store.get(TABLES_KEY).await.unwrap(), None);
        assert!(!store.remove(TABLES_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn file_store_set_then_get() {
        let root = temp_root();
        let store = FileBlobStore::new(&root);
        store.set("language", "en").await.unwrap();
        assert_eq!(store.get("language").await.unwrap().as_deref(), Some("en"));
        assert!(root.join("language.json").exists());

        assert!(store.remove("language").await.unwrap());
        assert_eq!(store.get("language").await.unwrap(), None);
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn file_store_concurrent_sets_leave_a_whole_value() {
        let root = temp_root();
        let store = Arc::new(FileBlobStore::new(&root));
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let value = format!("[{}]", vec![i.to_string(); 2000].join(","));
                store.set("shared", &value).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let raw = store.get("shared").await.unwrap().unwrap();
        let parsed: Vec<u32> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2000);
        assert!(parsed.iter().all(|v| *v == parsed[0]));

        let leftovers = std::fs::read_dir(&root)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .map(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(leftovers, 0);
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn file_store_sanitizes_keys() {
        let store = FileBlobStore::new("/data");
        assert_eq!(
            store.path_for("../etc/passwd"),
            PathBuf::from("/data/___etc_passwd.json")
        );
    }

    #[tokio::test]
    async fn memory_store_failing_writes() {
        let store = MemoryBlobStore::failing_writes();
        assert!(store.set("k", "v").await.is_err());
        store.set_fail_writes(false);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
