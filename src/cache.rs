//! On-disk cache for data fetched from the experiment database.
use std::{fmt::Display, marker::PhantomData, path::PathBuf};

use async_trait::async_trait;
use cached::IOCachedAsync;
use serde::{Serialize, de::DeserializeOwned};

/// `cached` backend storing bincode-encoded values in a cacache directory.
pub struct CacacheBackend<K, V> {
    root: PathBuf,
    refresh: bool,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> CacacheBackend<K, V> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            refresh: false,
            _phantom: PhantomData,
        }
    }

    /// When set, cached entries are ignored and overwritten on the next fetch.
    pub fn refresh(&self) -> bool {
        self.refresh
    }
}

#[async_trait]
impl<K, V> IOCachedAsync<K, V> for CacacheBackend<K, V> where
    K: Display + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync
{
    type Error = eyre::Error;

    async fn cache_get(&self, key: &K) -> Result<Option<V>, Self::Error> {
        match cacache::read(&self.root, key.to_string()).await {
            Ok(bytes) => {
                log::debug!("cache hit {key}");
                Ok(Some(bincode::deserialize::<V>(&bytes)?))
            },
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn cache_set(&self, key: K, val: V) -> Result<Option<V>, Self::Error> {
        let prev = self.cache_get(&key).await?;
        cacache::write(&self.root, key.to_string(), bincode::serialize(&val)?).await?;
        Ok(prev)
    }

    async fn cache_remove(&self, key: &K) -> Result<Option<V>, Self::Error> {
        let prev = self.cache_get(key).await?;
        if prev.is_some() {
            cacache::remove(&self.root, key.to_string()).await?;
        }
        Ok(prev)
    }

    fn cache_set_refresh(&mut self, refresh: bool) -> bool {
        std::mem::replace(&mut self.refresh, refresh)
    }
}
