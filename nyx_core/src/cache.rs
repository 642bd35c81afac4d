//! In-memory mirrors of database tables.
//!
//! A [`TableCache`] is bound to one [`RowSource`] (a bulk query) and keeps every row it
//! returned in a [`DashMap`] keyed by [`CachedRow::key`]. The database stays authoritative:
//! callers write the table first and then mirror the write here with [`TableCache::insert`],
//! [`TableCache::update`] or [`TableCache::remove`].

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use serenity::async_trait;
use sqlx::{postgres::PgRow, FromRow, PgPool};

use crate::data::structs::Error;

/// A row that can live in a [`TableCache`].
pub trait CachedRow: Clone + Send + Sync + 'static {
    type Key: Eq + Hash + Clone + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
}

/// A bulk query returning every row of a table.
#[async_trait]
pub trait RowSource: Send + Sync {
    type Row: CachedRow;

    async fn fetch_all(&self) -> Result<Vec<Self::Row>, Error>;
}

type KeyOf<S> = <<S as RowSource>::Row as CachedRow>::Key;

pub struct TableCache<S: RowSource> {
    source: S,
    entries: DashMap<KeyOf<S>, S::Row>,
    populated: AtomicBool,
}

impl<S: RowSource> TableCache<S> {
    /// Binds a cache to its source. Nothing is loaded until [`Self::populate`].
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: DashMap::new(),
            populated: AtomicBool::new(false),
        }
    }

    /// Runs the bulk query and inserts one entry per returned row.
    ///
    /// Nothing is inserted if the query fails. Rows sharing a key collapse into the last one.
    pub async fn populate(&self) -> Result<usize, Error> {
        let rows = self.source.fetch_all().await?;

        for row in rows {
            self.entries.insert(row.key(), row);
        }

        self.populated.store(true, Ordering::Release);
        Ok(self.entries.len())
    }

    /// Replaces the whole cache with a fresh bulk query.
    ///
    /// The new rows are fetched before anything is touched, so a failed query leaves the
    /// previous contents in place and readers never see a transiently empty cache.
    pub async fn refresh(&self) -> Result<usize, Error> {
        let rows = self.source.fetch_all().await?;
        let fresh: HashMap<_, _> = rows.into_iter().map(|row| (row.key(), row)).collect();

        self.entries.retain(|key, _| fresh.contains_key(key));
        let count = fresh.len();
        for (key, row) in fresh {
            self.entries.insert(key, row);
        }

        self.populated.store(true, Ordering::Release);
        Ok(count)
    }

    #[must_use]
    pub fn get(&self, key: &KeyOf<S>) -> Option<S::Row> {
        self.entries.get(key).map(|row| row.clone())
    }

    /// Looks up `key`, falling back to `default` for ids the table has no row for.
    #[must_use]
    pub fn get_or(&self, key: &KeyOf<S>, default: S::Row) -> S::Row {
        self.get(key).unwrap_or(default)
    }

    pub fn get_or_else(&self, key: &KeyOf<S>, default: impl FnOnce() -> S::Row) -> S::Row {
        self.get(key).unwrap_or_else(default)
    }

    pub fn contains(&self, key: &KeyOf<S>) -> bool {
        self.entries.contains_key(key)
    }

    /// Mirrors a row that was just written to the database.
    pub fn insert(&self, row: S::Row) {
        self.entries.insert(row.key(), row);
    }

    /// Mutates a cached row in place, returning false if the key is not cached.
    pub fn update(&self, key: &KeyOf<S>, f: impl FnOnce(&mut S::Row)) -> bool {
        match self.entries.get_mut(key) {
            Some(mut row) => {
                f(row.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, key: &KeyOf<S>) -> Option<S::Row> {
        self.entries.remove(key).map(|(_, row)| row)
    }

    /// Snapshot of every cached row matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&S::Row) -> bool) -> Vec<S::Row> {
        self.entries
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<KeyOf<S>> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a populate or refresh has completed at least once.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.populated.load(Ordering::Acquire)
    }
}

/// A [`RowSource`] running a fixed SQL query against postgres.
pub struct PgSource<R> {
    pool: PgPool,
    query: &'static str,
    _row: PhantomData<fn() -> R>,
}

impl<R> PgSource<R> {
    #[must_use]
    pub fn new(pool: PgPool, query: &'static str) -> Self {
        Self {
            pool,
            query,
            _row: PhantomData,
        }
    }
}

#[async_trait]
impl<R> RowSource for PgSource<R>
where
    R: CachedRow + for<'r> FromRow<'r, PgRow> + Unpin,
{
    type Row = R;

    async fn fetch_all(&self) -> Result<Vec<R>, Error> {
        let rows = sqlx::query_as::<_, R>(self.query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: u64,
        prefix: &'static str,
    }

    impl CachedRow for Row {
        type Key = u64;

        fn key(&self) -> u64 {
            self.id
        }
    }

    #[derive(Default)]
    struct MockSource {
        rows: Mutex<Vec<Row>>,
        fail: AtomicBool,
    }

    impl MockSource {
        fn with(rows: Vec<Row>) -> Self {
            Self {
                rows: Mutex::new(rows),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl RowSource for MockSource {
        type Row = Row;

        async fn fetch_all(&self) -> Result<Vec<Row>, Error> {
            if self.fail.load(Ordering::Relaxed) {
                return Err("connection reset".into());
            }
            Ok(self.rows.lock().clone())
        }
    }

    fn row(id: u64, prefix: &'static str) -> Row {
        Row { id, prefix }
    }

    #[tokio::test]
    async fn new_cache_is_empty() {
        let cache = TableCache::new(MockSource::with(vec![row(1, "!")]));
        assert!(cache.is_empty());
        assert!(!cache.is_populated());
        assert_eq!(cache.get(&1), None);
    }

    #[tokio::test]
    async fn populate_keys_every_row() {
        let cache = TableCache::new(MockSource::with(vec![
            row(1, "!"),
            row(2, "?"),
            row(3, "n!"),
        ]));

        assert_eq!(cache.populate().await.unwrap(), 3);
        assert!(cache.is_populated());
        assert_eq!(cache.get(&2), Some(row(2, "?")));
        let mut keys = cache.keys();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn duplicate_keys_keep_last_row() {
        let cache = TableCache::new(MockSource::with(vec![row(1, "a"), row(1, "b")]));
        assert_eq!(cache.populate().await.unwrap(), 1);
        assert_eq!(cache.get(&1).unwrap().prefix, "b");
    }

    #[tokio::test]
    async fn failed_populate_loads_nothing() {
        let source = MockSource::with(vec![row(1, "!")]);
        source.fail.store(true, Ordering::Relaxed);
        let cache = TableCache::new(source);

        assert!(cache.populate().await.is_err());
        assert!(cache.is_empty());
        assert!(!cache.is_populated());
    }

    #[tokio::test]
    async fn refresh_drops_stale_entries() {
        let cache = TableCache::new(MockSource::with(vec![row(1, "!"), row(2, "?")]));
        cache.populate().await.unwrap();
        cache.insert(row(9, "local"));

        *cache.source.rows.lock() = vec![row(2, "new"), row(4, ">")];
        assert_eq!(cache.refresh().await.unwrap(), 2);

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&9), None);
        assert_eq!(cache.get(&2), Some(row(2, "new")));
        assert_eq!(cache.get(&4), Some(row(4, ">")));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn refresh_to_empty_result() {
        let cache = TableCache::new(MockSource::with(vec![row(1, "!")]));
        cache.populate().await.unwrap();

        cache.source.rows.lock().clear();
        assert_eq!(cache.refresh().await.unwrap(), 0);
        assert!(cache.is_empty());
        assert!(cache.is_populated());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_rows() {
        let cache = TableCache::new(MockSource::with(vec![row(1, "!")]));
        cache.populate().await.unwrap();

        cache.source.fail.store(true, Ordering::Relaxed);
        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.get(&1), Some(row(1, "!")));
    }

    #[tokio::test]
    async fn absent_keys_resolve_to_default() {
        let cache = TableCache::new(MockSource::default());
        cache.populate().await.unwrap();

        assert_eq!(cache.get_or(&7, row(7, "n!")), row(7, "n!"));
        assert_eq!(cache.get_or_else(&8, || row(8, "d")).prefix, "d");
        assert!(!cache.contains(&7));
    }

    #[tokio::test]
    async fn write_through_helpers() {
        let cache = TableCache::new(MockSource::with(vec![row(1, "!")]));
        cache.populate().await.unwrap();

        assert!(cache.update(&1, |r| r.prefix = "?"));
        assert!(!cache.update(&2, |r| r.prefix = "?"));
        assert_eq!(cache.get(&1).unwrap().prefix, "?");

        cache.insert(row(2, "."));
        assert_eq!(cache.filter(|r| r.prefix == ".").len(), 1);
        assert_eq!(cache.remove(&2), Some(row(2, ".")));
        assert_eq!(cache.len(), 1);
    }
}
