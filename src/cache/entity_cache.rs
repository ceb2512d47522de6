use crate::orm::{OrmResult, Record};
use dashmap::DashMap;
use std::sync::Arc;

/// 以主键为键的并发记录缓存。
///
/// 缓存从不作为权威数据：写操作之后由调用方重新 `put` 或 `delete`。
pub struct EntityCache<R> {
    entries: DashMap<i64, Arc<R>>,
}

impl<R> Default for EntityCache<R> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<R: Record> EntityCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i64) -> Option<Arc<R>> {
        self.entries.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// 写入记录，替换同一主键下的旧实例。没有主键的记录不会被缓存。
    pub fn put(&self, record: R) -> Option<Arc<R>> {
        let id = record.identity().ok().flatten()?;
        let record = Arc::new(record);
        self.entries.insert(id, Arc::clone(&record));
        Some(record)
    }

    pub fn delete(&self, id: i64) {
        self.entries.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 先查缓存，未命中时调用 `load` 读取并回填。
    pub fn get_or_load<F>(&self, id: i64, load: F) -> OrmResult<Option<Arc<R>>>
    where
        F: FnOnce(i64) -> OrmResult<Option<R>>,
    {
        if let Some(hit) = self.get(id) {
            return Ok(Some(hit));
        }
        Ok(load(id)?.and_then(|record| self.put(record)))
    }
}
