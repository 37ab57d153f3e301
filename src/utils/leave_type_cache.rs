use std::time::Duration;

use moka::future::Cache;

use crate::model::leave_type::LeaveType;

/// Active leave types keyed by lowercased name.
///
/// Submissions look the type up on every request; HR edits invalidate the
/// whole cache since the set is small.
#[derive(Clone)]
pub struct LeaveTypeCache {
    inner: Cache<String, LeaveType>,
}

impl LeaveTypeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, type_name: &str) -> Option<LeaveType> {
        self.inner.get(&cache_key(type_name)).await
    }

    pub async fn insert(&self, leave_type: LeaveType) {
        self.inner
            .insert(cache_key(&leave_type.type_name), leave_type)
            .await;
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Load every active leave type concurrently
    pub async fn warm(&self, leave_types: Vec<LeaveType>) -> usize {
        let count = leave_types.len();
        let futures: Vec<_> = leave_types
            .into_iter()
            .map(|t| self.inner.insert(cache_key(&t.type_name), t))
            .collect();

        futures::future::join_all(futures).await;

        log::info!("Leave type cache warmup complete: {} active types", count);
        count
    }
}

fn cache_key(type_name: &str) -> String {
    type_name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leave_type(name: &str) -> LeaveType {
        LeaveType {
            id: 1,
            type_name: name.to_string(),
            description: None,
            color: None,
            max_days: None,
            carry_forward: false,
            is_active: true,
        }
    }

    #[actix_web::test]
    async fn lookup_ignores_case_and_padding() {
        let cache = LeaveTypeCache::new(Duration::from_secs(60));
        cache.insert(leave_type("Sick Leave")).await;
        assert!(cache.get(" sick leave").await.is_some());
        assert!(cache.get("Casual Leave").await.is_none());
    }

    #[actix_web::test]
    async fn invalidate_clears_entries() {
        let cache = LeaveTypeCache::new(Duration::from_secs(60));
        assert_eq!(cache.warm(vec![leave_type("Sick Leave"), leave_type("Comp Off")]).await, 2);
        cache.invalidate_all();
        assert!(cache.get("Sick Leave").await.is_none());
    }
}
