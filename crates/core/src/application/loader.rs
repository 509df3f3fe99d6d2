// Snapshot Loader - one full-list request per queue activation

use crate::application::reducer::dedup;
use crate::domain::{LoadError, QueueConfig, QueueItem};
use crate::port::{AuthContext, DataSource};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches the current pending list of a queue from the data source
#[derive(Clone)]
pub struct SnapshotLoader {
    data_source: Arc<dyn DataSource>,
    auth: AuthContext,
}

impl SnapshotLoader {
    pub fn new(data_source: Arc<dyn DataSource>, auth: AuthContext) -> Self {
        Self { data_source, auth }
    }

    /// Load and identify a queue snapshot
    ///
    /// Entries without identity are dropped with a warning; duplicate ids keep
    /// their first occurrence. Transport and auth failures come back as
    /// `LoadError`, never as a panic.
    pub async fn load(&self, config: &QueueConfig) -> Result<Vec<QueueItem>, LoadError> {
        let raw = self
            .data_source
            .request_snapshot(&config.name, &self.auth)
            .await
            .map_err(|e| {
                warn!(queue = %config.name, error = %e, "Snapshot request failed");
                e
            })?;

        let received = raw.len();
        let items = dedup(config.rules.items_from(&raw));

        if items.len() != received {
            warn!(
                queue = %config.name,
                received = received,
                kept = items.len(),
                "Snapshot contained malformed or duplicate entries"
            );
        }
        debug!(queue = %config.name, items = items.len(), "Snapshot loaded");

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdentityRule;
    use crate::port::data_source::mocks::MockDataSource;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn config() -> QueueConfig {
        QueueConfig::new("pendingServices", IdentityRule::new("_id").with_alias("id"))
    }

    #[tokio::test]
    async fn test_load_identifies_items_in_order() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot(
            "pendingServices",
            vec![json!({"_id": "s1"}), json!({"id": "s2", "status": "pending"})],
        );
        let loader = SnapshotLoader::new(source, AuthContext::bearer("t"));

        let items = assert_ok!(loader.load(&config()).await);
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_load_drops_malformed_and_duplicate_entries() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot(
            "pendingServices",
            vec![
                json!({"_id": "s1"}),
                json!({"title": "no identity"}),
                json!({"_id": "s1", "dup": true}),
                json!({"_id": "s2"}),
            ],
        );
        let loader = SnapshotLoader::new(source, AuthContext::anonymous());

        let items = loader.load(&config()).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].payload.as_value(), &json!({"_id": "s1"}));
    }

    #[tokio::test]
    async fn test_load_error_is_returned() {
        let source = Arc::new(MockDataSource::new());
        source.fail_snapshot("pendingServices", LoadError::Unauthorized("expired".into()));
        let loader = SnapshotLoader::new(source, AuthContext::anonymous());

        let err = assert_err!(loader.load(&config()).await);
        assert_eq!(err, LoadError::Unauthorized("expired".into()));
    }
}
