//! Session catalog and its read-side query contract
//!
//! # Components
//!
//! - `Session`: one structured session record
//! - `CatalogStore`: the reader/writer-locked map of sessions
//! - `ReadySignal`: one-shot broadcast fired when loading finishes
//! - `Catalog`: the store plus its readiness signal, answering queries in
//!   either blocking or non-blocking mode

mod ready;
mod session;
mod store;

pub use crate::config::QueryMode;
pub use ready::ReadySignal;
pub use session::Session;
pub use store::CatalogStore;

use crate::CatalogError;

/// Shared catalog handle used by loaders and query callers alike
#[derive(Debug, Default)]
pub struct Catalog {
    store: CatalogStore,
    ready: ReadySignal,
    mode: QueryMode,
}

impl Catalog {
    pub fn new(mode: QueryMode) -> Self {
        Self {
            store: CatalogStore::new(),
            ready: ReadySignal::new(),
            mode,
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Fires the readiness signal; returns `false` if it had already fired
    pub fn mark_ready(&self) -> bool {
        let fired = self.ready.fire();
        if fired {
            tracing::info!("Catalog ready with {} sessions", self.store.len());
        }
        fired
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    pub async fn wait_ready(&self) {
        self.ready.wait().await
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns every loaded session
    ///
    /// In `Block` mode this waits for the readiness signal first. In
    /// `Incomplete` mode it fails with `StillLoading` until the signal fires.
    pub async fn list_all(&self) -> Result<Vec<Session>, CatalogError> {
        self.gate().await?;
        Ok(self.store.list())
    }

    /// Returns the session stored under `id`
    ///
    /// Identifiers that failed to load are indistinguishable from identifiers
    /// that were never requested: both yield `RecordNotFound`.
    pub async fn get_by_id(&self, id: &str) -> Result<Session, CatalogError> {
        self.gate().await?;
        self.store
            .get(id)
            .ok_or_else(|| CatalogError::RecordNotFound { id: id.to_string() })
    }

    async fn gate(&self) -> Result<(), CatalogError> {
        match self.mode {
            QueryMode::Block => {
                self.ready.wait().await;
                Ok(())
            }
            QueryMode::Incomplete if self.ready.is_ready() => Ok(()),
            QueryMode::Incomplete => Err(CatalogError::StillLoading {
                loaded: self.store.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn talk(id: &str) -> Session {
        let mut session = Session::new(id, format!("https://example.com/{}", id));
        session.title = format!("Talk {}", id);
        session
    }

    #[tokio::test]
    async fn test_incomplete_mode_reports_loading() {
        let catalog = Catalog::new(QueryMode::Incomplete);
        catalog.store().put("A", talk("A"));

        match catalog.list_all().await {
            Err(CatalogError::StillLoading { loaded }) => assert_eq!(loaded, 1),
            other => panic!("expected StillLoading, got {:?}", other),
        }
        assert!(matches!(
            catalog.get_by_id("A").await,
            Err(CatalogError::StillLoading { .. })
        ));

        catalog.mark_ready();
        assert_eq!(catalog.list_all().await.unwrap().len(), 1);
        assert_eq!(catalog.get_by_id("A").await.unwrap().id, "A");
    }

    #[tokio::test]
    async fn test_block_mode_waits_for_ready() {
        let catalog = Arc::new(Catalog::new(QueryMode::Block));

        let reader = {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move { catalog.list_all().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reader.is_finished());

        catalog.store().put("A", talk("A"));
        catalog.mark_ready();

        let sessions = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let catalog = Catalog::new(QueryMode::Block);
        catalog.mark_ready();

        match catalog.get_by_id("missing").await {
            Err(CatalogError::RecordNotFound { id }) => assert_eq!(id, "missing"),
            other => panic!("expected RecordNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_returns_matching_key() {
        let catalog = Catalog::new(QueryMode::Block);
        for id in ["1", "2", "3"] {
            catalog.store().put(id, talk(id));
        }
        catalog.mark_ready();

        for id in ["1", "2", "3"] {
            assert_eq!(catalog.get_by_id(id).await.unwrap().id, id);
        }
    }

    #[test]
    fn test_mark_ready_once() {
        let catalog = Catalog::new(QueryMode::Block);
        assert!(catalog.mark_ready());
        assert!(!catalog.mark_ready());
        assert!(catalog.is_ready());
    }
}
