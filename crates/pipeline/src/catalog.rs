//! Content catalog collaborator.
//!
//! The generation core only needs `insert`, `exists`, and `list`; the
//! [`Catalog`] trait is that boundary. [`InMemoryCatalog`] is the
//! process-local implementation used by the worker and the tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use genstream_core::content::{ContentArtifact, ContentKind};
use genstream_core::search;
use genstream_core::types::ContentId;
use tokio::sync::RwLock;

/// Errors a catalog backend can report.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// An item with this id is already present.
    #[error("Content {0} already exists in the catalog")]
    Duplicate(ContentId),

    /// The backend could not serve the request.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Ordered collection of finished content, most recent first.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Insert an item at the head of the ordering as one atomic step.
    async fn insert(&self, item: ContentArtifact) -> Result<(), CatalogError>;

    /// Whether an item with this id is present.
    async fn exists(&self, id: ContentId) -> Result<bool, CatalogError>;

    /// Snapshot of every item, head first.
    async fn list(&self) -> Result<Vec<ContentArtifact>, CatalogError>;
}

// ---------------------------------------------------------------------------
// InMemoryCatalog
// ---------------------------------------------------------------------------

/// Process-local catalog.
///
/// Readers take a cloned snapshot under the read lock; an insert is a single
/// `push_front` under the write lock, so no reader sees a half-linked entry.
#[derive(Default)]
pub struct InMemoryCatalog {
    items: RwLock<VecDeque<ContentArtifact>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-populated with `items`, kept in the given order.
    pub fn with_items(items: Vec<ContentArtifact>) -> Self {
        Self {
            items: RwLock::new(items.into()),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Look up a single item.
    pub async fn get(&self, id: ContentId) -> Option<ContentArtifact> {
        self.items.read().await.iter().find(|item| item.id == id).cloned()
    }

    /// Free-text search over a snapshot.
    pub async fn search(&self, query: &str) -> Vec<ContentArtifact> {
        search::search(&self.snapshot().await, query)
    }

    /// Filter a snapshot by kind and genre.
    pub async fn filter(&self, kind: Option<ContentKind>, genre: Option<&str>) -> Vec<ContentArtifact> {
        search::filter(&self.snapshot().await, kind, genre)
    }

    /// Popular items from a snapshot.
    pub async fn featured(&self, min_views: u64, limit: usize) -> Vec<ContentArtifact> {
        search::featured(&self.snapshot().await, min_views, limit)
    }

    async fn snapshot(&self) -> Vec<ContentArtifact> {
        self.items.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn insert(&self, item: ContentArtifact) -> Result<(), CatalogError> {
        let mut items = self.items.write().await;
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(CatalogError::Duplicate(item.id));
        }
        items.push_front(item);
        Ok(())
    }

    async fn exists(&self, id: ContentId) -> Result<bool, CatalogError> {
        Ok(self.items.read().await.iter().any(|item| item.id == id))
    }

    async fn list(&self) -> Result<Vec<ContentArtifact>, CatalogError> {
        Ok(self.snapshot().await)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
