//! The collections platform as the rest of Curator sees it.

use async_trait::async_trait;
use curator_core::{CollectionRecord, Item};
use tracing::{info, warn};

use crate::SyncError;

/// Remote side of the workbook: liked items, collections and membership.
#[async_trait]
pub trait CollectionPlatform: Send + Sync {
    /// Every item the user has liked, without annotations.
    async fn liked_items(&self) -> Result<Vec<Item>, SyncError>;

    /// The user's collections. Members are not filled in.
    async fn collections(&self) -> Result<Vec<CollectionRecord>, SyncError>;

    /// Identifiers of the items in one collection.
    async fn collection_members(&self, collection_uid: &str) -> Result<Vec<String>, SyncError>;

    async fn add_item_to_collection(
        &self,
        collection_uid: &str,
        item_uid: &str,
    ) -> Result<(), SyncError>;
}

/// A fresh snapshot of the platform.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub items: Vec<Item>,
    pub collections: Vec<CollectionRecord>,
}

/// Collections with their current members.
///
/// A collection whose members cannot be listed is kept with no members.
pub async fn fetch_collections<P>(platform: &P) -> Result<Vec<CollectionRecord>, SyncError>
where
    P: CollectionPlatform + ?Sized,
{
    let mut collections = platform.collections().await?;
    for c in &mut collections {
        match platform.collection_members(&c.uid).await {
            Ok(members) => c.members = members,
            Err(e) => {
                warn!(collection = %c.name, error = %e, "could not list collection members");
            }
        }
    }
    info!(count = collections.len(), "fetched collections");
    Ok(collections)
}

/// Liked items plus collections with members.
pub async fn fetch_library<P>(platform: &P) -> Result<Library, SyncError>
where
    P: CollectionPlatform + ?Sized,
{
    let items = platform.liked_items().await?;
    info!(count = items.len(), "fetched liked items");
    let collections = fetch_collections(platform).await?;
    Ok(Library { items, collections })
}
