use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{Item, ItemDump, ItemVersion},
};

/// Repository trait for the live content store.
///
/// The pruner only reads from it, apart from [`ContentRepo::remove_version`].
#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Get an item by ID, with its full path resolved
    async fn get_item(&self, id: Uuid) -> DbResult<Option<Item>>;

    /// Get an item by its path (case-insensitive), e.g. `/sitecore/content`
    async fn get_item_by_path(&self, path: &str) -> DbResult<Option<Item>>;

    /// Direct children of an item, in repository order
    async fn children(&self, parent: &Item) -> DbResult<Vec<Item>>;

    /// Languages the item has at least one version in
    async fn languages(&self, item_id: Uuid) -> DbResult<Vec<String>>;

    /// All versions of the item in one language, ascending by number
    async fn versions(&self, item_id: Uuid, language: &str) -> DbResult<Vec<ItemVersion>>;

    /// Permanently remove one version.
    ///
    /// Holds the store's writer lock for the duration of the delete. Returns
    /// `false` if the version did not exist.
    async fn remove_version(&self, item_id: Uuid, language: &str, version: u32) -> DbResult<bool>;

    /// Dump the item with every version in every language
    async fn dump_item(&self, item: &Item) -> DbResult<ItemDump>;
}
