//! Page upsert and delete.

use crate::adapter::SyncAdapter;
use crate::error::SyncResult;
use ctfd_manager_cluster::Binding;
use ctfd_manager_remote::PageParams;
use ctfd_manager_types::{PageRecord, PageSpec};
use tracing::{info, warn};

fn page_params(page: &PageSpec) -> PageParams {
    PageParams {
        title: page.title.clone(),
        route: page.route.clone(),
        content: page.content.clone(),
        format: page.format.clone(),
        auth_required: page.auth_required,
        draft: page.draft,
        hidden: !page.enabled,
    }
}

impl SyncAdapter {
    /// Creates or updates the remote page for `record` and returns its id.
    pub async fn upsert_page(&self, record: &PageRecord) -> SyncResult<i64> {
        let params = page_params(&record.page);

        let id = match self.page_bindings.get(&record.slug).await? {
            Binding::Bound(id) if self.page_exists(id).await? => {
                self.content.patch_page(id, &params).await?;
                info!("[SYNC] Updated page {} ({id})", record.slug);
                id
            }
            binding => {
                if let Binding::Bound(id) = binding {
                    info!("[SYNC] Page {} bound to {id} but missing remotely, recreating", record.slug);
                }
                let created = self.content.create_page(&params).await?;
                info!("[SYNC] Created page {} with id {}", record.slug, created.id);
                created.id
            }
        };

        self.page_bindings.bind(&record.slug, id).await?;
        Ok(id)
    }

    /// Deletes the remote page and resets its binding. Returns false when the
    /// page was never uploaded.
    pub async fn delete_page(&self, slug: &str) -> SyncResult<bool> {
        let Binding::Bound(id) = self.page_bindings.get(slug).await? else {
            info!("[SYNC] Page {slug} is already deleted");
            return Ok(false);
        };

        match self.content.delete_page(id).await {
            Ok(()) => info!("[SYNC] Deleted page {slug} ({id})"),
            Err(e) if e.is_not_found() => warn!("[SYNC] Page {slug} ({id}) already gone remotely"),
            Err(e) => return Err(e.into()),
        }

        self.page_bindings.unbind(slug).await?;
        Ok(true)
    }

    async fn page_exists(&self, id: i64) -> SyncResult<bool> {
        Ok(self.content.list_pages().await?.iter().any(|p| p.id == id))
    }
}
