//! Challenge upsert and disable.

use crate::adapter::{IGNORED_FILES, SyncAdapter};
use crate::error::SyncResult;
use ctfd_manager_cluster::{Binding, load_mapping_table};
use ctfd_manager_remote::{
    ChallengeParams, ChallengeState, EntryKind, FileUpload, FlagParams, TagParams,
};
use ctfd_manager_types::{ChallengeRecord, DeliveryMode, FlagSpec, MappingTable};
use tracing::{debug, info, warn};

const STANDARD_TYPE: &str = "dynamic";
const INSTANCED_TYPE: &str = "kubectf";
const FLAG_TYPE: &str = "static";
const CASE_INSENSITIVE: &str = "case_insensitive";

/// Builds the remote payload. `with_type` is false for patches, which cannot
/// change a challenge's type.
fn challenge_params(
    record: &ChallengeRecord,
    table: &MappingTable,
    with_type: bool,
) -> ChallengeParams {
    let spec = &record.challenge;
    let (challenge_type, template_name, instance_type) = match spec.delivery_mode() {
        DeliveryMode::Standard => (STANDARD_TYPE, None, None),
        DeliveryMode::Instanced {
            template_name,
            instance_type,
        } => (INSTANCED_TYPE, Some(template_name), Some(instance_type)),
    };

    ChallengeParams {
        name: spec.name.clone(),
        category: table.category_name(spec),
        description: record.display_description(),
        value: spec.points,
        initial: spec.points,
        decay: spec.decay,
        minimum: spec.min_points,
        state: ChallengeState::from_enabled(spec.enabled),
        challenge_type: with_type.then(|| challenge_type.to_string()),
        connection_info: spec.connection.clone(),
        template_name,
        instance_type,
    }
}

fn flag_params(challenge_id: i64, flag: &FlagSpec) -> FlagParams {
    FlagParams {
        challenge: challenge_id,
        content: flag.flag.clone(),
        flag_type: FLAG_TYPE.to_string(),
        data: if flag.case_sensitive {
            String::new()
        } else {
            CASE_INSENSITIVE.to_string()
        },
    }
}

impl SyncAdapter {
    /// Creates or updates the remote challenge for `record` and returns its id.
    pub async fn upsert_challenge(&self, record: &ChallengeRecord) -> SyncResult<i64> {
        let slug = record.slug();
        match self.challenge_bindings.get(slug).await? {
            Binding::Absent => self.create_challenge(record).await,
            Binding::Bound(id) => {
                let remote = self.content.list_challenges().await?;
                if remote.iter().any(|c| c.id == id) {
                    self.update_challenge(id, record).await
                } else {
                    info!("[SYNC] Challenge {slug} bound to {id} but missing remotely, recreating");
                    self.create_challenge(record).await
                }
            }
        }
    }

    /// Hides the remote challenge (it is never deleted) and forgets the
    /// fingerprint of its source object. The binding is kept.
    pub async fn disable_challenge(
        &self,
        source_name: &str,
        record: &ChallengeRecord,
    ) -> SyncResult<()> {
        let slug = record.slug();
        match self.challenge_bindings.get(slug).await? {
            Binding::Absent => {
                info!("[SYNC] Challenge {slug} was never uploaded, nothing to disable");
            }
            Binding::Bound(id) => {
                self.content
                    .set_challenge_state(id, ChallengeState::Hidden)
                    .await?;
                info!("[SYNC] Challenge {slug} ({id}) hidden");
            }
        }

        self.fingerprints.clear(source_name).await?;
        Ok(())
    }

    async fn create_challenge(&self, record: &ChallengeRecord) -> SyncResult<i64> {
        let table = load_mapping_table(self.cluster.as_ref(), &self.config.namespace).await?;
        let params = challenge_params(record, &table, true);
        info!(
            category = %params.category,
            difficulty = %table.difficulty_name(&record.challenge),
            "[SYNC] Creating challenge {}",
            record.slug()
        );

        let created = self.content.create_challenge(&params).await?;
        // Bound before sub-resources so a failure below retries as an update.
        self.challenge_bindings.bind(record.slug(), created.id).await?;

        self.upload_files(created.id, record).await?;
        self.upload_flags(created.id, record).await?;
        self.upload_tags(created.id, record).await;

        info!("[SYNC] Created challenge {} with id {}", record.slug(), created.id);
        Ok(created.id)
    }

    async fn update_challenge(&self, id: i64, record: &ChallengeRecord) -> SyncResult<i64> {
        let table = load_mapping_table(self.cluster.as_ref(), &self.config.namespace).await?;
        let params = challenge_params(record, &table, false);
        info!(
            category = %params.category,
            difficulty = %table.difficulty_name(&record.challenge),
            "[SYNC] Updating challenge {} ({id})",
            record.slug()
        );

        self.content.patch_challenge(id, &params).await?;

        // Sub-resources are replaced wholesale. A failure part way leaves the
        // challenge with a partial set until the next sync.
        for file in self.content.list_challenge_files(id).await? {
            self.content.delete_file(file.id).await?;
        }
        self.upload_files(id, record).await?;

        for flag in self.content.list_challenge_flags(id).await? {
            self.content.delete_flag(flag.id).await?;
        }
        self.upload_flags(id, record).await?;

        for tag in self.content.list_challenge_tags(id).await? {
            self.content.delete_tag(tag.id).await?;
        }
        self.upload_tags(id, record).await;

        self.challenge_bindings.bind(record.slug(), id).await?;
        Ok(id)
    }

    async fn upload_files(&self, id: i64, record: &ChallengeRecord) -> SyncResult<()> {
        let files = self.collect_files(record).await?;
        if files.is_empty() {
            debug!("[SYNC] No files for challenge {}", record.slug());
            return Ok(());
        }

        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        info!("[SYNC] Uploading files for {}: {names:?}", record.slug());
        self.content.upload_challenge_files(id, &files).await?;
        Ok(())
    }

    /// Reads the challenge's file directory from source control. A missing
    /// directory means no files; an unreadable file is skipped.
    async fn collect_files(&self, record: &ChallengeRecord) -> SyncResult<Vec<FileUpload>> {
        let repo = &self.config.source_repository;
        let branch = &self.config.source_branch;
        let dir = record.files_dir();

        let entries = match self.source.list_dir(repo, branch, &dir).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => {
                debug!("[SYNC] No file directory at {dir}");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            if entry.kind != EntryKind::File || IGNORED_FILES.contains(&entry.name.as_str()) {
                continue;
            }

            let path = format!("{dir}/{}", entry.name);
            match self.source.fetch_file(repo, branch, &path).await {
                Ok(content) => files.push(FileUpload {
                    name: entry.name,
                    content,
                }),
                Err(e) => warn!("[SYNC] Skipping file {path}: {e}"),
            }
        }
        Ok(files)
    }

    async fn upload_flags(&self, id: i64, record: &ChallengeRecord) -> SyncResult<()> {
        for flag in &record.challenge.flags {
            self.content.create_flag(&flag_params(id, flag)).await?;
        }
        Ok(())
    }

    /// Tag failures are tolerated individually.
    async fn upload_tags(&self, id: i64, record: &ChallengeRecord) {
        for tag in record.challenge.non_empty_tags() {
            let params = TagParams {
                challenge: id,
                value: tag.to_string(),
            };
            if let Err(e) = self.content.create_tag(&params).await {
                warn!("[SYNC] Failed to upload tag {tag} for {}: {e}", record.slug());
            }
        }
    }
}
