//! The content-service seam used by the sync adapter.

use crate::error::RemoteResult;
use crate::types::*;
use async_trait::async_trait;

/// Challenge, file, flag, tag and page operations on the scoring platform.
#[async_trait]
pub trait ContentService: Send + Sync {
    // ── Challenges ──

    /// Every challenge, including hidden ones.
    async fn list_challenges(&self) -> RemoteResult<Vec<RemoteChallenge>>;
    async fn create_challenge(&self, params: &ChallengeParams) -> RemoteResult<RemoteChallenge>;
    async fn patch_challenge(
        &self,
        id: i64,
        params: &ChallengeParams,
    ) -> RemoteResult<RemoteChallenge>;
    async fn set_challenge_state(&self, id: i64, state: ChallengeState) -> RemoteResult<()>;

    // ── Files ──

    async fn list_challenge_files(&self, challenge_id: i64) -> RemoteResult<Vec<RemoteFile>>;
    async fn upload_challenge_files(
        &self,
        challenge_id: i64,
        files: &[FileUpload],
    ) -> RemoteResult<Vec<RemoteFile>>;
    async fn delete_file(&self, id: i64) -> RemoteResult<()>;

    // ── Flags ──

    async fn list_challenge_flags(&self, challenge_id: i64) -> RemoteResult<Vec<RemoteFlag>>;
    async fn create_flag(&self, params: &FlagParams) -> RemoteResult<RemoteFlag>;
    async fn delete_flag(&self, id: i64) -> RemoteResult<()>;

    // ── Tags ──

    async fn list_challenge_tags(&self, challenge_id: i64) -> RemoteResult<Vec<RemoteTag>>;
    async fn create_tag(&self, params: &TagParams) -> RemoteResult<RemoteTag>;
    async fn delete_tag(&self, id: i64) -> RemoteResult<()>;

    // ── Pages ──

    async fn list_pages(&self) -> RemoteResult<Vec<RemotePage>>;
    async fn create_page(&self, params: &PageParams) -> RemoteResult<RemotePage>;
    async fn patch_page(&self, id: i64, params: &PageParams) -> RemoteResult<RemotePage>;
    async fn delete_page(&self, id: i64) -> RemoteResult<()>;
}
