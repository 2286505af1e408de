use std::{
    io::ErrorKind,
    str::FromStr,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    draft::{DocumentSnapshot, DraftToken},
    transport::{DraftId, DraftTransport, TransportError},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDraft {
    pub token: DraftToken,
    #[serde(flatten)]
    pub snapshot: DocumentSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Keeps one JSON file per draft in a directory.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn load(&self, token: &DraftToken) -> Result<StoredDraft, TransportError> {
        let path = self.path_of(token)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(TransportError::UnknownDraft(token.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    /// All readable drafts, most recently updated first.
    pub async fn list(&self) -> Result<Vec<StoredDraft>, TransportError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(err.into()),
        };
        let mut drafts = vec![];
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let raw = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<StoredDraft>(&raw) {
                Ok(draft) => drafts.push(draft),
                Err(err) => warn!("Skipping unreadable draft file {path:?}: {err}"),
            }
        }
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(drafts)
    }

    /// Only tokens this store could have issued map to a file, so no token
    /// resolves outside the directory.
    fn path_of(&self, token: &DraftToken) -> Result<PathBuf, TransportError> {
        match DraftId::from_str(token.as_str()) {
            Ok(id) => Ok(self.dir.join(format!("{id}.json"))),
            Err(err) => {
                debug!("Rejecting malformed draft token {token:?}: {err}");
                Err(TransportError::UnknownDraft(token.clone()))
            }
        }
    }

    async fn write(&self, draft: &StoredDraft) -> Result<(), TransportError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_of(&draft.token)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, serde_json::to_vec_pretty(draft)?).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        debug!("Wrote draft {} to {path:?}", draft.token);
        Ok(())
    }
}

impl DraftTransport for FileDraftStore {
    async fn create_draft(&self, snapshot: &DocumentSnapshot) -> Result<DraftToken, TransportError> {
        let now = Utc::now();
        let draft = StoredDraft {
            token: DraftId::new().into(),
            snapshot: snapshot.clone(),
            created_at: now,
            updated_at: now,
        };
        self.write(&draft).await?;
        Ok(draft.token)
    }

    async fn update_draft(
        &self,
        token: &DraftToken,
        snapshot: &DocumentSnapshot,
    ) -> Result<(), TransportError> {
        let mut draft = self.load(token).await?;
        draft.snapshot = snapshot.clone();
        draft.updated_at = Utc::now();
        self.write(&draft).await
    }
}
