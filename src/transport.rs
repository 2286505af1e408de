//! Where drafts end up. The engine only knows the [`DraftTransport`] trait;
//! the stores here are the implementations the binary and the tests use.

use std::future::Future;

use type_safe_id::{StaticType, TypeSafeId};

use crate::draft::{DocumentSnapshot, DraftToken};

mod file;
mod memory;

pub use file::{FileDraftStore, StoredDraft};
pub use memory::MemoryDraftStore;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Draft;

impl StaticType for Draft {
    const TYPE: &'static str = "draft";
}

/// Issues fresh tokens, e.g. `draft_01h455vb4pex5vsknk084sn02q`.
pub type DraftId = TypeSafeId<Draft>;

impl From<DraftId> for DraftToken {
    fn from(id: DraftId) -> Self {
        DraftToken::new(id.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("draft store unavailable: {0}")]
    Unavailable(String),
    #[error("no draft with token {0}")]
    UnknownDraft(DraftToken),
    #[error("draft store I/O failed")]
    Io(#[from] std::io::Error),
    #[error("draft could not be encoded")]
    Encoding(#[from] serde_json::Error),
}

/// Remote draft store as seen by the autosave engine.
///
/// Both calls are fallible and may take arbitrarily long; the engine imposes
/// no timeout of its own.
pub trait DraftTransport: Send + Sync + 'static {
    /// Persists a draft for the first time and returns its newly issued token.
    fn create_draft(
        &self,
        snapshot: &DocumentSnapshot,
    ) -> impl Future<Output = Result<DraftToken, TransportError>> + Send;

    /// Overwrites the draft identified by `token`.
    fn update_draft(
        &self,
        token: &DraftToken,
        snapshot: &DocumentSnapshot,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
