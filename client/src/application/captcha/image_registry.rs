use bytes::Bytes;
use std::collections::BTreeSet;

use crate::domain::{ChallengeImage, ImageHandle};

/// Issues and revokes challenge image handles.
///
/// Only the coordinator owns one of these; a live handle is one that has
/// been created and not yet revoked.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    next_id: u64,
    live: BTreeSet<ImageHandle>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, content_type: impl Into<String>, bytes: Bytes) -> ChallengeImage {
        self.next_id += 1;
        let handle = ImageHandle::from_raw(self.next_id);
        self.live.insert(handle);
        ChallengeImage {
            handle,
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Returns false for handles that were never issued or already revoked
    pub fn revoke(&mut self, handle: ImageHandle) -> bool {
        self.live.remove(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: ImageHandle) -> bool {
        self.live.contains(&handle)
    }
}
