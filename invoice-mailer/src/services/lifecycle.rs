//! Single owner of rendered-artifact destruction.
//!
//! Every artifact is tracked from the moment it is persisted. A send attempt
//! holds a [`SendLease`], so at most one attempt is in flight per artifact,
//! and the backing file is removed at most once, only after a terminal
//! outcome.

use crate::models::{DeliveryOutcome, RenderedArtifact};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("artifact {0} is not tracked")]
    Unknown(Uuid),

    #[error("artifact {0} has a delivery attempt in flight")]
    InFlight(Uuid),

    #[error("artifact {id} cannot be released as {disposition:?} (last outcome: {last_outcome:?})")]
    NotReleasable {
        id: Uuid,
        disposition: Disposition,
        last_outcome: Option<DeliveryOutcome>,
    },
}

/// Why an artifact is being destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The provider accepted the message.
    Delivered,
    /// The provider rejected the message and the caller gave up on it.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactState {
    Ready {
        last_outcome: Option<DeliveryOutcome>,
    },
    InFlight {
        previous: Option<DeliveryOutcome>,
    },
}

#[derive(Debug)]
struct TrackedArtifact {
    path: PathBuf,
    state: ArtifactState,
}

/// Entries live only while an artifact can still be sent. Releasing or
/// abandoning an artifact drops its entry, so the map holds no history.
#[derive(Debug, Default)]
pub struct ArtifactLifecycle {
    artifacts: DashMap<Uuid, TrackedArtifact>,
}

impl ArtifactLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly persisted artifact.
    pub(crate) fn register(&self, artifact: &RenderedArtifact) {
        self.artifacts.insert(
            artifact.id(),
            TrackedArtifact {
                path: artifact.path().to_path_buf(),
                state: ArtifactState::Ready { last_outcome: None },
            },
        );
        tracing::debug!(artifact_id = %artifact.id(), path = ?artifact.path(), "Artifact registered");
    }

    /// Claim the artifact for one send attempt.
    pub fn lease(&self, artifact: &RenderedArtifact) -> Result<SendLease<'_>, LifecycleError> {
        let id = artifact.id();
        let mut entry = self
            .artifacts
            .get_mut(&id)
            .ok_or(LifecycleError::Unknown(id))?;

        let state = entry.state;
        match state {
            ArtifactState::Ready { last_outcome } => {
                entry.state = ArtifactState::InFlight {
                    previous: last_outcome,
                };
                Ok(SendLease {
                    lifecycle: self,
                    id,
                    settled: false,
                })
            }
            ArtifactState::InFlight { .. } => Err(LifecycleError::InFlight(id)),
        }
    }

    /// Destroy the backing storage and stop tracking the artifact.
    ///
    /// Allowed only once, never while a send is in flight, and only when the
    /// last outcome matches the disposition: `Delivered` after `Success`,
    /// `Discarded` after `RejectedByProvider`. A second release finds no
    /// entry and fails with `Unknown`. Removal failures are logged and
    /// otherwise ignored.
    pub async fn release(&self, id: Uuid, disposition: Disposition) -> Result<(), LifecycleError> {
        let path = match self.artifacts.entry(id) {
            Entry::Vacant(_) => return Err(LifecycleError::Unknown(id)),
            Entry::Occupied(entry) => {
                let last_outcome = match entry.get().state {
                    ArtifactState::InFlight { .. } => return Err(LifecycleError::InFlight(id)),
                    ArtifactState::Ready { last_outcome } => last_outcome,
                };
                let allowed = matches!(
                    (disposition, last_outcome),
                    (Disposition::Delivered, Some(DeliveryOutcome::Success))
                        | (Disposition::Discarded, Some(DeliveryOutcome::RejectedByProvider))
                );
                if !allowed {
                    return Err(LifecycleError::NotReleasable {
                        id,
                        disposition,
                        last_outcome,
                    });
                }
                entry.remove().path
            }
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(artifact_id = %id, path = ?path, disposition = ?disposition, "Artifact deleted");
            }
            Err(e) => {
                tracing::warn!(
                    artifact_id = %id,
                    path = ?path,
                    error = %e,
                    "Could not delete artifact"
                );
            }
        }

        Ok(())
    }

    /// Convenience for the caller-side discard after a rejection.
    pub async fn discard(&self, artifact: &RenderedArtifact) -> Result<(), LifecycleError> {
        self.release(artifact.id(), Disposition::Discarded).await
    }

    /// Stop tracking an artifact whose delivery was given up without a
    /// terminal outcome. The file stays on disk and its path is returned
    /// so the caller can report it.
    pub fn abandon(&self, artifact: &RenderedArtifact) -> Result<PathBuf, LifecycleError> {
        let id = artifact.id();
        match self.artifacts.entry(id) {
            Entry::Vacant(_) => Err(LifecycleError::Unknown(id)),
            Entry::Occupied(entry) => match entry.get().state {
                ArtifactState::InFlight { .. } => Err(LifecycleError::InFlight(id)),
                ArtifactState::Ready { .. } => {
                    let path = entry.remove().path;
                    tracing::info!(artifact_id = %id, path = ?path, "Artifact abandoned");
                    Ok(path)
                }
            },
        }
    }

    pub fn is_tracked(&self, id: Uuid) -> bool {
        self.artifacts.contains_key(&id)
    }

    /// Number of artifacts that can still be sent.
    pub fn tracked(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_in_flight(&self, id: Uuid) -> bool {
        self.artifacts
            .get(&id)
            .is_some_and(|entry| matches!(entry.state, ArtifactState::InFlight { .. }))
    }

    /// Outcome of the most recent completed attempt, if any.
    pub fn last_outcome(&self, id: Uuid) -> Option<DeliveryOutcome> {
        self.artifacts.get(&id).and_then(|entry| match entry.state {
            ArtifactState::Ready { last_outcome } => last_outcome,
            ArtifactState::InFlight { previous } => previous,
        })
    }

    fn finish(&self, id: Uuid, outcome: Option<DeliveryOutcome>) {
        if let Some(mut entry) = self.artifacts.get_mut(&id) {
            let state = entry.state;
            if let ArtifactState::InFlight { previous } = state {
                entry.state = ArtifactState::Ready {
                    last_outcome: outcome.or(previous),
                };
            }
        }
    }
}

/// Exclusive claim on an artifact for the duration of one send attempt.
///
/// Dropping an unsettled lease (validation failure, cancelled future) puts
/// the artifact back as it was.
#[derive(Debug)]
pub struct SendLease<'a> {
    lifecycle: &'a ArtifactLifecycle,
    id: Uuid,
    settled: bool,
}

impl SendLease<'_> {
    /// Record the classified outcome and end the attempt.
    pub fn settle(mut self, outcome: DeliveryOutcome) {
        self.lifecycle.finish(self.id, Some(outcome));
        self.settled = true;
    }
}

impl Drop for SendLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.lifecycle.finish(self.id, None);
        }
    }
}
