//! Random group assignment for accepted membership requests.

use std::sync::Mutex;

use metrics::counter;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Group, MembershipRequest, RequestStatus};
use crate::store::GroupStore;

/// What happened when the engine looked at a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// Preconditions not met; nothing was attempted.
    Skipped,
    Assigned(Uuid),
    NoMatch,
    /// Candidate lookup failed. Treated like no match.
    Failed,
}

impl AssignmentOutcome {
    fn label(&self) -> &'static str {
        match self {
            AssignmentOutcome::Skipped => "skipped",
            AssignmentOutcome::Assigned(_) => "assigned",
            AssignmentOutcome::NoMatch => "no_match",
            AssignmentOutcome::Failed => "error",
        }
    }
}

/// Picks an open group for a request's region, uniformly at random.
pub struct GroupAssigner {
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for GroupAssigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupAssigner").finish_non_exhaustive()
    }
}

impl Default for GroupAssigner {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl GroupAssigner {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic assigner for reproducible runs and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Whether an update from `previous` to `incoming` should trigger assignment.
    pub fn should_assign(previous: RequestStatus, incoming: &MembershipRequest) -> bool {
        previous != incoming.status
            && incoming.status == RequestStatus::Accepted
            && incoming.group.is_none()
            && incoming.region.is_some()
    }

    /// Uniform pick among eligible candidates.
    pub fn pick(&self, region: Uuid, candidates: &[Group]) -> Option<Uuid> {
        let eligible: Vec<&Group> = candidates
            .iter()
            .filter(|group| group.accepts_region(region))
            .collect();

        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        eligible.choose(&mut *rng).map(|group| group.id)
    }

    /// Runs assignment for an incoming update, setting `incoming.group` on success.
    ///
    /// Never fails: lookup errors are logged and reported as [`AssignmentOutcome::Failed`].
    pub async fn assign(
        &self,
        groups: &dyn GroupStore,
        previous: RequestStatus,
        incoming: &mut MembershipRequest,
    ) -> AssignmentOutcome {
        if !Self::should_assign(previous, incoming) {
            return AssignmentOutcome::Skipped;
        }
        let Some(region) = incoming.region else {
            return AssignmentOutcome::Skipped;
        };

        let outcome = match groups.find_open_groups_for_region(region).await {
            Ok(candidates) => {
                let picked = self.pick(region, &candidates);
                info!(
                    request_id = %incoming.id,
                    region_id = %region,
                    candidates = candidates.len(),
                    "Group assignment candidates loaded"
                );
                match picked {
                    Some(group_id) => {
                        incoming.group = Some(group_id);
                        info!(request_id = %incoming.id, group_id = %group_id, "Request assigned to group");
                        AssignmentOutcome::Assigned(group_id)
                    }
                    None => {
                        info!(request_id = %incoming.id, region_id = %region, "No open group for region");
                        AssignmentOutcome::NoMatch
                    }
                }
            }
            Err(e) => {
                warn!(request_id = %incoming.id, error = %e, "Failed to load candidate groups");
                AssignmentOutcome::Failed
            }
        };

        counter!("group_assignments_total", "outcome" => outcome.label()).increment(1);
        outcome
    }
}
