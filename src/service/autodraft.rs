//! Autodraft strategy resolver.
//!
//! Chooses a nomination for a seat whose deadline elapsed with autodraft
//! enabled. Choices are deterministic: the RNG is seeded from the draft's
//! autopick seed mixed with the pick number, so replaying a draft with the
//! same seed reproduces the same autopicks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{AutodraftConfig, AutodraftStrategy, Draft, DraftPlan, NominationId};
use crate::error::DraftError;
use crate::persistence::DraftTx;

const PICK_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Derives the RNG seed for one pick of a draft.
///
/// Uses the draft's `auto_pick_seed` when set, otherwise the low 64 bits of
/// the draft id, so every draft has a stable seed.
#[must_use]
pub fn pick_seed(draft: &Draft, pick_number: i32) -> u64 {
    let base = draft.auto_pick_seed.map_or_else(
        || draft.id.as_uuid().as_u64_pair().1,
        |seed| u64::from_ne_bytes(seed.to_ne_bytes()),
    );
    let pick = u64::from(pick_number.unsigned_abs());
    base ^ pick.wrapping_mul(PICK_MIX)
}

/// Picks uniformly from `undrafted`, which must be sorted for stable
/// indexing. Returns `None` when the pool is empty.
#[must_use]
pub fn choose_random(undrafted: &[NominationId], seed: u64) -> Option<NominationId> {
    if undrafted.is_empty() {
        return None;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let index = rng.random_range(0..undrafted.len());
    undrafted.get(index).copied()
}

/// Returns the highest-ranked plan entry that is still undrafted.
#[must_use]
pub fn choose_from_plan(plan: &DraftPlan, undrafted: &[NominationId]) -> Option<NominationId> {
    plan.entries
        .iter()
        .find(|entry| undrafted.binary_search(entry).is_ok())
        .copied()
}

/// Applies a strategy to an already-loaded pool.
///
/// PLAN falls back to RANDOM when the plan is missing or exhausted.
#[must_use]
pub fn choose(
    strategy: AutodraftStrategy,
    plan: Option<&DraftPlan>,
    undrafted: &[NominationId],
    seed: u64,
) -> Option<NominationId> {
    match strategy {
        AutodraftStrategy::Random => choose_random(undrafted, seed),
        AutodraftStrategy::Plan => plan
            .and_then(|plan| choose_from_plan(plan, undrafted))
            .or_else(|| choose_random(undrafted, seed)),
    }
}

/// Resolves the nomination to autopick for the current pick of the draft
/// held by `tx`.
///
/// Returns `Ok(None)` when no undrafted nomination is left.
///
/// # Errors
///
/// Returns a persistence error if the pool or the plan cannot be loaded.
pub(crate) async fn resolve(
    tx: &mut dyn DraftTx,
    config: &AutodraftConfig,
    pick_number: i32,
) -> Result<Option<NominationId>, DraftError> {
    let undrafted = tx.undrafted_nominations().await?;
    let plan = match (config.strategy, config.plan_id) {
        (AutodraftStrategy::Plan, Some(plan_id)) => tx.plan(plan_id).await?,
        _ => None,
    };
    let seed = pick_seed(tx.draft(), pick_number);
    Ok(choose(config.strategy, plan.as_ref(), &undrafted, seed))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::draft::tests::pending_draft;
    use crate::domain::{ParticipantId, PlanId};

    fn pool(n: usize) -> Vec<NominationId> {
        let mut ids: Vec<NominationId> = (0..n).map(|_| NominationId::new()).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn random_is_deterministic_for_a_seed() {
        let undrafted = pool(20);
        let a = choose_random(&undrafted, 42);
        let b = choose_random(&undrafted, 42);
        assert_eq!(a, b);
        assert!(a.is_some_and(|id| undrafted.contains(&id)));
    }

    #[test]
    fn random_on_empty_pool_is_none() {
        assert_eq!(choose_random(&[], 1), None);
    }

    #[test]
    fn plan_takes_first_undrafted_entry() {
        let undrafted = pool(5);
        let Some(second) = undrafted.get(1).copied() else {
            panic!("pool too small");
        };
        let Some(fourth) = undrafted.get(3).copied() else {
            panic!("pool too small");
        };
        let plan = DraftPlan {
            id: PlanId::new(),
            participant_id: ParticipantId::new(),
            entries: vec![NominationId::new(), fourth, second],
        };
        let chosen = choose(AutodraftStrategy::Plan, Some(&plan), &undrafted, 9);
        assert_eq!(chosen, Some(fourth));
    }

    #[test]
    fn exhausted_plan_falls_back_to_random() {
        let undrafted = pool(5);
        let plan = DraftPlan {
            id: PlanId::new(),
            participant_id: ParticipantId::new(),
            entries: vec![NominationId::new()],
        };
        let chosen = choose(AutodraftStrategy::Plan, Some(&plan), &undrafted, 9);
        assert_eq!(chosen, choose_random(&undrafted, 9));
    }

    #[test]
    fn seed_varies_by_pick_and_honours_draft_seed() {
        let mut draft = pending_draft();
        assert_ne!(pick_seed(&draft, 1), pick_seed(&draft, 2));
        let seeded = pick_seed(&draft, 1);
        draft.auto_pick_seed = Some(8);
        assert_ne!(pick_seed(&draft, 1), seeded);
        draft.auto_pick_seed = None;
        assert_eq!(pick_seed(&draft, 3), pick_seed(&draft, 3));
    }
}
