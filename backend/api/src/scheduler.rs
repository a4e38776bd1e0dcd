//! Long-running background task that rolls over recurring cycles once
//! their end date has passed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use crate::closing;
use crate::store::{SharedStore, Store};

pub struct SchedulerState {
    pub store: SharedStore,
    pub poll_interval_secs: u64,
}

/// Spawn the scheduler loop as a background [`tokio`] task.
pub async fn run(state: Arc<SchedulerState>) {
    info!(
        "Cycle scheduler starting — polling every {}s",
        state.poll_interval_secs
    );

    loop {
        if let Err(e) = poll_once(state.store.as_ref()).await {
            error!("Scheduler poll error: {e}");
        }
        tokio::time::sleep(Duration::from_secs(state.poll_interval_secs)).await;
    }
}

/// Perform a single poll iteration: settle every recurring pot whose
/// active cycle has expired. One pot failing never blocks the others.
async fn poll_once(store: &dyn Store) -> crate::errors::Result<()> {
    let now = Utc::now().timestamp();
    let due = store.pots_with_expired_cycles(now).await?;

    for pot in due {
        match closing::close_active_cycle(store, &pot, now).await {
            Ok(outcome) => info!(
                "Rolled over pot {} from cycle {} to cycle {:?}",
                pot.slug, outcome.cycle_number, outcome.next_cycle
            ),
            Err(e) => error!("Failed to roll over pot {}: {e}", pot.slug),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemStore;

    #[tokio::test]
    async fn poll_rolls_over_expired_recurring_cycles() {
        let seeded_at = 1_700_000_000;
        let store = MemStore::seeded(seeded_at);

        // Jump past the 30-day cycle end: contributions total 3 000 cents,
        // well under the objective, so the rollover settles a deficit.
        let store: Arc<MemStore> = Arc::new(store);
        let due = store
            .pots_with_expired_cycles(seeded_at + 31 * 86_400)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);

        for pot in due {
            closing::close_active_cycle(store.as_ref(), &pot, seeded_at + 31 * 86_400)
                .await
                .unwrap();
        }

        let pot = store.find_pot("demo123").await.unwrap().unwrap();
        assert_eq!(pot.current_cycle, 2);
        assert!(pot.is_open());
        assert!(store.refund_rows().is_empty());
    }
}
