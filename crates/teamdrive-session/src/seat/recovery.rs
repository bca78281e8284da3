//! Startup recovery of ledger state from persisted checkouts.

use std::sync::Arc;

use tracing::info;

use teamdrive_core::result::AppResult;

use crate::store::CheckoutStore;

use super::ledger::{SeatHold, SeatLedger};

/// Rebuild the ledger's holds from the active checkout rows.
///
/// Called once during startup so seat accounting survives process
/// restarts. Returns the number of holds restored.
pub async fn restore_from_checkouts(
    ledger: &Arc<dyn SeatLedger>,
    checkout_store: &Arc<dyn CheckoutStore>,
) -> AppResult<u32> {
    let active = checkout_store.find_all_active().await?;

    let holds: Vec<SeatHold> = active
        .iter()
        .map(|checkout| SeatHold {
            checkout_id: checkout.id,
            user_id: checkout.user_id,
            feature_name: checkout.feature_name.clone(),
            allocated_at: checkout.checked_out_at,
        })
        .collect();

    let count = holds.len() as u32;
    ledger.restore(holds).await?;

    info!(restored = count, "Seat ledger recovered from persisted state");
    Ok(count)
}
