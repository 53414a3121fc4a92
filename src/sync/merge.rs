use std::time::Duration;

use super::bounded;
use crate::{
    error::AppError,
    models::{MergeFailure, MergeReport, WishlistItem},
    services::WishlistRemote,
};

/// Pushes every local item to the server, one at a time, in list order
///
/// A failed push never stops the pass. A 409 from the server means the
/// program is already on the remote list and counts as merged.
pub(crate) async fn push_local_items(
    remote: &dyn WishlistRemote,
    items: &[WishlistItem],
    timeout: Duration,
) -> MergeReport {
    let mut report = MergeReport::default();

    for item in items {
        if report.succeeded.contains(&item.program_id) {
            continue;
        }

        match bounded(timeout, remote.add(item.program_id)).await {
            Ok(()) => report.succeeded.push(item.program_id),
            Err(AppError::Conflict(_)) => {
                tracing::debug!(program_id = item.program_id, "Program already on server");
                report.succeeded.push(item.program_id);
            }
            Err(e) => {
                tracing::warn!(
                    program_id = item.program_id,
                    title = %item.title,
                    error = %e,
                    "Failed to push local wishlist item"
                );
                report.failed.push(MergeFailure {
                    item: item.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}
