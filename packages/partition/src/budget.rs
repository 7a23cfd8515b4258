//! Per-partition pixel budget allocation.

use crate::BudgetError;

/// Divides a global pixel budget evenly across partitions.
///
/// A depth-0 request (one partition) receives the full budget. The result
/// is floored; a floor of zero is an error rather than a request the
/// backend would treat as unlimited.
///
/// # Errors
///
/// Returns [`BudgetError::Exhausted`] if the per-partition share rounds
/// down to zero.
pub fn allocate(total_budget: u64, partition_count: usize) -> Result<u64, BudgetError> {
    let divisor = partition_count.max(1) as u64;
    let per_partition = total_budget / divisor;
    if per_partition == 0 {
        return Err(BudgetError::Exhausted {
            total_budget,
            partition_count,
        });
    }
    Ok(per_partition)
}
