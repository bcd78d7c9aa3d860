// Reconciliation: plan, apply, refresh, destroy
pub mod reconcile;

// Read-only API lookups
pub mod lookup;
