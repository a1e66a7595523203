//! Reconciliation with the hosted backend.
//!
//! Four domains sync: locations, tasks and appointments as per-row tables
//! merged last-write-wins, finances as a single per-user document row.

mod client;
mod outcome;
mod rows;
mod sync;

pub use client::{SupabaseClient, TableClient};
pub use outcome::SyncOutcome;
pub use sync::{CloudSync, RemoteSync, MSG_PULLED, MSG_SYNC_FAILED};
