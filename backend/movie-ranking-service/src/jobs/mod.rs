// ============================================
// Background Jobs Module
// ============================================
//
// Contains background job runners for:
// - Communal snapshot publication
//
// Triggered via CronJob (SNAPSHOT_RUN_ONCE=true) or as a long-lived loop.

pub mod communal_snapshot;

pub use communal_snapshot::{
    run_communal_snapshot_job, CommunalSnapshotConfig, CommunalSnapshotJob, SnapshotJobStats,
};
