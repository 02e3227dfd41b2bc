pub mod communal;
pub mod percentile;
pub mod reorder;
pub mod skill_rating;
pub mod store;

pub use communal::{CommunalError, CommunalRankingService};
pub use percentile::RankPercentileAggregator;
pub use reorder::{DragState, DualListReorderModel, ListKind, Slot};
pub use skill_rating::{SkillLedger, SkillRatingAggregator};
