// Module declarations
pub mod semantic;
pub mod temporal;
#[cfg(test)]
mod tests;
pub mod types;

pub use types::*;

pub use semantic::{
    density_memberships, fold_unclustered, group_by_label, partition_events, split_window,
};
pub use temporal::{cluster_by_time, target_window_count};
