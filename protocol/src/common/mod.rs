//! Transport-agnostic containers shared by the node.

pub mod rolling_list;

pub use rolling_list::{RollingList, RollingListError};
