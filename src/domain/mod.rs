//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains its rich domain types plus the components that
//! operate on them (stores, engines, session state machines).

pub mod order;
pub mod wallet;
