//! # Integration Flows

pub mod end_to_end;
pub mod history_inference;
pub mod node_flows;
