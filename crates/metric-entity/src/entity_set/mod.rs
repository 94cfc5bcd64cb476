//! Entity sets and their average-mapping graph.

pub mod graph;
pub mod instance_list;

pub use graph::EntitySetGraph;
pub use instance_list::parse_instance_list;
