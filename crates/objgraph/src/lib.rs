//! Classes, instances, inheritance, property resolution, containment,
//! DBREF allocation, verb/function tables, and the permission model
//! (spec.md §§4.2, 4.4, 4.8).

pub mod cache;
pub mod object_graph;
pub mod permission;
pub mod verb_table;

pub use object_graph::ObjectGraph;
pub use permission::PermissionModel;
pub use verb_table::{Provenance, VerbTable};
