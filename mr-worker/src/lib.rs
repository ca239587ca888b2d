//! Worker side of the MapReduce cluster: polls the coordinator, runs the
//! map or reduce task it is handed, and reports completion.

pub mod args;
pub mod core;
pub mod map;
pub mod reduce;
