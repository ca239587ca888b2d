//! Bundled MapReduce applications, resolvable by name.

use common::Workload;

pub mod grep;
pub mod vertex_degree;
pub mod wc;

const WORKLOADS: &[(&str, Workload)] = &[
    (
        "wc",
        Workload {
            map_fn: wc::map,
            reduce_fn: wc::reduce,
        },
    ),
    (
        "grep",
        Workload {
            map_fn: grep::map,
            reduce_fn: grep::reduce,
        },
    ),
    (
        "vertex-degree",
        Workload {
            map_fn: vertex_degree::map,
            reduce_fn: vertex_degree::reduce,
        },
    ),
];

/// Look up a workload by name.
pub fn try_named(name: &str) -> Option<Workload> {
    WORKLOADS
        .iter()
        .find(|(workload_name, _)| *workload_name == name)
        .map(|(_, workload)| *workload)
}

/// Names of every bundled workload.
pub fn names() -> impl Iterator<Item = &'static str> {
    WORKLOADS.iter().map(|(name, _)| *name)
}
