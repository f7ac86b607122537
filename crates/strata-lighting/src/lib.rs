//! Lighting computation for the strata terrain core.
//!
//! Two stages, both invoked by the mesh-rebuild worker under the
//! lighting-dirty gate: global sunlight (per-column ray casting into the
//! sun array) and per-vertex coloring (sun averaging, ambient occlusion,
//! emissive override) into the corner-indexed vertex color array.

mod sunlight;
mod vertex;

pub use sunlight::{FULL_SUN, calculate_global_light};
pub use vertex::calculate_vertex_lighting;
