//! The concurrent rebuild pipeline of the strata terrain core.
//!
//! Four long-lived worker threads cooperate over shared queues: chunk
//! generation, mesh rebuild (ramps + lighting + geometry), liquid-surface
//! rebuild, and the fixed-interval water-simulation trigger. The owner
//! thread feeds them through [`RebuildPipeline::update_rebuild_list`] once
//! per frame and adopts generated chunks through
//! [`RebuildPipeline::drain_generated`]; workers block only on their wake
//! signals and exit promptly on shutdown.

mod collaborators;
mod pipeline;
mod workers;

pub use collaborators::{
    LiquidMesher, MeshBuilder, MeshError, TerrainGenerator, WaterSimulation,
};
pub use pipeline::{PipelineOptions, RebuildPipeline};
