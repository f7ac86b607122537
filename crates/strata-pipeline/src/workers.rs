//! Worker loop bodies: the per-cycle drain logic of the mesh, liquid,
//! generation, and water-trigger threads.
//!
//! Every loop has the same shape: block in a `select!` over its wake
//! signal and the shared shutdown channel, exit immediately on shutdown
//! (in-flight work is abandoned, not completed), otherwise drain once.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, select};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use strata_lighting::{calculate_global_light, calculate_vertex_lighting};
use strata_math::{ChunkCoord, chunk_origin};
use strata_voxel::{ChunkEvent, ChunkRegistry, VoxelChunk};

use crate::collaborators::{LiquidMesher, MeshBuilder, TerrainGenerator, WaterSimulation};
use crate::pipeline::PipelineOptions;

/// A rebuild queue: coordinates pushed by the scheduler in priority
/// order, drained wholesale by one worker per wake.
pub(crate) type RebuildQueue = Arc<Mutex<Vec<ChunkCoord>>>;

/// Takes the queue contents, deduplicated by coordinate with the
/// scheduler's order preserved — a chunk enqueued twice in one wake is
/// processed once.
fn take_cycle(queue: &RebuildQueue) -> Vec<ChunkCoord> {
    let coords = std::mem::take(&mut *queue.lock());
    let mut seen = FxHashSet::default();
    coords.into_iter().filter(|c| seen.insert(*c)).collect()
}

/// The generation worker: pops one chunk request at a time, runs the
/// generator, marks the result dirty, and publishes it for owner-thread
/// adoption.
pub(crate) fn generation_loop(
    registry: Arc<ChunkRegistry>,
    generator: Arc<dyn TerrainGenerator>,
    requests: Receiver<ChunkCoord>,
    generated: Sender<Arc<VoxelChunk>>,
    shutdown: Receiver<()>,
) {
    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(requests) -> request => {
                let Ok(coord) = request else { break };
                let dims = registry.dims();
                let chunk = generator.generate(coord, chunk_origin(coord, dims), dims);
                chunk.mark_mesh_dirty();
                chunk.mark_lighting_dirty();
                chunk.mark_ramps_dirty();
                if generated.send(Arc::new(chunk)).is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("generation worker exiting");
}

/// The mesh worker: per wake, drains its queue into a working set, then
/// runs three sub-passes in order — ramp recompute, lighting, mesh
/// geometry — clearing flags per chunk as each completes.
pub(crate) fn mesh_loop(
    registry: Arc<ChunkRegistry>,
    builder: Arc<dyn MeshBuilder>,
    queue: RebuildQueue,
    wake: Receiver<()>,
    shutdown: Receiver<()>,
    options: PipelineOptions,
) {
    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(wake) -> msg => {
                if msg.is_err() {
                    break;
                }
                mesh_cycle(&registry, &builder, &queue, &options);
            }
        }
    }
    tracing::debug!("mesh worker exiting");
}

fn mesh_cycle(
    registry: &ChunkRegistry,
    builder: &Arc<dyn MeshBuilder>,
    queue: &RebuildQueue,
    options: &PipelineOptions,
) {
    let coords = take_cycle(queue);
    if coords.is_empty() {
        return;
    }
    let types = Arc::clone(registry.voxel_types());

    // A chunk removed from the registry while queued is skipped, never an
    // error — its pending flag dies with it.
    let resolve = |coord: &ChunkCoord| registry.get_chunk(*coord);

    // Pass 1: ramp hints (gated per chunk by the ramps flag).
    for chunk in coords.iter().filter_map(resolve) {
        chunk.update_ramps(&types);
    }

    // Pass 2: lighting for every chunk flagged stale.
    for chunk in coords.iter().filter_map(resolve) {
        if !chunk.lighting_dirty() {
            continue;
        }
        {
            let mut data = chunk.data().write();
            calculate_global_light(
                &mut data,
                &types,
                options.sunlight_enabled,
                options.sun_fallback,
            );
        }
        calculate_vertex_lighting(registry, &chunk, options.fog_color);
        chunk.clear_lighting_dirty();
    }

    // Pass 3: mesh geometry for every chunk still flagged dirty. A
    // builder failure abandons the rest of the cycle; the abandoned
    // chunks keep their stale flags and their pending flags are released
    // so the next scheduling pass retries them.
    for (i, coord) in coords.iter().enumerate() {
        let Some(chunk) = resolve(coord) else {
            continue;
        };
        if !chunk.mesh_dirty() {
            chunk.clear_mesh_pending();
            continue;
        }
        match builder.build_mesh(&chunk) {
            Ok(()) => {
                chunk.clear_mesh_rebuilt();
                registry.events().push(ChunkEvent::ChunkModified { chunk: *coord });
            }
            Err(err) => {
                tracing::error!("mesh rebuild failed for {coord:?}: {err}; abandoning cycle");
                for remaining in coords[i..].iter().filter_map(resolve) {
                    remaining.clear_mesh_pending();
                }
                return;
            }
        }
    }
}

/// The liquid worker: drains its queue and rebuilds each chunk's liquid
/// surface. Failures recover per chunk — logged, the stale flag kept for
/// retry, and the cycle continues. The worker itself never dies short of
/// shutdown.
pub(crate) fn liquid_loop(
    registry: Arc<ChunkRegistry>,
    mesher: Arc<dyn LiquidMesher>,
    queue: RebuildQueue,
    wake: Receiver<()>,
    shutdown: Receiver<()>,
) {
    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(wake) -> msg => {
                if msg.is_err() {
                    break;
                }
                liquid_cycle(&registry, &mesher, &queue);
            }
        }
    }
    tracing::debug!("liquid worker exiting");
}

fn liquid_cycle(registry: &ChunkRegistry, mesher: &Arc<dyn LiquidMesher>, queue: &RebuildQueue) {
    for coord in take_cycle(queue) {
        let Some(chunk) = registry.get_chunk(coord) else {
            continue;
        };
        match mesher.build_liquid_mesh(&chunk) {
            Ok(()) => chunk.clear_liquid_rebuilt(),
            Err(err) => {
                tracing::error!("liquid rebuild failed for {coord:?}: {err}; will retry");
                chunk.clear_liquid_pending();
            }
        }
    }
}

/// The water trigger: signals the external simulation on a fixed
/// wall-clock interval until shutdown.
pub(crate) fn water_loop(
    registry: Arc<ChunkRegistry>,
    simulation: Arc<dyn WaterSimulation>,
    interval: std::time::Duration,
    shutdown: Receiver<()>,
) {
    let ticker = crossbeam_channel::tick(interval);
    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(ticker) -> _ => simulation.advance_tick(&registry),
        }
    }
    tracing::debug!("water trigger exiting");
}
