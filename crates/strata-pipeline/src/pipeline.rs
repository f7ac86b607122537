//! Pipeline construction, the scheduling pass, and the shutdown protocol.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use dashmap::DashMap;
use glam::Vec3;
use parking_lot::Mutex;
use strata_math::{ChunkCoord, world_to_chunk};
use strata_voxel::{ChunkRegistry, VertexColor, VoxelChunk};

use crate::collaborators::{LiquidMesher, MeshBuilder, TerrainGenerator, WaterSimulation};
use crate::workers::{self, RebuildQueue};

/// Tuning knobs of the rebuild pipeline.
#[derive(Clone, Copy, Debug)]
pub struct PipelineOptions {
    /// Whether global sunlight is simulated; when false, chunks are
    /// flooded with `sun_fallback`.
    pub sunlight_enabled: bool,
    /// Flood intensity used when sunlight simulation is disabled.
    pub sun_fallback: u8,
    /// Constant vertex color written for visible non-solid voxels.
    pub fog_color: VertexColor,
    /// Wall-clock interval of the water-simulation trigger.
    pub water_tick: Duration,
    /// Capacity of the generation request queue; excess requests are
    /// rejected until the worker catches up.
    pub generation_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            sunlight_enabled: true,
            sun_fallback: 96,
            fog_color: VertexColor {
                sun: 32,
                ambient: 48,
                dynamic: 0,
            },
            water_tick: Duration::from_millis(250),
            generation_capacity: 64,
        }
    }
}

/// Orchestrates the four background workers over the chunk registry.
///
/// The owner thread drives the pipeline: [`update_rebuild_list`] converts
/// dirty flags into prioritized queue entries once per frame, and
/// [`drain_generated`] adopts freshly generated chunks into the registry
/// (the registry has a single inserter by design).
///
/// [`update_rebuild_list`]: Self::update_rebuild_list
/// [`drain_generated`]: Self::drain_generated
pub struct RebuildPipeline {
    registry: Arc<ChunkRegistry>,
    mesh_queue: RebuildQueue,
    liquid_queue: RebuildQueue,
    mesh_wake: Sender<()>,
    liquid_wake: Sender<()>,
    gen_requests: Sender<ChunkCoord>,
    generated: Receiver<Arc<VoxelChunk>>,
    /// Coordinates requested but not yet adopted, to reject duplicates.
    pending_generation: DashMap<ChunkCoord, ()>,
    /// Dropping this closes the shutdown channel every worker selects on.
    shutdown_tx: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl RebuildPipeline {
    /// Spawns the four workers and returns the pipeline handle.
    pub fn new(
        registry: Arc<ChunkRegistry>,
        generator: Arc<dyn TerrainGenerator>,
        mesh_builder: Arc<dyn MeshBuilder>,
        liquid_mesher: Arc<dyn LiquidMesher>,
        water_sim: Arc<dyn WaterSimulation>,
        options: PipelineOptions,
    ) -> Self {
        let mesh_queue: RebuildQueue = Arc::new(Mutex::new(Vec::new()));
        let liquid_queue: RebuildQueue = Arc::new(Mutex::new(Vec::new()));
        // Wake channels hold at most one pending signal; a worker that is
        // already awake drains everything scheduled since.
        let (mesh_wake, mesh_wake_rx) = bounded::<()>(1);
        let (liquid_wake, liquid_wake_rx) = bounded::<()>(1);
        let (gen_requests, gen_requests_rx) = bounded::<ChunkCoord>(options.generation_capacity);
        let (generated_tx, generated) = unbounded::<Arc<VoxelChunk>>();
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let mut handles = Vec::with_capacity(4);

        {
            let registry = Arc::clone(&registry);
            let shutdown = shutdown_rx.clone();
            handles.push(
                std::thread::Builder::new()
                    .name("strata-generation".into())
                    .spawn(move || {
                        workers::generation_loop(
                            registry,
                            generator,
                            gen_requests_rx,
                            generated_tx,
                            shutdown,
                        )
                    })
                    .expect("failed to spawn generation worker"),
            );
        }
        {
            let registry = Arc::clone(&registry);
            let queue = Arc::clone(&mesh_queue);
            let shutdown = shutdown_rx.clone();
            handles.push(
                std::thread::Builder::new()
                    .name("strata-mesh".into())
                    .spawn(move || {
                        workers::mesh_loop(registry, mesh_builder, queue, mesh_wake_rx, shutdown, options)
                    })
                    .expect("failed to spawn mesh worker"),
            );
        }
        {
            let registry = Arc::clone(&registry);
            let queue = Arc::clone(&liquid_queue);
            let shutdown = shutdown_rx.clone();
            handles.push(
                std::thread::Builder::new()
                    .name("strata-liquid".into())
                    .spawn(move || {
                        workers::liquid_loop(registry, liquid_mesher, queue, liquid_wake_rx, shutdown)
                    })
                    .expect("failed to spawn liquid worker"),
            );
        }
        {
            let registry = Arc::clone(&registry);
            let interval = options.water_tick;
            handles.push(
                std::thread::Builder::new()
                    .name("strata-water".into())
                    .spawn(move || workers::water_loop(registry, water_sim, interval, shutdown_rx))
                    .expect("failed to spawn water trigger"),
            );
        }

        Self {
            registry,
            mesh_queue,
            liquid_queue,
            mesh_wake,
            liquid_wake,
            gen_requests,
            generated,
            pending_generation: DashMap::new(),
            shutdown_tx: Some(shutdown_tx),
            handles,
        }
    }

    /// The registry this pipeline rebuilds.
    pub fn registry(&self) -> &Arc<ChunkRegistry> {
        &self.registry
    }

    // -- scheduling ---------------------------------------------------------

    /// The once-per-frame scheduling pass.
    ///
    /// Scans all chunks once, claims those whose mesh or liquid surface is
    /// stale and not yet queued (the claim flips the pending flag), sorts
    /// each claim list by squared chunk distance from the camera — nearer
    /// first, chunks above the viewing slice last, ties by scan order —
    /// pushes the coordinates, and wakes a worker only when its queue
    /// actually gained items.
    pub fn update_rebuild_list(&self, camera: Vec3) {
        let camera_chunk = world_to_chunk(camera, self.registry.dims());
        let slice = self.registry.max_view_slice();

        let mut mesh_claims: Vec<(bool, u64, usize, ChunkCoord)> = Vec::new();
        let mut liquid_claims: Vec<(bool, u64, usize, ChunkCoord)> = Vec::new();

        for (scan_idx, chunk) in self.registry.chunks().into_iter().enumerate() {
            let coord = chunk.coord();
            let invisible = chunk.origin().y as i32 > slice;
            let dist = coord.distance_sq(camera_chunk);
            if chunk.claim_mesh_rebuild() {
                mesh_claims.push((invisible, dist, scan_idx, coord));
            }
            if chunk.claim_liquid_rebuild() {
                liquid_claims.push((invisible, dist, scan_idx, coord));
            }
        }

        if !mesh_claims.is_empty() {
            mesh_claims.sort();
            self.mesh_queue.lock().extend(mesh_claims.iter().map(|c| c.3));
            let _ = self.mesh_wake.try_send(());
        }
        if !liquid_claims.is_empty() {
            liquid_claims.sort();
            self.liquid_queue
                .lock()
                .extend(liquid_claims.iter().map(|c| c.3));
            let _ = self.liquid_wake.try_send(());
        }
    }

    // -- generation ---------------------------------------------------------

    /// Requests background generation of the chunk at `coord`.
    ///
    /// Returns `false` when the chunk already exists, is already pending,
    /// or the request queue is full — callers simply retry on a later
    /// frame.
    pub fn request_generation(&self, coord: ChunkCoord) -> bool {
        if self.registry.get_chunk(coord).is_some() {
            return false;
        }
        if self.pending_generation.contains_key(&coord) {
            return false;
        }
        self.pending_generation.insert(coord, ());
        if self.gen_requests.try_send(coord).is_err() {
            self.pending_generation.remove(&coord);
            tracing::debug!("generation queue full, rejecting {coord:?}");
            return false;
        }
        true
    }

    /// Adopts every finished chunk into the registry. Owner thread only —
    /// the registry has a single inserter, so two workers can never race
    /// an insert for the same coordinate.
    ///
    /// Returns the number of chunks adopted. Chunks rejected by admission
    /// control (capacity, occupied coordinate) are dropped.
    pub fn drain_generated(&self) -> usize {
        let mut adopted = 0;
        while let Ok(chunk) = self.generated.try_recv() {
            let coord = chunk.coord();
            self.pending_generation.remove(&coord);
            if self.registry.add_chunk(chunk) {
                adopted += 1;
            } else {
                tracing::debug!("generated chunk {coord:?} rejected by admission control");
            }
        }
        adopted
    }

    /// Number of generation requests not yet adopted.
    pub fn pending_generation_count(&self) -> usize {
        self.pending_generation.len()
    }

    // -- shutdown -----------------------------------------------------------

    /// Stops all four workers and joins their threads.
    ///
    /// Closing the shared shutdown channel makes every worker's wait
    /// return immediately; partially drained queues are abandoned, not
    /// completed. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shutdown_tx.take().is_some() {
            tracing::info!("shutting down rebuild pipeline");
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for RebuildPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
