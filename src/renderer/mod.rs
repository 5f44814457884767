pub mod backend;
pub mod frame;
pub mod graph;
pub mod pipeline;

use crate::context::RenderContext;
use crate::shader::CacheStats;
use crate::view::View;
use derivative::Derivative;

pub use backend::WgpuBackend;
pub use frame::{LightFrame, ModelFrame, SceneFrame};
pub use graph::{ForwardPass, RenderGraph, RenderPass, ShadowPass};

/// What one call to [`Renderer::render`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats
{
        pub frame: u64,

        pub scenes: usize,

        pub draws: usize,

        /// Programs destroyed at the end of the frame.
        pub retired: usize,

        pub cache: CacheStats,
}

/// Turns the active part of a view into draw calls once per frame.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Renderer
{
        pub graph: RenderGraph,

        frames: u64,

        /// Logs shader cache counters after every frame.
        pub log_stats: bool,
}

impl Default for Renderer
{
        fn default() -> Self
        {
                Self::new(RenderGraph::standard())
        }
}

impl Renderer
{
        pub fn new(graph: RenderGraph) -> Self
        {
                Self {
                        graph,
                        frames: 0,
                        log_stats: false,
                }
        }

        pub fn frames(&self) -> u64
        {
                self.frames
        }

        /// Snapshots the view, runs the graph and presents.
        ///
        /// Programs evicted from the shader cache, during this frame or
        /// since the last one, are destroyed even when recording fails.
        pub fn render(
                &mut self,
                view: &View<RenderContext>,
                ctx: &mut RenderContext,
        ) -> anyhow::Result<FrameStats>
        {
                let scenes = frame::collect(view);

                let result = self
                        .graph
                        .execute(&scenes, ctx)
                        .and_then(|draws| ctx.gpu.present().map(|_| draws));

                let retired = ctx.flush_retired();

                let draws = result?;

                self.frames += 1;

                let stats = FrameStats {
                        frame: self.frames,
                        scenes: scenes.len(),
                        draws,
                        retired,
                        cache: ctx.shaders.stats(),
                };

                if self.log_stats
                {
                        log::info!(
                                "Frame {}: {} scene(s), {} draw(s), {} cached program(s), {} hit(s), {} miss(es)",
                                stats.frame,
                                stats.scenes,
                                stats.draws,
                                ctx.shaders.len(),
                                stats.cache.hits,
                                stats.cache.misses
                        );
                }

                Ok(stats)
        }
}
