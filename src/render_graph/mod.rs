//! The frame as a chain of passes.
//!
//! [`MeshNode`] draws the scene into an HDR target, [`BloomNode`] adds the
//! glow, and [`FinishNode`] vignettes, tone maps and writes the surface. The
//! overlay is drawn last, straight onto the surface:
//!
//! ```ignore
//! graph.render(&gpu, time, &camera, |gpu, pass| overlay.render(gpu, pass))?;
//! ```

mod graph;
mod mesh_queue;
mod post_process_nodes;
mod render_node;
mod render_target;

pub use graph::{RenderGraph, RenderGraphBuilder};
pub use mesh_queue::{MeshNode, MeshQueue};
pub use post_process_nodes::{BloomNode, FinishNode};
pub use render_node::{RenderContext, RenderNode};
pub use render_target::RenderTarget;
