use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::constants::TRANSITION_DELAY;
use crate::shuffle::PresentationOrder;
use crate::surface::Surface;

pub fn next_index(position: usize, len: usize) -> usize {
    (position + 1) % len
}

pub fn prev_index(position: usize, len: usize) -> usize {
    (position + len - 1) % len
}

/// Puts images on the surface with a fade-out, swap, fade-in sequence.
pub struct Viewer<S: Surface> {
    surface: Arc<S>,
}

impl<S: Surface> Viewer<S> {
    pub fn new(surface: Arc<S>) -> Self {
        Self { surface }
    }

    /// Show the image at `index`.
    ///
    /// Opacity drops to 0 before this returns; the swap and the return to full
    /// opacity happen in the returned task after [`TRANSITION_DELAY`]. Returns
    /// `None` when `index` has no entry. Must be called inside a tokio runtime.
    pub fn show(&self, order: &PresentationOrder, index: usize) -> Option<JoinHandle<()>> {
        let reference = order.get(index)?.to_string();
        self.surface.set_opacity(0.0);

        let surface = Arc::clone(&self.surface);
        Some(tokio::spawn(async move {
            tokio::time::sleep(TRANSITION_DELAY).await;
            surface.set_image(&reference);
            surface.set_opacity(1.0);
        }))
    }
}
