use std::sync::{Arc, Mutex, MutexGuard};

/// What the controller drives on screen.
///
/// Implementations are shared with background tasks (the delayed image swap),
/// so every method takes `&self`.
pub trait Surface: Send + Sync + 'static {
    fn set_image(&self, reference: &str);
    fn set_opacity(&self, opacity: f32);
    fn set_status(&self, status: &str);
    fn set_navigation_enabled(&self, enabled: bool);
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    pub image: Option<String>,
    pub opacity: f32,
    pub status: String,
    pub navigation_enabled: bool,
    /// Bumped on every change so frontends can redraw lazily.
    pub revision: u64,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            image: None,
            opacity: 1.0,
            status: String::new(),
            navigation_enabled: false,
            revision: 0,
        }
    }
}

/// Surface backed by a plain struct behind a mutex. Frontends read a snapshot
/// every frame.
#[derive(Debug, Clone, Default)]
pub struct SharedSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl SharedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SurfaceState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        // A panicking writer cannot leave the state half-updated.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut SurfaceState)) {
        let mut state = self.lock();
        f(&mut state);
        state.revision += 1;
    }
}

impl Surface for SharedSurface {
    fn set_image(&self, reference: &str) {
        self.update(|s| s.image = Some(reference.to_string()));
    }

    fn set_opacity(&self, opacity: f32) {
        self.update(|s| s.opacity = opacity.clamp(0.0, 1.0));
    }

    fn set_status(&self, status: &str) {
        self.update(|s| s.status = status.to_string());
    }

    fn set_navigation_enabled(&self, enabled: bool) {
        self.update(|s| s.navigation_enabled = enabled);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_surface_tracks_changes() {
        let surface = SharedSurface::new();
        let start = surface.snapshot();
        assert_eq!(start.image, None);
        assert!(!start.navigation_enabled);

        surface.set_opacity(0.0);
        surface.set_image("a.png");
        surface.set_opacity(3.0);
        surface.set_status("ready");
        surface.set_navigation_enabled(true);

        let state = surface.snapshot();
        assert_eq!(state.image.as_deref(), Some("a.png"));
        assert_eq!(state.opacity, 1.0);
        assert_eq!(state.status, "ready");
        assert!(state.navigation_enabled);
        assert_eq!(state.revision, start.revision + 5);
    }

    #[test]
    fn clones_share_state() {
        let surface = SharedSurface::new();
        let other = surface.clone();
        other.set_image("b.png");
        assert_eq!(surface.snapshot().image.as_deref(), Some("b.png"));
    }
}
