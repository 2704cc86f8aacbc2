use std::time::Duration;

pub const TRANSITION_DELAY: Duration = Duration::from_millis(250); // Fade-out before the image swap
pub const DEFAULT_INTERVAL_SECS: u64 = 3;                          // Autoplay period when none is given
pub const MIN_INTERVAL_SECS: u64 = 1;                              // Autoplay period lower bound
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;                   // Autoplay period upper bound

pub const MAX_IMAGE_BYTES: u64 = 64 * 1024 * 1024;                 // Body limit for one fetched image
pub const MAX_CATALOG_BYTES: u64 = 4 * 1024 * 1024;                // Body limit for the catalog

pub const RENDER_WIDTH: i32 = 1920;                                // Default window width
pub const RENDER_HEIGHT: i32 = 1080;                               // Default window height
pub const FPS: u32 = 60;                                           // Frames per second
pub const FADE_SPEED: f32 = 1.0 / 0.25;                            // Opacity change per second on screen
