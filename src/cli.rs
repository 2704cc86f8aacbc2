use std::fmt;
use std::str::FromStr;

use clap::{ArgAction, Parser};

use crate::autoplay::clamp_interval;
use crate::catalog::CatalogLocation;
use crate::constants::*;
use crate::controller::Options;

#[derive(Parser)]
#[command(name = "slideshow")]
#[command(author, version, about)]
#[command(long_about = "Show the images listed in a JSON catalog in shuffled order.\n\n\
    The catalog is a JSON array of image paths or URLs, relative to the catalog itself.\n\n\
    Examples:\n  \
    slideshow images.json                      Open a window, step with the arrow keys\n  \
    slideshow https://host/images.json -a      Start with autoplay on\n  \
    slideshow images.json --headless           Drive it from the terminal")]
pub struct Cli {
    /// Catalog file or http(s) URL
    pub catalog: CatalogLocation,

    /// Seconds between automatic advances (1 to 86400)
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval: u64,

    /// Start with autoplay enabled
    #[arg(short, long)]
    pub autoplay: bool,

    /// Seed for the shuffle, for a reproducible order
    #[arg(long)]
    pub seed: Option<u64>,

    /// Read commands from stdin instead of opening a window
    #[arg(long)]
    pub headless: bool,

    /// Window size as WIDTHxHEIGHT
    #[arg(long, default_value_t = WindowSize::default())]
    pub size: WindowSize,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn options(&self) -> Options {
        Options {
            interval_secs: clamp_interval(self.interval),
            autoplay: self.autoplay,
            seed: self.seed,
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: i32,
    pub height: i32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: RENDER_WIDTH / 2,
            height: RENDER_HEIGHT / 2,
        }
    }
}

impl FromStr for WindowSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width: i32 = width.trim().parse().map_err(|_| format!("invalid width '{}'", width))?;
        let height: i32 = height.trim().parse().map_err(|_| format!("invalid height '{}'", height))?;
        if width <= 0 || height <= 0 {
            return Err(format!("window size must be positive, got {}x{}", width, height));
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
