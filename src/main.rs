use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod autoplay;
mod catalog;
mod cli;
mod constants;
mod controller;
mod preload;
mod shuffle;
#[cfg_attr(not(feature = "window"), allow(dead_code))]
mod slide;
mod state;
mod surface;
mod terminal;
#[cfg_attr(not(feature = "window"), allow(dead_code))]
mod texture_loader;
mod viewer;
#[cfg(feature = "window")]
mod window;

use crate::cli::Cli;
use crate::controller::Controller;
use crate::preload::{FetchOnly, ImageCache, Preloader};
use crate::surface::SharedSurface;

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    // One worker is enough: timers, transitions and the channel glue are tiny,
    // fetches run on the blocking pool.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let result = {
        let _guard = runtime.enter();
        run(&cli, &runtime)
    };

    // A fetch still in flight must not keep the process alive after quitting.
    runtime.shutdown_background();
    result
}

fn run(cli: &Cli, runtime: &tokio::runtime::Runtime) -> Result<()> {
    let surface = SharedSurface::new();
    let cache = ImageCache::new();

    // Only the window decodes images; headless runs just check they load.
    let windowed = cfg!(feature = "window") && !cli.headless;
    let preloader: Arc<dyn Preloader> = if windowed {
        Arc::new(cache.clone())
    } else {
        Arc::new(FetchOnly)
    };
    let controller = Controller::new(
        cli.catalog.clone(),
        Arc::new(surface.clone()),
        preloader,
        cli.options(),
    );

    #[cfg(feature = "window")]
    {
        if windowed {
            return window::run(controller, surface, cache, cli.size);
        }
    }

    runtime.block_on(terminal::run(controller, surface))
}
