use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::autoplay::Autoplay;
use crate::catalog::{self, CatalogLocation, LoadError, SourceList};
use crate::constants::*;
use crate::preload::{spawn_preload, Cancel, Preloader};
use crate::shuffle::{shuffle, PresentationOrder};
use crate::state::LoadState;
use crate::surface::Surface;
use crate::viewer::{next_index, prev_index, Viewer};

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum Event {
    Next,
    Prev,
    SetAutoplay(bool),
    SetInterval(u64),
    Reload,
    Tick { generation: u64 },
    Loaded(Result<SourceList, LoadError>),
}

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub interval_secs: u64,
    pub autoplay: bool,
    pub seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            autoplay: false,
            seed: None,
        }
    }
}

/// Owns the presentation order, the current position and the autoplay
/// timer. All mutation goes through [`Controller::handle`] or the methods it
/// dispatches to; background tasks talk back through the event channel.
pub struct Controller<S: Surface> {
    location: CatalogLocation,
    surface: Arc<S>,
    viewer: Viewer<S>,
    preloader: Arc<dyn Preloader>,
    rng: StdRng,

    state: LoadState,
    order: PresentationOrder,
    position: Option<usize>,
    autoplay: Autoplay,

    transition: Option<JoinHandle<()>>,
    preload: Option<JoinHandle<()>>,
    preload_cancel: Cancel,

    events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
}

impl<S: Surface> Controller<S> {
    /// Must be called inside a tokio runtime when `options.autoplay` is set.
    pub fn new(
        location: CatalogLocation,
        surface: Arc<S>,
        preloader: Arc<dyn Preloader>,
        options: Options,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let tick_tx = events_tx.clone();
        let mut autoplay = Autoplay::new(options.interval_secs, move |generation| {
            tick_tx.send(Event::Tick { generation }).is_ok()
        });
        if options.autoplay {
            autoplay.set_enabled(true);
        }

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        surface.set_navigation_enabled(false);

        Self {
            location,
            viewer: Viewer::new(Arc::clone(&surface)),
            surface,
            preloader,
            rng,
            state: LoadState::Loading,
            order: PresentationOrder::default(),
            position: None,
            autoplay,
            transition: None,
            preload: None,
            preload_cancel: Cancel::default(),
            events_tx,
            events_rx,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn order(&self) -> &PresentationOrder {
        &self.order
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&str> {
        self.position.and_then(|p| self.order.get(p))
    }

    pub fn autoplay(&self) -> &Autoplay {
        &self.autoplay
    }

    /// The most recent fade transition, if it has not been taken yet.
    #[cfg(test)]
    pub fn take_transition(&mut self) -> Option<JoinHandle<()>> {
        self.transition.take()
    }

    /// The most recent preload batch, if it has not been taken yet.
    #[cfg(test)]
    pub fn take_preload(&mut self) -> Option<JoinHandle<()>> {
        self.preload.take()
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Next | Event::Prev if !self.state.navigable() => {
                debug!("ignoring {:?} while {:?}", event, self.state);
            }
            Event::Next => {
                self.transition = self.next();
                self.autoplay.restart_if_enabled();
            }
            Event::Prev => {
                self.transition = self.prev();
                self.autoplay.restart_if_enabled();
            }
            Event::Tick { generation } => {
                if self.autoplay.accepts(generation) {
                    self.transition = self.next();
                } else {
                    debug!("dropping tick from stale timer {}", generation);
                }
            }
            Event::SetAutoplay(enabled) => self.autoplay.set_enabled(enabled),
            Event::SetInterval(secs) => self.autoplay.set_interval(secs),
            Event::Reload => {
                self.reload();
            }
            Event::Loaded(result) => self.apply_load(result),
        }
    }

    /// Handle everything already queued. Returns how many events ran.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next queued event. Never returns `None` while the
    /// controller is alive, since it holds a sender itself.
    pub async fn recv(&mut self) -> Option<Event> {
        self.events_rx.recv().await
    }

    /// Fetch the catalog on the blocking pool and post the outcome back as
    /// [`Event::Loaded`].
    pub fn reload(&mut self) -> JoinHandle<()> {
        self.set_state(LoadState::Loading);

        let location = self.location.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::task::spawn_blocking(move || catalog::load(&location)).await {
                Ok(result) => result,
                Err(e) => Err(LoadError::Worker(e.to_string())),
            };
            let _ = tx.send(Event::Loaded(result));
        })
    }

    /// Replace the order with a shuffle of `result`, or report why there is
    /// nothing to show.
    pub fn apply_load(&mut self, result: Result<SourceList, LoadError>) {
        match result {
            Ok(source) if !source.is_empty() => {
                let count = source.len();
                self.order = shuffle(source, &mut self.rng);
                self.position = Some(0);
                self.restart_preload();
                self.transition = self.viewer.show(&self.order, 0);
                info!("loaded {} images from {}", count, self.location);
                self.set_state(LoadState::Ready { count });
            }
            Ok(_) => {
                warn!("catalog {} has no images", self.location);
                self.clear_order();
                self.set_state(LoadState::Empty);
            }
            Err(e) => {
                warn!("failed to load {}: {}", self.location, e);
                self.clear_order();
                self.set_state(LoadState::Failed(e.to_string()));
            }
        }
    }

    pub fn next(&mut self) -> Option<JoinHandle<()>> {
        self.step(next_index)
    }

    pub fn prev(&mut self) -> Option<JoinHandle<()>> {
        self.step(prev_index)
    }

    fn step(&mut self, advance: fn(usize, usize) -> usize) -> Option<JoinHandle<()>> {
        let position = self.position?;
        let len = self.order.len();
        if len == 0 {
            return None;
        }
        let position = advance(position, len);
        self.position = Some(position);
        self.viewer.show(&self.order, position)
    }

    /// Stop the previous batch, drop what the old order cached and warm the
    /// current one.
    fn restart_preload(&mut self) {
        self.preload_cancel.cancel();
        if self.preload.take().is_some_and(|batch| !batch.is_finished()) {
            debug!("cancelled the unfinished preload batch");
        }
        self.preloader.retain(self.order.as_slice());
        if self.order.is_empty() {
            return;
        }
        self.preload_cancel = Cancel::default();
        self.preload = Some(spawn_preload(
            Arc::clone(&self.preloader),
            self.order.as_slice().to_vec(),
            self.preload_cancel.clone(),
        ));
    }

    fn clear_order(&mut self) {
        self.order = PresentationOrder::default();
        self.position = None;
        self.restart_preload();
    }

    fn set_state(&mut self, state: LoadState) {
        let location = self.location.to_string();
        self.surface.set_status(&state.message(&location));
        self.surface.set_navigation_enabled(state.navigable());
        self.state = state;
    }
}

impl<S: Surface> Drop for Controller<S> {
    fn drop(&mut self) {
        self.preload_cancel.cancel();
        if let Some(transition) = self.transition.take() {
            transition.abort();
        }
    }
}
