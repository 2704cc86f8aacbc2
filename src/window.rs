use std::collections::HashSet;

use anyhow::Result;
use raylib::prelude::*;
use tracing::warn;

use crate::cli::WindowSize;
use crate::constants::*;
use crate::controller::{Controller, Event};
use crate::preload::ImageCache;
use crate::slide::{Fade, Slide};
use crate::surface::SharedSurface;
use crate::texture_loader::load_texture_from_bytes;

/// Map this frame's key presses to controller events.
fn read_input(rl: &RaylibHandle, controller: &Controller<SharedSurface>) -> Vec<Event> {
    let mut events = Vec::new();

    if rl.is_key_pressed(KeyboardKey::KEY_RIGHT) || rl.is_key_pressed(KeyboardKey::KEY_SPACE) {
        events.push(Event::Next);
    }
    if rl.is_key_pressed(KeyboardKey::KEY_LEFT) {
        events.push(Event::Prev);
    }
    if rl.is_key_pressed(KeyboardKey::KEY_A) {
        events.push(Event::SetAutoplay(!controller.autoplay().enabled()));
    }
    if rl.is_key_pressed(KeyboardKey::KEY_UP) {
        events.push(Event::SetInterval(controller.autoplay().interval_secs() + 1));
    }
    if rl.is_key_pressed(KeyboardKey::KEY_DOWN) {
        events.push(Event::SetInterval(controller.autoplay().interval_secs().saturating_sub(1)));
    }
    if rl.is_key_pressed(KeyboardKey::KEY_R) {
        events.push(Event::Reload);
    }

    events
}

/// Run the slideshow in a native window until it is closed. Must be called
/// with a tokio runtime entered.
pub fn run(
    mut controller: Controller<SharedSurface>,
    surface: SharedSurface,
    cache: ImageCache,
    size: WindowSize,
) -> Result<()> {
    let (mut rl, thread) = raylib::init()
        .size(size.width, size.height)
        .title("Shuffled Slideshow")
        .vsync()
        .resizable()
        .build();
    rl.set_target_fps(FPS);
    rl.set_trace_log(TraceLogLevel::LOG_ERROR);

    controller.reload();

    let mut slide: Option<Slide> = None;
    let mut undecodable: HashSet<String> = HashSet::new();
    let mut fade = Fade::default();

    // --- Main Loop ---
    while !rl.window_should_close() {
        let dt = rl.get_frame_time();

        // 1. Input and queued events (timer ticks, finished loads)
        for event in read_input(&rl, &controller) {
            if matches!(event, Event::Reload) {
                cache.forget_failures();
                undecodable.clear();
            }
            controller.handle(event);
        }
        controller.drain();

        // 2. Follow the surface
        let state = surface.snapshot();
        fade.target = state.opacity;
        fade.update(dt);

        if let Some(reference) = &state.image {
            let loaded = slide.as_ref().is_some_and(|s| &s.reference == reference);
            if !loaded && !undecodable.contains(reference) {
                match cache.get(reference) {
                    Some(bytes) => match load_texture_from_bytes(&mut rl, &thread, reference, &bytes) {
                        Ok(texture) => slide = Some(Slide::new(reference.clone(), texture)),
                        Err(e) => {
                            warn!("{:#}", e);
                            undecodable.insert(reference.clone());
                        }
                    },
                    None => {
                        let _ = cache.request(reference);
                    }
                }
            }
        }

        // 3. Draw
        let mut d = rl.begin_drawing(&thread);
        d.clear_background(Color::BLACK);

        let sh = d.get_screen_height();

        if let Some(slide) = slide.as_ref().filter(|s| Some(&s.reference) == state.image.as_ref()) {
            slide.draw(&mut d, fade.opacity);
        }

        let position = match controller.position() {
            Some(p) => format!("{}/{}", p + 1, controller.order().len()),
            None => "-".to_string(),
        };
        let autoplay = if controller.autoplay().enabled() { "on" } else { "off" };
        d.draw_text(
            &format!("{}   autoplay {} ({}s)", position, autoplay, controller.autoplay().interval_secs()),
            20,
            20,
            20,
            Color::LIGHTGRAY,
        );

        let status_color = if state.navigation_enabled { Color::LIGHTGRAY } else { Color::RED };
        d.draw_text(&state.status, 20, sh - 40, 20, status_color);
    } // End main loop

    Ok(())
}
