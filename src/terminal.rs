use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::autoplay::parse_interval;
use crate::controller::{Controller, Event};
use crate::surface::{SharedSurface, SurfaceState};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

const HELP: &str = "commands: n = next, p = previous, a = toggle autoplay, \
                    i <seconds> = autoplay interval, r = reload, q = quit";

#[derive(Debug, PartialEq)]
pub enum Command {
    Next,
    Prev,
    ToggleAutoplay,
    Interval(u64),
    Reload,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match word.to_lowercase().as_str() {
        "n" | "next" | "" => Some(Command::Next),
        "p" | "prev" | "previous" => Some(Command::Prev),
        "a" | "autoplay" => Some(Command::ToggleAutoplay),
        "i" | "interval" => Some(Command::Interval(parse_interval(rest))),
        "r" | "reload" => Some(Command::Reload),
        "h" | "help" | "?" => Some(Command::Help),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

/// Render what changed between two surface snapshots as printable lines.
fn describe_changes(
    previous: &SurfaceState,
    current: &SurfaceState,
    controller: &Controller<SharedSurface>,
) -> Vec<String> {
    let mut lines = Vec::new();
    if current.status != previous.status && !current.status.is_empty() {
        lines.push(current.status.clone());
    }
    if current.image != previous.image {
        if let Some(image) = &current.image {
            let position = controller.position().map_or(0, |p| p + 1);
            lines.push(format!("[{}/{}] {}", position, controller.order().len(), image));
        }
    }
    lines
}

/// Drive the controller from stdin and print every surface change.
pub async fn run(mut controller: Controller<SharedSurface>, surface: SharedSurface) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    let mut shown = SurfaceState::default();

    controller.reload();
    println!("{}", HELP);

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Some(Command::Quit) => break,
                    Some(Command::Help) => println!("{}", HELP),
                    Some(Command::Next) => controller.handle(Event::Next),
                    Some(Command::Prev) => controller.handle(Event::Prev),
                    Some(Command::ToggleAutoplay) => {
                        let enabled = !controller.autoplay().enabled();
                        controller.handle(Event::SetAutoplay(enabled));
                        println!("autoplay {} ({}s)", if enabled { "on" } else { "off" }, controller.autoplay().interval_secs());
                    }
                    Some(Command::Interval(secs)) => {
                        controller.handle(Event::SetInterval(secs));
                        println!("interval {}s", controller.autoplay().interval_secs());
                    }
                    Some(Command::Reload) => controller.handle(Event::Reload),
                    None => println!("unknown command: {} ({})", line.trim(), HELP),
                }
            }
            Some(event) = controller.recv() => {
                debug!("event {:?}", event);
                controller.handle(event);
            }
            _ = poll.tick() => {}
        }

        let current = surface.snapshot();
        if current.revision != shown.revision {
            for line in describe_changes(&shown, &current, &controller) {
                println!("{}", line);
            }
            shown = current;
        }
    }

    Ok(())
}
