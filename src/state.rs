#[derive(Debug, PartialEq, Eq, Clone)]
pub enum LoadState {
    Loading,                  // Catalog fetch in flight
    Ready { count: usize },   // Shuffled order available, navigation enabled
    Empty,                    // Catalog loaded but had nothing to show
    Failed(String),           // Fetch or parse failed
}

impl LoadState {
    pub fn navigable(&self) -> bool {
        matches!(self, LoadState::Ready { .. })
    }

    /// Status line shown to the user for this state.
    pub fn message(&self, location: &str) -> String {
        match self {
            LoadState::Loading => format!("Loading catalog from {}…", location),
            LoadState::Ready { count } => format!("Loaded {} images in shuffled order.", count),
            LoadState::Empty => "No images found. Check the catalog and the images folder.".to_string(),
            LoadState::Failed(reason) => format!("Load error: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ready_is_navigable() {
        assert!(LoadState::Ready { count: 1 }.navigable());
        assert!(!LoadState::Loading.navigable());
        assert!(!LoadState::Empty.navigable());
        assert!(!LoadState::Failed("x".into()).navigable());
    }

    #[test]
    fn every_state_has_a_message() {
        for state in [
            LoadState::Loading,
            LoadState::Ready { count: 3 },
            LoadState::Empty,
            LoadState::Failed("timeout".into()),
        ] {
            assert!(!state.message("images.json").is_empty());
        }
        assert_eq!(
            LoadState::Ready { count: 3 }.message("images.json"),
            "Loaded 3 images in shuffled order."
        );
        assert!(LoadState::Failed("timeout".into()).message("x").ends_with("timeout"));
    }
}
