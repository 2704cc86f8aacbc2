use rand::Rng;

use crate::catalog::{ImageRef, SourceList};

/// The sequence the slideshow actually walks through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationOrder {
    items: Vec<ImageRef>,
}

impl PresentationOrder {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[ImageRef] {
        &self.items
    }
}

/// Backward Fisher–Yates: every permutation is equally likely.
pub fn shuffle_in_place<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

pub fn shuffle<R: Rng + ?Sized>(source: SourceList, rng: &mut R) -> PresentationOrder {
    let mut items = source;
    shuffle_in_place(&mut items, rng);
    PresentationOrder { items }
}
