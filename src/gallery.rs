//! Session gallery
//!
//! Saved charts in the order they were saved. The store is owned by one
//! session; nothing here is shared or locked.

use crate::graph::RenderedArtifact;
use chrono::{DateTime, Local};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub name: String,
    pub description: String,
    pub artifact: RenderedArtifact,
    pub created_at: DateTime<Local>,
}

/// Insertion-ordered store with an optional capacity
#[derive(Debug, Clone, Default)]
pub struct GalleryStore {
    /// Kept contiguous after every append so `list` is a single slice
    entries: VecDeque<GalleryEntry>,
    capacity: Option<usize>,
}

impl GalleryStore {
    /// `None` keeps every entry; `Some(n)` evicts the oldest once `n` are stored
    pub fn new(capacity: Option<usize>) -> Self {
        GalleryStore {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Save an artifact stamped with the current local time
    pub fn append(
        &mut self,
        artifact: RenderedArtifact,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &GalleryEntry {
        self.append_at(artifact, name, description, Local::now())
    }

    pub fn append_at(
        &mut self,
        artifact: RenderedArtifact,
        name: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Local>,
    ) -> &GalleryEntry {
        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity {
                let Some(evicted) = self.entries.pop_front() else {
                    break;
                };
                tracing::debug!(name = %evicted.name, capacity, "evicted oldest gallery entry");
            }
        }
        self.entries.push_back(GalleryEntry {
            name: name.into(),
            description: description.into(),
            artifact,
            created_at,
        });
        let entries = self.entries.make_contiguous();
        &entries[entries.len() - 1]
    }

    /// Entries in insertion order
    pub fn list(&self) -> &[GalleryEntry] {
        self.entries.as_slices().0
    }

    pub fn get(&self, index: usize) -> Option<&GalleryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
