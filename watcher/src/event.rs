//! Live path events.

use std::collections::HashMap;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;

use notify::EventKind;
use notify::event::ModifyKind;

/// Change flags attached to a live event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventFlags(u8);

impl EventFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Item was created.
    pub const CREATED: Self = Self(1);
    /// Item was removed.
    pub const REMOVED: Self = Self(1 << 1);
    /// Item was renamed; reported for both the old and the new name.
    pub const RENAMED: Self = Self(1 << 2);
    /// Item contents changed.
    pub const MODIFIED: Self = Self(1 << 3);
    /// Item metadata changed.
    pub const METADATA: Self = Self(1 << 4);
    /// Item was opened, read or closed.
    pub const ACCESSED: Self = Self(1 << 5);
    /// The backend could not classify the change.
    pub const OTHER: Self = Self(1 << 6);

    /// Whether every flag in `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether the item was created.
    pub fn is_created(self) -> bool {
        self.contains(Self::CREATED)
    }

    /// Whether the item was renamed.
    pub fn is_renamed(self) -> bool {
        self.contains(Self::RENAMED)
    }
}

impl BitOr for EventFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<EventKind> for EventFlags {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::CREATED,
            EventKind::Modify(ModifyKind::Name(_)) => Self::RENAMED,
            EventKind::Modify(ModifyKind::Metadata(_)) => Self::METADATA,
            EventKind::Modify(_) => Self::MODIFIED,
            EventKind::Remove(_) => Self::REMOVED,
            EventKind::Access(_) => Self::ACCESSED,
            EventKind::Any | EventKind::Other => Self::OTHER,
        }
    }
}

/// A path reported by the event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEvent {
    /// The affected path.
    pub path: PathBuf,

    /// What happened to it.
    pub flags: EventFlags,
}

impl PathEvent {
    /// Create a new path event.
    pub fn new(path: impl Into<PathBuf>, flags: EventFlags) -> Self {
        Self {
            path: path.into(),
            flags,
        }
    }

    /// Split a notify event into one path event per path.
    pub fn from_notify(event: notify::Event) -> impl Iterator<Item = Self> {
        let flags = EventFlags::from(event.kind);
        event.paths.into_iter().map(move |path| Self::new(path, flags))
    }
}

/// Events collected during one latency window.
///
/// Repeated events for a path collapse into its first entry with the flags
/// merged, so arrival order is kept.
#[derive(Debug, Clone, Default)]
pub struct EventBatch {
    events: Vec<PathEvent>,
    positions: HashMap<PathBuf, usize>,
}

impl EventBatch {
    /// Create a new empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event, merging it into an earlier one for the same path.
    pub fn push(&mut self, event: PathEvent) {
        match self.positions.get(&event.path) {
            Some(&index) => self.events[index].flags |= event.flags,
            None => {
                self.positions.insert(event.path.clone(), self.events.len());
                self.events.push(event);
            }
        }
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get the number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Events in arrival order.
    pub fn iter(&self) -> std::slice::Iter<'_, PathEvent> {
        self.events.iter()
    }
}

impl FromIterator<PathEvent> for EventBatch {
    fn from_iter<I: IntoIterator<Item = PathEvent>>(iter: I) -> Self {
        let mut batch = Self::new();
        for event in iter {
            batch.push(event);
        }
        batch
    }
}

impl<'a> IntoIterator for &'a EventBatch {
    type Item = &'a PathEvent;
    type IntoIter = std::slice::Iter<'a, PathEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
