use crate::icon::requests::{Hotspot, IconSize};
use crate::icon::targets::EntryEncoding;
use std::collections::HashSet;
use thiserror::Error;

const HEADER_SIZE: usize = 6;
const DIRECTORY_ENTRY_SIZE: usize = 16;
const ICON_COLOR_PLANES: u16 = 1;
const ICON_BITS_PER_PIXEL: u16 = 32;

/// Whether the container is an icon or a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Icon,
    Cursor,
}

impl ContainerKind {
    /// The resource type stored in the container header.
    pub fn resource_type(self) -> u16 {
        match self {
            Self::Icon => 1,
            Self::Cursor => 2,
        }
    }

    /// The conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Icon => "ico",
            Self::Cursor => "cur",
        }
    }
}

/// One encoded image inside the container.
#[derive(Debug, Clone, PartialEq)]
pub struct IconEntry {
    pub size: IconSize,
    pub encoding: EntryEncoding,
    pub payload: Vec<u8>,

    /// The hotspot of the entry, only used by cursors
    pub hotspot: Option<Hotspot>,
}

/// A complete icon or cursor, entries ordered ascending by size.
#[derive(Debug, Clone, PartialEq)]
pub struct IconContainer {
    kind: ContainerKind,
    entries: Vec<IconEntry>,
}

impl IconContainer {
    /// Creates a container, sorting the entries by size.
    pub fn new(kind: ContainerKind, mut entries: Vec<IconEntry>) -> Self {
        entries.sort_by_key(|entry| entry.size);
        Self { kind, entries }
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn entries(&self) -> &[IconEntry] {
        &self.entries
    }

    /// Serializes the container.
    pub fn write(&self) -> Result<Vec<u8>, ContainerError> {
        write_container(&self.entries, self.kind)
    }
}

/// Serializes entries into an ICO or CUR file.
///
/// Entries are written ascending by size no matter the order they are passed in, and payloads
/// follow the directory back to back. The output only depends on the entries and the kind.
pub fn write_container(entries: &[IconEntry], kind: ContainerKind) -> Result<Vec<u8>, ContainerError> {
    let mut sorted: Vec<&IconEntry> = entries.iter().collect();
    sorted.sort_by_key(|entry| entry.size);

    let mut seen = HashSet::with_capacity(sorted.len());
    if let Some(duplicate) = sorted.iter().find(|entry| !seen.insert(entry.size)) {
        return Err(ContainerError::DuplicateSize(duplicate.size));
    }

    let count =
        u16::try_from(sorted.len()).map_err(|_| ContainerError::TooManyEntries(sorted.len()))?;

    let directory_end = HEADER_SIZE + DIRECTORY_ENTRY_SIZE * sorted.len();
    let total = sorted
        .iter()
        .try_fold(directory_end, |acc, entry| acc.checked_add(entry.payload.len()))
        .filter(|total| u32::try_from(*total).is_ok())
        .ok_or(ContainerError::TooLarge)?;

    let mut data = Vec::with_capacity(total);

    // Header
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&kind.resource_type().to_le_bytes());
    data.extend_from_slice(&count.to_le_bytes());

    // Directory
    let mut offset = directory_end;
    for entry in &sorted {
        let (field_a, field_b) = match kind {
            ContainerKind::Icon => (ICON_COLOR_PLANES, ICON_BITS_PER_PIXEL),
            ContainerKind::Cursor => entry.hotspot.unwrap_or_default().to_pixels(entry.size),
        };

        data.push(entry.size.directory_byte());
        data.push(entry.size.directory_byte());
        data.push(0); // Color count
        data.push(0); // Reserved
        data.extend_from_slice(&field_a.to_le_bytes());
        data.extend_from_slice(&field_b.to_le_bytes());
        data.extend_from_slice(&(entry.payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&(offset as u32).to_le_bytes());

        offset += entry.payload.len();
    }

    // Payloads
    for entry in &sorted {
        data.extend_from_slice(&entry.payload);
    }

    debug_assert_eq!(data.len(), total);

    tracing::debug!(
        "Wrote {:?} container with {} entries ({} bytes)",
        kind,
        count,
        data.len()
    );

    Ok(data)
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("more than one entry has the size {0}")]
    DuplicateSize(IconSize),

    #[error("a container can hold at most 65535 entries, got {0}")]
    TooManyEntries(usize),

    #[error("the container would exceed 4 GiB")]
    TooLarge,
}
