use crate::icon::inputs::{SourceCatalog, SourceId};
use crate::icon::requests::{IconSize, OutputRequestTable};
use std::collections::BTreeMap;

/// The outcome of choosing a source for one requested size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Source(SourceId),
    Unsatisfiable,
}

/// Picks the source an entry of the given size is derived from.
///
/// Only sources at least as large as the entry in both dimensions qualify. The one with the
/// smallest larger dimension wins, ties go to the source declared first.
pub fn select_source(size: IconSize, catalog: &SourceCatalog) -> Option<SourceId> {
    let size = size.get() as u32;

    // min_by_key keeps the first of several equal candidates
    catalog
        .iter()
        .filter(|source| source.width() >= size && source.height() >= size)
        .min_by_key(|source| source.width().max(source.height()))
        .map(|source| source.id())
}

/// Selects a source for every requested size.
pub fn select(
    requests: &OutputRequestTable,
    catalog: &SourceCatalog,
) -> BTreeMap<IconSize, Selection> {
    requests
        .iter()
        .map(|request| {
            let selection = match select_source(request.size, catalog) {
                Some(id) => Selection::Source(id),
                None => Selection::Unsatisfiable,
            };

            (request.size, selection)
        })
        .collect()
}
