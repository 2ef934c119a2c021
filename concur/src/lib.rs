//! Assembles Windows icon (`.ico`) and cursor (`.cur`) files from a set of source images.
//!
//! The pipeline picks the closest source for every requested size, resizes it, encodes it as
//! PNG or as a bitmap with an AND mask and serializes everything into a single container. See
//! [`icon::IconProcessor`] for the entry point.

pub mod icon;
