//! URL handling module for sitemapper
//!
//! This module provides link resolution against the page a link was found
//! on, site-membership checks, image source resolution, and the ordered
//! regex matching used for exclusions and changefreq/priority lookups.

mod matcher;
mod normalize;

// Re-export main functions
pub use matcher::{PatternMap, PatternSet};
pub use normalize::{
    canonical_root, resolve_image_src, resolve_link, same_site_candidate, ImageScope,
};
