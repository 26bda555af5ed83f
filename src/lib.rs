mod app;
mod components;
pub mod config;
pub mod document;
pub mod editor;
pub mod geometry;
pub mod models;
mod pages;
pub mod state;
mod util;

use leptos::prelude::*;

pub use app::App;
pub use editor::{use_tag_editor, PlacedTags, TagEditor};

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(App);
}

#[cfg(test)]
mod tests {
    use crate::models::default_suggestions;
    use crate::pages::{PREDEFINED_TAGS, STORIES};

    #[test]
    fn test_story_routes_are_unique() {
        let mut paths: Vec<_> = STORIES.iter().map(|(p, _)| *p).collect();
        paths.dedup();
        assert_eq!(paths.len(), STORIES.len());
        assert_eq!(STORIES[0].0, "/");
    }

    #[test]
    fn test_predefined_story_uses_catalog_ids() {
        let catalog = default_suggestions();
        for id in PREDEFINED_TAGS {
            assert!(catalog.iter().any(|s| s.id == id), "{id} not in catalog");
        }
    }
}
