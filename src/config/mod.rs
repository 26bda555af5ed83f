use crate::models::{default_suggestions, Suggestion};
use std::str::FromStr;

pub const DEFAULT_BLUR_GRACE_MS: u32 = 200;
pub const DEFAULT_HOVER_TOLERANCE_PX: f64 = 5.0;
pub const DEFAULT_PLACEHOLDER: &str = "Type or drag tags here...";

/// What to do with a dropped chip whose target cannot be resolved (no caret
/// under the pointer, or no child below the hover line).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum UnresolvedDrop {
    /// Place it at the end of the document.
    #[default]
    Append,
    /// Drop it silently.
    Discard,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TagEditorConfig {
    pub blur_grace_ms: u32,
    pub hover_tolerance_px: f64,
    pub placeholder: String,
    pub unresolved_drop: UnresolvedDrop,
    pub suggestions: Vec<Suggestion>,
}

impl Default for TagEditorConfig {
    fn default() -> Self {
        Self {
            blur_grace_ms: DEFAULT_BLUR_GRACE_MS,
            hover_tolerance_px: DEFAULT_HOVER_TOLERANCE_PX,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            unresolved_drop: UnresolvedDrop::default(),
            suggestions: default_suggestions(),
        }
    }
}

impl TagEditorConfig {
    /// The grace period as a `setTimeout` delay, saturating at `i32::MAX`.
    pub fn blur_grace_timeout(&self) -> i32 {
        i32::try_from(self.blur_grace_ms).unwrap_or(i32::MAX)
    }

    /// Defaults, overridden by an optional `window.TAG_EDITOR` object:
    ///
    /// ```js
    /// window.TAG_EDITOR = { blurGraceMs: 300, hoverTolerancePx: 8, unresolvedDrop: "discard" };
    /// ```
    pub fn from_window() -> Self {
        let mut cfg = Self::default();

        let Some(env) = web_sys::window().and_then(|w| w.get("TAG_EDITOR")) else {
            return cfg;
        };
        let env: wasm_bindgen::JsValue = env.into();
        if env.is_undefined() || !env.is_object() {
            return cfg;
        }

        let read = |key: &str| js_sys::Reflect::get(&env, &key.into()).ok();

        if let Some(ms) = read("blurGraceMs").and_then(|v| v.as_f64()) {
            if ms >= 0.0 {
                cfg.blur_grace_ms = ms.round() as u32;
            }
        }
        if let Some(px) = read("hoverTolerancePx").and_then(|v| v.as_f64()) {
            if px > 0.0 {
                cfg.hover_tolerance_px = px;
            }
        }
        if let Some(p) = read("placeholder").and_then(|v| v.as_string()) {
            cfg.placeholder = p;
        }
        if let Some(mode) = read("unresolvedDrop").and_then(|v| v.as_string()) {
            match UnresolvedDrop::from_str(mode.trim()) {
                Ok(m) => cfg.unresolved_drop = m,
                Err(_) => leptos::logging::warn!("TAG_EDITOR.unresolvedDrop: unknown mode {mode:?}"),
            }
        }

        cfg
    }
}
