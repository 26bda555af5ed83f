use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A draggable entry of the suggestion panel.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    pub id: String,
    pub label: String,
    pub icon: String,
}

impl Suggestion {
    pub fn new(id: &str, label: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// The fixed suggestion catalog.
pub fn default_suggestions() -> Vec<Suggestion> {
    vec![
        Suggestion::new("ask-ai", "Ask AI", "🤖"),
        Suggestion::new("input", "Input", "📝"),
        Suggestion::new("perplexity", "Perplexity", "🔄"),
    ]
}

pub(crate) fn find_suggestion<'a>(catalog: &'a [Suggestion], id: &str) -> Option<&'a Suggestion> {
    catalog.iter().find(|s| s.id == id)
}

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Identity of one placed chip.
///
/// Minted per placement, so two chips created from the same suggestion never
/// share an id. Ids are process-wide unique, which also keeps chips of two
/// editors on the same page apart.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TagInstanceId(String);

impl TagInstanceId {
    pub fn mint() -> Self {
        let n = NEXT_INSTANCE.fetch_add(1, Ordering::SeqCst);
        Self(format!("chip-{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TagInstanceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TagInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chip as stored in the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chip {
    pub instance: TagInstanceId,
    pub suggestion_id: String,
    pub label: String,
    pub icon: String,
}

impl Chip {
    pub fn place(suggestion: &Suggestion) -> Self {
        Self {
            instance: TagInstanceId::mint(),
            suggestion_id: suggestion.id.clone(),
            label: suggestion.label.clone(),
            icon: suggestion.icon.clone(),
        }
    }
}

/// Entry of the placed-tags list, in drop order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedTag {
    pub instance: TagInstanceId,
    pub suggestion_id: String,
}

impl From<&Chip> for PlacedTag {
    fn from(chip: &Chip) -> Self {
        Self {
            instance: chip.instance.clone(),
            suggestion_id: chip.suggestion_id.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("drag payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("drag payload is missing `{0}`")]
    MissingField(&'static str),
}

/// What travels through `DataTransfer` as `text/plain`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DragPayload {
    /// A suggestion dragged out of the panel.
    Suggestion(Suggestion),
    /// An already placed chip being repositioned.
    Internal(TagInstanceId),
}

/// Wire shape: `{id, label, icon}` or `{id, isInternalDrag: true}`.
#[derive(Serialize, Deserialize)]
struct WirePayload {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    #[serde(
        rename = "isInternalDrag",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    is_internal_drag: bool,
}

impl DragPayload {
    pub const MIME: &'static str = "text/plain";

    pub fn decode(raw: &str) -> Result<Self, PayloadError> {
        let wire: WirePayload = serde_json::from_str(raw)?;
        if wire.is_internal_drag {
            return Ok(Self::Internal(TagInstanceId(wire.id)));
        }

        let label = wire.label.ok_or(PayloadError::MissingField("label"))?;
        let icon = wire.icon.ok_or(PayloadError::MissingField("icon"))?;
        Ok(Self::Suggestion(Suggestion {
            id: wire.id,
            label,
            icon,
        }))
    }

    pub fn encode(&self) -> String {
        let wire = match self {
            Self::Suggestion(s) => WirePayload {
                id: s.id.clone(),
                label: Some(s.label.clone()),
                icon: Some(s.icon.clone()),
                is_internal_drag: false,
            },
            Self::Internal(id) => WirePayload {
                id: id.0.clone(),
                label: None,
                icon: None,
                is_internal_drag: true,
            },
        };
        serde_json::to_string(&wire).unwrap_or_default()
    }
}
