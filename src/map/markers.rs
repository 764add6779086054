use serde::{Deserialize, Serialize};

use crate::Category;

pub const MARKER_SIZE_PX: u32 = 28;
pub const MARKER_SIZE_ACTIVE_PX: u32 = 44;

pub const DEFAULT_COLOR: &str = "#9E9E9E";

/// Closed category color table. Every `Category` has an entry; anything the
/// backend sends outside the closed set already collapsed to `Other` at
/// parse time, so the lookup is total.
const CATEGORY_COLORS: &[(Category, &str)] = &[
    (Category::Sport, "#4CAF50"),
    (Category::Music, "#9C27B0"),
    (Category::Food, "#FF9800"),
    (Category::Culture, "#3F51B5"),
    (Category::Games, "#F44336"),
    (Category::Walk, "#03A9F4"),
    (Category::Other, DEFAULT_COLOR),
];

#[must_use]
pub fn color_for(category: Category) -> &'static str {
    CATEGORY_COLORS
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    #[default]
    Static,
    Breathe,
    Bounce,
    /// Reserved for the single marker closest to the user coordinate.
    NearestPulse,
}

/// Derived per render pass, never stored (a marker's look is a pure
/// function of the impulse plus selection/ranking context).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerVisualSpec {
    pub color: &'static str,
    pub base_size_px: u32,
    pub glyph: &'static str,
    pub animation: AnimationKind,
    pub is_active: bool,
    pub is_nearest: bool,
}

/// Keyword rules scanned in order, first match wins. Matching is on the
/// lowercased content, so the same (content, category) pair classifies
/// identically across calls and process restarts.
const CONTENT_RULES: &[(&[&str], &str, AnimationKind)] = &[
    (
        &["футбол", "football", "soccer", "матч", "match"],
        "⚽",
        AnimationKind::Bounce,
    ),
    (
        &["концерт", "concert", "музык", "music"],
        "🎵",
        AnimationKind::Breathe,
    ),
    (&["кофе", "coffee", "чай", "tea"], "☕", AnimationKind::Static),
    (
        &["пицц", "pizza", "еда", "food", "ужин", "dinner"],
        "🍕",
        AnimationKind::Static,
    ),
    (
        &["кино", "cinema", "movie", "фильм"],
        "🎬",
        AnimationKind::Static,
    ),
    (
        &["прогул", "walk", "гуля"],
        "🚶",
        AnimationKind::Breathe,
    ),
    (
        &["игр", "game", "настол", "board"],
        "🎮",
        AnimationKind::Bounce,
    ),
    (
        &["учеб", "study", "лекци", "lecture"],
        "📚",
        AnimationKind::Static,
    ),
];

const fn category_fallback(category: Category) -> (&'static str, AnimationKind) {
    match category {
        Category::Sport => ("⚽", AnimationKind::Bounce),
        Category::Music => ("🎵", AnimationKind::Breathe),
        Category::Food => ("🍕", AnimationKind::Static),
        Category::Culture => ("🎭", AnimationKind::Static),
        Category::Games => ("🎮", AnimationKind::Bounce),
        Category::Walk => ("🚶", AnimationKind::Breathe),
        Category::Other => ("✨", AnimationKind::Static),
    }
}

#[must_use]
pub fn classify(content: &str, category: Category) -> (&'static str, AnimationKind) {
    let lowered = content.to_lowercase();
    for (keywords, glyph, animation) in CONTENT_RULES {
        if keywords.iter().any(|k| lowered.contains(k)) {
            return (glyph, *animation);
        }
    }
    category_fallback(category)
}

/// Size is driven by selection state, never by zoom level.
#[must_use]
pub fn present(
    category: Category,
    content: &str,
    is_active: bool,
    is_nearest: bool,
) -> MarkerVisualSpec {
    let (glyph, animation) = classify(content, category);
    MarkerVisualSpec {
        color: color_for(category),
        base_size_px: if is_active {
            MARKER_SIZE_ACTIVE_PX
        } else {
            MARKER_SIZE_PX
        },
        glyph,
        animation: if is_nearest {
            AnimationKind::NearestPulse
        } else {
            animation
        },
        is_active,
        is_nearest,
    }
}
