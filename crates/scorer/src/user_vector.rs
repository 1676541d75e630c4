//! Per-request user vector.
//!
//! Genre positions get binary presence, the watch slot gets a saturating
//! function of how much the user has watched. Everything else stays zero.

use model_store::{FeatureVector, GenreEncoding, VectorLayout};

/// Watch-history size at which the watch slot saturates at 1.0
pub const WATCH_SATURATION: f32 = 10.0;

/// `min(watched / 10, 1)`
pub fn watch_influence(watched_count: usize) -> f32 {
    (watched_count as f32 / WATCH_SATURATION).min(1.0)
}

/// Build the user vector for `layout`.
///
/// Genres missing from the encoding are ignored, as is any index that would
/// land outside the vector or on the watch slot.
pub fn build_user_vector<S: AsRef<str>>(
    preferred_genres: &[S],
    watched_count: usize,
    encoding: &GenreEncoding,
    layout: &VectorLayout,
) -> FeatureVector {
    let mut vector = vec![0.0; layout.length];
    let watch_index = layout.watch_index();

    for genre in preferred_genres {
        if let Some(idx) = encoding.index_of(genre.as_ref()) {
            if idx < layout.length && idx != watch_index {
                vector[idx] = 1.0;
            }
        }
    }

    if watch_index < layout.length {
        vector[watch_index] = watch_influence(watched_count);
    }

    vector
}
