//! Profile record to (description, numeric features)
//!
//! This is the only place features are derived from a record. Training and
//! inference both go through [`synthesize`], so the matrix the classifier was
//! fitted on and the rows it scores are built by the same code.

use crate::profile::ProfileRecord;
use serde::{Deserialize, Serialize};

use super::layout::N_NUMERIC_FEATURES;

/// Text and numeric features derived from one profile record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedFeatures {
    /// Natural-language rendering used as vectorizer input
    pub description: String,
    /// Raw and engineered numeric features, in `NUMERIC_COLUMNS` order
    pub numeric: [f64; N_NUMERIC_FEATURES],
}

/// Derive both feature views of a record
pub fn synthesize(record: &ProfileRecord) -> SynthesizedFeatures {
    SynthesizedFeatures {
        description: describe(record),
        numeric: numeric_features(record),
    }
}

/// Render the raw fields as a structured sentence
pub fn describe(record: &ProfileRecord) -> String {
    format!(
        "User has {} followers, follows {} accounts, has a biography of {} characters, \
         posted {} media items, {} a profile picture, {} a private account, \
         username contains {} digits and has {} characters.",
        record.follower_count,
        record.following_count,
        record.biography_length,
        record.media_count,
        has_or_not(record.has_profile_picture),
        has_or_not(record.is_private),
        record.username_digit_count,
        record.username_length,
    )
}

/// Eight raw columns followed by the three engineered ones
pub fn numeric_features(record: &ProfileRecord) -> [f64; N_NUMERIC_FEATURES] {
    let followers = record.follower_count as f64;
    let following = record.following_count as f64;
    let media = record.media_count as f64;

    // +1 offsets keep both ratios finite for empty accounts
    let follower_following_ratio = followers / (following + 1.0);
    let has_numeric_username = flag(record.username_digit_count > 0);
    let engagement_score = (media + 1.0) / (followers + 1.0);

    [
        followers,
        following,
        record.biography_length as f64,
        media,
        flag(record.has_profile_picture),
        flag(record.is_private),
        record.username_digit_count as f64,
        record.username_length as f64,
        follower_following_ratio,
        has_numeric_username,
        engagement_score,
    ]
}

fn has_or_not(value: bool) -> &'static str {
    if value {
        "has"
    } else {
        "does not have"
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
