//! Raw profile attributes for a single account

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw attribute bag for one account.
///
/// Accepts the corpus field names (`userFollowerCount`, ...), the scraper's
/// short names (`followers`, ...) and the snake_case names when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(alias = "userFollowerCount", alias = "followers")]
    pub follower_count: u64,
    #[serde(alias = "userFollowingCount", alias = "following")]
    pub following_count: u64,
    #[serde(alias = "userBiographyLength", alias = "bio_length")]
    pub biography_length: u64,
    #[serde(alias = "userMediaCount", alias = "posts")]
    pub media_count: u64,
    #[serde(
        alias = "userHasProfilPic",
        alias = "has_profile_pic",
        deserialize_with = "bool_from_flag"
    )]
    pub has_profile_picture: bool,
    #[serde(alias = "userIsPrivate", deserialize_with = "bool_from_flag")]
    pub is_private: bool,
    #[serde(alias = "usernameDigitCount", alias = "digit_count")]
    pub username_digit_count: u64,
    #[serde(alias = "usernameLength")]
    pub username_length: u64,
}

impl ProfileRecord {
    /// Build a record from a username and the profile counters reported by
    /// the upstream service. Digit count and length are derived from the
    /// username itself; any Unicode numeric character counts as a digit.
    pub fn from_username(
        username: &str,
        follower_count: u64,
        following_count: u64,
        biography_length: u64,
        media_count: u64,
        has_profile_picture: bool,
        is_private: bool,
    ) -> Self {
        let username_digit_count = username.chars().filter(|c| c.is_numeric()).count() as u64;
        let username_length = username.chars().count() as u64;

        Self {
            follower_count,
            following_count,
            biography_length,
            media_count,
            has_profile_picture,
            is_private,
            username_digit_count,
            username_length,
        }
    }

    /// Check the record invariants: a non-empty username whose digit count
    /// does not exceed its length.
    pub fn validate(&self) -> Result<()> {
        if self.username_length == 0 {
            return Err(DetectorError::ValidationError(
                "username_length must be positive".to_string(),
            ));
        }
        if self.username_digit_count > self.username_length {
            return Err(DetectorError::ValidationError(format!(
                "username_digit_count ({}) exceeds username_length ({})",
                self.username_digit_count, self.username_length
            )));
        }
        Ok(())
    }
}

/// Binary label attached to a corpus record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Genuine,
    Bot,
}

impl Label {
    pub fn from_class(class: i64) -> Self {
        if class == 1 {
            Label::Bot
        } else {
            Label::Genuine
        }
    }

    pub fn class(self) -> i64 {
        match self {
            Label::Genuine => 0,
            Label::Bot => 1,
        }
    }

    /// Human-readable verdict returned to callers
    pub fn verdict(self) -> &'static str {
        match self {
            Label::Bot => "Bot Detected",
            Label::Genuine => "Real User",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verdict())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// Booleans arrive as `true/false` from the scraper and as `0/1` in corpora.
fn bool_from_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(i) => Ok(i != 0),
        Flag::Float(f) => Ok(f != 0.0),
    }
}
