//! Corpus generators shared by the integration tests

#![allow(dead_code)]

use instagram_bot_detector::profile::ProfileRecord;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Established accounts: many followers, few followings, filled-in profiles
pub fn genuine_record(i: u64) -> ProfileRecord {
    ProfileRecord {
        follower_count: 1000 + 37 * i,
        following_count: 100 + (7 * i) % 200,
        biography_length: 20 + i % 100,
        media_count: 50 + i,
        has_profile_picture: true,
        is_private: i % 3 == 0,
        username_digit_count: i % 2,
        username_length: 8 + i % 6,
    }
}

/// Automated accounts: follow thousands, followed by few, digit-heavy names
pub fn bot_record(i: u64) -> ProfileRecord {
    ProfileRecord {
        follower_count: 5 + i % 40,
        following_count: 1500 + 13 * i,
        biography_length: i % 5,
        media_count: i % 4,
        has_profile_picture: i % 4 == 0,
        is_private: false,
        username_digit_count: 3 + i % 4,
        username_length: 10 + i % 5,
    }
}

/// The record shape stored in the corpus files
pub fn corpus_entry(r: &ProfileRecord) -> Value {
    json!({
        "userFollowerCount": r.follower_count,
        "userFollowingCount": r.following_count,
        "userBiographyLength": r.biography_length,
        "userMediaCount": r.media_count,
        "userHasProfilPic": r.has_profile_picture as u8,
        "userIsPrivate": r.is_private as u8,
        "usernameDigitCount": r.username_digit_count,
        "usernameLength": r.username_length,
    })
}

pub fn write_corpus(dir: &Path, name: &str, records: &[ProfileRecord]) -> PathBuf {
    let path = dir.join(name);
    let entries: Vec<Value> = records.iter().map(corpus_entry).collect();
    std::fs::write(&path, serde_json::to_string_pretty(&entries).unwrap()).unwrap();
    path
}

/// Write `n_bots` bot and `n_genuine` genuine records, returning both paths
pub fn write_corpora(dir: &Path, n_bots: u64, n_genuine: u64) -> (PathBuf, PathBuf) {
    let bots: Vec<ProfileRecord> = (0..n_bots).map(bot_record).collect();
    let genuine: Vec<ProfileRecord> = (0..n_genuine).map(genuine_record).collect();
    (
        write_corpus(dir, "bots.json", &bots),
        write_corpus(dir, "real.json", &genuine),
    )
}
