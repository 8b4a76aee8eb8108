//! Follower collection and account-level analysis
//!
//! [`ProfileSource`] is the boundary to whatever lists an account's
//! followers and looks up their profiles. [`SnapshotSource`] serves both from
//! a JSON file captured earlier. [`FollowerAnalyzer`] walks the follower list,
//! resolves each username to a [`ProfileRecord`] and scores them as one batch.

use crate::error::{DetectorError, Result};
use crate::inference::{InferenceEngine, Prediction};
use crate::profile::ProfileRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of looking up one username
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileLookup {
    Found(ProfileRecord),
    NotFound,
    RateLimited,
}

/// Source of follower lists and profile attributes
pub trait ProfileSource: Send + Sync {
    /// Followers of `target` not contained in `already_seen`.
    /// An empty result means the list is exhausted.
    fn followers(&self, target: &str, already_seen: &[String]) -> Result<Vec<String>>;

    fn profile(&self, username: &str) -> Result<ProfileLookup>;
}

/// One follower as captured in a snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotProfile {
    pub username: String,
    pub followers: u64,
    pub following: u64,
    #[serde(default)]
    pub bio_length: u64,
    #[serde(default)]
    pub posts: u64,
    #[serde(default)]
    pub has_profile_pic: bool,
    #[serde(default)]
    pub is_private: bool,
}

impl SnapshotProfile {
    pub fn to_record(&self) -> ProfileRecord {
        ProfileRecord::from_username(
            &self.username,
            self.followers,
            self.following,
            self.bio_length,
            self.posts,
            self.has_profile_pic,
            self.is_private,
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SnapshotFile {
    /// Target username -> its followers
    accounts: BTreeMap<String, Vec<SnapshotProfile>>,
    /// Usernames whose lookup is reported as rate limited
    #[serde(default)]
    rate_limited: BTreeSet<String>,
}

/// Offline [`ProfileSource`] backed by a JSON snapshot:
///
/// ```json
/// {
///   "accounts": { "target": [ { "username": "a_1", "followers": 3, "following": 900 } ] },
///   "rate_limited": ["b_2"]
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    followers: BTreeMap<String, Vec<String>>,
    profiles: BTreeMap<String, ProfileRecord>,
    rate_limited: BTreeSet<String>,
}

impl SnapshotSource {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DetectorError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(json)?;
        let mut source = Self {
            rate_limited: file.rate_limited,
            ..Self::default()
        };
        for (target, entries) in file.accounts {
            for entry in &entries {
                source.profiles.insert(entry.username.clone(), entry.to_record());
            }
            source
                .followers
                .insert(target, entries.into_iter().map(|e| e.username).collect());
        }
        Ok(source)
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.followers.keys().map(String::as_str)
    }
}

impl ProfileSource for SnapshotSource {
    fn followers(&self, target: &str, already_seen: &[String]) -> Result<Vec<String>> {
        let listed = self.followers.get(target).ok_or_else(|| {
            DetectorError::ValidationError(format!("Account '{}' is not in the snapshot", target))
        })?;
        let seen: HashSet<&str> = already_seen.iter().map(String::as_str).collect();
        Ok(listed
            .iter()
            .filter(|name| !seen.contains(name.as_str()))
            .cloned()
            .collect())
    }

    fn profile(&self, username: &str) -> Result<ProfileLookup> {
        if self.rate_limited.contains(username) {
            return Ok(ProfileLookup::RateLimited);
        }
        Ok(match self.profiles.get(username) {
            Some(record) => ProfileLookup::Found(*record),
            None => ProfileLookup::NotFound,
        })
    }
}

/// Verdict for one follower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerVerdict {
    pub username: String,
    pub profile: ProfileRecord,
    pub prediction: Prediction,
}

/// Bot share among an account's followers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountReport {
    pub target: String,
    /// Percentage of scored followers labeled as bots
    pub bot_percentage: f64,
    pub followers_listed: usize,
    pub followers_analyzed: usize,
    pub followers: Vec<FollowerVerdict>,
    pub not_found: usize,
    pub rate_limited: usize,
    /// Profiles that were found but could not be scored
    pub invalid: usize,
    /// Lookups that failed outright
    pub lookup_errors: usize,
}

/// Scores every follower of an account
pub struct FollowerAnalyzer<S: ProfileSource> {
    source: S,
    engine: Arc<InferenceEngine>,
    max_followers: Option<usize>,
}

impl<S: ProfileSource> FollowerAnalyzer<S> {
    pub fn new(source: S, engine: Arc<InferenceEngine>) -> Self {
        Self {
            source,
            engine,
            max_followers: None,
        }
    }

    /// Stop listing after `n` followers
    pub fn with_max_followers(mut self, n: usize) -> Self {
        self.max_followers = Some(n);
        self
    }

    /// Page through the follower list until it is exhausted or the cap is hit
    fn collect_followers(&self, target: &str) -> Result<Vec<String>> {
        let cap = self.max_followers.unwrap_or(usize::MAX);
        let mut seen: Vec<String> = Vec::new();
        while seen.len() < cap {
            let page = self.source.followers(target, &seen)?;
            if page.is_empty() {
                break;
            }
            let room = cap - seen.len();
            seen.extend(page.into_iter().take(room));
        }
        Ok(seen)
    }

    pub fn analyze(&self, target: &str) -> Result<AccountReport> {
        let listed = self.collect_followers(target)?;
        info!(target, followers = listed.len(), "Collected follower list");

        let mut usernames = Vec::new();
        let mut records = Vec::new();
        let (mut not_found, mut rate_limited, mut lookup_errors) = (0, 0, 0);

        for username in &listed {
            match self.source.profile(username) {
                Ok(ProfileLookup::Found(record)) => {
                    usernames.push(username.clone());
                    records.push(record);
                }
                Ok(ProfileLookup::NotFound) => not_found += 1,
                Ok(ProfileLookup::RateLimited) => {
                    warn!(username = username.as_str(), "Profile lookup rate limited");
                    rate_limited += 1;
                }
                Err(e) => {
                    warn!(username = username.as_str(), error = %e, "Profile lookup failed");
                    lookup_errors += 1;
                }
            }
        }

        let batch = self.engine.predict_batch(&records);
        let followers: Vec<FollowerVerdict> = batch
            .indices
            .iter()
            .zip(batch.predictions.iter())
            .map(|(&i, prediction)| FollowerVerdict {
                username: usernames[i].clone(),
                profile: records[i],
                prediction: prediction.clone(),
            })
            .collect();

        info!(
            target,
            analyzed = followers.len(),
            bot_percentage = batch.bot_percentage,
            not_found,
            rate_limited,
            "Analyzed followers"
        );

        Ok(AccountReport {
            target: target.to_string(),
            bot_percentage: batch.bot_percentage,
            followers_listed: listed.len(),
            followers_analyzed: followers.len(),
            followers,
            not_found,
            rate_limited,
            invalid: batch.skipped,
            lookup_errors,
        })
    }
}
