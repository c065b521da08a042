//! Listing sources: where entries come from.
//!
//! - `S3Store`: anonymous SDK access to a public bucket
//! - `LocalStore`: a directory mirror of a bucket
//! - `archive`: tar (optionally gzip) member listing over any reader

pub mod archive;
pub mod local;
pub mod s3;

use std::fmt;
use std::io::Read;
use std::str::FromStr;

pub use archive::read_archive_members;
pub use local::LocalStore;
pub use s3::{S3Options, S3Store};

use crate::core::tokenize::Entry;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("unknown bucket label '{0}' (expected one of: land-da, srw, rt)")]
    UnknownBucket(String),

    #[error("{operation} request failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    #[error("storage service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("failed to read archive")]
    Archive(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Known storage buckets, addressed by short label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BucketLabel {
    #[value(name = "land-da")]
    LandDa,
    Srw,
    Rt,
}

impl BucketLabel {
    pub fn bucket_name(self) -> &'static str {
        match self {
            BucketLabel::LandDa => "noaa-ufs-land-da-pds",
            BucketLabel::Srw => "noaa-ufs-srw-pds",
            BucketLabel::Rt => "noaa-ufs-regtests-pds",
        }
    }

    pub fn profile(self) -> &'static str {
        match self {
            BucketLabel::LandDa => "land-da-app",
            BucketLabel::Srw => "srw-app",
            BucketLabel::Rt => "ufs-wm-rt-app",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BucketLabel::LandDa => "land-da",
            BucketLabel::Srw => "srw",
            BucketLabel::Rt => "rt",
        }
    }
}

impl fmt::Display for BucketLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketLabel {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "land-da" => Ok(BucketLabel::LandDa),
            "srw" => Ok(BucketLabel::Srw),
            "rt" => Ok(BucketLabel::Rt),
            other => Err(SourceError::UnknownBucket(other.to_string())),
        }
    }
}

/// Object storage as seen by the mapper.
pub trait ObjectStore {
    /// Bucket name, used in output file names.
    fn name(&self) -> &str;

    /// Every key in the bucket, in listing order.
    fn list_keys(&self) -> Result<Vec<Entry>, SourceError>;

    /// Open one object for streaming reads.
    fn open(&self, key: &str) -> Result<Box<dyn Read + '_>, SourceError>;

    /// Keys containing `prefix` anywhere (substring, not a key prefix).
    fn list_prefixed(&self, prefix: &str) -> Result<Vec<Entry>, SourceError> {
        Ok(self
            .list_keys()?
            .into_iter()
            .filter(|e| e.path.contains(prefix))
            .collect())
    }

    /// Members of a tar object, leading `./` removed.
    fn archive_members(&self, key: &str) -> Result<Vec<Entry>, SourceError> {
        read_archive_members(self.open(key)?)
    }
}
