//! Anonymous read access to a public S3 bucket through the AWS SDK.
//!
//! The SDK is async; `S3Store` owns a current-thread runtime and blocks on
//! each call so listing and archive reads stay synchronous for callers.
//! Requests are unsigned, so no credentials are looked up.

use std::io::{self, Read};
use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use bytes::{Buf, Bytes};
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tracing::{debug, instrument};

use super::{ObjectStore, SourceError};
use crate::core::tokenize::Entry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Options {
    /// Endpoint override for S3-compatible stores, e.g. `http://localhost:9000`.
    /// Switches to path-style addressing.
    pub endpoint: Option<String>,

    /// Region the public buckets live in
    pub region: String,

    /// Limit on establishing a connection
    pub connect_timeout_secs: u64,

    /// Limit on waiting for a response to start; object bodies stream
    /// without an overall deadline
    pub read_timeout_secs: u64,
}

impl Default for S3Options {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            connect_timeout_secs: 10,
            read_timeout_secs: 60,
        }
    }
}

impl S3Options {
    fn timeouts(&self) -> TimeoutConfig {
        TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .read_timeout(Duration::from_secs(self.read_timeout_secs))
            .build()
    }
}

pub struct S3Store {
    bucket: String,
    client: Client,
    runtime: Runtime,
}

impl S3Store {
    pub fn new(bucket: impl Into<String>, options: &S3Options) -> Result<Self, SourceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let client = runtime.block_on(create_client(options));

        Ok(Self {
            bucket: bucket.into(),
            client,
            runtime,
        })
    }
}

async fn create_client(options: &S3Options) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(options.region.clone()))
        .timeout_config(options.timeouts())
        .no_credentials();

    if let Some(endpoint) = &options.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let shared = loader.load().await;
    let builder = aws_sdk_s3::config::Builder::from(&shared);

    // Custom endpoints (MinIO, LocalStack, test servers) expect path-style URLs
    let config = if options.endpoint.is_some() {
        builder.force_path_style(true).build()
    } else {
        builder.build()
    };

    Client::from_conf(config)
}

impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    fn list_keys(&self) -> Result<Vec<Entry>, SourceError> {
        self.runtime.block_on(async {
            let mut entries = Vec::new();
            let mut continuation_token: Option<String> = None;
            let mut pages = 0usize;

            loop {
                let resp = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .set_continuation_token(continuation_token.take())
                    .send()
                    .await
                    .map_err(|e| sdk_error("ListObjectsV2", e))?;
                pages += 1;

                for obj in resp.contents() {
                    let Some(key) = obj.key() else { continue };
                    let size = obj
                        .size()
                        .and_then(|s| u64::try_from(s).ok())
                        .unwrap_or(0);
                    entries.push(Entry::new(key, size));
                }

                match resp.next_continuation_token() {
                    Some(token) if resp.is_truncated() == Some(true) => {
                        continuation_token = Some(token.to_string());
                    }
                    _ => break,
                }
            }

            debug!(pages, keys = entries.len(), "listed bucket");
            Ok::<_, SourceError>(entries)
        })
    }

    fn open(&self, key: &str) -> Result<Box<dyn Read + '_>, SourceError> {
        debug!(bucket = %self.bucket, key, "fetching object");

        let resp = self
            .runtime
            .block_on(self.client.get_object().bucket(&self.bucket).key(key).send())
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    SourceError::NotFound(key.to_string())
                } else {
                    sdk_error("GetObject", e)
                }
            })?;

        Ok(Box::new(BodyReader {
            runtime: &self.runtime,
            body: resp.body,
            chunk: Bytes::new(),
        }))
    }
}

/// Service errors keep their S3 code; transport failures keep the full
/// error chain as text.
fn sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> SourceError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.code() {
        Some(code) => SourceError::Service {
            code: code.to_string(),
            message: err.message().unwrap_or_default().to_string(),
        },
        None => SourceError::Request {
            operation,
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}

/// Blocking `Read` over an object body, one chunk at a time.
struct BodyReader<'a> {
    runtime: &'a Runtime,
    body: ByteStream,
    chunk: Bytes,
}

impl Read for BodyReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while !self.chunk.has_remaining() {
            match self.runtime.block_on(self.body.next()) {
                Some(Ok(chunk)) => self.chunk = chunk,
                Some(Err(err)) => return Err(io::Error::other(err)),
                None => return Ok(0),
            }
        }

        let n = buf.len().min(self.chunk.remaining());
        self.chunk.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_public_buckets() {
        let opts = S3Options::default();
        assert_eq!(opts.endpoint, None);
        assert_eq!(opts.region, "us-east-1");
        assert!(opts.read_timeout_secs > opts.connect_timeout_secs);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let opts: S3Options = toml::from_str("endpoint = \"http://localhost:9000\"\nread_timeout_secs = 5").unwrap();
        assert_eq!(opts.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(opts.read_timeout_secs, 5);
        assert_eq!(opts.connect_timeout_secs, S3Options::default().connect_timeout_secs);
    }

    #[test]
    fn store_builds_without_network() {
        let opts = S3Options {
            endpoint: Some("http://127.0.0.1:9".into()),
            ..S3Options::default()
        };
        let store = S3Store::new("noaa-ufs-srw-pds", &opts).unwrap();
        assert_eq!(store.name(), "noaa-ufs-srw-pds");
    }
}
