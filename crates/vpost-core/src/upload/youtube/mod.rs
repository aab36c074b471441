//! videos.insert over the resumable upload protocol.
//!
//! The session is opened lazily by the first `next_chunk` call (POST with
//! the JSON metadata, session URI returned in `Location`). Each later call
//! PUTs one chunk with `Content-Range`; `308` means "keep going" and carries
//! the server's committed range, `200`/`201` carries the final resource.
//! After any failure the next call first asks the server how much it holds
//! (`Content-Range: bytes */total`) and resumes from there.

mod parse;

use anyhow::Context;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::config::UploadConfig;
use crate::http::{self, HttpResponse, Method, StreamError, Timeouts};
use crate::retry::{chunk_error_from_curl, ChunkError};

use super::driver::{ChunkOutcome, ChunkSender};
use super::session::{UploadSession, VideoMetadata};

/// Content type announced for the media bytes.
const MEDIA_CONTENT_TYPE: &str = "video/*";

/// One in-progress videos.insert call.
pub struct YoutubeInsertRequest {
    endpoint: String,
    access_token: String,
    metadata: serde_json::Value,
    file: File,
    total_bytes: u64,
    chunk_size: Option<u64>,
    timeouts: Timeouts,
    session_uri: Option<String>,
    offset: u64,
    in_error_state: bool,
}

impl YoutubeInsertRequest {
    /// Open the session's file and prepare the request. No network I/O yet.
    pub fn new(
        session: &UploadSession,
        access_token: String,
        cfg: &UploadConfig,
    ) -> anyhow::Result<Self> {
        let path = session.resource_path();
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let total_bytes = file
            .metadata()
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        if total_bytes == 0 {
            anyhow::bail!("refusing to upload empty file {}", path.display());
        }
        Ok(Self {
            endpoint: cfg.endpoint.clone(),
            access_token,
            metadata: session.metadata().to_json(),
            file,
            total_bytes,
            chunk_size: cfg.effective_chunk_size(),
            timeouts: Timeouts {
                connect: cfg.connect_timeout(),
                total: cfg.chunk_timeout(),
            },
            session_uri: None,
            offset: 0,
            in_error_state: false,
        })
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Byte offset the server has confirmed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn auth_header(&self) -> String {
        format!("Authorization: Bearer {}", self.access_token)
    }

    fn exchange(
        &self,
        method: Method,
        url: &str,
        headers: &[String],
        body: &[u8],
    ) -> Result<HttpResponse, ChunkError> {
        http::send(method, url, headers, body, self.timeouts).map_err(chunk_error_from_curl)
    }

    fn start_session(&self) -> Result<String, ChunkError> {
        let mut url = url::Url::parse(&self.endpoint)
            .map_err(|e| ChunkError::other(format!("invalid endpoint {:?}: {e}", self.endpoint)))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("part", VideoMetadata::parts());
        let body = serde_json::to_vec(&self.metadata)
            .map_err(|e| ChunkError::other(format!("encode metadata: {e}")))?;
        let headers = [
            self.auth_header(),
            "Content-Type: application/json; charset=UTF-8".to_string(),
            format!("X-Upload-Content-Length: {}", self.total_bytes),
            format!("X-Upload-Content-Type: {}", MEDIA_CONTENT_TYPE),
        ];
        let resp = self.exchange(Method::Post, url.as_str(), &headers, &body)?;
        if resp.status != 200 && resp.status != 201 {
            return Err(ChunkError::http(resp.status, resp.body_text()));
        }
        let location = resp.header("Location").ok_or_else(|| {
            ChunkError::other("resumable session response has no Location header")
        })?;
        let uri = parse::resolve_location(&self.endpoint, location)?;
        tracing::debug!(session_uri = %uri, "opened resumable upload session");
        Ok(uri)
    }

    /// Turn a chunk or status-query response into an outcome, tracking the offset.
    fn interpret(&mut self, resp: HttpResponse) -> Result<ChunkOutcome, ChunkError> {
        match resp.status {
            200 | 201 => {
                self.offset = self.total_bytes;
                parse::final_response(&resp.body)
            }
            308 => {
                self.offset = parse::committed_offset(resp.header("Range"), self.total_bytes)?;
                Ok(ChunkOutcome::Progress {
                    bytes_sent: self.offset,
                    total_bytes: self.total_bytes,
                })
            }
            status => Err(ChunkError::http(status, resp.body_text())),
        }
    }

    fn query_status(&mut self, uri: &str) -> Result<ChunkOutcome, ChunkError> {
        let headers = [
            self.auth_header(),
            format!("Content-Range: {}", parse::status_query_range(self.total_bytes)),
        ];
        let resp = self.exchange(Method::Put, uri, &headers, &[])?;
        let outcome = self.interpret(resp)?;
        tracing::debug!(offset = self.offset, "server reported committed range");
        Ok(outcome)
    }

    /// Length of the next chunk starting at the confirmed offset.
    fn chunk_len(&self) -> u64 {
        let remaining = self.total_bytes - self.offset;
        self.chunk_size.map_or(remaining, |c| c.min(remaining))
    }

    /// Stream the next chunk straight from the file.
    fn send_chunk(&self, uri: &str) -> Result<HttpResponse, ChunkError> {
        let len = self.chunk_len();
        let headers = [
            self.auth_header(),
            format!("Content-Type: {}", MEDIA_CONTENT_TYPE),
            format!(
                "Content-Range: {}",
                parse::content_range(self.offset, len, self.total_bytes)
            ),
        ];
        tracing::debug!(offset = self.offset, len, "sending chunk");
        (&self.file).seek(SeekFrom::Start(self.offset))?;
        let mut body = (&self.file).take(len);
        http::put_stream(uri, &headers, &mut body, len, self.timeouts).map_err(|e| match e {
            StreamError::Curl(e) => chunk_error_from_curl(e),
            StreamError::Read(e) => ChunkError::from(e),
            StreamError::Truncated { expected, sent } => ChunkError::other(format!(
                "file shrank during upload: expected {} bytes at offset {}, read {}",
                expected, self.offset, sent
            )),
        })
    }

    fn advance(&mut self) -> Result<ChunkOutcome, ChunkError> {
        let uri = match &self.session_uri {
            Some(uri) => uri.clone(),
            None => {
                let uri = self.start_session()?;
                self.session_uri = Some(uri.clone());
                uri
            }
        };

        if self.in_error_state {
            if let ChunkOutcome::Complete(resp) = self.query_status(&uri)? {
                self.in_error_state = false;
                return Ok(ChunkOutcome::Complete(resp));
            }
            self.in_error_state = false;
        }

        if self.offset >= self.total_bytes {
            // Every byte is committed; only the final response is missing.
            return match self.query_status(&uri)? {
                ChunkOutcome::Progress { .. } => Err(ChunkError::other(
                    "server holds the whole file but did not finalize the upload",
                )),
                done => Ok(done),
            };
        }

        let resp = self.send_chunk(&uri)?;
        self.interpret(resp)
    }
}

impl ChunkSender for YoutubeInsertRequest {
    fn next_chunk(&mut self) -> Result<ChunkOutcome, ChunkError> {
        let result = self.advance();
        if result.is_err() && self.session_uri.is_some() {
            self.in_error_state = true;
        }
        result
    }
}
