//! Pure helpers for the resumable protocol: ranges and final responses.

use crate::retry::ChunkError;
use crate::upload::driver::ChunkOutcome;

/// Next byte the server expects, from a `Range: bytes=0-N` header.
/// No header means the server holds nothing yet.
fn next_offset_from_range(range: Option<&str>) -> Result<u64, ChunkError> {
    let Some(raw) = range else {
        return Ok(0);
    };
    let malformed = || ChunkError::other(format!("malformed Range header: {raw:?}"));
    let spec = raw.trim().strip_prefix("bytes=").ok_or_else(malformed)?;
    let (_, end) = spec.split_once('-').ok_or_else(malformed)?;
    let end: u64 = end.trim().parse().map_err(|_| malformed())?;
    end.checked_add(1).ok_or_else(malformed)
}

/// Next offset from a 308 `Range` header, bounded by the file size.
pub(crate) fn committed_offset(range: Option<&str>, total: u64) -> Result<u64, ChunkError> {
    let next = next_offset_from_range(range)?;
    if next > total {
        return Err(ChunkError::other(format!(
            "server reports {next} bytes committed of a {total}-byte upload"
        )));
    }
    Ok(next)
}

/// `Content-Range` for a chunk of `len` bytes starting at `start`.
pub(crate) fn content_range(start: u64, len: u64, total: u64) -> String {
    format!("bytes {}-{}/{}", start, start + len - 1, total)
}

/// `Content-Range` for a status query that asks how much the server has.
pub(crate) fn status_query_range(total: u64) -> String {
    format!("bytes */{}", total)
}

/// Interpret the body of a 200/201 response.
/// A body that is not JSON is a fatal, non-retriable condition.
pub(crate) fn final_response(body: &[u8]) -> Result<ChunkOutcome, ChunkError> {
    serde_json::from_slice(body)
        .map(ChunkOutcome::Complete)
        .map_err(|e| ChunkError::other(format!("upload response is not JSON: {e}")))
}

/// Resolve a possibly relative `Location` against the endpoint it came from.
pub(crate) fn resolve_location(endpoint: &str, location: &str) -> Result<String, ChunkError> {
    let base = url::Url::parse(endpoint)
        .map_err(|e| ChunkError::other(format!("invalid endpoint {endpoint:?}: {e}")))?;
    base.join(location)
        .map(|u| u.to_string())
        .map_err(|e| ChunkError::other(format!("invalid Location {location:?}: {e}")))
}
