//! Classify HTTP status and curl errors into retry policy error kinds.

use super::error::{ChunkError, TransportKind};
use super::policy::Classification;

/// Classify an HTTP status code against the retriable set.
pub fn classify_http_status(code: u16, retriable: &[u16]) -> Classification {
    if retriable.contains(&code) {
        Classification::Retriable
    } else {
        Classification::Fatal
    }
}

/// Map a curl error to a transport kind, or `None` when it is not a
/// connection-level failure (bad option, unsupported protocol, ...).
pub fn transport_kind_for_curl(e: &curl::Error) -> Option<TransportKind> {
    if e.is_operation_timedout() {
        return Some(TransportKind::Timeout);
    }
    if e.is_couldnt_connect() || e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
        return Some(TransportKind::NotConnected);
    }
    if e.is_send_error() || e.is_upload_failed() || e.is_read_error() {
        return Some(TransportKind::CannotSend);
    }
    if e.is_recv_error() {
        return Some(TransportKind::ConnectionReset);
    }
    if e.is_partial_file() {
        return Some(TransportKind::IncompleteRead);
    }
    if e.is_got_nothing() {
        return Some(TransportKind::ResponseNotReady);
    }
    if e.is_http2_error() || e.is_http2_stream_error() {
        return Some(TransportKind::ImproperConnectionState);
    }
    // CURLE_WEIRD_SERVER_REPLY
    if e.code() == 8 {
        return Some(TransportKind::BadStatusLine);
    }
    if e.is_write_error() {
        return Some(TransportKind::Io);
    }
    None
}

/// Convert a curl error into a chunk error, keeping the classification
/// decision in one place.
pub fn chunk_error_from_curl(e: curl::Error) -> ChunkError {
    match transport_kind_for_curl(&e) {
        Some(kind) => ChunkError::transport(kind, e.to_string()),
        None => ChunkError::other(e.to_string()),
    }
}

/// Classify a chunk error. Total: every value maps to exactly one class.
pub fn classify(e: &ChunkError, retriable_status_codes: &[u16]) -> Classification {
    match e {
        ChunkError::Transport { .. } => Classification::Retriable,
        ChunkError::Http { status, .. } => classify_http_status(*status, retriable_status_codes),
        ChunkError::Other(_) => Classification::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RETRIABLE_STATUS_CODES;

    #[test]
    fn http_5xx_gateway_family_retriable() {
        for code in [500, 502, 503, 504] {
            assert_eq!(
                classify_http_status(code, &RETRIABLE_STATUS_CODES),
                Classification::Retriable
            );
        }
    }

    #[test]
    fn other_http_statuses_fatal() {
        for code in [400, 401, 403, 404, 429, 501, 505] {
            assert_eq!(
                classify_http_status(code, &RETRIABLE_STATUS_CODES),
                Classification::Fatal,
                "status {code}"
            );
        }
    }

    #[test]
    fn every_transport_kind_retriable() {
        let kinds = [
            TransportKind::ConnectionReset,
            TransportKind::IncompleteRead,
            TransportKind::ImproperConnectionState,
            TransportKind::CannotSend,
            TransportKind::NotConnected,
            TransportKind::ResponseNotReady,
            TransportKind::BadStatusLine,
            TransportKind::Io,
            TransportKind::Timeout,
        ];
        for kind in kinds {
            let e = ChunkError::transport(kind, "x");
            assert_eq!(classify(&e, &RETRIABLE_STATUS_CODES), Classification::Retriable);
        }
    }

    #[test]
    fn other_errors_fatal_and_stable() {
        let e = ChunkError::other("invalid literal for int()");
        let first = classify(&e, &RETRIABLE_STATUS_CODES);
        assert_eq!(first, Classification::Fatal);
        assert_eq!(classify(&e, &RETRIABLE_STATUS_CODES), first);
    }

    #[test]
    fn curl_timeout_maps_to_timeout_kind() {
        // CURLE_OPERATION_TIMEDOUT
        let e = curl::Error::new(28);
        assert_eq!(transport_kind_for_curl(&e), Some(TransportKind::Timeout));
        assert!(matches!(
            chunk_error_from_curl(e),
            ChunkError::Transport { kind: TransportKind::Timeout, .. }
        ));
    }

    #[test]
    fn curl_weird_reply_maps_to_bad_status_line() {
        // CURLE_WEIRD_SERVER_REPLY
        let e = curl::Error::new(8);
        assert_eq!(transport_kind_for_curl(&e), Some(TransportKind::BadStatusLine));
        assert!(matches!(
            chunk_error_from_curl(e),
            ChunkError::Transport { kind: TransportKind::BadStatusLine, .. }
        ));
    }

    #[test]
    fn curl_malformed_url_is_not_transport() {
        // CURLE_URL_MALFORMAT
        let e = curl::Error::new(3);
        assert_eq!(transport_kind_for_curl(&e), None);
        assert!(matches!(chunk_error_from_curl(e), ChunkError::Other(_)));
    }
}
