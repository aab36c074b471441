//! Minimal blocking HTTP exchange over libcurl.
//!
//! One `Easy` handle per request. Small bodies (metadata, token forms,
//! status queries) are sent from memory; media chunks are streamed from a
//! reader so a file is never held in memory whole. Response headers and
//! body are collected whole.
//! Runs in the current thread; call from `spawn_blocking` if used from async code.

use curl::easy::{Easy, List, ReadError};
use std::io::{self, Read};
use std::str;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Post,
    Put,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Timeouts {
    pub connect: Duration,
    /// Whole-request deadline; elapsed deadline surfaces as a curl timeout.
    pub total: Duration,
}

#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub headers: Vec<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Value of the last header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failure of a streamed upload.
#[derive(Debug, thiserror::Error)]
pub(crate) enum StreamError {
    #[error(transparent)]
    Curl(#[from] curl::Error),
    #[error("reading request body: {0}")]
    Read(#[source] io::Error),
    #[error("request body ended after {sent} of {expected} bytes")]
    Truncated { expected: u64, sent: u64 },
}

/// Find a header value in collected header lines. Later lines win, so the
/// final response of a redirect or `100 Continue` exchange is used.
pub(crate) fn header_value<'a>(lines: &'a [String], name: &str) -> Option<&'a str> {
    lines.iter().rev().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
    })
}

fn easy_for(url: &str, headers: &[String], timeouts: Timeouts) -> Result<Easy, curl::Error> {
    let mut easy = Easy::new();
    easy.url(url)?;
    easy.connect_timeout(timeouts.connect)?;
    easy.timeout(timeouts.total)?;

    // Empty "Expect:" stops curl from waiting on `100 Continue` for large bodies.
    let mut list = List::new();
    list.append("Expect:")?;
    for h in headers {
        list.append(h)?;
    }
    easy.http_headers(list)?;
    Ok(easy)
}

/// Send `body` with `method` to `url` and collect the response.
pub(crate) fn send(
    method: Method,
    url: &str,
    headers: &[String],
    body: &[u8],
    timeouts: Timeouts,
) -> Result<HttpResponse, curl::Error> {
    let mut response_headers: Vec<String> = Vec::new();
    let mut response_body: Vec<u8> = Vec::new();

    let mut easy = easy_for(url, headers, timeouts)?;
    easy.post(true)?;
    if method == Method::Put {
        easy.custom_request("PUT")?;
    }
    easy.post_fields_copy(body)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                response_headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            response_body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    Ok(HttpResponse {
        status: easy.response_code()? as u16,
        headers: response_headers,
        body: response_body,
    })
}

/// PUT exactly `len` bytes read from `body` to `url`.
pub(crate) fn put_stream(
    url: &str,
    headers: &[String],
    body: &mut dyn Read,
    len: u64,
    timeouts: Timeouts,
) -> Result<HttpResponse, StreamError> {
    let mut response_headers: Vec<String> = Vec::new();
    let mut response_body: Vec<u8> = Vec::new();
    let mut sent: u64 = 0;
    let mut failure: Option<StreamError> = None;

    let mut easy = easy_for(url, headers, timeouts)?;
    easy.upload(true)?;
    easy.in_filesize(len)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                response_headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            response_body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.read_function(|buf| {
            let want = (len - sent).min(buf.len() as u64) as usize;
            if want == 0 {
                return Ok(0);
            }
            loop {
                match body.read(&mut buf[..want]) {
                    Ok(0) => {
                        failure = Some(StreamError::Truncated {
                            expected: len,
                            sent,
                        });
                        return Err(ReadError::Abort);
                    }
                    Ok(n) => {
                        sent += n as u64;
                        return Ok(n);
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        failure = Some(StreamError::Read(e));
                        return Err(ReadError::Abort);
                    }
                }
            }
        })?;
        transfer.perform()
    };
    if let Some(f) = failure {
        return Err(f);
    }
    performed?;

    Ok(HttpResponse {
        status: easy.response_code()? as u16,
        headers: response_headers,
        body: response_body,
    })
}
