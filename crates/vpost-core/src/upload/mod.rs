//! Video upload: session metadata, the resumable driver, and the
//! videos.insert client it drives.

pub mod driver;
mod error;
pub mod session;
pub mod youtube;

pub use driver::{ChunkOutcome, ChunkSender, ResumableUploadDriver, UploadAttempt};
pub use error::{FailureKind, SessionError, UploadError};
pub use session::{PrivacyStatus, UploadOptions, UploadSession, VideoMetadata};
pub use youtube::YoutubeInsertRequest;

use anyhow::{Context, Result};

use crate::config::UploadConfig;
use crate::control::Delay;
use crate::credentials::CredentialProvider;

/// Fetch a token, open the insert request and drive it to completion.
/// Terminal upload failures come back as [`UploadError`] inside the
/// `anyhow::Error` so callers can still downcast on the kind.
pub fn upload_session<D: Delay>(
    session: &UploadSession,
    credentials: &dyn CredentialProvider,
    cfg: &UploadConfig,
    driver: &mut ResumableUploadDriver<D>,
) -> Result<String> {
    let token = credentials
        .access_token()
        .context("could not obtain an access token")?;
    let mut request = YoutubeInsertRequest::new(session, token, cfg)?;
    tracing::info!(
        file = %session.resource_path().display(),
        bytes = request.total_bytes(),
        title = %session.metadata().title,
        privacy = %session.metadata().privacy_status,
        "starting resumable upload"
    );
    let id = driver.run(&mut request)?;
    Ok(id)
}
