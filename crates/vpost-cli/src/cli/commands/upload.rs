//! `vpost upload` – drive a resumable upload, cancellable with Ctrl-C.

use anyhow::Result;
use vpost_core::config::VpostConfig;
use vpost_core::control::{CancelToken, CancellableSleep};
use vpost_core::credentials::AuthorizedUserFile;
use vpost_core::upload::{self, ResumableUploadDriver, UploadOptions, UploadSession};

pub async fn run_upload(cfg: &VpostConfig, opts: UploadOptions, channel: &str) -> Result<()> {
    let session = UploadSession::from_options(opts)?;
    let credentials = AuthorizedUserFile::for_channel(&cfg.upload.credentials_dir()?, channel);
    tracing::debug!(path = %credentials.path().display(), "using channel credentials");

    let cancel = CancelToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling upload");
                eprintln!("Cancelling upload...");
                cancel.cancel();
            }
        })
    };

    let upload_cfg = cfg.upload.clone();
    let policy = cfg.retry.policy();
    let result = tokio::task::spawn_blocking(move || {
        let delay = CancellableSleep::new(cancel.clone());
        let mut driver = ResumableUploadDriver::new(policy, delay).with_cancel_token(cancel);
        upload::upload_session(&session, &credentials, &upload_cfg, &mut driver)
    })
    .await
    .map_err(|e| anyhow::anyhow!("upload task failed: {}", e))?;
    interrupt.abort();

    let id = result?;
    println!("Video id \"{}\" was successfully uploaded.", id);
    Ok(())
}
