// src/output/attachments.rs
//! Downloads files hosted by Notion next to the snapshots that reference them.

use super::paths::{attachment_file_name, partial_path};
use crate::algebras::EventSink;
use crate::constants::DOWNLOAD_TIMEOUT_SECS;
use crate::error::{persistence_error, AppError};
use crate::model::Block;
use log::Level;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// A completed download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Streams attachment bodies to disk.
///
/// Signed file URLs carry their own credentials, so this client sends no
/// Notion headers.
pub struct AttachmentDownloader {
    client: Client,
    events: Arc<dyn EventSink>,
}

impl AttachmentDownloader {
    pub fn new(events: Arc<dyn EventSink>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, events })
    }

    /// Downloads the file carried by `block` into `dir`.
    ///
    /// Returns `Ok(None)` for blocks with nothing retrievable: externally
    /// hosted files and non-media blocks.
    pub async fn download(
        &self,
        block: &Block,
        dir: &Path,
    ) -> Result<Option<DownloadedFile>, AppError> {
        let Some((kind, file)) = block.attachment() else {
            return Ok(None);
        };
        let Some(url) = file.hosted_url() else {
            self.events.record(
                Level::Debug,
                "Skipping file without a downloadable URL",
                &[
                    ("block_id", block.id().to_string()),
                    ("type", kind.to_string()),
                ],
            );
            return Ok(None);
        };

        let file_name = attachment_file_name(url, block.id(), kind);
        let target = dir.join(&file_name);
        let bytes = self.fetch_to(url, &target).await?;

        self.events.record(
            Level::Info,
            "Downloaded file",
            &[
                ("filename", file_name),
                ("path", target.display().to_string()),
                ("size", bytes.to_string()),
                ("block_id", block.id().to_string()),
            ],
        );
        Ok(Some(DownloadedFile {
            path: target,
            bytes,
        }))
    }

    /// Streams `url` into a temp file beside `target`, then renames it.
    async fn fetch_to(&self, url: &str, target: &Path) -> Result<u64, AppError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| persistence_error(parent, &e))?;
        }

        let temp = partial_path(target);
        let written = match self.stream_body(url, &temp).await {
            Ok(0) => Err(AppError::Persistence {
                path: target.to_path_buf(),
                cause: "Downloaded file is empty".to_string(),
            }),
            other => other,
        };

        match written {
            Ok(bytes) => {
                fs::rename(&temp, target)
                    .await
                    .map_err(|e| persistence_error(target, &e))?;
                Ok(bytes)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                Err(e)
            }
        }
    }

    async fn stream_body(&self, url: &str, temp: &Path) -> Result<u64, AppError> {
        let transfer_error = |cause: String| AppError::Persistence {
            path: temp.to_path_buf(),
            cause,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transfer_error(format!("Download request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(transfer_error(format!("Download returned HTTP {}", status)));
        }

        let mut out = fs::File::create(temp)
            .await
            .map_err(|e| persistence_error(temp, &e))?;
        let mut total: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| transfer_error(format!("Download interrupted: {}", e)))?
        {
            out.write_all(&chunk)
                .await
                .map_err(|e| persistence_error(temp, &e))?;
            total += chunk.len() as u64;
        }
        out.flush().await.map_err(|e| persistence_error(temp, &e))?;

        Ok(total)
    }
}
