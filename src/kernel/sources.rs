//! Kernel Source Download
//!
//! Retrieves the pinned source archive over HTTP. One GET, no retries and no
//! resume: the archive is either transferred completely with a `200 OK`, or
//! the run fails with the URL and the cause attached.

use crate::error::FetchError;
use crate::models::ReleaseSource;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTTP client for the archive download.
///
/// The blocking client defaults to a 30 s total timeout that also covers the
/// body; a full source tarball takes longer than that, so it is disabled.
fn download_client(url: &str) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(None::<Duration>)
        .build()
        .map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })
}

/// Download `source` into `dest_dir`, naming the file after the final URL
/// path segment and overwriting any existing file of that name.
///
/// # Returns
/// * `Ok(PathBuf)` - path of the downloaded archive
/// * `Err(FetchError)` - bad status, transport failure, or any I/O error
///   while creating, writing or flushing the file
///
/// A failed transfer may leave a partial file behind; it is not cleaned up.
pub fn fetch_source(source: &ReleaseSource, dest_dir: &Path) -> Result<PathBuf, FetchError> {
    let url = source.url();
    log::info!("[Fetch] downloading kernel source: {}", url);

    let mut response = download_client(url)?
        .get(url)
        .send()
        .map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::UnexpectedStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let dest = dest_dir.join(source.archive_name());
    let io_err = |e: std::io::Error| FetchError::Io {
        url: url.to_string(),
        source: e,
    };

    let file = File::create(&dest).map_err(io_err)?;
    let mut out = BufWriter::new(file);

    let bytes = std::io::copy(&mut response, &mut out).map_err(io_err)?;

    // Surface flush/close errors instead of losing them in Drop.
    out.flush().map_err(io_err)?;
    let file = out.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;

    log::info!("[Fetch] wrote {} bytes to {}", bytes, dest.display());
    Ok(dest)
}
