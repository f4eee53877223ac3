//! Failure screenshots.
//!
//! Files are named `<safe test id>__<YYYYmmdd-HHMMSS>.png` inside the
//! configured artifacts directory.

use crate::driver::BrowserDriver;
use crate::result::E2eResult;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Timestamp format of artifact file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Test id with path separators replaced, usable as a file name
#[must_use]
pub fn safe_test_id(test_id: &str) -> String {
    test_id.replace("::", "__").replace(['/', '\\'], "_")
}

/// Artifact path for a test at a given moment
#[must_use]
pub fn artifact_path(dir: &Path, test_id: &str, at: NaiveDateTime) -> PathBuf {
    dir.join(format!(
        "{}__{}.png",
        safe_test_id(test_id),
        at.format(TIMESTAMP_FORMAT)
    ))
}

/// Write PNG bytes under `dir`, creating it if needed
pub async fn save_screenshot(dir: &Path, test_id: &str, png: &[u8]) -> E2eResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = artifact_path(dir, test_id, chrono::Local::now().naive_local());
    tokio::fs::write(&path, png).await?;
    Ok(path)
}

/// Take a full-page screenshot and save it
pub async fn capture(driver: &dyn BrowserDriver, dir: &Path, test_id: &str) -> E2eResult<PathBuf> {
    let png = driver.screenshot_full_page().await?;
    save_screenshot(dir, test_id, &png).await
}
