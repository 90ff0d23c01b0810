use std::io;

use tracing::debug;

use crate::error::AppResult;

/// Opens `url` in the system browser.
pub fn open_url(url: &str) -> AppResult<()> {
    debug!(url, "opening browser");
    open::that(url)
        .map_err(|err| io::Error::new(err.kind(), format!("failed to open {url}: {err}")))?;
    Ok(())
}
