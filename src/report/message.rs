//! Reusable report message bookkeeping
//!
//! The waiting list is published as exactly one message: created when the
//! first non-empty report appears, edited in place when the text changes,
//! and deleted when the report becomes empty. Repeating identical text is
//! skipped so the surface sees no churn.

use crate::error::Result;
use crate::report::surface::ReportSurface;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Single reusable report message on a surface
pub struct ReusableReport {
    surface: Arc<dyn ReportSurface>,
    // Current message text; None means no report message exists
    current_text: Mutex<Option<String>>,
}

impl ReusableReport {
    pub fn new(surface: Arc<dyn ReportSurface>) -> Self {
        Self {
            surface,
            current_text: Mutex::new(None),
        }
    }

    /// Bring the report message in line with the given text
    pub async fn set_text(&self, text: &str) -> Result<()> {
        let mut current = self.current_text.lock().await;

        if text.is_empty() {
            if current.is_some() {
                debug!("Removing report message");
                self.surface.delete().await?;
                *current = None;
            }
            return Ok(());
        }

        match current.as_deref() {
            None => {
                debug!("Creating report message with\n{}", text);
                self.surface.create(text).await?;
                *current = Some(text.to_string());
            }
            Some(existing) if existing == text => {
                // Identical content; skip the network round trip
            }
            Some(existing) => {
                debug!("Updating report message text\n{}\nwith\n{}", existing, text);
                self.surface.edit(text).await?;
                *current = Some(text.to_string());
            }
        }

        Ok(())
    }

    /// Post a one-off command reply through the surface
    pub async fn reply(&self, text: &str) -> Result<()> {
        self.surface.reply(text).await
    }
}
