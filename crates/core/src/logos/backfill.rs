//! Eager logo acquisition for instruments still missing an image.

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::acquisition::LogoAcquisitionService;
use crate::errors::Result;
use crate::instruments::InstrumentRepositoryTrait;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackfillResult {
    pub checked: usize,
    pub acquired: usize,
    /// No logo could be found.
    pub missing: usize,
    /// Acquisition or persistence raised an error.
    pub failed: usize,
}

pub struct LogoBackfillService {
    repository: Arc<dyn InstrumentRepositoryTrait>,
    acquisition: Arc<LogoAcquisitionService>,
}

impl LogoBackfillService {
    pub fn new(
        repository: Arc<dyn InstrumentRepositoryTrait>,
        acquisition: Arc<LogoAcquisitionService>,
    ) -> Self {
        Self {
            repository,
            acquisition,
        }
    }

    /// Acquire logos for up to `limit` image-less instruments, one at a time.
    pub async fn backfill_missing(&self, limit: i64) -> Result<BackfillResult> {
        let instruments = self.repository.find_many_missing_image(limit)?;
        let mut result = BackfillResult {
            checked: instruments.len(),
            ..Default::default()
        };

        for instrument in instruments {
            match self.acquisition.acquire(&instrument.symbol).await {
                Ok(Some(image_ref)) => {
                    match self
                        .repository
                        .set_image_ref(instrument.symbol.clone(), image_ref)
                        .await
                    {
                        Ok(()) => result.acquired += 1,
                        Err(e) => {
                            warn!("Backfill: failed to store logo for {}: {}", instrument.symbol, e);
                            result.failed += 1;
                        }
                    }
                }
                Ok(None) => result.missing += 1,
                Err(e) => {
                    warn!("Backfill: acquisition failed for {}: {}", instrument.symbol, e);
                    result.failed += 1;
                }
            }
        }

        info!(
            "Logo backfill finished: checked={}, acquired={}, missing={}, failed={}",
            result.checked, result.acquired, result.missing, result.failed
        );

        Ok(result)
    }
}
