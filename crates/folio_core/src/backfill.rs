use crate::error::FolioError;
use crate::model::{AssetFilter, NewAsset};
use crate::traits::{RecordStore, StorageBackend};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// Objects found in the originals bucket.
    pub scanned: usize,
    pub inserted: usize,
    /// Objects that already had a record.
    pub skipped: usize,
    pub failed: usize,
}

/// Inserts an uncategorized, flag-free record for every original lacking one.
///
/// Keyed by storage path, so running it again inserts nothing.
#[instrument(skip_all)]
pub async fn backfill<S: StorageBackend, R: RecordStore>(
    originals: &S,
    records: &R,
    uploaded_by: Option<&str>,
) -> Result<BackfillReport, FolioError> {
    let objects = originals.list("").await?;
    let existing: HashSet<String> = records
        .list_assets(AssetFilter::all())
        .await?
        .into_iter()
        .map(|asset| asset.path)
        .collect();
    info!("Found {} originals, {} records", objects.len(), existing.len());

    let mut report = BackfillReport {
        scanned: objects.len(),
        ..Default::default()
    };

    for name in objects {
        if existing.contains(&name) {
            debug!("Skipping existing {name}");
            report.skipped += 1;
            continue;
        }

        let record = NewAsset::placeholder(name.as_str(), uploaded_by.map(str::to_string));
        match records.insert_asset(record).await {
            Ok(asset) => {
                debug!(id = asset.id, "Inserted record for {name}");
                report.inserted += 1;
            }
            Err(e) => {
                error!("Insert failed for {name}: {e}");
                report.failed += 1;
            }
        }
    }

    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        failed = report.failed,
        "Backfill finished"
    );
    Ok(report)
}
