use crate::domain::ports::SnapshotStore;
use crate::error::{Result, SimulatorError};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding ledger snapshots.
pub const CF_LEDGER: &str = "ledger";
/// Key of the escrow transaction snapshot inside [`CF_LEDGER`].
pub const SNAPSHOT_KEY: &[u8] = b"escrow_transactions";

/// A persistent snapshot store backed by RocksDB.
///
/// The whole ledger lives under a single key, mirroring the one-slot contract
/// of [`SnapshotStore`].
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBSnapshotStore {
    db: Arc<DB>,
}

impl RocksDBSnapshotStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_ledger = ColumnFamilyDescriptor::new(CF_LEDGER, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_ledger])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_LEDGER).ok_or_else(|| {
            SimulatorError::PersistenceError("Ledger column family not found".to_string())
        })
    }
}

#[async_trait]
impl SnapshotStore for RocksDBSnapshotStore {
    async fn load(&self) -> Result<Option<String>> {
        let Some(bytes) = self.db.get_cf(self.cf()?, SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| SimulatorError::PersistenceError(format!("Snapshot is not UTF-8: {}", e)))
    }

    async fn save(&self, snapshot: String) -> Result<()> {
        self.db.put_cf(self.cf()?, SNAPSHOT_KEY, snapshot)?;
        Ok(())
    }

    async fn erase(&self) -> Result<()> {
        self.db.delete_cf(self.cf()?, SNAPSHOT_KEY)?;
        Ok(())
    }
}
