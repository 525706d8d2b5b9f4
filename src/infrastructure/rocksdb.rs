use crate::domain::ports::SubmissionStore;
use crate::domain::submission::Submission;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for submission documents keyed by id.
pub const CF_SUBMISSIONS: &str = "submissions";
/// Column Family mapping (consent, client, key) to the latest submission id.
pub const CF_IDEMPOTENCY: &str = "idempotency";

const SCOPE_SEPARATOR: char = '\u{1f}';

/// A persistent submission store backed by RocksDB.
///
/// RocksDB has no unique indexes, so writes are serialized through an async
/// mutex and both uniqueness checks run inside it. Reads go straight to the DB.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
pub struct RocksDbSubmissionStore<P> {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
    _payload: PhantomData<fn() -> P>,
}

impl<P> Clone for RocksDbSubmissionStore<P> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            write_lock: Arc::clone(&self.write_lock),
            _payload: PhantomData,
        }
    }
}

impl<P> RocksDbSubmissionStore<P>
where
    P: Serialize + DeserializeOwned,
{
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<T: AsRef<Path>>(path: T) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_submissions = ColumnFamilyDescriptor::new(CF_SUBMISSIONS, Options::default());
        let cf_idempotency = ColumnFamilyDescriptor::new(CF_IDEMPOTENCY, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_submissions, cf_idempotency])
            .map_err(backend)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
            _payload: PhantomData,
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("{name} column family not found")))
    }

    fn read_submission(&self, id: &str) -> Result<Option<Submission<P>>, StoreError> {
        let cf = self.cf(CF_SUBMISSIONS)?;
        match self.db.get_cf(cf, id.as_bytes()).map_err(backend)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("Deserialization error: {e}"))),
            None => Ok(None),
        }
    }

    fn read_scope(&self, scope: &str) -> Result<Option<Submission<P>>, StoreError> {
        let cf = self.cf(CF_IDEMPOTENCY)?;
        match self.db.get_cf(cf, scope.as_bytes()).map_err(backend)? {
            Some(id) => {
                let id = String::from_utf8(id)
                    .map_err(|e| StoreError::Serialization(format!("Corrupt index entry: {e}")))?;
                self.read_submission(&id)
            }
            None => Ok(None),
        }
    }
}

fn scope_key(consent_id: &str, api_client_id: &str, idempotency_key: &str) -> String {
    format!("{consent_id}{SCOPE_SEPARATOR}{api_client_id}{SCOPE_SEPARATOR}{idempotency_key}")
}

fn backend(e: rocksdb::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl<P> SubmissionStore<P> for RocksDbSubmissionStore<P>
where
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn insert(&self, submission: Submission<P>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        if self.read_submission(&submission.id)?.is_some() {
            return Err(StoreError::UniqueKeyViolation(format!(
                "id {}",
                submission.id
            )));
        }

        let scope = scope_key(
            &submission.consent_id,
            &submission.api_client_id,
            &submission.idempotency_key,
        );
        if let Some(existing) = self.read_scope(&scope)?
            && existing.is_key_live(Utc::now())
        {
            return Err(StoreError::UniqueKeyViolation(format!(
                "idempotency key {}",
                submission.idempotency_key
            )));
        }

        let value = serde_json::to_vec(&submission)
            .map_err(|e| StoreError::Serialization(format!("Serialization error: {e}")))?;

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_SUBMISSIONS)?, submission.id.as_bytes(), value);
        batch.put_cf(
            self.cf(CF_IDEMPOTENCY)?,
            scope.as_bytes(),
            submission.id.as_bytes(),
        );
        self.db.write(batch).map_err(backend)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Submission<P>>, StoreError> {
        self.read_submission(id)
    }

    async fn find_by_consent_client_key(
        &self,
        consent_id: &str,
        api_client_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Submission<P>>, StoreError> {
        self.read_scope(&scope_key(consent_id, api_client_id, idempotency_key))
    }
}
