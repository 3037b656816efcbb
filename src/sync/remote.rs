//! The remote store contract.
//!
//! The server only ever sees records in wire shape: ciphertext plus
//! unencrypted name and metadata.  Implementations classify failures as
//! `Unauthorized`, `NotFound`, `AccessDenied`, `ServerError` or
//! `NetworkError`.

use crate::errors::Result;
use crate::vault::SecretRecord;

/// CRUD transport for encrypted records.
pub trait RemoteStore {
    /// Store a new record and return the id the server assigned to it.
    fn create(&mut self, record: &SecretRecord) -> Result<i64>;

    /// All records belonging to `owner_id`.
    fn get_all(&mut self, owner_id: i64) -> Result<Vec<SecretRecord>>;

    /// A single record, including its ciphertext.
    fn get_by_id(&mut self, id: i64) -> Result<SecretRecord>;

    /// Overwrite an existing record.
    fn update(&mut self, record: &SecretRecord) -> Result<()>;

    fn delete(&mut self, id: i64) -> Result<()>;
}
