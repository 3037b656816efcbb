//! HTTP `RemoteStore` over the blocking `ureq` client.
//!
//! Endpoints, relative to the server base URL:
//!
//! ```text
//! POST   /api/data/              create, responds with the stored record
//! GET    /api/data/              list the caller's records (may omit ciphertext)
//! GET    /api/data/{id}/encrypted  one record with its ciphertext
//! PUT    /api/data/{id}          update
//! DELETE /api/data/{id}          delete
//! ```
//!
//! Every request carries `Authorization: Bearer <token>` and is bounded by
//! a single global deadline.  There is no retry.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::remote::RemoteStore;
use crate::errors::{LockboxError, Result};
use crate::vault::SecretRecord;

/// Minimal view of the create response; only the assigned id matters.
#[derive(Deserialize)]
struct Created {
    id: i64,
}

/// `RemoteStore` backed by the vault server's REST API.
///
/// Holds the bearer token for the session; the token is wiped on drop.
pub struct HttpRemoteStore {
    agent: ureq::Agent,
    base_url: String,
    token: Option<Zeroizing<String>>,
}

impl HttpRemoteStore {
    /// Build a store for `base_url`.  Calls fail with `Unauthorized`
    /// until a token is supplied.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()).map(Zeroizing::new),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn bearer(&self) -> Result<String> {
        self.token
            .as_ref()
            .map(|t| format!("Bearer {}", t.as_str()))
            .ok_or(LockboxError::Unauthorized)
    }
}

impl RemoteStore for HttpRemoteStore {
    fn create(&mut self, record: &SecretRecord) -> Result<i64> {
        debug!(kind = %record.kind, "POST /api/data/");
        let mut resp = self
            .agent
            .post(&self.url("/api/data/"))
            .header("Authorization", &self.bearer()?)
            .send_json(record)
            .map_err(|e| classify(e, record.id))?;

        let created: Created = resp
            .body_mut()
            .read_json()
            .map_err(|e| classify(e, record.id))?;
        if created.id <= 0 {
            return Err(LockboxError::ServerError(format!(
                "server assigned invalid id {}",
                created.id
            )));
        }
        Ok(created.id)
    }

    fn get_all(&mut self, owner_id: i64) -> Result<Vec<SecretRecord>> {
        debug!(owner_id, "GET /api/data/");
        let mut resp = self
            .agent
            .get(&self.url("/api/data/"))
            .header("Authorization", &self.bearer()?)
            .call()
            .map_err(|e| classify(e, 0))?;

        let listed = resp
            .body_mut()
            .read_json::<Option<Vec<SecretRecord>>>()
            .map_err(|e| classify(e, 0))?
            .unwrap_or_default();

        // The listing carries metadata only; ciphertext comes from the
        // per-record endpoint.  An entry that cannot be completed stays in
        // the snapshot without ciphertext so its id is still known.
        let mut records = Vec::with_capacity(listed.len());
        for record in listed {
            if record.id <= 0 || !record.ciphertext.is_empty() {
                records.push(record);
                continue;
            }
            match self.get_by_id(record.id) {
                Ok(full) => records.push(full),
                Err(e) => {
                    warn!(id = record.id, error = %e, "could not fetch ciphertext");
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    fn get_by_id(&mut self, id: i64) -> Result<SecretRecord> {
        debug!(id, "GET /api/data/{{id}}/encrypted");
        let mut resp = self
            .agent
            .get(&self.url(&format!("/api/data/{id}/encrypted")))
            .header("Authorization", &self.bearer()?)
            .call()
            .map_err(|e| classify(e, id))?;

        resp.body_mut().read_json().map_err(|e| classify(e, id))
    }

    fn update(&mut self, record: &SecretRecord) -> Result<()> {
        debug!(id = record.id, "PUT /api/data/{{id}}");
        self.agent
            .put(&self.url(&format!("/api/data/{}", record.id)))
            .header("Authorization", &self.bearer()?)
            .send_json(record)
            .map_err(|e| classify(e, record.id))?;
        Ok(())
    }

    fn delete(&mut self, id: i64) -> Result<()> {
        debug!(id, "DELETE /api/data/{{id}}");
        self.agent
            .delete(&self.url(&format!("/api/data/{id}")))
            .header("Authorization", &self.bearer()?)
            .call()
            .map_err(|e| classify(e, id))?;
        Ok(())
    }
}

/// Map a transport failure onto the store error taxonomy.
fn classify(err: ureq::Error, id: i64) -> LockboxError {
    match err {
        ureq::Error::StatusCode(401) => LockboxError::Unauthorized,
        ureq::Error::StatusCode(403) => LockboxError::AccessDenied(id),
        ureq::Error::StatusCode(404) => LockboxError::NotFound(format!("record {id}")),
        ureq::Error::StatusCode(code) => LockboxError::ServerError(format!("HTTP {code}")),
        ureq::Error::Json(e) => LockboxError::ServerError(format!("malformed response: {e}")),
        other => LockboxError::NetworkError(other.to_string()),
    }
}
