//! Named store and entry operations.
//!
//! Stores are created on demand and deleted wholesale; entries are
//! overwritten by key with no ordering guarantee between writers.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::{Error, Response};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached response together with where and when it was stored.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheEntry {
    pub store: String,
    pub key: String,
    pub method: String,
    pub url: String,
    pub response: Response,
    pub stored_at: String,
}

/// A request/response pair waiting to be written by [`CacheDb::put_all`].
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub method: String,
    pub url: String,
    pub response: Response,
}

const SELECT_ENTRY: &str = "SELECT
    e.store_name, e.key, e.method, e.url, e.status, e.status_text,
    e.headers_json, e.body, e.response_url, e.stored_at
FROM entries e";

struct RawEntry {
    store: String,
    key: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    response_url: Option<String>,
    stored_at: String,
}

impl RawEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            store: row.get(0)?,
            key: row.get(1)?,
            method: row.get(2)?,
            url: row.get(3)?,
            status: row.get(4)?,
            status_text: row.get(5)?,
            headers_json: row.get(6)?,
            body: row.get(7)?,
            response_url: row.get(8)?,
            stored_at: row.get(9)?,
        })
    }

    fn decode(self) -> Result<CacheEntry, Error> {
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        Ok(CacheEntry {
            store: self.store,
            key: self.key,
            method: self.method,
            url: self.url,
            response: Response {
                status: self.status,
                status_text: self.status_text,
                headers,
                body: self.body,
                url: self.response_url,
            },
            stored_at: self.stored_at,
        })
    }
}

fn ensure_store(conn: &rusqlite::Connection, name: &str, now: &str) -> Result<(), Error> {
    conn.execute("INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)", params![name, now])?;
    Ok(())
}

fn upsert_entry(conn: &rusqlite::Connection, store: &str, entry: &PendingEntry, now: &str) -> Result<(), Error> {
    let method = entry.method.to_ascii_uppercase();
    let key = compute_cache_key(&method, &entry.url);
    let headers_json = serde_json::to_string(&entry.response.headers)?;
    conn.execute(
        "INSERT INTO entries (
            store_name, key, method, url, status, status_text,
            headers_json, body, response_url, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(store_name, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            response_url = excluded.response_url,
            stored_at = excluded.stored_at",
        params![
            store,
            key,
            method,
            &entry.url,
            entry.response.status,
            &entry.response.status_text,
            headers_json,
            &entry.response.body,
            &entry.response.url,
            now,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Create the named store if it does not exist yet.
    pub async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_store(conn, &name, &now) })
            .await
            .map_err(Error::from)
    }

    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all stores, oldest first.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and every entry in it.
    ///
    /// Returns false if no store had that name.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Write a response under `(method, url)` in the named store.
    ///
    /// Overwrites any previous entry for the same key; creates the store if needed.
    pub async fn put(&self, store: &str, method: &str, url: &str, response: &Response) -> Result<(), Error> {
        let store = store.to_string();
        let entry = PendingEntry { method: method.to_string(), url: url.to_string(), response: response.clone() };
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_store(conn, &store, &now)?;
                upsert_entry(conn, &store, &entry, &now)
            })
            .await
            .map_err(Error::from)
    }

    /// Write every entry in one transaction; either all are stored or none.
    pub async fn put_all(&self, store: &str, entries: Vec<PendingEntry>) -> Result<(), Error> {
        let store = store.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                ensure_store(&tx, &store, &now)?;
                for entry in &entries {
                    upsert_entry(&tx, &store, entry, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `(method, url)` in one store.
    pub async fn match_in(&self, store: &str, method: &str, url: &str) -> Result<Option<Response>, Error> {
        let store = store.to_string();
        let key = compute_cache_key(method, url);
        let sql = format!("{SELECT_ENTRY} WHERE e.store_name = ?1 AND e.key = ?2");
        self.query_entry(sql, (store, key))
            .await
            .map(|entry| entry.map(|e| e.response))
    }

    /// Look up `(method, url)` across every store, oldest store first.
    pub async fn match_any(&self, method: &str, url: &str) -> Result<Option<Response>, Error> {
        Ok(self.get_entry(method, url).await?.map(|e| e.response))
    }

    /// Like [`CacheDb::match_any`] but keeps the entry metadata.
    pub async fn get_entry(&self, method: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        let key = compute_cache_key(method, url);
        let sql = format!(
            "{SELECT_ENTRY} JOIN stores s ON s.name = e.store_name
             WHERE e.key = ?1 ORDER BY s.rowid ASC LIMIT 1"
        );
        self.query_entry(sql, (key,)).await
    }

    async fn query_entry<P>(&self, sql: String, args: P) -> Result<Option<CacheEntry>, Error>
    where
        P: rusqlite::Params + Send + 'static,
    {
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                match stmt.query_row(args, RawEntry::from_row) {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawEntry::decode).transpose()
    }

    pub async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store_name = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Keep the newest `max_entries` entries of a store by write time and
    /// delete the rest. Reads do not refresh an entry.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_oldest_entries(&self, store: &str, max_entries: usize) -> Result<u64, Error> {
        let store = store.to_string();
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store_name = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE store_name = ?1 AND rowid IN (
                        SELECT rowid FROM entries WHERE store_name = ?1
                        ORDER BY stored_at ASC, rowid ASC LIMIT ?2
                    )",
                    params![store, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
