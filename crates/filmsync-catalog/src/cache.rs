//! SQLite cache of fetched lists.
//!
//! One row per list in `playlist` (name and when it was last fetched) and one
//! row per entry in `catalog_item`. Storing a list replaces all of its rows
//! in a single transaction, so a reader never sees a half-written list.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use filmsync_core::CatalogItem;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::{Catalog, CatalogError, ListId};

/// A catalog as read back from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedCatalog {
    pub catalog: Catalog,
    /// Unix time of the fetch that produced this copy.
    pub renewed_at: u64,
}

/// Handle to the on-disk (or in-memory) list cache.
pub struct CatalogCache {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS playlist (
             id          TEXT PRIMARY KEY,
             name        TEXT NOT NULL,
             renew_time  INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS catalog_item (
             list_id         TEXT NOT NULL,
             rank            INTEGER NOT NULL,
             title           TEXT NOT NULL,
             original_title  TEXT,
             year            TEXT,
             PRIMARY KEY (list_id, rank)
         );",
    )
}

impl CatalogCache {
    /// Open (creating if needed) a cache file. Parent directories are created.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// A cache that lives only as long as this handle.
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read a list back. `None` when the list was never stored or has no entries.
    pub fn load(&self, list: &ListId) -> Result<Option<CachedCatalog>, CatalogError> {
        let conn = self.lock();

        let header: Option<(String, i64)> = conn
            .query_row(
                "SELECT name, renew_time FROM playlist WHERE id = ?1",
                params![list.key()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((name, renew_time)) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare_cached(
            "SELECT rank, title, original_title, year FROM catalog_item
             WHERE list_id = ?1 ORDER BY rank",
        )?;
        let items = stmt
            .query_map(params![list.key()], |row| {
                Ok(CatalogItem {
                    rank: row.get(0)?,
                    title: row.get(1)?,
                    original_title: row.get(2)?,
                    year: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if items.is_empty() {
            return Ok(None);
        }

        Ok(Some(CachedCatalog {
            catalog: Catalog {
                list: list.clone(),
                name,
                items,
            },
            renewed_at: u64::try_from(renew_time).unwrap_or(0),
        }))
    }

    /// Replace a list's cached entries and stamp it with the current time.
    pub fn store(&self, catalog: &Catalog) -> Result<(), CatalogError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let key = catalog.list.key();

        tx.execute("DELETE FROM catalog_item WHERE list_id = ?1", params![key])?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT OR REPLACE INTO catalog_item (list_id, rank, title, original_title, year)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for item in &catalog.items {
                insert.execute(params![
                    key,
                    item.rank,
                    item.title,
                    item.original_title,
                    item.year
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO playlist (id, name, renew_time) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, renew_time = excluded.renew_time",
            params![key, catalog.name, now_epoch() as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Drop one list, or every list when `list` is `None`. Returns the number
    /// of lists removed.
    pub fn clear(&self, list: Option<&ListId>) -> Result<usize, CatalogError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let removed = match list {
            Some(list) => {
                tx.execute(
                    "DELETE FROM catalog_item WHERE list_id = ?1",
                    params![list.key()],
                )?;
                tx.execute("DELETE FROM playlist WHERE id = ?1", params![list.key()])?
            }
            None => {
                tx.execute("DELETE FROM catalog_item", [])?;
                tx.execute("DELETE FROM playlist", [])?
            }
        };
        tx.commit()?;
        Ok(removed)
    }
}
