// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! SQLite-backed mirror
//!
//! The schema carries the uniqueness rules and the interface-to-peer cascade
//! itself, so constraint failures from SQLite are mapped straight onto
//! [`StoreError`] variants.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, ffi, params};

use super::{Interface, MirrorStore, NewInterface, NewPeer, Peer};
use crate::error::StoreError;

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS interfaces (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        display_name TEXT NOT NULL,
        device_interface_name TEXT NOT NULL UNIQUE,
        public_key TEXT NOT NULL,
        private_key TEXT NOT NULL,
        listen_port INTEGER NOT NULL,
        address TEXT,
        mtu INTEGER NOT NULL,
        enabled INTEGER NOT NULL,
        is_imported INTEGER NOT NULL,
        comment TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS peers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        public_key TEXT NOT NULL,
        private_key TEXT,
        preshared_key TEXT,
        allowed_ips TEXT NOT NULL,
        endpoint TEXT NOT NULL DEFAULT '',
        persistent_keepalive INTEGER NOT NULL,
        enabled INTEGER NOT NULL,
        comment TEXT NOT NULL DEFAULT '',
        last_handshake TEXT,
        is_imported INTEGER NOT NULL,
        interface_id INTEGER NOT NULL REFERENCES interfaces(id) ON DELETE CASCADE,
        UNIQUE(public_key, interface_id)
    );
    CREATE INDEX IF NOT EXISTS idx_peers_interface ON peers(interface_id);
";

const INTERFACE_COLUMNS: &str = "id, display_name, device_interface_name, public_key, \
     private_key, listen_port, address, mtu, enabled, is_imported, comment";

const PEER_COLUMNS: &str = "id, name, public_key, private_key, preshared_key, allowed_ips, \
     endpoint, persistent_keepalive, enabled, comment, last_handshake, is_imported, interface_id";

/// [`super::MirrorStore`] persisted in a SQLite database
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] when the file cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref()).map_err(backend)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(backend)?;
        let store = Self::init(conn)?;
        tracing::info!("Opened mirror database at {}", path.as_ref().display());
        Ok(store)
    }

    /// Opens a throwaway database
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(backend)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;").map_err(backend)?;
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    tracing::error!("Mirror database error: {}", e);
    StoreError::Backend(e.to_string())
}

/// Extended result code of a constraint violation
fn violated(e: &rusqlite::Error) -> Option<i32> {
    match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            Some(err.extended_code)
        }
        _ => None,
    }
}

fn interface_name_error(e: rusqlite::Error, name: &str) -> StoreError {
    match violated(&e) {
        Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => {
            StoreError::Conflict(format!("interface {name} already exists"))
        }
        _ => backend(e),
    }
}

fn peer_key_error(e: rusqlite::Error, public_key: &str, interface_id: i64) -> StoreError {
    match violated(&e) {
        Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => StoreError::Conflict(format!(
            "peer {public_key} already exists on interface #{interface_id}"
        )),
        Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
            StoreError::NotFound(format!("interface #{interface_id}"))
        }
        _ => backend(e),
    }
}

fn interface_from_row(row: &Row<'_>) -> rusqlite::Result<Interface> {
    Ok(Interface {
        id: row.get(0)?,
        display_name: row.get(1)?,
        device_interface_name: row.get(2)?,
        public_key: row.get(3)?,
        private_key: row.get(4)?,
        listen_port: row.get(5)?,
        address: row.get(6)?,
        mtu: row.get(7)?,
        enabled: row.get(8)?,
        is_imported: row.get(9)?,
        comment: row.get(10)?,
    })
}

fn peer_from_row(row: &Row<'_>) -> rusqlite::Result<Peer> {
    Ok(Peer {
        id: row.get(0)?,
        name: row.get(1)?,
        public_key: row.get(2)?,
        private_key: row.get(3)?,
        preshared_key: row.get(4)?,
        allowed_ips: row.get(5)?,
        endpoint: row.get(6)?,
        persistent_keepalive: row.get(7)?,
        enabled: row.get(8)?,
        comment: row.get(9)?,
        last_handshake: row.get(10)?,
        is_imported: row.get(11)?,
        interface_id: row.get(12)?,
    })
}

fn select_peers(
    conn: &Connection,
    filter: &str,
    args: impl rusqlite::Params,
) -> rusqlite::Result<Vec<Peer>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PEER_COLUMNS} FROM peers {filter} ORDER BY id"
    ))?;
    let rows = stmt.query_map(args, peer_from_row)?;
    rows.collect()
}

impl MirrorStore for SqliteStore {
    async fn interfaces(&self) -> Result<Vec<Interface>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT {INTERFACE_COLUMNS} FROM interfaces ORDER BY id"))
            .map_err(backend)?;
        let rows = stmt.query_map([], interface_from_row).map_err(backend)?;
        rows.collect::<rusqlite::Result<_>>().map_err(backend)
    }

    async fn interface(&self, id: i64) -> Result<Option<Interface>, StoreError> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {INTERFACE_COLUMNS} FROM interfaces WHERE id = ?1"),
            params![id],
            interface_from_row,
        )
        .optional()
        .map_err(backend)
    }

    async fn insert_interface(&self, new: NewInterface) -> Result<Interface, StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO interfaces (display_name, device_interface_name, public_key, private_key, \
             listen_port, address, mtu, enabled, is_imported, comment) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                new.display_name,
                new.device_interface_name,
                new.public_key,
                new.private_key,
                new.listen_port,
                new.address,
                new.mtu,
                new.enabled,
                new.is_imported,
                new.comment,
            ],
        )
        .map_err(|e| interface_name_error(e, &new.device_interface_name))?;

        let id = conn.last_insert_rowid();
        tracing::trace!("Stored interface {} as #{}", new.device_interface_name, id);
        Ok(Interface {
            id,
            display_name: new.display_name,
            device_interface_name: new.device_interface_name,
            public_key: new.public_key,
            private_key: new.private_key,
            listen_port: new.listen_port,
            address: new.address,
            mtu: new.mtu,
            enabled: new.enabled,
            is_imported: new.is_imported,
            comment: new.comment,
        })
    }

    async fn save_interface(&self, interface: &Interface) -> Result<(), StoreError> {
        let conn = self.lock();
        let changed = conn
            .execute(
                "UPDATE interfaces SET display_name = ?2, device_interface_name = ?3, \
                 public_key = ?4, private_key = ?5, listen_port = ?6, address = ?7, mtu = ?8, \
                 enabled = ?9, is_imported = ?10, comment = ?11 WHERE id = ?1",
                params![
                    interface.id,
                    interface.display_name,
                    interface.device_interface_name,
                    interface.public_key,
                    interface.private_key,
                    interface.listen_port,
                    interface.address,
                    interface.mtu,
                    interface.enabled,
                    interface.is_imported,
                    interface.comment,
                ],
            )
            .map_err(|e| interface_name_error(e, &interface.device_interface_name))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("interface #{}", interface.id)));
        }
        Ok(())
    }

    async fn delete_interface(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.lock();
        let peers: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM peers WHERE interface_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(backend)?;
        let removed = conn
            .execute("DELETE FROM interfaces WHERE id = ?1", params![id])
            .map_err(backend)?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("interface #{id}")));
        }
        if peers > 0 {
            tracing::debug!("Removed {} peers of interface #{}", peers, id);
        }
        Ok(())
    }

    async fn peers(&self) -> Result<Vec<Peer>, StoreError> {
        let conn = self.lock();
        select_peers(&conn, "", []).map_err(backend)
    }

    async fn peers_on(&self, interface_id: i64) -> Result<Vec<Peer>, StoreError> {
        let conn = self.lock();
        select_peers(&conn, "WHERE interface_id = ?1", params![interface_id]).map_err(backend)
    }

    async fn peer(&self, id: i64) -> Result<Option<Peer>, StoreError> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {PEER_COLUMNS} FROM peers WHERE id = ?1"),
            params![id],
            peer_from_row,
        )
        .optional()
        .map_err(backend)
    }

    async fn insert_peer(&self, new: NewPeer) -> Result<Peer, StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO peers (name, public_key, private_key, preshared_key, allowed_ips, \
             endpoint, persistent_keepalive, enabled, comment, last_handshake, is_imported, \
             interface_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                new.name,
                new.public_key,
                new.private_key,
                new.preshared_key,
                new.allowed_ips,
                new.endpoint,
                new.persistent_keepalive,
                new.enabled,
                new.comment,
                new.last_handshake,
                new.is_imported,
                new.interface_id,
            ],
        )
        .map_err(|e| peer_key_error(e, &new.public_key, new.interface_id))?;

        Ok(Peer {
            id: conn.last_insert_rowid(),
            name: new.name,
            public_key: new.public_key,
            private_key: new.private_key,
            preshared_key: new.preshared_key,
            allowed_ips: new.allowed_ips,
            endpoint: new.endpoint,
            persistent_keepalive: new.persistent_keepalive,
            enabled: new.enabled,
            comment: new.comment,
            last_handshake: new.last_handshake,
            is_imported: new.is_imported,
            interface_id: new.interface_id,
        })
    }

    async fn save_peer(&self, peer: &Peer) -> Result<(), StoreError> {
        let conn = self.lock();
        let changed = conn
            .execute(
                "UPDATE peers SET name = ?2, public_key = ?3, private_key = ?4, \
                 preshared_key = ?5, allowed_ips = ?6, endpoint = ?7, persistent_keepalive = ?8, \
                 enabled = ?9, comment = ?10, last_handshake = ?11, is_imported = ?12, \
                 interface_id = ?13 WHERE id = ?1",
                params![
                    peer.id,
                    peer.name,
                    peer.public_key,
                    peer.private_key,
                    peer.preshared_key,
                    peer.allowed_ips,
                    peer.endpoint,
                    peer.persistent_keepalive,
                    peer.enabled,
                    peer.comment,
                    peer.last_handshake,
                    peer.is_imported,
                    peer.interface_id,
                ],
            )
            .map_err(|e| peer_key_error(e, &peer.public_key, peer.interface_id))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("peer #{}", peer.id)));
        }
        Ok(())
    }

    async fn delete_peer(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.lock();
        let removed = conn
            .execute("DELETE FROM peers WHERE id = ?1", params![id])
            .map_err(backend)?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("peer #{id}")));
        }
        Ok(())
    }
}
