use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    error::Result,
    model::{Role, UserProfile},
    route::Route,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub display_name: String,
    pub role: Role,
    pub token: String,
}

impl Session {
    pub fn from_profile(profile: UserProfile, token: String) -> Self {
        Self {
            user_id: profile.id,
            display_name: profile.display_name,
            role: profile.role,
            token,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Logout,
    Expired,
}

/// The one owner of the authenticated session. Only the auth flow mutates it.
#[derive(Debug, Default)]
pub struct SessionContext {
    current: Option<Session>,
}

impl SessionContext {
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn user_id(&self) -> Option<i64> {
        self.current.as_ref().map(|s| s.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Installs `session` and returns where the user should land.
    pub fn establish(&mut self, session: Session) -> Route {
        log::info!(
            "[Session] established for user {} ({})",
            session.user_id,
            session.role.as_str()
        );
        let route = Route::landing_for(session.role);
        self.current = Some(session);
        route
    }

    /// Drops the session. Returns the session that was active, if any.
    pub fn teardown(&mut self, reason: TeardownReason) -> Option<Session> {
        let previous = self.current.take();
        if let Some(session) = &previous {
            log::info!("[Session] cleared for user {} ({reason:?})", session.user_id);
        }
        previous
    }
}

fn ensure_schema(conn: &Connection) -> std::result::Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS session (
            slot INTEGER PRIMARY KEY CHECK (slot = 1),
            user_id INTEGER NOT NULL,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL,
            token TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Persists the current session so a restart can resume it.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens `path`, or an in-memory store if that fails.
    pub fn open_or_memory(path: &Path) -> Result<Self> {
        match Self::open(path) {
            Ok(store) => Ok(store),
            Err(err) => {
                log::warn!("[Session] store at {path:?} unavailable ({err}), using memory");
                Self::in_memory()
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO session (slot, user_id, display_name, role, token)
             VALUES (1, ?1, ?2, ?3, ?4)
             ON CONFLICT(slot) DO UPDATE SET
                user_id = excluded.user_id,
                display_name = excluded.display_name,
                role = excluded.role,
                token = excluded.token",
            params![
                session.user_id,
                session.display_name,
                session.role.as_str(),
                session.token
            ],
        )?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<Session>> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, display_name, role, token FROM session WHERE slot = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((user_id, display_name, role, token)) = row else {
            return Ok(None);
        };
        match Role::parse(&role) {
            Some(role) => Ok(Some(Session {
                user_id,
                display_name,
                role,
                token,
            })),
            None => {
                log::warn!("[Session] stored session has unknown role {role:?}, discarding");
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM session", [])?;
        Ok(())
    }
}
