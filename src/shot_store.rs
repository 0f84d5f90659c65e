use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::shot::{ShotEvent, ShotOutcome, StoredShot};
use crate::shot_source::{ShotFilter, ShotSource};

const CACHE_DIR: &str = "xg_engine";
const DB_FILE: &str = "shots.sqlite";
pub const ENV_DB_PATH: &str = "XG_ENGINE_DB";

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path.trim()));
        }
    }
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS shots (
            shot_id INTEGER PRIMARY KEY,
            match_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            player_id INTEGER NOT NULL,
            minute INTEGER NULL,
            x REAL NOT NULL,
            y REAL NOT NULL,
            shot_outcome TEXT NULL,
            is_header INTEGER NOT NULL,
            is_penalty INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_shots_match ON shots(match_id);
        CREATE INDEX IF NOT EXISTS idx_shots_team ON shots(team_id);
        CREATE INDEX IF NOT EXISTS idx_shots_player ON shots(player_id);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

// SQLite integers are signed; ids above i64::MAX would sort out of order.
fn sql_id(id: u64, what: &str) -> Result<i64> {
    i64::try_from(id).with_context(|| format!("{what} {id} exceeds sqlite integer range"))
}

pub fn upsert_shots(conn: &mut Connection, shots: &[StoredShot]) -> Result<usize> {
    let updated_at = Utc::now().to_rfc3339();
    let tx = conn.transaction().context("begin shot upsert transaction")?;
    {
        let mut stmt = tx
            .prepare(
                r#"
                INSERT INTO shots(
                    shot_id, match_id, team_id, player_id, minute,
                    x, y, shot_outcome, is_header, is_penalty, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(shot_id) DO UPDATE SET
                    match_id = excluded.match_id,
                    team_id = excluded.team_id,
                    player_id = excluded.player_id,
                    minute = excluded.minute,
                    x = excluded.x,
                    y = excluded.y,
                    shot_outcome = excluded.shot_outcome,
                    is_header = excluded.is_header,
                    is_penalty = excluded.is_penalty,
                    updated_at = excluded.updated_at
                "#,
            )
            .context("prepare shot upsert")?;
        for s in shots {
            stmt.execute(params![
                sql_id(s.shot_id, "shot id")?,
                sql_id(s.match_id, "match id")?,
                s.team_id as i64,
                s.player_id as i64,
                s.minute.map(i64::from),
                s.shot.x,
                s.shot.y,
                s.shot.shot_outcome.as_ref().map(|o| o.as_str().to_string()),
                s.shot.is_header as i64,
                s.shot.is_penalty as i64,
                updated_at,
            ])
            .with_context(|| format!("upsert shot {}", s.shot_id))?;
        }
    }
    tx.commit().context("commit shot upsert")?;
    info!(count = shots.len(), "upserted shots");
    Ok(shots.len())
}

pub fn load_shots(conn: &Connection, filter: &ShotFilter) -> Result<Vec<StoredShot>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                shot_id, match_id, team_id, player_id, minute,
                x, y, shot_outcome, is_header, is_penalty
            FROM shots
            WHERE (?1 IS NULL OR player_id = ?1)
              AND (?2 IS NULL OR team_id = ?2)
              AND (?3 IS NULL OR match_id = ?3)
            ORDER BY match_id ASC, minute ASC, shot_id ASC
            "#,
        )
        .context("prepare load shots query")?;

    let match_id = filter
        .match_id
        .map(|id| sql_id(id, "match id"))
        .transpose()?;
    let rows = stmt
        .query_map(
            params![
                filter.player_id.map(i64::from),
                filter.team_id.map(i64::from),
                match_id,
            ],
            |row| {
                Ok(StoredShot {
                    shot_id: row.get::<_, u64>(0)?,
                    match_id: row.get::<_, u64>(1)?,
                    team_id: row.get::<_, u32>(2)?,
                    player_id: row.get::<_, u32>(3)?,
                    minute: row.get::<_, Option<u16>>(4)?,
                    shot: ShotEvent {
                        x: row.get(5)?,
                        y: row.get(6)?,
                        shot_outcome: row
                            .get::<_, Option<String>>(7)?
                            .map(|raw| ShotOutcome::parse(&raw)),
                        is_header: row.get::<_, i64>(8)? != 0,
                        is_penalty: row.get::<_, i64>(9)? != 0,
                    },
                })
            },
        )
        .context("query load shots")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode shot row")?);
    }
    Ok(out)
}

pub fn latest_update(conn: &Connection) -> Result<Option<String>> {
    conn.query_row("SELECT MAX(updated_at) FROM shots", [], |row| {
        row.get::<_, Option<String>>(0)
    })
    .optional()
    .map(Option::flatten)
    .context("query latest shot update")
}

// rusqlite connections are Send but not Sync.
pub struct SqliteShotSource {
    conn: Mutex<Connection>,
}

impl SqliteShotSource {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn upsert(&self, shots: &[StoredShot]) -> Result<usize> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("shot store lock poisoned"))?;
        upsert_shots(&mut conn, shots)
    }
}

impl ShotSource for SqliteShotSource {
    fn shots(&self, filter: &ShotFilter) -> Result<Vec<StoredShot>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("shot store lock poisoned"))?;
        load_shots(&conn, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(shot_id: u64, match_id: u64, team_id: u32, player_id: u32) -> StoredShot {
        StoredShot {
            shot_id,
            match_id,
            team_id,
            player_id,
            minute: Some((shot_id % 90 * 7 % 90) as u16),
            shot: ShotEvent::new(80.0, 45.0),
        }
    }

    #[test]
    fn upsert_replaces_by_shot_id() {
        let mut conn = open_in_memory().unwrap();
        upsert_shots(&mut conn, &[stored(1, 1, 10, 7)]).unwrap();

        let mut changed = stored(1, 1, 10, 7);
        changed.shot.shot_outcome = Some(ShotOutcome::Goal);
        changed.shot.is_header = true;
        upsert_shots(&mut conn, &[changed.clone()]).unwrap();

        let rows = load_shots(&conn, &ShotFilter::default()).unwrap();
        assert_eq!(rows, vec![changed]);
        assert!(latest_update(&conn).unwrap().is_some());
    }

    #[test]
    fn load_applies_filters() {
        let mut conn = open_in_memory().unwrap();
        upsert_shots(
            &mut conn,
            &[
                stored(1, 1, 10, 7),
                stored(2, 1, 20, 8),
                stored(3, 2, 10, 7),
                stored(4, 2, 10, 9),
            ],
        )
        .unwrap();
        assert_eq!(load_shots(&conn, &ShotFilter::for_player(7)).unwrap().len(), 2);
        assert_eq!(load_shots(&conn, &ShotFilter::for_team(10)).unwrap().len(), 3);
        assert_eq!(load_shots(&conn, &ShotFilter::for_match(1)).unwrap().len(), 2);
        let both = ShotFilter {
            team_id: Some(10),
            match_id: Some(2),
            ..ShotFilter::default()
        };
        assert_eq!(load_shots(&conn, &both).unwrap().len(), 2);
    }

    #[test]
    fn unknown_outcome_tags_survive_storage() {
        let mut conn = open_in_memory().unwrap();
        let mut shot = stored(5, 3, 10, 7);
        shot.shot.shot_outcome = Some(ShotOutcome::Other("hit_woodwork".to_string()));
        upsert_shots(&mut conn, &[shot]).unwrap();
        let rows = load_shots(&conn, &ShotFilter::for_match(3)).unwrap();
        assert_eq!(
            rows[0].shot.shot_outcome,
            Some(ShotOutcome::Other("hit_woodwork".to_string()))
        );
    }

    #[test]
    fn ids_beyond_sqlite_range_are_rejected() {
        let mut conn = open_in_memory().unwrap();
        let err = upsert_shots(&mut conn, &[stored(u64::MAX, 1, 10, 7)]).unwrap_err();
        assert!(format!("{err:#}").contains("exceeds sqlite integer range"));
        assert!(load_shots(&conn, &ShotFilter::default()).unwrap().is_empty());

        let err = load_shots(&conn, &ShotFilter::for_match(u64::MAX)).unwrap_err();
        assert!(format!("{err:#}").contains("match id"));

        let top = i64::MAX as u64;
        upsert_shots(&mut conn, &[stored(top, top, 10, 7)]).unwrap();
        let rows = load_shots(&conn, &ShotFilter::for_match(top)).unwrap();
        assert_eq!(rows[0].shot_id, top);
    }

    #[test]
    fn open_db_reports_unwritable_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let err = open_db(&blocker.join("shots.sqlite")).unwrap_err();
        assert!(format!("{err:#}").contains(&format!("create {}", blocker.display())));
    }

    #[test]
    fn empty_table_has_no_latest_update() {
        let conn = open_in_memory().unwrap();
        assert_eq!(latest_update(&conn).unwrap(), None);
    }
}
