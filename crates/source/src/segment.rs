//! One rosbag2 `.db3` segment
//!
//! A segment is a SQLite database with a `topics` table and a `messages`
//! table. Newer recorders also write a `message_definitions` table holding
//! the full definition of every recorded type.
//!
//! ```text
//! topics(id, name, type, serialization_format, offered_qos_profiles)
//! messages(id, topic_id, timestamp, data)            timestamp: i64 ns
//! message_definitions(topic_type, encoding, encoded_message_definition, ...)
//! ```
//!
//! The connection is guarded by a mutex and locked only for the duration of
//! a single query, so no statement outlives the call that prepared it.

use crate::error::{SourceError, SourceResult};
use logstream_core::Timestamp;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A topic as declared in one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTopic {
    /// Row id, only meaningful within this segment
    pub id: i64,
    /// Topic name
    pub name: String,
    /// Declared type name
    pub type_name: String,
    /// Serialization format of payloads
    pub serialization_format: String,
}

/// A message definition embedded in the segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedDefinition {
    /// Definition encoding (`ros2msg`, `ros2idl`)
    pub encoding: String,
    /// Full definition text including dependencies
    pub text: String,
}

/// A raw `messages` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    /// Row id
    pub id: i64,
    /// Segment-local topic id
    pub topic_id: i64,
    /// Receive time in signed nanoseconds
    pub timestamp: i64,
    /// Payload
    pub data: Vec<u8>,
}

/// An opened, read-only segment.
#[derive(Debug)]
pub struct Segment {
    path: PathBuf,
    conn: Mutex<Connection>,
    topics: Vec<SegmentTopic>,
    definitions: HashMap<String, EmbeddedDefinition>,
    time_range: Option<(Timestamp, Timestamp)>,
    message_counts: HashMap<i64, u64>,
}

impl Segment {
    /// Open a segment and read its metadata.
    ///
    /// Fails if the file cannot be opened or is not a rosbag2 database.
    pub fn open(path: &Path) -> SourceResult<Segment> {
        let err = segment_error(path);
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(&err)?;

        let topics = read_topics(&conn).map_err(&err)?;
        let definitions = read_definitions(&conn).map_err(&err)?;
        let time_range = read_time_range(&conn).map_err(&err)?;
        let message_counts = read_message_counts(&conn).map_err(&err)?;

        tracing::debug!(
            path = %path.display(),
            topics = topics.len(),
            embedded_definitions = definitions.len(),
            "Opened segment"
        );

        Ok(Segment {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
            topics,
            definitions,
            time_range,
            message_counts,
        })
    }

    /// Segment file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Topics declared by this segment, in id order.
    pub fn topics(&self) -> &[SegmentTopic] {
        &self.topics
    }

    /// Segment-local id of a topic.
    pub fn topic_by_name(&self, name: &str) -> Option<&SegmentTopic> {
        self.topics.iter().find(|t| t.name == name)
    }

    /// Embedded definition for a type, if the segment carries one.
    pub fn embedded_definition(&self, type_name: &str) -> Option<&EmbeddedDefinition> {
        self.definitions
            .get(type_name)
            .filter(|def| !def.text.trim().is_empty())
    }

    /// First and last receive time, `None` when the segment is empty.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        self.time_range
    }

    /// Number of messages recorded for a segment-local topic id.
    pub fn message_count(&self, topic_id: i64) -> u64 {
        self.message_counts.get(&topic_id).copied().unwrap_or(0)
    }

    /// Read up to `limit` rows ordered by `(timestamp, id)`.
    ///
    /// Only rows strictly after `after` (as a `(timestamp, id)` pair) and
    /// with `timestamp < end_exclusive` are returned. `topic_ids` must not be
    /// empty.
    pub fn read_page(
        &self,
        topic_ids: &[i64],
        after: (i64, i64),
        end_exclusive: i64,
        limit: usize,
    ) -> SourceResult<Vec<MessageRow>> {
        let id_list = topic_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            "SELECT id, topic_id, timestamp, data FROM messages \
             WHERE topic_id IN ({}) AND timestamp < ?1 \
             AND (timestamp > ?2 OR (timestamp = ?2 AND id > ?3)) \
             ORDER BY timestamp, id LIMIT ?4",
            id_list
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let conn = self.conn.lock();
        let query = || -> rusqlite::Result<Vec<MessageRow>> {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![end_exclusive, after.0, after.1, limit], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    topic_id: row.get(1)?,
                    timestamp: row.get(2)?,
                    data: row.get(3)?,
                })
            })?;
            rows.collect()
        };
        query().map_err(segment_error(&self.path))
    }

    /// Latest row for a topic with `timestamp <= at`.
    pub fn latest_at_or_before(&self, topic_id: i64, at: i64) -> SourceResult<Option<MessageRow>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, topic_id, timestamp, data FROM messages \
             WHERE topic_id = ?1 AND timestamp <= ?2 \
             ORDER BY timestamp DESC, id DESC LIMIT 1",
            params![topic_id, at],
            |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    topic_id: row.get(1)?,
                    timestamp: row.get(2)?,
                    data: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(segment_error(&self.path))
    }
}

fn segment_error(path: &Path) -> impl Fn(rusqlite::Error) -> SourceError + '_ {
    move |source| SourceError::Segment {
        path: path.display().to_string(),
        source,
    }
}

fn read_topics(conn: &Connection) -> rusqlite::Result<Vec<SegmentTopic>> {
    let mut stmt =
        conn.prepare("SELECT id, name, type, serialization_format FROM topics ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(SegmentTopic {
            id: row.get(0)?,
            name: row.get(1)?,
            type_name: row.get(2)?,
            serialization_format: row.get(3)?,
        })
    })?;
    rows.collect()
}

fn read_definitions(conn: &Connection) -> rusqlite::Result<HashMap<String, EmbeddedDefinition>> {
    let has_table: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'message_definitions'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if has_table.is_none() {
        return Ok(HashMap::new());
    }

    let mut stmt = conn.prepare(
        "SELECT topic_type, encoding, encoded_message_definition FROM message_definitions",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            EmbeddedDefinition {
                encoding: row.get(1)?,
                text: row.get(2)?,
            },
        ))
    })?;
    rows.collect()
}

fn read_time_range(conn: &Connection) -> rusqlite::Result<Option<(Timestamp, Timestamp)>> {
    let (min, max): (Option<i64>, Option<i64>) = conn.query_row(
        "SELECT MIN(timestamp), MAX(timestamp) FROM messages",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(match (min, max) {
        (Some(min), Some(max)) => Some((
            Timestamp::from_segment_nanos(min),
            Timestamp::from_segment_nanos(max),
        )),
        _ => None,
    })
}

fn read_message_counts(conn: &Connection) -> rusqlite::Result<HashMap<i64, u64>> {
    let mut stmt = conn.prepare("SELECT topic_id, COUNT(*) FROM messages GROUP BY topic_id")?;
    let rows = stmt.query_map([], |row| {
        let count: i64 = row.get(1)?;
        Ok((row.get::<_, i64>(0)?, u64::try_from(count).unwrap_or(0)))
    })?;
    rows.collect()
}
