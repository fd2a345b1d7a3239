//! Segment fixtures
//!
//! [`BagWriter`] produces rosbag2 `.db3` files with the same table layout a
//! recorder writes, so readers can be exercised against real SQLite files.

use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;

const SCHEMA_SQL: &str = "
    CREATE TABLE schema(schema_version INTEGER PRIMARY KEY, ros_distro TEXT NOT NULL);
    INSERT INTO schema(schema_version, ros_distro) VALUES (3, 'humble');
    CREATE TABLE topics(
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        serialization_format TEXT NOT NULL,
        offered_qos_profiles TEXT NOT NULL
    );
    CREATE TABLE messages(
        id INTEGER PRIMARY KEY,
        topic_id INTEGER NOT NULL,
        timestamp INTEGER NOT NULL,
        data BLOB NOT NULL
    );
    CREATE INDEX timestamp_idx ON messages (timestamp ASC);
";

const DEFINITIONS_SQL: &str = "
    CREATE TABLE IF NOT EXISTS message_definitions(
        id INTEGER PRIMARY KEY,
        topic_type TEXT NOT NULL,
        encoding TEXT NOT NULL,
        encoded_message_definition TEXT NOT NULL,
        type_description_hash TEXT NOT NULL
    );
";

/// Writes a single rosbag2 segment.
pub struct BagWriter {
    conn: Connection,
    topic_ids: HashMap<String, i64>,
}

impl BagWriter {
    /// Create a new segment file with the rosbag2 tables.
    pub fn create(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(BagWriter {
            conn,
            topic_ids: HashMap::new(),
        })
    }

    /// Declare a topic; returns its segment-local id.
    pub fn add_topic(
        &mut self,
        name: &str,
        type_name: &str,
        serialization_format: &str,
    ) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO topics(name, type, serialization_format, offered_qos_profiles) \
             VALUES (?1, ?2, ?3, '')",
            params![name, type_name, serialization_format],
        )?;
        let id = self.conn.last_insert_rowid();
        self.topic_ids.insert(name.to_string(), id);
        Ok(id)
    }

    /// Embed a message definition (creates the table on first use).
    pub fn add_message_definition(
        &mut self,
        type_name: &str,
        encoding: &str,
        text: &str,
    ) -> rusqlite::Result<()> {
        self.conn.execute_batch(DEFINITIONS_SQL)?;
        self.conn.execute(
            "INSERT INTO message_definitions(topic_type, encoding, encoded_message_definition, \
             type_description_hash) VALUES (?1, ?2, ?3, '')",
            params![type_name, encoding, text],
        )?;
        Ok(())
    }

    /// Append one message to a declared topic.
    pub fn write(&mut self, topic: &str, timestamp: i64, data: &[u8]) -> rusqlite::Result<()> {
        let topic_id = self
            .topic_ids
            .get(topic)
            .copied()
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        self.conn.execute(
            "INSERT INTO messages(topic_id, timestamp, data) VALUES (?1, ?2, ?3)",
            params![topic_id, timestamp, data],
        )?;
        Ok(())
    }

    /// Close the database, flushing everything to disk.
    pub fn finish(self) -> rusqlite::Result<()> {
        self.conn.close().map_err(|(_, e)| e)
    }
}
