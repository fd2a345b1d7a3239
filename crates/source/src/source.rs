//! rosbag2 log source
//!
//! [`LogSource`] opens every segment of one recording as a single logical
//! log. Lifecycle:
//!
//! 1. `new` records the segment paths, nothing is opened
//! 2. `initialize` opens segments, resolves schemas, returns metadata and
//!    accumulated problems
//! 3. `message_iterator` / `backfill_messages` read from the opened log
//! 4. `close` (or drop) releases the handle
//!
//! Segment files that fail to open are reported as problems as long as at
//! least one other segment opens.

use crate::config::SourceConfig;
use crate::error::{SourceError, SourceResult};
use crate::handle::LogHandle;
use crate::iterator::MessageIterator;
use crate::segment::Segment;
use crate::stream::MessageStream;
use logstream_core::{MessageEvent, Problem, Timestamp, Topic, TopicStats};
use logstream_schema::{resolve, well_known, SchemaError, TypeRegistry, ROS2_MSG_ENCODING};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Profile reported for rosbag2 logs.
pub const ROS2_PROFILE: &str = "ros2";

const UNSUPPORTED_TYPE_TIP: &str = "ROS 2 .db3 files written without embedded message \
    definitions only support well-known ROS types. Re-record with a newer rosbag2 or convert \
    the recording to a format that stores definitions.";

/// Result of a successful `initialize`.
#[derive(Debug, Clone)]
pub struct Initialization {
    /// All topics, with schema when it could be resolved
    pub topics: Vec<Topic>,
    /// Message counts for topics that have messages
    pub topic_stats: BTreeMap<String, TopicStats>,
    /// First receive time
    pub start: Timestamp,
    /// Last receive time (inclusive)
    pub end: Timestamp,
    /// Non-fatal problems found while opening
    pub problems: Vec<Problem>,
    /// Format-identifying profile
    pub profile: String,
    /// Every type definition known for this log
    pub datatypes: Arc<TypeRegistry>,
}

/// Arguments for [`LogSource::message_iterator`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageIteratorArgs {
    /// Topics to include; empty means no messages
    pub topics: BTreeSet<String>,
    /// Inclusive start, defaults to the log start
    pub start: Option<Timestamp>,
    /// Inclusive end, defaults to the log end
    pub end: Option<Timestamp>,
}

impl MessageIteratorArgs {
    /// Iterate the full log for `topics`.
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MessageIteratorArgs {
            topics: topics.into_iter().map(Into::into).collect(),
            start: None,
            end: None,
        }
    }

    /// Restrict to `[start, end]` (builder pattern).
    pub fn between(mut self, start: Timestamp, end: Timestamp) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Set only the inclusive start (builder pattern).
    pub fn starting_at(mut self, start: Timestamp) -> Self {
        self.start = Some(start);
        self
    }
}

/// A logical log made of one or more `.db3` segments.
#[derive(Debug)]
pub struct LogSource {
    paths: Vec<PathBuf>,
    config: SourceConfig,
    handle: Option<Arc<LogHandle>>,
}

impl LogSource {
    /// Source over `paths` with the default configuration.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_config(paths, SourceConfig::default())
    }

    /// Source over `paths` with an explicit configuration.
    pub fn with_config<I, P>(paths: I, config: SourceConfig) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        LogSource {
            paths: paths.into_iter().map(Into::into).collect(),
            config,
            handle: None,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// The opened log, once initialized.
    pub fn handle(&self) -> Option<&LogHandle> {
        self.handle.as_deref()
    }

    /// Open all segments and gather metadata.
    ///
    /// # Errors
    ///
    /// Fails when no paths were given, when no segment opens, when the log
    /// has no messages, or when a well-known definition is inconsistent.
    pub fn initialize(&mut self) -> SourceResult<Initialization> {
        if self.handle.is_some() {
            return Err(SourceError::AlreadyInitialized);
        }
        if self.paths.is_empty() {
            return Err(SourceError::NoSegments);
        }
        self.config.validate()?;

        let mut problems = Vec::new();
        let (segments, first_error) = self.open_segments(&mut problems);
        if segments.is_empty() {
            return Err(SourceError::NoReadableSegments {
                attempted: self.paths.len(),
                first_error: first_error.unwrap_or_default(),
            });
        }

        let mut start: Option<Timestamp> = None;
        let mut end: Option<Timestamp> = None;
        for (seg_start, seg_end) in segments.iter().filter_map(|s| s.time_range()) {
            start = Some(start.map_or(seg_start, |t| t.min(seg_start)));
            end = Some(end.map_or(seg_end, |t| t.max(seg_end)));
        }

        let mut topic_stats: BTreeMap<String, TopicStats> = BTreeMap::new();
        for segment in &segments {
            for topic in segment.topics() {
                let count = segment.message_count(topic.id);
                if count > 0 {
                    topic_stats
                        .entry(topic.name.clone())
                        .or_insert(TopicStats { num_messages: 0 })
                        .num_messages += count;
                }
            }
        }
        let total: u64 = topic_stats.values().map(|s| s.num_messages).sum();
        let (Some(start), Some(end)) = (start, end) else {
            return Err(SourceError::NoMessages);
        };
        if total == 0 {
            return Err(SourceError::NoMessages);
        }

        let mut datatypes = well_known().clone();
        let topics = collect_topics(&segments, &mut datatypes, &mut problems)?;

        tracing::info!(
            segments = segments.len(),
            topics = topics.len(),
            messages = total,
            start = %start,
            end = %end,
            problems = problems.len(),
            "Initialized log source"
        );

        self.handle = Some(Arc::new(LogHandle {
            segments,
            start,
            end,
            topics: topics.clone(),
            topic_stats: topic_stats.clone(),
        }));

        Ok(Initialization {
            topics,
            topic_stats,
            start,
            end,
            problems,
            profile: ROS2_PROFILE.to_string(),
            datatypes: Arc::new(datatypes),
        })
    }

    fn open_segments(&self, problems: &mut Vec<Problem>) -> (Vec<Arc<Segment>>, Option<String>) {
        let mut segments = Vec::with_capacity(self.paths.len());
        let mut first_error = None;
        for path in &self.paths {
            match Segment::open(path) {
                Ok(segment) => segments.push(Arc::new(segment)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable segment");
                    problems.push(
                        Problem::error(format!("Failed to open segment {}: {}", path.display(), e))
                            .with_tip("The file may be truncated or not a rosbag2 .db3 file."),
                    );
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        (segments, first_error)
    }

    /// Time-ordered messages for `args.topics` within the inclusive window.
    ///
    /// An empty topic set yields an empty iterator without touching any
    /// segment.
    pub fn message_iterator(&self, args: &MessageIteratorArgs) -> SourceResult<MessageIterator> {
        let handle = self.handle.as_ref().ok_or(SourceError::NotInitialized)?;
        if args.topics.is_empty() {
            return Ok(MessageIterator::empty());
        }
        let topics: Vec<String> = args.topics.iter().cloned().collect();
        let start = args.start.unwrap_or(handle.start);
        let end = args.end.unwrap_or(handle.end);
        Ok(MessageIterator::new(
            &handle.segments,
            &topics,
            start,
            end,
            self.config.page_size,
        ))
    }

    /// [`Self::message_iterator`] consumed from async code.
    ///
    /// Must be called from within a tokio runtime.
    pub fn message_stream(&self, args: &MessageIteratorArgs) -> SourceResult<MessageStream> {
        let iterator = self.message_iterator(args)?;
        Ok(iterator.into_stream(self.config.stream_capacity))
    }

    /// The latest message at or before `time` for each topic.
    ///
    /// Topics with no such message are omitted. Results are ordered by
    /// receive time, then topic name.
    pub fn backfill_messages(
        &self,
        topics: &BTreeSet<String>,
        time: Timestamp,
    ) -> SourceResult<Vec<MessageEvent>> {
        let handle = self.handle.as_ref().ok_or(SourceError::NotInitialized)?;
        let at = time.as_segment_nanos();

        let mut out = Vec::new();
        for name in topics {
            // (timestamp, segment index, row id) of the best match so far
            let mut best: Option<((i64, usize, i64), Vec<u8>, String)> = None;
            for (index, segment) in handle.segments.iter().enumerate() {
                let Some(topic) = segment.topic_by_name(name) else {
                    continue;
                };
                if let Some(row) = segment.latest_at_or_before(topic.id, at)? {
                    let key = (row.timestamp, index, row.id);
                    if best.as_ref().map_or(true, |(k, _, _)| key > *k) {
                        best = Some((key, row.data, topic.type_name.clone()));
                    }
                }
            }
            if let Some(((timestamp, _, _), data, schema_name)) = best {
                out.push(MessageEvent::new(
                    name.clone(),
                    Timestamp::from_segment_nanos(timestamp),
                    data,
                    schema_name,
                ));
            }
        }
        out.sort_by(|a, b| {
            a.receive_time
                .cmp(&b.receive_time)
                .then_with(|| a.topic.cmp(&b.topic))
        });
        Ok(out)
    }

    /// Release the opened log.
    ///
    /// Iterators created earlier keep their own segment references until
    /// they are dropped or closed.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            tracing::debug!("Closed log source");
        }
    }
}

/// Union of segment topics by name, each with a schema where possible.
fn collect_topics(
    segments: &[Arc<Segment>],
    datatypes: &mut TypeRegistry,
    problems: &mut Vec<Problem>,
) -> SourceResult<Vec<Topic>> {
    let mut topics: Vec<Topic> = Vec::new();
    for segment in segments {
        for declared in segment.topics() {
            if let Some(existing) = topics.iter().find(|t| t.name == declared.name) {
                if existing.schema_name != declared.type_name {
                    problems.push(Problem::warn(format!(
                        "Topic \"{}\" has type \"{}\" in {} but \"{}\" in an earlier segment",
                        declared.name,
                        declared.type_name,
                        segment.path().display(),
                        existing.schema_name
                    )));
                }
                continue;
            }

            let mut topic = Topic::new(
                declared.name.clone(),
                declared.type_name.clone(),
                declared.serialization_format.clone(),
            );

            if let Some(embedded) = segments
                .iter()
                .find_map(|s| s.embedded_definition(&declared.type_name))
            {
                if embedded.encoding == ROS2_MSG_ENCODING {
                    match TypeRegistry::from_document(&declared.type_name, &embedded.text) {
                        Ok(parsed) => datatypes.extend(parsed),
                        Err(e) => problems.push(Problem::warn(format!(
                            "Embedded definition of \"{}\" could not be parsed: {}",
                            declared.type_name, e
                        ))),
                    }
                }
                topic.schema_data = Some(embedded.text.clone().into_bytes());
                topic.schema_encoding = Some(embedded.encoding.clone());
                topics.push(topic);
                continue;
            }

            match resolve(&declared.type_name, well_known()) {
                Ok(closure) => {
                    topic.schema_data = Some(closure.to_schema_bytes());
                    topic.schema_encoding = Some(ROS2_MSG_ENCODING.to_string());
                }
                Err(SchemaError::UnknownType(_)) => {
                    tracing::warn!(
                        topic = %declared.name,
                        type_name = %declared.type_name,
                        "Topic has unsupported datatype"
                    );
                    problems.push(
                        Problem::warn(format!(
                            "Topic \"{}\" has unsupported datatype \"{}\"",
                            declared.name, declared.type_name
                        ))
                        .with_tip(UNSUPPORTED_TYPE_TIP),
                    );
                }
                Err(e) => return Err(e.into()),
            }
            topics.push(topic);
        }
    }
    Ok(topics)
}
