//! Iterating a multi-segment recording and decoding its images.

use crate::common::{ms, TestLog};
use logstream::{
    decode_raw, IteratorItem, LogSource, MessageIteratorArgs, RawImage, RawImageOptions,
    SourceConfig, Timestamp,
};

fn camera_log() -> TestLog {
    let topics = [
        ("/camera/mono", "sensor_msgs/msg/Image"),
        ("/odom", "nav_msgs/msg/Odometry"),
    ];
    TestLog::new(
        &topics,
        &[
            vec![
                ("/camera/mono", ms(0), vec![0, 64, 128, 255]),
                ("/odom", ms(10), vec![1]),
                ("/camera/mono", ms(100), vec![1, 2, 3, 4]),
            ],
            vec![
                ("/odom", ms(50), vec![2]),
                ("/camera/mono", ms(200), vec![9, 9, 9, 9]),
            ],
        ],
    )
}

#[test]
fn test_iterate_and_decode_camera_topic() {
    let log = camera_log();
    let mut source = LogSource::with_config(log.paths.clone(), SourceConfig::for_testing());
    let init = source.initialize().unwrap();
    assert!(init.problems.is_empty());
    assert_eq!(init.topic_stats["/camera/mono"].num_messages, 3);

    let mut decoded = Vec::new();
    for item in source
        .message_iterator(&MessageIteratorArgs::new(["/camera/mono"]))
        .unwrap()
    {
        let event = item.into_message().unwrap();
        let image = RawImage::new(2, 2, "mono8", &event.message);
        decoded.push(decode_raw(&image, &RawImageOptions::default()).unwrap());
    }
    assert_eq!(decoded.len(), 3);
    assert_eq!(&decoded[0].data()[4..8], &[64, 64, 64, 255]);
    assert_eq!(&decoded[2].data()[..4], &[9, 9, 9, 255]);
}

#[test]
fn test_seek_window_and_backfill() {
    let log = camera_log();
    let mut source = LogSource::new(log.paths.clone());
    source.initialize().unwrap();

    let seek = Timestamp::from_millis(60);
    let topics = ["/camera/mono".to_string(), "/odom".to_string()]
        .into_iter()
        .collect();
    let backfill = source.backfill_messages(&topics, seek).unwrap();
    let seeded: Vec<(&str, u64)> = backfill
        .iter()
        .map(|e| (e.topic.as_str(), e.receive_time.as_nanos() / 1_000_000))
        .collect();
    assert_eq!(seeded, vec![("/camera/mono", 0), ("/odom", 50)]);

    let args = MessageIteratorArgs::new(["/camera/mono", "/odom"])
        .between(seek, Timestamp::from_millis(200));
    let times: Vec<u64> = source
        .message_iterator(&args)
        .unwrap()
        .filter_map(IteratorItem::into_message)
        .map(|e| e.receive_time.as_nanos() / 1_000_000)
        .collect();
    assert_eq!(times, vec![100, 200]);
}

#[tokio::test]
async fn test_stream_from_async_consumer() {
    let log = camera_log();
    let mut source = LogSource::with_config(log.paths.clone(), SourceConfig::for_testing());
    source.initialize().unwrap();

    let mut stream = source
        .message_stream(&MessageIteratorArgs::new(["/odom"]))
        .unwrap();
    let mut payloads = Vec::new();
    while let Some(item) = stream.next().await {
        payloads.push(item.into_message().unwrap().message.to_vec());
    }
    assert_eq!(payloads, vec![vec![1], vec![2]]);
}
