//! Well-known ROS 2 message definitions
//!
//! rosbag2 `.db3` segments written before message definitions were embedded
//! only record type names. Topics of these common types can still be parsed
//! by resolving them against this table.

use crate::parser::parse_definition;
use crate::registry::TypeRegistry;
use once_cell::sync::Lazy;

/// `(type name, .msg body)` for every well-known type.
pub const WELL_KNOWN_DEFINITIONS: &[(&str, &str)] = &[
    (
        "builtin_interfaces/msg/Time",
        "int32 sec\n\
         uint32 nanosec",
    ),
    (
        "builtin_interfaces/msg/Duration",
        "int32 sec\n\
         uint32 nanosec",
    ),
    (
        "std_msgs/msg/Header",
        "builtin_interfaces/Time stamp\n\
         string frame_id",
    ),
    ("std_msgs/msg/Empty", ""),
    ("std_msgs/msg/Bool", "bool data"),
    ("std_msgs/msg/String", "string data"),
    ("std_msgs/msg/Int32", "int32 data"),
    ("std_msgs/msg/Int64", "int64 data"),
    ("std_msgs/msg/Float32", "float32 data"),
    ("std_msgs/msg/Float64", "float64 data"),
    (
        "std_msgs/msg/ColorRGBA",
        "float32 r\n\
         float32 g\n\
         float32 b\n\
         float32 a",
    ),
    (
        "geometry_msgs/msg/Point",
        "float64 x\n\
         float64 y\n\
         float64 z",
    ),
    (
        "geometry_msgs/msg/Point32",
        "float32 x\n\
         float32 y\n\
         float32 z",
    ),
    (
        "geometry_msgs/msg/Vector3",
        "float64 x\n\
         float64 y\n\
         float64 z",
    ),
    (
        "geometry_msgs/msg/Quaternion",
        "float64 x 0\n\
         float64 y 0\n\
         float64 z 0\n\
         float64 w 1",
    ),
    ("geometry_msgs/msg/Polygon", "Point32[] points"),
    (
        "geometry_msgs/msg/Pose",
        "Point position\n\
         Quaternion orientation",
    ),
    (
        "geometry_msgs/msg/PoseStamped",
        "std_msgs/Header header\n\
         Pose pose",
    ),
    (
        "geometry_msgs/msg/PoseWithCovariance",
        "Pose pose\n\
         float64[36] covariance",
    ),
    (
        "geometry_msgs/msg/PoseWithCovarianceStamped",
        "std_msgs/Header header\n\
         PoseWithCovariance pose",
    ),
    (
        "geometry_msgs/msg/Transform",
        "Vector3 translation\n\
         Quaternion rotation",
    ),
    (
        "geometry_msgs/msg/TransformStamped",
        "std_msgs/Header header\n\
         string child_frame_id\n\
         Transform transform",
    ),
    (
        "geometry_msgs/msg/Twist",
        "Vector3 linear\n\
         Vector3 angular",
    ),
    (
        "geometry_msgs/msg/TwistStamped",
        "std_msgs/Header header\n\
         Twist twist",
    ),
    (
        "geometry_msgs/msg/TwistWithCovariance",
        "Twist twist\n\
         float64[36] covariance",
    ),
    (
        "geometry_msgs/msg/Accel",
        "Vector3 linear\n\
         Vector3 angular",
    ),
    (
        "sensor_msgs/msg/Image",
        "std_msgs/Header header\n\
         uint32 height\n\
         uint32 width\n\
         string encoding\n\
         uint8 is_bigendian\n\
         uint32 step\n\
         uint8[] data",
    ),
    (
        "sensor_msgs/msg/CompressedImage",
        "std_msgs/Header header\n\
         string format\n\
         uint8[] data",
    ),
    (
        "sensor_msgs/msg/RegionOfInterest",
        "uint32 x_offset\n\
         uint32 y_offset\n\
         uint32 height\n\
         uint32 width\n\
         bool do_rectify",
    ),
    (
        "sensor_msgs/msg/CameraInfo",
        "std_msgs/Header header\n\
         uint32 height\n\
         uint32 width\n\
         string distortion_model\n\
         float64[] d\n\
         float64[9] k\n\
         float64[9] r\n\
         float64[12] p\n\
         uint32 binning_x\n\
         uint32 binning_y\n\
         RegionOfInterest roi",
    ),
    (
        "sensor_msgs/msg/PointField",
        "uint8 INT8=1\n\
         uint8 UINT8=2\n\
         uint8 INT16=3\n\
         uint8 UINT16=4\n\
         uint8 INT32=5\n\
         uint8 UINT32=6\n\
         uint8 FLOAT32=7\n\
         uint8 FLOAT64=8\n\
         string name\n\
         uint32 offset\n\
         uint8 datatype\n\
         uint32 count",
    ),
    (
        "sensor_msgs/msg/PointCloud2",
        "std_msgs/Header header\n\
         uint32 height\n\
         uint32 width\n\
         PointField[] fields\n\
         bool is_bigendian\n\
         uint32 point_step\n\
         uint32 row_step\n\
         uint8[] data\n\
         bool is_dense",
    ),
    (
        "sensor_msgs/msg/Imu",
        "std_msgs/Header header\n\
         geometry_msgs/Quaternion orientation\n\
         float64[9] orientation_covariance\n\
         geometry_msgs/Vector3 angular_velocity\n\
         float64[9] angular_velocity_covariance\n\
         geometry_msgs/Vector3 linear_acceleration\n\
         float64[9] linear_acceleration_covariance",
    ),
    (
        "sensor_msgs/msg/LaserScan",
        "std_msgs/Header header\n\
         float32 angle_min\n\
         float32 angle_max\n\
         float32 angle_increment\n\
         float32 time_increment\n\
         float32 scan_time\n\
         float32 range_min\n\
         float32 range_max\n\
         float32[] ranges\n\
         float32[] intensities",
    ),
    (
        "sensor_msgs/msg/NavSatStatus",
        "int8 STATUS_NO_FIX=-1\n\
         int8 STATUS_FIX=0\n\
         int8 STATUS_SBAS_FIX=1\n\
         int8 STATUS_GBAS_FIX=2\n\
         int8 status\n\
         uint16 SERVICE_GPS=1\n\
         uint16 SERVICE_GLONASS=2\n\
         uint16 SERVICE_COMPASS=4\n\
         uint16 SERVICE_GALILEO=8\n\
         uint16 service",
    ),
    (
        "sensor_msgs/msg/NavSatFix",
        "std_msgs/Header header\n\
         NavSatStatus status\n\
         float64 latitude\n\
         float64 longitude\n\
         float64 altitude\n\
         float64[9] position_covariance\n\
         uint8 COVARIANCE_TYPE_UNKNOWN=0\n\
         uint8 COVARIANCE_TYPE_APPROXIMATED=1\n\
         uint8 COVARIANCE_TYPE_DIAGONAL_KNOWN=2\n\
         uint8 COVARIANCE_TYPE_KNOWN=3\n\
         uint8 position_covariance_type",
    ),
    (
        "sensor_msgs/msg/JointState",
        "std_msgs/Header header\n\
         string[] name\n\
         float64[] position\n\
         float64[] velocity\n\
         float64[] effort",
    ),
    (
        "nav_msgs/msg/MapMetaData",
        "builtin_interfaces/Time map_load_time\n\
         float32 resolution\n\
         uint32 width\n\
         uint32 height\n\
         geometry_msgs/Pose origin",
    ),
    (
        "nav_msgs/msg/OccupancyGrid",
        "std_msgs/Header header\n\
         MapMetaData info\n\
         int8[] data",
    ),
    (
        "nav_msgs/msg/Odometry",
        "std_msgs/Header header\n\
         string child_frame_id\n\
         geometry_msgs/PoseWithCovariance pose\n\
         geometry_msgs/TwistWithCovariance twist",
    ),
    (
        "nav_msgs/msg/Path",
        "std_msgs/Header header\n\
         geometry_msgs/PoseStamped[] poses",
    ),
    (
        "tf2_msgs/msg/TFMessage",
        "geometry_msgs/TransformStamped[] transforms",
    ),
    (
        "rcl_interfaces/msg/Log",
        "uint8 DEBUG=10\n\
         uint8 INFO=20\n\
         uint8 WARN=30\n\
         uint8 ERROR=40\n\
         uint8 FATAL=50\n\
         builtin_interfaces/Time stamp\n\
         uint8 level\n\
         string name\n\
         string msg\n\
         string file\n\
         string function\n\
         uint32 line",
    ),
    (
        "foxglove_msgs/msg/CompressedVideo",
        "builtin_interfaces/Time timestamp\n\
         string frame_id\n\
         uint8[] data\n\
         string format",
    ),
];

static WELL_KNOWN: Lazy<TypeRegistry> = Lazy::new(|| {
    let mut registry = TypeRegistry::new();
    for (name, text) in WELL_KNOWN_DEFINITIONS {
        match parse_definition(name, text) {
            Ok(definition) => registry.insert(definition),
            Err(e) => tracing::error!(type_name = %name, error = %e, "Skipping well-known type"),
        }
    }
    registry
});

/// Registry of well-known ROS 2 types, built on first use.
pub fn well_known() -> &'static TypeRegistry {
    &WELL_KNOWN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;

    #[test]
    fn test_every_definition_parses() {
        assert_eq!(well_known().len(), WELL_KNOWN_DEFINITIONS.len());
    }

    #[test]
    fn test_every_definition_resolves() {
        for (name, _) in WELL_KNOWN_DEFINITIONS {
            let closure = resolve(name, well_known());
            assert!(closure.is_ok(), "{} failed: {:?}", name, closure.err());
        }
    }

    #[test]
    fn test_image_closure() {
        let closure = resolve("sensor_msgs/msg/Image", well_known()).unwrap();
        let names: Vec<_> = closure.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "sensor_msgs/msg/Image",
                "std_msgs/msg/Header",
                "builtin_interfaces/msg/Time"
            ]
        );
    }

    #[test]
    fn test_tf_closure_dedupes_vector_types() {
        let closure = resolve("tf2_msgs/msg/TFMessage", well_known()).unwrap();
        assert!(closure.contains("geometry_msgs/msg/Vector3"));
        assert!(closure.contains("geometry_msgs/msg/Quaternion"));
        let count = closure
            .iter()
            .filter(|d| d.name == "builtin_interfaces/msg/Time")
            .count();
        assert_eq!(count, 1);
    }
}
