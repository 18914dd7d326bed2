/// Stage layout names
pub const DANCE_SINGLE: &str = "dance-single";
pub const DANCE_DOUBLE: &str = "dance-double";

/// Override keys are beats quantized to 1/1000 of a beat
pub const BEAT_KEY_SCALE: f64 = 1000.0;

/// Hold end within this many beats of a row counts as a tail on that row
pub const HOLD_TAIL_EPSILON: f64 = 0.0005;

/// Heel and toe of one foot can share two panels up to this squared distance
pub const MAX_BRACKET_DISTANCE_SQ: f64 = 2.0;

/// Cost model thresholds [s]
pub const FOOTSWITCH_THRESHOLD_S: f64 = 0.25; // 8th note at 120 BPM
pub const FAST_JACK_THRESHOLD_S: f64 = 0.1;
pub const MIN_ELAPSED_S: f64 = 1e-6;

/// Facing penalty shape
pub const FACING_EXPONENT: f64 = 1.8;
pub const FACING_SCALE: f64 = 100.0;

/// Fixed penalty for moving a foot while the other one never touched the pad
pub const LONE_FOOT_PENALTY: f64 = 500.0;

/// Expected headers in chart CSV files
pub const EXPECTED_CHART_HEADERS: [&str; 5] = ["Beat", "Second", "Column", "Type", "Hold"];
pub const OPTIONAL_FAKE_HEADER: &str = "Fake";

/// Export defaults
pub const DEFAULT_OUTPUT_DIR: &str = "parity";
