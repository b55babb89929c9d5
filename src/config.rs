// Car body and spawn
pub const START_POSITION: [f32; 3] = [-25.0, 3.0, 0.0];
pub const CAR_HALF_EXTENTS: [f32; 3] = [0.3, 0.15, 0.6];
pub const CAR_MASS: f32 = 1.0;
pub const CAR_LINEAR_DAMPING: f32 = 0.5;
pub const CAR_ANGULAR_DAMPING: f32 = 0.5;

// Gameplay thresholds
pub const FALL_Y: f32 = -2.0;
pub const FINISH_X: f32 = 24.0;
pub const FINISH_MIN_Y: f32 = -1.0;

// Throttle: impulse = (0.5 + intensity) * IMPULSE_GAIN, so a shout at the
// intensity ceiling (0.5) doubles the silent baseline.
pub const IMPULSE_GAIN: f32 = 0.04;
pub const FORWARD_FACTOR: f32 = 1.4;
pub const TORQUE_TRIM: f32 = 0.01;

// Track: 101 spline samples over x in [-25, 25], two gentle S-curves wide 6.
pub const TRACK_SEGMENTS: usize = 100;
pub const TRACK_LENGTH_X: f32 = 50.0;
pub const TRACK_WAVE_AMPLITUDE: f32 = 6.0;
pub const TRACK_Y: f32 = 1.0;
pub const TRACK_HALF_WIDTH: f32 = 1.0;
pub const TRACK_HALF_THICKNESS: f32 = 0.15;

// Obstacles
pub const LATERAL_SWAY: f32 = 1.5;
pub const LATERAL_RAISE: f32 = 1.5;
pub const VERTICAL_BASE_HEIGHT: f32 = 1.5;
pub const VERTICAL_TRAVEL: f32 = 2.0;
pub const LATERAL_OBSTACLE_HALF: [f32; 3] = [0.35, 0.35, 0.35];
pub const VERTICAL_OBSTACLE_HALF: [f32; 3] = [0.5, 0.25, 0.5];

// Voice intensity
pub const CALIBRATION_MS: u64 = 2000;
pub const BASELINE_SMOOTHING: f32 = 0.9;
pub const ANALYSIS_MID_SCALE: f32 = 128.0;
pub const INTENSITY_HEADROOM: f32 = 0.5;
pub const FFT_SIZE: usize = 512;
pub const SPECTRUM_SMOOTHING: f32 = 0.8;

// Chase camera
pub const CAMERA_OFFSET: [f32; 3] = [0.0, 2.0, -5.0];
pub const CAMERA_LERP: f32 = 0.1;
pub const CAMERA_POLL_MS: u64 = 100;
pub const CAMERA_START_POSITION: [f32; 3] = [5.0, 3.0, -3.0];

// Race lifecycle
pub const FINISH_DISPLAY_SECONDS: u64 = 10;

// Frame timing
pub const MAX_FRAME_DT: f32 = 0.1;
