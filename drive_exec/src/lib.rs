//! # Drive library.
//!
//! Control and state estimation for a differential drive robot. The
//! executable and the benchmarks access the modules through this library.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Controller - runs the control pipeline and provides access to it from other threads
pub mod controller;

/// Drive control module - converts body velocity commands into motor duty cycles
pub mod drive_ctrl;

/// Lowpass filter for the measured wheel speeds
pub mod filter;

/// Sensor fusion module - tilt angle from the accelerometer and gyro
pub mod fusion;

/// Hardware abstraction - encoder counters, motor outputs and the IMU
pub mod hal;

/// Kinematic model of the differential drive
pub mod kinematics;

/// Localisation module - odometry and the pose EKF
pub mod loc;

/// Trapezoidal motion profiles
pub mod motion;

/// Executable parameters
pub mod params;

/// Two dimensional points
pub mod point;

/// Fixed period execution on a dedicated thread
pub mod scheduler;

/// Simulated drive train
pub mod sim;

/// Tasks and the task sequencer
pub mod task;
