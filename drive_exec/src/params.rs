//! # Drive Executable Parameters
//!
//! Parameters for the drive executable: the behaviour loop, the beacon layout
//! and the simulated drive train it runs against.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{point::Point, sim::SimParams, task::TaskDesc};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriveExecParams {
    /// Period of the behaviour (task sequencer) loop.
    ///
    /// Units: seconds
    pub behaviour_period_s: f64,

    /// Number of behaviour cycles between two beacon scans.
    pub scan_every_num_cycles: u64,

    /// Observations further than this from every known beacon are not used.
    ///
    /// Units: meters
    pub beacon_association_threshold_m: f64,

    /// The execution is stopped after this time even if tasks remain.
    ///
    /// Units: seconds
    pub max_run_time_s: f64,

    /// Surveyed beacon positions.
    pub beacons: Vec<Point>,

    /// Tasks to run, in order.
    pub tasks: Vec<TaskDesc>,

    /// Simulated drive train.
    pub sim: SimParams,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{drive_ctrl, fusion, loc};

    #[test]
    fn test_param_files() {
        let exec: DriveExecParams =
            util::params::from_str(include_str!("../../params/drive_exec.toml")).unwrap();
        assert!(!exec.beacons.is_empty());
        assert!(!exec.tasks.is_empty());
        assert!(exec.behaviour_period_s > 0.0);

        let drive: drive_ctrl::Params =
            util::params::from_str(include_str!("../../params/drive_ctrl.toml")).unwrap();
        drive.validate().unwrap();
        assert_eq!(drive.period_s, exec.sim.period_s);

        let _: loc::Params =
            util::params::from_str(include_str!("../../params/loc.toml")).unwrap();

        let fusion: fusion::Params =
            util::params::from_str(include_str!("../../params/fusion.toml")).unwrap();
        fusion.validate().unwrap();
    }
}
