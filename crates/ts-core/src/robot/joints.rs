//! Position to joint-configuration map for the right arm.

use ts_common::{Position, NUM_POSITIONS};

pub const JOINT_NAMES: [&str; 3] = ["RShoulderPitch", "RShoulderRoll", "RWristYaw"];

const SHOULDER_PITCH: f64 = 0.1;
const WRIST_YAW: f64 = 1.74;
const SHOULDER_ROLL: [f64; NUM_POSITIONS] = [0.2, -0.1, -0.4, -0.7, -1.0, -0.7, -0.4, -0.1];

/// Seconds per joint for a move between positions.
pub const MOVE_SPEEDS: [f64; 3] = [1.0, 1.0, 1.0];
/// Seconds per joint for each half of the probe motion.
pub const PROBE_SPEEDS: [f64; 3] = [0.8, 0.8, 0.8];
/// Shoulder pitch raise during a probe.
pub const PROBE_LIFT: f64 = 0.1;

/// Joint angles for one position, in [`JOINT_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointTarget {
    pub label: u8,
    pub angles: [f64; 3],
}

impl JointTarget {
    /// The same target with the shoulder raised by [`PROBE_LIFT`].
    pub fn lifted(&self) -> JointTarget {
        let mut angles = self.angles;
        angles[0] += PROBE_LIFT;
        JointTarget { angles, ..*self }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JointMap {
    targets: [JointTarget; NUM_POSITIONS],
}

impl Default for JointMap {
    fn default() -> Self {
        let mut targets = [JointTarget {
            label: 0,
            angles: [0.0; 3],
        }; NUM_POSITIONS];
        for (i, t) in targets.iter_mut().enumerate() {
            *t = JointTarget {
                label: i as u8 + 1,
                angles: [SHOULDER_PITCH, SHOULDER_ROLL[i], WRIST_YAW],
            };
        }
        JointMap { targets }
    }
}

impl JointMap {
    pub fn target(&self, position: Position) -> JointTarget {
        self.targets[position.index()]
    }

    /// Resolve a raw index, as decoded from the wire.
    pub fn lookup(&self, index: usize) -> Option<JointTarget> {
        self.targets.get(index).copied()
    }

    /// Lift then return: the two waypoints of the probe motion.
    pub fn probe(&self, position: Position) -> [JointTarget; 2] {
        let base = self.target(position);
        [base.lifted(), base]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_position_resolves() {
        let map = JointMap::default();
        for p in Position::all() {
            let t = map.lookup(p.index()).unwrap();
            assert_eq!(t, map.target(p));
            assert_eq!(format!("S{}", t.label), p.label());
            assert_eq!(t.angles[0], SHOULDER_PITCH);
            assert_eq!(t.angles[2], WRIST_YAW);
        }
        assert!(map.lookup(NUM_POSITIONS).is_none());
    }

    #[test]
    fn mirrored_positions_share_roll() {
        let map = JointMap::default();
        for p in Position::all() {
            assert_eq!(map.target(p).angles[1], map.target(p.mirror()).angles[1], "{p}");
        }
    }

    #[test]
    fn probe_lifts_and_returns() {
        let map = JointMap::default();
        let p = Position::new(4).unwrap();
        let [up, back] = map.probe(p);
        assert!((up.angles[0] - 0.2).abs() < 1e-12);
        assert_eq!(back, map.target(p));
        assert_eq!(map.target(p).angles[1], -1.0);
    }
}
