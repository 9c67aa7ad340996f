// Run-cycle pose for the runner's legs and body.
//
// A handful of scalars updated in place every tick. The renderer reads them
// to place the leg and body boxes; nothing is rebuilt per frame.

const PHASE_STEP: f32 = 0.05;
const SWING_AMPLITUDE: f32 = 0.3;
const LEAN_ANGLE: f32 = 0.2;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrideAnimation {
    /// Accumulated run-cycle phase in radians.
    pub phase: f32,
    /// Left leg pitch; the right leg is its mirror.
    pub left_swing: f32,
    pub right_swing: f32,
    /// Body pitch: forward when advancing, backward when retreating.
    pub lean: f32,
}

impl StrideAnimation {
    /// `drive` is -1, 0 or 1 along the heading.
    pub fn update(&mut self, drive: f32) {
        if drive == 0.0 {
            self.left_swing = 0.0;
            self.right_swing = 0.0;
            self.lean = 0.0;
            return;
        }

        self.phase += PHASE_STEP;
        let swing = self.phase.sin() * SWING_AMPLITUDE;
        self.left_swing = -swing;
        self.right_swing = swing;
        self.lean = LEAN_ANGLE * drive.signum();
    }

    pub fn is_running(&self) -> bool {
        self.lean != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legs_mirror_while_running() {
        let mut stride = StrideAnimation::default();
        for _ in 0..40 {
            stride.update(1.0);
            assert_eq!(stride.left_swing, -stride.right_swing);
            assert!(stride.right_swing.abs() <= SWING_AMPLITUDE);
        }
        assert!(stride.is_running());
        assert_eq!(stride.lean, LEAN_ANGLE);
        assert!((stride.phase - 40.0 * PHASE_STEP).abs() < 1e-4);
    }

    #[test]
    fn retreat_leans_back() {
        let mut stride = StrideAnimation::default();
        stride.update(-1.0);
        assert_eq!(stride.lean, -LEAN_ANGLE);
    }

    #[test]
    fn idle_resets_pose_but_keeps_phase() {
        let mut stride = StrideAnimation::default();
        for _ in 0..10 {
            stride.update(1.0);
        }
        let phase = stride.phase;
        stride.update(0.0);
        assert_eq!(stride.left_swing, 0.0);
        assert_eq!(stride.right_swing, 0.0);
        assert_eq!(stride.lean, 0.0);
        assert!(!stride.is_running());
        assert_eq!(stride.phase, phase);
    }
}
