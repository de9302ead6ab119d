//! Time-driven motion for the displayed model.
//!
//! Rotation integrates frame deltas, so a long stall produces one large jump
//! and the model keeps turning in the same direction. Bobbing is a pure
//! function of elapsed time, which keeps replays with the same clock identical.

use crate::runtime::FrameTick;
use crate::scene::{LoadState, PositionOffset, SceneState};

/// Constants of one motion law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    /// Radians of yaw per second; must stay positive.
    pub rotation_rate: f64,
    pub y_frequency: f64,
    pub y_amplitude: f64,
    pub z_frequency: f64,
    pub z_amplitude: f64,
}

impl MotionProfile {
    /// Gentle swim applied once the asset is on screen.
    pub const LOADED: MotionProfile = MotionProfile {
        rotation_rate: 0.3,
        y_frequency: 0.8,
        y_amplitude: 0.3,
        z_frequency: 0.4,
        z_amplitude: 0.2,
    };

    /// Swim of the procedural placeholder. Starts out equal to [`Self::LOADED`];
    /// the two are configured independently.
    pub const FALLBACK: MotionProfile = MotionProfile {
        rotation_rate: 0.3,
        y_frequency: 0.8,
        y_amplitude: 0.3,
        z_frequency: 0.4,
        z_amplitude: 0.2,
    };
}

/// Vertical and depth offsets at `elapsed` seconds.
pub fn offsets_at(profile: &MotionProfile, elapsed: f64) -> PositionOffset {
    PositionOffset {
        y: ((elapsed * profile.y_frequency).sin() * profile.y_amplitude) as f32,
        z: ((elapsed * profile.z_frequency).cos() * profile.z_amplitude) as f32,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationDriver {
    loaded: MotionProfile,
    fallback: MotionProfile,
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new(MotionProfile::LOADED, MotionProfile::FALLBACK)
    }
}

impl AnimationDriver {
    pub fn new(loaded: MotionProfile, fallback: MotionProfile) -> Self {
        Self { loaded, fallback }
    }

    /// Profile matching the scene's current load state.
    pub fn profile_for(&self, state: LoadState) -> &MotionProfile {
        match state {
            LoadState::Loaded => &self.loaded,
            LoadState::Pending | LoadState::Failed => &self.fallback,
        }
    }

    /// Advances rotation by `tick.delta` and re-evaluates the offsets at `tick.elapsed`.
    pub fn update(&self, scene: &mut SceneState, tick: FrameTick) {
        let profile = *self.profile_for(scene.load_state());
        let delta = if tick.delta.is_finite() {
            tick.delta.max(0.0)
        } else {
            0.0
        };
        scene.advance_rotation(delta * profile.rotation_rate);
        scene.set_position_offset(offsets_at(&profile, tick.elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{fallback, DisplayedModel};
    use crate::types::Rgb;

    fn scene() -> SceneState {
        SceneState::new(DisplayedModel::fallback(fallback::shark()), Rgb::WHITE)
    }

    fn tick(elapsed: f64, delta: f64) -> FrameTick {
        FrameTick {
            elapsed,
            delta,
            frame_index: 0,
        }
    }

    #[test]
    fn rotation_never_decreases() {
        let driver = AnimationDriver::default();
        let mut scene = scene();
        let mut previous = scene.rotation_y();
        let mut elapsed = 0.0;
        for delta in [0.0, 0.016, 0.5, 0.0, 3600.0, 0.001] {
            elapsed += delta;
            driver.update(&mut scene, tick(elapsed, delta));
            assert!(scene.rotation_y() >= previous);
            previous = scene.rotation_y();
        }
    }

    #[test]
    fn long_stall_produces_single_jump() {
        let driver = AnimationDriver::default();
        let mut scene = scene();
        driver.update(&mut scene, tick(10.0, 10.0));
        let expected = 10.0 * MotionProfile::FALLBACK.rotation_rate;
        assert!((scene.rotation_y() - expected).abs() < 1e-9);
    }

    #[test]
    fn offsets_stay_within_amplitude() {
        for profile in [MotionProfile::LOADED, MotionProfile::FALLBACK] {
            for step in 0..2000 {
                let offset = offsets_at(&profile, step as f64 * 0.037);
                assert!(offset.y.abs() as f64 <= profile.y_amplitude + 1e-6);
                assert!(offset.z.abs() as f64 <= profile.z_amplitude + 1e-6);
            }
        }
    }

    #[test]
    fn offsets_depend_only_on_elapsed_time() {
        let driver = AnimationDriver::default();
        let mut coarse = scene();
        let mut fine = scene();
        driver.update(&mut coarse, tick(2.0, 2.0));
        for step in 1..=20 {
            driver.update(&mut fine, tick(step as f64 * 0.1, 0.1));
        }
        assert_eq!(coarse.position_offset(), fine.position_offset());
    }

    #[test]
    fn loaded_profile_matches_reference_values() {
        let offset = offsets_at(&MotionProfile::LOADED, 0.0);
        assert_eq!(offset.y, 0.0);
        assert!((offset.z - 0.2).abs() < 1e-6);
    }

    #[test]
    fn fallback_profile_matches_reference_values() {
        let crest = std::f64::consts::FRAC_PI_2 / 0.8;
        let offset = offsets_at(&MotionProfile::FALLBACK, crest);
        assert!((offset.y - 0.3).abs() < 1e-6);
        assert!((offset.z as f64 - 0.2 * (0.4 * crest).cos()).abs() < 1e-6);
        assert_eq!(MotionProfile::FALLBACK.rotation_rate, 0.3);
    }
}
