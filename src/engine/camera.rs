// Chase camera that trails the runner.
//
// Camera model:
//   - Sits `distance` behind the runner along its heading and `height` above
//   - Looks at a point `look_height` above the runner's feet
//   - Eye position is smoothed toward its goal so turns do not snap the view

use glam::{Mat4, Vec3};

pub struct ChaseCamera {
    /// Smoothed world-space eye position.
    eye: Vec3,
    target: Vec3,

    pub distance: f32,
    pub height: f32,
    pub look_height: f32,

    /// Fraction of the remaining gap to the goal closed per update, in (0, 1].
    pub follow: f32,

    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl ChaseCamera {
    pub fn new() -> Self {
        Self {
            eye: Vec3::new(0.0, 4.0, 8.0),
            target: Vec3::ZERO,
            distance: 8.0,
            height: 4.0,
            look_height: 1.0,
            follow: 0.15,
            fov: 60.0_f32.to_radians(),
            near: 0.1,
            far: 400.0,
        }
    }

    /// Move toward the chase position for a runner at `position` facing `forward`.
    pub fn update(&mut self, position: Vec3, forward: Vec3) {
        let goal = position - forward * self.distance + Vec3::Y * self.height;
        self.eye = self.eye.lerp(goal, self.follow.clamp(0.0, 1.0));
        self.target = position + Vec3::Y * self.look_height;
    }

    /// Jump straight to the chase position, e.g. after a teleport.
    pub fn snap(&mut self, position: Vec3, forward: Vec3) {
        self.eye = position - forward * self.distance + Vec3::Y * self.height;
        self.target = position + Vec3::Y * self.look_height;
    }

    #[cfg(test)]
    pub fn eye(&self) -> Vec3 { self.eye }
    #[cfg(test)]
    pub fn target(&self) -> Vec3 { self.target }

    /// View matrix: looks from the camera eye toward the target.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    /// Perspective projection matrix.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}
