//! Conversion between controller space and Bevy world space.
//!
//! The locomotion math works in *controller space*: X right, Y up, Z forward.
//! Bevy's world is right-handed with -Z forward, so the two differ by a
//! mirror across the XY plane. Vectors flip their Z component; rotations
//! flip the X and Y components of the quaternion (a reflection reverses the
//! rotation sense around any axis lying in the mirror plane).

use bevy::prelude::*;

/// Convert a Bevy world vector into controller space.
#[inline]
pub fn vec_from_world(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, -v.z)
}

/// Convert a controller-space vector into Bevy world space.
#[inline]
pub fn vec_to_world(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, -v.z)
}

/// Convert a Bevy world rotation into controller space.
#[inline]
pub fn rot_from_world(q: Quat) -> Quat {
    Quat::from_xyzw(-q.x, -q.y, q.z, q.w)
}

/// Convert a controller-space rotation into Bevy world space.
#[inline]
pub fn rot_to_world(q: Quat) -> Quat {
    Quat::from_xyzw(-q.x, -q.y, q.z, q.w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn bevy_forward_is_controller_forward() {
        assert!(approx(vec_from_world(Vec3::NEG_Z), Vec3::Z));
        assert!(approx(vec_to_world(Vec3::Z), Vec3::NEG_Z));
    }

    #[test]
    fn right_and_up_are_unchanged() {
        assert!(approx(vec_from_world(Vec3::X), Vec3::X));
        assert!(approx(vec_from_world(Vec3::Y), Vec3::Y));
    }

    #[test]
    fn mirrored_rotation_matches_mirrored_vectors() {
        let q = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(0.3);
        let v = Vec3::new(0.2, -1.3, 0.8);

        let in_world = q * v;
        let via_controller = rot_to_world(rot_from_world(q)) * v;
        assert!(approx(in_world, via_controller));

        let mirrored = rot_from_world(q) * vec_from_world(v);
        assert!(approx(vec_to_world(mirrored), in_world));
    }

    #[test]
    fn controller_yaw_faces_bevy_forward_toward_target() {
        // Controller yaw of +90 degrees turns +Z toward +X.
        let controller = Quat::from_rotation_y(FRAC_PI_2);
        assert!(approx(controller * Vec3::Z, Vec3::X));

        // In Bevy the same facing must point the body's -Z toward +X.
        let world = rot_to_world(controller);
        assert!(approx(world * Vec3::NEG_Z, Vec3::X));
    }
}
