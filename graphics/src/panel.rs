//! Debug options panel.
//!
//! Drives the sun's rotation and position and the shadow camera's
//! orthographic bounds at runtime. This is a debug affordance, not part of
//! the rendering contract.

use glam::{EulerRot, Quat};

use crate::scene::{CameraId, LightId, Scene};
use crate::stats::FrameStats;

/// Euler axis the rotation panel clamps to the pitch limit.
///
/// Which axis acts as pitch depends on the light rig's Euler order, so it is
/// configuration rather than a hard-coded component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PitchClampAxis {
    /// Clamp the X component.
    #[default]
    X,
    /// Clamp the Y component.
    Y,
}

/// Pitch limit in degrees applied to the clamped axis.
const PITCH_LIMIT: f32 = 89.0;

/// Draw the options panel for the sun and shadow camera.
pub fn draw_options(
    ui: &mut egui::Ui,
    scene: &mut Scene,
    sun: LightId,
    shadow_camera: CameraId,
    pitch_axis: PitchClampAxis,
    stats: &FrameStats,
) {
    ui.label(format!(
        "frame time: {:.2} ms (avg {:.2} ms)",
        stats.last_ms(),
        stats.average_ms()
    ));

    let light = scene.directional_light_mut(sun);

    let (x, y, z) = light.transform.rotation.to_euler(EulerRot::XYZ);
    let mut euler_degrees = [x.to_degrees(), y.to_degrees(), z.to_degrees()];
    let mut rotation_changed = false;
    ui.horizontal(|ui| {
        ui.label("Rotation");
        for angle in &mut euler_degrees {
            rotation_changed |= ui
                .add(egui::DragValue::new(angle).speed(0.1).range(-180.0..=180.0))
                .changed();
        }
    });
    if rotation_changed {
        clamp_pitch(&mut euler_degrees, pitch_axis);
        light.transform.rotation = Quat::from_euler(
            EulerRot::XYZ,
            euler_degrees[0].to_radians(),
            euler_degrees[1].to_radians(),
            euler_degrees[2].to_radians(),
        );
    }

    ui.horizontal(|ui| {
        ui.label("Position");
        ui.add(egui::DragValue::new(&mut light.transform.translation.x));
        ui.add(egui::DragValue::new(&mut light.transform.translation.y));
        ui.add(egui::DragValue::new(&mut light.transform.translation.z));
    });

    let camera = scene.camera_mut(shadow_camera);
    if let Some(bounds) = camera.projection.ortho_bounds() {
        let mut edited = bounds;
        ui.horizontal(|ui| {
            ui.label("Ortho L/R/B/T");
            ui.add(egui::DragValue::new(&mut edited.left));
            ui.add(egui::DragValue::new(&mut edited.right));
            ui.add(egui::DragValue::new(&mut edited.bottom));
            ui.add(egui::DragValue::new(&mut edited.top));
        });
        ui.horizontal(|ui| {
            ui.label("Ortho Near/Far");
            ui.add(egui::DragValue::new(&mut edited.near));
            ui.add(egui::DragValue::new(&mut edited.far));
        });
        if edited != bounds {
            camera.projection.set_ortho_bounds(edited);
        }
    }
}

/// Clamp one Euler axis to the pitch limit, in degrees.
///
/// Split out of the panel for testing.
pub(crate) fn clamp_pitch(euler_degrees: &mut [f32; 3], axis: PitchClampAxis) {
    let clamped = match axis {
        PitchClampAxis::X => &mut euler_degrees[0],
        PitchClampAxis::Y => &mut euler_degrees[1],
    };
    *clamped = clamped.clamp(-PITCH_LIMIT, PITCH_LIMIT);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_pitch_default_axis() {
        let mut angles = [120.0, 170.0, 0.0];
        clamp_pitch(&mut angles, PitchClampAxis::X);
        assert_eq!(angles, [89.0, 170.0, 0.0]);
    }

    #[test]
    fn test_clamp_pitch_axis_is_configurable() {
        let mut angles = [120.0, 170.0, 0.0];
        clamp_pitch(&mut angles, PitchClampAxis::Y);
        assert_eq!(angles, [120.0, 89.0, 0.0]);
    }
}
