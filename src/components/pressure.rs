use serde::{Deserialize, Serialize};

use crate::core::Body;
use crate::utils::geometry::polygon_area;

/// Inflates a body with internal gas pressure.
///
/// Each perimeter edge receives an outward force proportional to its length
/// and inversely proportional to the enclosed volume, so a squeezed body
/// pushes back harder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureComponent {
    pub gas_pressure: f32,
    volume: f32,
}

impl PressureComponent {
    pub fn new(gas_pressure: f32) -> Self {
        Self {
            gas_pressure,
            volume: 0.0,
        }
    }

    /// Enclosed area computed on the last update.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn accumulate_internal_forces(&mut self, body: &mut Body) {
        let count = body.point_masses.len();
        if count < 1 {
            self.volume = 0.0;
            return;
        }

        // A fully collapsed body would see its pressure diverge; floor the
        // volume instead.
        self.volume = polygon_area(body.point_masses.iter().map(|pm| pm.position)).max(0.5);

        for i in 0..count {
            let j = (i + 1) % count;
            let pressure = (1.0 / self.volume) * body.edges[i].length * self.gas_pressure;

            let normal_a = body.point_normals[i];
            let normal_b = body.point_normals[j];
            body.point_masses[i].apply_force(normal_a * pressure);
            body.point_masses[j].apply_force(normal_b * pressure);
        }
    }
}
