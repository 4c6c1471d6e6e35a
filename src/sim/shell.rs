//! Deformable planet shell
//!
//! The crust is a fixed-topology triangle mesh. Impacts only move vertices
//! inward and darken their colors; nothing ever heals, and the index list
//! never changes after load.

use std::collections::HashMap;

use glam::Vec3;

use crate::consts::*;
use crate::error::MeshError;

/// Outcome of a single impact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImpactReport {
    /// Vertices moved by this impact
    pub displaced: usize,
    /// Vertices counted toward total damage for the first time
    pub newly_damaged: usize,
}

/// The planet's outer crust
#[derive(Debug, Clone)]
pub struct DeformableShell {
    vertices: Vec<Vec3>,
    colors: Vec<Vec3>,
    indices: Vec<u32>,
    /// Vertices already counted in `total_damage`
    damaged: Vec<bool>,
    total_damage: usize,
    /// Set after any mutation until the presenter re-uploads the buffers
    dirty: bool,
}

impl DeformableShell {
    /// Build a shell from raw mesh data
    pub fn from_mesh(
        vertices: Vec<Vec3>,
        colors: Vec<Vec3>,
        indices: Vec<u32>,
    ) -> Result<Self, MeshError> {
        if colors.len() != vertices.len() {
            return Err(MeshError::ColorCountMismatch {
                vertices: vertices.len(),
                colors: colors.len(),
            });
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::NotTriangles(indices.len()));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }

        let count = vertices.len();
        Ok(Self {
            vertices,
            colors,
            indices,
            damaged: vec![false; count],
            total_damage: 0,
            dirty: true,
        })
    }

    /// Generate the standard planet: a subdivided icosahedron with terrain colors
    pub fn icosphere(subdivisions: u32) -> Self {
        let (unit, indices) = icosphere_mesh(subdivisions);
        let colors = unit.iter().map(|&v| terrain_color(v)).collect();
        let vertices: Vec<Vec3> = unit.into_iter().map(|v| v * SHELL_BASE_RADIUS).collect();
        let count = vertices.len();
        let mut shell = Self {
            vertices,
            colors,
            indices,
            damaged: vec![false; count],
            total_damage: 0,
            dirty: true,
        };
        shell.settle();
        log::debug!(
            "Generated shell: {} vertices, {} triangles",
            shell.vertex_count(),
            shell.indices.len() / 3
        );
        shell
    }

    /// Sink darker terrain slightly and inflate the crust
    ///
    /// Brighter vertices stay higher, so color doubles as relief.
    pub fn settle(&mut self) {
        for (v, c) in self.vertices.iter_mut().zip(&self.colors) {
            let gray = (c.x + c.y + c.z) / 3.0;
            let inset = (1.0 - gray) * 0.01;
            *v -= v.normalize_or_zero() * inset;
            *v *= SHELL_INFLATE;
        }
        self.dirty = true;
    }

    /// Crater the shell around `point`
    ///
    /// Every vertex closer than `radius` is pushed toward the center along its
    /// own normal by `radius - distance` and darkened. There is no floor: heavy
    /// bombardment can drive a vertex through the middle of the planet.
    pub fn apply_impact(&mut self, point: Vec3, radius: f32) -> ImpactReport {
        let mut report = ImpactReport::default();
        let radius_sq = radius * radius;

        for (i, v) in self.vertices.iter_mut().enumerate() {
            if v.distance_squared(point) >= radius_sq {
                continue;
            }
            let sink = radius - v.distance(point);
            *v -= v.normalize_or_zero() * sink;
            self.colors[i] -= Vec3::splat(SHELL_DARKEN);
            report.displaced += 1;

            if sink > SHELL_DAMAGE_THRESHOLD && !self.damaged[i] {
                self.damaged[i] = true;
                self.total_damage += 1;
                report.newly_damaged += 1;
            }
        }

        if report.displaced > 0 {
            self.dirty = true;
        }
        report
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of vertices that have been badly hit at least once
    pub fn total_damage(&self) -> usize {
        self.total_damage
    }

    /// Damage at which the round ends
    pub fn damage_limit(&self) -> usize {
        self.vertex_count() / 2
    }

    pub fn is_destroyed(&self) -> bool {
        self.total_damage >= self.damage_limit()
    }

    /// Damage as a fraction of the limit (1.0 = round over)
    pub fn damage_fraction(&self) -> f32 {
        let limit = self.damage_limit();
        if limit == 0 {
            return 1.0;
        }
        self.total_damage as f32 / limit as f32
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning whether buffers need re-uploading
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// Unit icosphere vertices and triangle indices
fn icosphere_mesh(subdivisions: u32) -> (Vec<Vec3>, Vec<u32>) {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let mut vertices: Vec<Vec3> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Vec3::new(x, y, z).normalize())
    .collect();

    let mut indices: Vec<u32> = vec![
        0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11, //
        1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7, 6, 7, 1, 8, //
        3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9, //
        4, 9, 5, 2, 4, 11, 6, 2, 10, 8, 6, 7, 9, 8, 1,
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut next = Vec::with_capacity(indices.len() * 4);

        let mut midpoint = |a: u32, b: u32, vertices: &mut Vec<Vec3>| -> u32 {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let m = (vertices[a as usize] + vertices[b as usize]).normalize();
                vertices.push(m);
                (vertices.len() - 1) as u32
            })
        };

        for tri in indices.chunks_exact(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            next.extend_from_slice(&[a, ab, ca, b, bc, ab, c, ca, bc, ab, bc, ca]);
        }
        indices = next;
    }

    (vertices, indices)
}

/// Deterministic land/sea coloring from a few octaves of trig noise
fn terrain_color(p: Vec3) -> Vec3 {
    let h = (p.x * 3.1 + 0.7).sin() * (p.y * 2.7 - 1.3).cos()
        + 0.5 * (p.z * 5.3 + p.x * 1.9).sin()
        + 0.25 * (p.y * 9.1 - p.z * 4.3).cos();

    if h < 0.0 {
        // Ocean, deeper is darker
        let depth = (-h).min(1.0);
        Vec3::new(0.05, 0.2 + 0.2 * (1.0 - depth), 0.5 + 0.3 * (1.0 - depth))
    } else if p.y.abs() > 0.85 {
        Vec3::splat(0.92)
    } else {
        let height = h.min(1.0);
        Vec3::new(0.25 + 0.35 * height, 0.55 - 0.2 * height, 0.15 + 0.1 * height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::comet::{Comet, CometPhase};
    use proptest::prelude::*;

    fn flat_patch() -> DeformableShell {
        // Three vertices on the unit sphere near +Z, one far away at -Z
        let vertices = vec![
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.05, 0.0, 1.0).normalize(),
            Vec3::new(0.0, 0.05, 1.0).normalize(),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        let colors = vec![Vec3::ONE; 4];
        DeformableShell::from_mesh(vertices, colors, vec![0, 1, 2, 0, 2, 3]).unwrap()
    }

    #[test]
    fn test_icosphere_counts() {
        let shell = DeformableShell::icosphere(2);
        // 10 * 4^n + 2 vertices, 20 * 4^n triangles
        assert_eq!(shell.vertex_count(), 162);
        assert_eq!(shell.indices().len(), 320 * 3);
        assert_eq!(shell.damage_limit(), 81);
    }

    #[test]
    fn test_icosphere_is_identical_across_builds() {
        let a = DeformableShell::icosphere(3);
        let b = DeformableShell::icosphere(3);
        assert_eq!(a.vertices(), b.vertices());
        assert_eq!(a.colors(), b.colors());
    }

    /// Crater radius of a mid-sized comet at mid speed
    fn typical_blast() -> f32 {
        let speed = COMET_MIN_SPEED + COMET_SPEED_RANGE / 2.0;
        let comet = Comet {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            rotation: 0.0,
            scale: COMET_MIN_SCALE + COMET_SCALE_RANGE / 2.0,
            phase: CometPhase::Approaching { speed },
        };
        comet.blast_radius(speed)
    }

    #[test]
    fn test_settled_crust_is_within_blast_reach_of_band() {
        let blast = typical_blast();
        let shell = DeformableShell::icosphere(3);
        for v in shell.vertices() {
            let r = v.length();
            assert!(r < SHELL_COLLISION_RADIUS, "radius {r}");
            // Sink from a hit directly overhead, on the band
            let sink = blast - (SHELL_COLLISION_RADIUS - r);
            assert!(sink > SHELL_DAMAGE_THRESHOLD, "radius {r} sinks only {sink}");
        }
    }

    #[test]
    fn test_hit_from_band_damages_generated_crust() {
        let mut shell = DeformableShell::icosphere(3);
        let top = shell.vertices()[0];
        let point = top.normalize() * (SHELL_COLLISION_RADIUS - 1e-3);
        let report = shell.apply_impact(point, typical_blast());
        assert!(report.newly_damaged >= 1);
        assert!(shell.total_damage() >= 1);
    }

    #[test]
    fn test_from_mesh_rejects_bad_indices() {
        let err = DeformableShell::from_mesh(vec![Vec3::X; 3], vec![Vec3::ONE; 3], vec![0, 1, 3])
            .unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            }
        );

        let err =
            DeformableShell::from_mesh(vec![Vec3::X; 3], vec![Vec3::ONE; 2], vec![0, 1, 2])
                .unwrap_err();
        assert!(matches!(err, MeshError::ColorCountMismatch { .. }));

        let err = DeformableShell::from_mesh(vec![Vec3::X; 3], vec![Vec3::ONE; 3], vec![0, 1])
            .unwrap_err();
        assert_eq!(err, MeshError::NotTriangles(2));
    }

    #[test]
    fn test_impact_displaces_inward_and_darkens() {
        let mut shell = flat_patch();
        shell.take_dirty();

        let report = shell.apply_impact(Vec3::new(0.0, 0.0, 1.0), 0.1);
        assert_eq!(report.displaced, 3);
        assert!(shell.is_dirty());

        // Center vertex sinks by the full radius
        assert!((shell.vertices()[0].z - 0.9).abs() < 1e-5);
        assert!((shell.colors()[0] - Vec3::splat(0.8)).length() < 1e-5);
        // Far vertex untouched
        assert_eq!(shell.vertices()[3], Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(shell.colors()[3], Vec3::ONE);
    }

    #[test]
    fn test_miss_leaves_shell_clean() {
        let mut shell = flat_patch();
        shell.take_dirty();
        let report = shell.apply_impact(Vec3::new(5.0, 0.0, 0.0), 0.1);
        assert_eq!(report, ImpactReport::default());
        assert!(!shell.is_dirty());
    }

    #[test]
    fn test_damage_counts_each_vertex_once() {
        let mut shell = flat_patch();
        let first = shell.apply_impact(Vec3::new(0.0, 0.0, 1.0), 0.1);
        assert!(first.newly_damaged >= 1);
        let after_first = shell.total_damage();

        // Hitting the same crater again cannot recount those vertices
        let second = shell.apply_impact(shell.vertices()[0], 0.1);
        assert!(shell.total_damage() >= after_first);
        assert_eq!(shell.total_damage(), after_first + second.newly_damaged);
        assert!(shell.total_damage() <= shell.vertex_count());
    }

    #[test]
    fn test_shallow_graze_is_not_damage() {
        let mut shell = flat_patch();
        // Touches the center vertex but only sinks it 0.01
        let report = shell.apply_impact(Vec3::new(0.0, 0.0, 1.09), 0.1);
        assert_eq!(report.displaced, 1);
        assert_eq!(report.newly_damaged, 0);
        assert_eq!(shell.total_damage(), 0);
    }

    #[test]
    fn test_destroyed_at_half() {
        let mut shell = flat_patch();
        assert_eq!(shell.damage_limit(), 2);
        shell.apply_impact(Vec3::new(0.0, 0.0, 1.0), 0.2);
        assert!(shell.total_damage() >= 2);
        assert!(shell.is_destroyed());
        assert!(shell.damage_fraction() >= 1.0);
    }

    proptest! {
        #[test]
        fn prop_impacts_never_heal(
            hits in prop::collection::vec(
                ((-1.0f32..1.0), (-1.0f32..1.0), (-1.0f32..1.0), 0.01f32..0.13),
                1..12,
            )
        ) {
            let mut shell = DeformableShell::icosphere(2);
            let mut prev_damage = 0;
            for (x, y, z, radius) in hits {
                let dir = Vec3::new(x, y, z).normalize_or(Vec3::Z);
                let before: Vec<f32> = shell.vertices().iter().map(|v| v.length()).collect();
                shell.apply_impact(dir * SHELL_COLLISION_RADIUS, radius);
                for (b, v) in before.iter().zip(shell.vertices()) {
                    prop_assert!(v.length() <= b + 1e-5);
                }
                prop_assert!(shell.total_damage() >= prev_damage);
                prev_damage = shell.total_damage();
            }
        }
    }
}
