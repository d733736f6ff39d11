//! Path geometry: step displacement and local curvature radius.
use crate::tractography::core::state::Vec3;

/// Voxel-index displacement for one step along the physical direction `m`.
///
/// Positions are continuous indices in storage order while orientations
/// are physical `(x, y, z)`, so the components are reversed and divided by
/// the per-axis spacing.
pub fn step_displacement(m: &Vec3, voxel: &[f64; 3], step_length: f64) -> Vec3 {
    Vec3::new(m.z / voxel[0], m.y / voxel[1], m.x / voxel[2]) * step_length
}

/// Radius of curvature, in millimetres, through the last three positions.
///
/// Positions are voxel indices and are scaled by `voxel` before use. With
/// segments `v1`, `v2` the radius is `((|v1| + |v2|) / 2) / ‖v̂2 - v̂1‖`, the
/// mean segment length over the change of unit direction. A full reversal
/// gives half the mean segment length. Fewer than three positions, a
/// repeated point or a straight path give `f64::INFINITY`.
pub fn curve_radius(positions: &[Vec3], voxel: &[f64; 3]) -> f64 {
    let n = positions.len();
    if n < 3 {
        return f64::INFINITY;
    }
    let scale = Vec3::new(voxel[0], voxel[1], voxel[2]);
    let v1 = (positions[n - 2] - positions[n - 3]).component_mul(&scale);
    let v2 = (positions[n - 1] - positions[n - 2]).component_mul(&scale);
    let (n1, n2) = (v1.norm(), v2.norm());
    if n1 == 0.0 || n2 == 0.0 {
        return f64::INFINITY;
    }
    let turn = ((v2 / n2) - (v1 / n1)).norm();
    if turn == 0.0 { f64::INFINITY } else { 0.5 * (n1 + n2) / turn }
}
