//! Vector type alias for 3D positions and displacement vectors.

use nalgebra::Vector3;

/// 3D vector type for particle positions and pair displacements.
///
/// Alias for `nalgebra::Vector3<f64>`. Host arrays store positions as
/// `[f64; 3]`; convert with [`Vec3::from`] at the kernel boundary.
pub type Vec3 = Vector3<f64>;
