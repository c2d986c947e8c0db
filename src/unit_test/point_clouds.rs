use nalgebra::{Matrix3, Vector3, Vector6};
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rstest::fixture;

use crate::{pointcloud::PointCloud, transform::Transform};

const NUM_POINTS: usize = 500;
const SEMI_AXES: [f32; 3] = [1.0, 0.6, 0.4];
const INTENSITY_SLOPE: [f32; 3] = [0.12, -0.09, 0.15];

fn fibonacci_direction(index: usize, count: usize) -> Vector3<f32> {
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
    let y = 1.0 - 2.0 * (index as f32 + 0.5) / count as f32;
    let radius = (1.0 - y * y).sqrt();
    let theta = golden_angle * index as f32;
    Vector3::new(radius * theta.cos(), y, radius * theta.sin())
}

/// Triaxial ellipsoid centered at `(0.1, -0.2, 0.3)` with normals, colors and color gradients.
///
/// The intensity is a linear function of the position, so its tangential gradient is exact.
#[fixture]
pub fn sample_ellipsoid_pointcloud() -> PointCloud {
    let center = Vector3::new(0.1, -0.2, 0.3);
    let slope = Vector3::from(INTENSITY_SLOPE);

    let mut points = Array2::zeros((NUM_POINTS, 3));
    let mut normals = Array2::zeros((NUM_POINTS, 3));
    let mut colors = Array2::zeros((NUM_POINTS, 3));
    let mut gradients = Array2::zeros((NUM_POINTS, 3));
    for i in 0..NUM_POINTS {
        let dir = fibonacci_direction(i, NUM_POINTS);
        let offset = Vector3::new(
            dir.x * SEMI_AXES[0],
            dir.y * SEMI_AXES[1],
            dir.z * SEMI_AXES[2],
        );
        let point = center + offset;
        let normal = Vector3::new(
            dir.x / SEMI_AXES[0],
            dir.y / SEMI_AXES[1],
            dir.z / SEMI_AXES[2],
        )
        .normalize();
        let intensity = 0.5 + slope.dot(&offset);
        let gradient = (Matrix3::identity() - normal * normal.transpose()) * slope;

        for k in 0..3 {
            points[[i, k]] = point[k];
            normals[[i, k]] = normal[k];
            gradients[[i, k]] = gradient[k];
        }
        colors[[i, 0]] = intensity + 0.1;
        colors[[i, 1]] = intensity;
        colors[[i, 2]] = intensity - 0.1;
    }

    PointCloud::new(points)
        .with_normals(normals)
        .with_colors(colors)
        .with_color_gradients(gradients)
}

/// Regular grid on the `z = 0` plane with `+z` normals.
#[fixture]
pub fn sample_plane_pointcloud() -> PointCloud {
    let side = 10;
    let mut points = Array2::zeros((side * side, 3));
    let mut normals = Array2::zeros((side * side, 3));
    for row in 0..side {
        for col in 0..side {
            let index = row * side + col;
            points[[index, 0]] = col as f32 * 0.1;
            points[[index, 1]] = row as f32 * 0.1;
            normals[[index, 2]] = 1.0;
        }
    }
    PointCloud::new(points).with_normals(normals)
}

/// Seeded random rigid transform.
///
/// # Arguments
///
/// * `seed` - Random seed.
/// * `max_translation` - Bound of each translation component.
/// * `max_angle` - Bound of the rotation angle in radians.
pub fn random_transform(seed: u64, max_translation: f32, max_angle: f32) -> Transform {
    let mut rng = StdRng::seed_from_u64(seed);
    let axis = Vector3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0f32),
    )
    .normalize();
    let angle = rng.gen_range(0.0..max_angle);
    let translation = Vector3::new(
        rng.gen_range(-max_translation..max_translation),
        rng.gen_range(-max_translation..max_translation),
        rng.gen_range(-max_translation..max_translation),
    );
    let so3 = axis * angle;
    Transform::from_se3_exp(&Vector6::new(
        translation.x,
        translation.y,
        translation.z,
        so3.x,
        so3.y,
        so3.z,
    ))
}

/// Copy of `pcl` moved by `offset`, attributes included.
pub fn translated(pcl: &PointCloud, offset: &Vector3<f32>) -> PointCloud {
    &Transform::from_rotation_translation(&Matrix3::identity(), offset) * pcl
}
