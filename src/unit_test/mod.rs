mod point_clouds;
pub use point_clouds::{
    random_transform, sample_ellipsoid_pointcloud, sample_plane_pointcloud, translated,
};
