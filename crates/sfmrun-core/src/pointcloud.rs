use crate::point::Point3D;
use serde::{Deserialize, Serialize};

/// Read-only snapshot of a reconstruction's 3D points.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Point3D>,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3D> {
        self.points.iter()
    }
}

impl From<Vec<Point3D>> for PointCloud {
    fn from(value: Vec<Point3D>) -> Self {
        Self { points: value }
    }
}

impl FromIterator<Point3D> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3D>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a Point3D;
    type IntoIter = std::slice::Iter<'a, Point3D>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::PointCloud;
    use crate::point::Point3D;

    #[test]
    fn collects_in_order() {
        let cloud: PointCloud = (0..3)
            .map(|i| Point3D::from([i as f64, 0.0, 0.0]))
            .collect();

        assert_eq!(cloud.len(), 3);
        let xs: Vec<f64> = cloud.iter().map(|p| p.x()).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn default_is_empty() {
        let cloud = PointCloud::default();
        assert!(cloud.is_empty());
        assert_eq!(cloud.len(), 0);
    }
}
