use crate::float_types::Real;
use nalgebra::Point2;

/// Axis-aligned box in the sheet plane, used by the 2D broad phases.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb2 {
    pub mins: Point2<Real>,
    pub maxs: Point2<Real>,
}

impl Aabb2 {
    #[inline]
    pub const fn new(mins: Point2<Real>, maxs: Point2<Real>) -> Self {
        Self { mins, maxs }
    }

    /// Smallest box containing every point; `None` for an empty iterator.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point2<Real>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Aabb2::new(*first, *first);
        for p in iter {
            aabb.mins.x = aabb.mins.x.min(p.x);
            aabb.mins.y = aabb.mins.y.min(p.y);
            aabb.maxs.x = aabb.maxs.x.max(p.x);
            aabb.maxs.y = aabb.maxs.y.max(p.y);
        }
        Some(aabb)
    }

    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.maxs.x >= other.mins.x
            && self.mins.x <= other.maxs.x
            && self.maxs.y >= other.mins.y
            && self.mins.y <= other.maxs.y
    }

    /// Grow (or shrink, for negative `margin`) the box on every side.
    #[inline]
    pub fn expanded(&self, margin: Real) -> Self {
        Self::new(
            Point2::new(self.mins.x - margin, self.mins.y - margin),
            Point2::new(self.maxs.x + margin, self.maxs.y + margin),
        )
    }

    /// Euclidean gap between two boxes, 0 when they touch or overlap.
    /// A lower bound for the distance between anything the boxes contain.
    pub fn distance(&self, other: &Self) -> Real {
        let dx = (self.mins.x.max(other.mins.x) - self.maxs.x.min(other.maxs.x)).max(0.0);
        let dy = (self.mins.y.max(other.mins.y) - self.maxs.y.min(other.maxs.y)).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    #[inline]
    pub fn merged(&self, other: &Self) -> Self {
        Self::new(
            Point2::new(self.mins.x.min(other.mins.x), self.mins.y.min(other.mins.y)),
            Point2::new(self.maxs.x.max(other.maxs.x), self.maxs.y.max(other.maxs.y)),
        )
    }

    #[inline]
    pub fn center(&self) -> Point2<Real> {
        Point2::new(
            (self.mins.x + self.maxs.x) / 2.0,
            (self.mins.y + self.maxs.y) / 2.0,
        )
    }

    #[inline]
    pub fn width(&self) -> Real {
        self.maxs.x - self.mins.x
    }

    #[inline]
    pub fn height(&self) -> Real {
        self.maxs.y - self.mins.y
    }

    /// Corner arrays in the layout `rstar` envelopes expect.
    #[inline]
    pub fn corners(&self) -> ([Real; 2], [Real; 2]) {
        ([self.mins.x, self.mins.y], [self.maxs.x, self.maxs.y])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_distance() {
        let a = Aabb2::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let b = Aabb2::new(Point2::new(2.0, 0.0), Point2::new(3.0, 1.0));

        // Boxes are separated by 1 unit in X
        assert!((a.distance(&b) - 1.0).abs() < 1e-12);
        assert!(!a.intersects(&b));
        assert!(a.expanded(0.5).intersects(&b.expanded(0.5)));
    }

    #[test]
    fn test_from_points() {
        let pts = [Point2::new(1.0, -2.0), Point2::new(-1.0, 4.0), Point2::new(0.5, 0.5)];
        let aabb = Aabb2::from_points(&pts).expect("non-empty");
        assert_eq!(aabb.mins, Point2::new(-1.0, -2.0));
        assert_eq!(aabb.maxs, Point2::new(1.0, 4.0));
        assert!(Aabb2::from_points(&Vec::<Point2<Real>>::new()).is_none());
    }
}
