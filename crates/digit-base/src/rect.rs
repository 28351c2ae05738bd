use crate::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect<T> {
    pub origin: Vec2<T>,
    pub size: Vec2<T>,
}

impl<T> Rect<T> {
    pub const fn new(origin: Vec2<T>, size: Vec2<T>) -> Self {
        Self { origin, size }
    }
}

impl<T: std::ops::Add<Output = T> + Copy> Rect<T> {
    /// One past the bottom-right corner.
    pub fn max(&self) -> Vec2<T> {
        self.origin + self.size
    }
}

impl<T: std::ops::Add<Output = T> + PartialOrd + Copy> Rect<T> {
    pub fn contains_rect(&self, other: Rect<T>) -> bool {
        let self_max = self.max();
        let other_max = other.max();
        other.origin.x >= self.origin.x
            && other.origin.y >= self.origin.y
            && other_max.x <= self_max.x
            && other_max.y <= self_max.y
    }
}

impl Rect<usize> {
    pub fn is_empty(&self) -> bool {
        self.size.x == 0 || self.size.y == 0
    }

    /// Overflow-safe check that the rect lies inside a `size` frame anchored at the origin.
    pub fn fits_in(&self, size: Vec2<usize>) -> bool {
        match (
            self.origin.x.checked_add(self.size.x),
            self.origin.y.checked_add(self.size.y),
        ) {
            (Some(max_x), Some(max_y)) => max_x <= size.x && max_y <= size.y,
            _ => false,
        }
    }
}
