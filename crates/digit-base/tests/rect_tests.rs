use digit_base::{Rect, Vec2};

#[test]
fn test_rect_max() {
    let rect = Rect::new(Vec2::new(104usize, 0), Vec2::new(112, 224));
    assert_eq!(rect.max(), Vec2::new(216, 224));
}

#[test]
fn test_rect_fits_in_frame() {
    let rect = Rect::new(Vec2::new(104usize, 0), Vec2::new(112, 224));
    assert!(rect.fits_in(Vec2::new(320, 240)));
    assert!(!rect.fits_in(Vec2::new(200, 240)));
}

#[test]
fn test_rect_fits_in_overflow() {
    let rect = Rect::new(Vec2::new(usize::MAX, 0), Vec2::new(2, 2));
    assert!(!rect.fits_in(Vec2::new(320, 240)));
}

#[test]
fn test_rect_is_empty() {
    assert!(Rect::new(Vec2::new(0usize, 0), Vec2::new(0, 10)).is_empty());
    assert!(!Rect::new(Vec2::new(0usize, 0), Vec2::new(1, 1)).is_empty());
}

#[test]
fn test_rect_contains_rect() {
    let outer = Rect::new(Vec2::new(0i32, 0), Vec2::new(10, 10));
    assert!(outer.contains_rect(Rect::new(Vec2::new(2, 2), Vec2::new(8, 8))));
    assert!(!outer.contains_rect(Rect::new(Vec2::new(2, 2), Vec2::new(9, 8))));
}

#[test]
fn test_vec2_area() {
    assert_eq!(Vec2::new(28usize, 28).area(), 784);
}
