//! Click points: mapping clicks on the scaled image back to natural-image
//! pixels, and the ordered log of recorded points.

use chrono::{DateTime, Utc};
use egui::{Pos2, Rect};
use uuid::Uuid;

/// A single recorded click, carrying both display-space and image-space
/// coordinates.
///
/// `display_x`/`display_y` are relative to the rendered image's top-left
/// corner and stay floating point. `image_x`/`image_y` are pixels on the
/// original image, rounded half-away-from-zero. Neither pair is clamped:
/// a click landing on a stale rect edge may map outside `0..width`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickPoint {
    pub id: String,
    pub display_x: f32,
    pub display_y: f32,
    pub image_x: i32,
    pub image_y: i32,
    pub timestamp: DateTime<Utc>,
}

impl ClickPoint {
    /// Map a pointer position to a new point, given the on-screen rect the
    /// image currently occupies and its natural pixel size.
    ///
    /// Returns `None` when the rect has no area (image not laid out yet),
    /// so a half-initialized frame never mints NaN coordinates.
    pub fn from_click(pointer: Pos2, rendered: Rect, natural_size: (u32, u32)) -> Option<Self> {
        if rendered.width() <= 0.0 || rendered.height() <= 0.0 {
            return None;
        }

        let scale_x = f64::from(natural_size.0) / f64::from(rendered.width());
        let scale_y = f64::from(natural_size.1) / f64::from(rendered.height());

        let display_x = pointer.x - rendered.left();
        let display_y = pointer.y - rendered.top();

        let image_x = (f64::from(display_x) * scale_x).round() as i32;
        let image_y = (f64::from(display_y) * scale_y).round() as i32;

        Some(Self {
            id: new_point_id(),
            display_x,
            display_y,
            image_x,
            image_y,
            timestamp: Utc::now(),
        })
    }

    /// Inverse of [`Self::from_click`]: where this point's image pixel lands
    /// inside the rect the image is currently drawn in. Used for the marker
    /// overlay only.
    pub fn marker_position(&self, rendered: Rect, natural_size: (u32, u32)) -> Pos2 {
        let scale_x = rendered.width() / natural_size.0 as f32;
        let scale_y = rendered.height() / natural_size.1 as f32;
        Pos2::new(
            rendered.left() + self.image_x as f32 * scale_x,
            rendered.top() + self.image_y as f32 * scale_y,
        )
    }
}

/// Generate an opaque, collision-resistant point id.
///
/// Ids never contain commas; the CSV export relies on that.
fn new_point_id() -> String {
    format!("click-{}", Uuid::new_v4().simple())
}

/// Ordered log of recorded points. Insertion order is the canonical order
/// for numbering, display and export.
#[derive(Debug, Default, Clone)]
pub struct PointLog {
    points: Vec<ClickPoint>,
}

impl PointLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point to the end of the log.
    pub fn push(&mut self, point: ClickPoint) {
        self.points.push(point);
    }

    /// Remove the point with the given id. No-op when the id is absent;
    /// the remaining points keep their order.
    pub fn remove(&mut self, id: &str) {
        if let Some(index) = self.points.iter().position(|p| p.id == id) {
            self.points.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[ClickPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    fn rect(left: f32, top: f32, width: f32, height: f32) -> Rect {
        Rect::from_min_size(pos2(left, top), vec2(width, height))
    }

    fn point_at(id: &str, image_x: i32, image_y: i32) -> ClickPoint {
        ClickPoint {
            id: id.to_owned(),
            display_x: image_x as f32,
            display_y: image_y as f32,
            image_x,
            image_y,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn click_scales_to_natural_coordinates() {
        // 1000x500 natural image shown at half size, click 100,50 into it.
        let p = ClickPoint::from_click(pos2(120.0, 80.0), rect(20.0, 30.0, 500.0, 250.0), (1000, 500))
            .unwrap();
        assert_eq!(p.display_x, 100.0);
        assert_eq!(p.display_y, 50.0);
        assert_eq!(p.image_x, 200);
        assert_eq!(p.image_y, 100);
    }

    #[test]
    fn identity_scale_keeps_coordinates() {
        let p = ClickPoint::from_click(pos2(141.5, 77.2), rect(0.0, 0.0, 800.0, 600.0), (800, 600))
            .unwrap();
        assert_eq!(p.image_x, 142);
        assert_eq!(p.image_y, 77);
    }

    #[test]
    fn click_outside_rect_is_not_clamped() {
        let p = ClickPoint::from_click(pos2(5.0, 350.0), rect(10.0, 10.0, 300.0, 300.0), (600, 600))
            .unwrap();
        assert_eq!(p.image_x, -10);
        assert_eq!(p.image_y, 680);
    }

    #[test]
    fn zero_area_rect_yields_no_point() {
        assert!(ClickPoint::from_click(pos2(50.0, 50.0), rect(0.0, 0.0, 0.0, 200.0), (800, 600)).is_none());
        assert!(ClickPoint::from_click(pos2(50.0, 50.0), rect(0.0, 0.0, 200.0, 0.0), (800, 600)).is_none());
    }

    #[test]
    fn marker_position_inverts_the_mapping() {
        let rendered = rect(20.0, 30.0, 500.0, 250.0);
        let p = ClickPoint::from_click(pos2(120.0, 80.0), rendered, (1000, 500)).unwrap();
        let marker = p.marker_position(rendered, (1000, 500));
        assert!((marker.x - 120.0).abs() < 0.5);
        assert!((marker.y - 80.0).abs() < 0.5);
    }

    #[test]
    fn ids_are_unique() {
        let mut log = PointLog::new();
        for _ in 0..100 {
            log.push(
                ClickPoint::from_click(pos2(5.0, 5.0), rect(0.0, 0.0, 10.0, 10.0), (10, 10))
                    .unwrap(),
            );
        }
        let mut ids: Vec<_> = log.points().iter().map(|p| p.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn removal_preserves_order_of_survivors() {
        let mut log = PointLog::new();
        log.push(point_at("a", 1, 1));
        log.push(point_at("b", 2, 2));
        log.push(point_at("c", 3, 3));
        log.push(point_at("d", 4, 4));

        log.remove("b");

        let ids: Vec<_> = log.points().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "d"]);
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut log = PointLog::new();
        log.push(point_at("a", 1, 1));
        log.push(point_at("b", 2, 2));

        log.remove("nope");

        let ids: Vec<_> = log.points().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = PointLog::new();
        log.push(point_at("a", 1, 1));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
    }
}
