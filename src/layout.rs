use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

pub const SPIDER_BASE_RADIUS: f32 = 40.0;
pub const SPIDER_RING_SPACING: f32 = 28.0;
pub const SPIDER_MIN_SPACING: f32 = 32.0;
const SPIDER_MIN_RING_CAPACITY: usize = 6;

pub fn ring_radius(ring: usize) -> f32 {
    SPIDER_BASE_RADIUS + (ring as f32 * SPIDER_RING_SPACING)
}

pub fn ring_capacity(radius: f32) -> usize {
    let fit = ((TAU * radius) / SPIDER_MIN_SPACING).floor() as usize;
    fit.max(SPIDER_MIN_RING_CAPACITY)
}

/// Offsets for fanning `count` markers out around a cluster anchor.
///
/// Rings are filled innermost first; each ring spreads its members evenly
/// over the full circle. Large clusters get more rings instead of tighter
/// spacing.
pub fn spider_layout(count: usize) -> Vec<Vec2> {
    let mut offsets = Vec::with_capacity(count);
    let mut ring = 0usize;

    while offsets.len() < count {
        let radius = ring_radius(ring);
        let remaining = count - offsets.len();
        let ring_count = remaining.min(ring_capacity(radius));

        for index in 0..ring_count {
            let angle = (index as f32 / ring_count as f32) * TAU;
            offsets.push(vec2(angle.cos(), angle.sin()) * radius);
        }

        ring += 1;
    }

    offsets
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn rings(offsets: &[Vec2]) -> Vec<(f32, usize)> {
        let mut rings: Vec<(f32, usize)> = Vec::new();
        for offset in offsets {
            let radius = offset.length();
            match rings.last_mut() {
                Some((last, count)) if (*last - radius).abs() < 0.01 => *count += 1,
                _ => rings.push((radius, 1)),
            }
        }
        rings
    }

    #[test]
    fn returns_exactly_count_offsets() {
        for count in 0..200 {
            assert_eq!(spider_layout(count).len(), count);
        }
    }

    #[test]
    fn six_fit_on_the_first_ring() {
        let rings = rings(&spider_layout(6));
        assert_eq!(rings.len(), 1);
        assert_abs_diff_eq!(rings[0].0, 40.0, epsilon = 0.01);
        assert_eq!(rings[0].1, 6);
    }

    #[test]
    fn ten_spill_onto_second_ring() {
        let rings = rings(&spider_layout(10));
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].1, 7);
        assert_eq!(rings[1].1, 3);
        assert_abs_diff_eq!(rings[1].0, 68.0, epsilon = 0.01);
    }

    #[test]
    fn ring_radius_strictly_increases() {
        let rings = rings(&spider_layout(150));
        assert!(rings.len() > 3);
        for pair in rings.windows(2) {
            assert!(pair[1].0 > pair[0].0);
        }
    }

    #[test]
    fn same_ring_members_keep_min_arc_spacing() {
        for count in [2, 7, 8, 20, 21, 64, 333] {
            for (radius, members) in rings(&spider_layout(count)) {
                if members < 2 {
                    continue;
                }
                let arc = TAU * radius / members as f32;
                assert!(arc >= SPIDER_MIN_SPACING, "count {count}: arc {arc}");
            }
        }
    }

    #[test]
    fn layout_is_deterministic() {
        assert_eq!(spider_layout(17), spider_layout(17));
    }

    #[test]
    fn single_member_sits_on_first_ring() {
        let offsets = spider_layout(1);
        assert_abs_diff_eq!(offsets[0].x, 40.0, epsilon = 1e-4);
        assert_abs_diff_eq!(offsets[0].y, 0.0, epsilon = 1e-4);
    }
}
