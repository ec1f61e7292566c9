use glam::Vec2;

/// Returns the vector rotated 90 degrees counter-clockwise.
///
/// For an edge walked in body winding order this is the outward normal
/// direction (before normalization).
#[inline]
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Signed area of the polygon described by `points`, following the body
/// winding convention (positive for shapes built by [`crate::ClosedShape`]
/// constructors; reversing the vertex order negates the sign).
pub fn polygon_area<I>(points: I) -> f32
where
    I: IntoIterator<Item = Vec2>,
    I::IntoIter: Clone,
{
    let iter = points.into_iter();
    let mut prev = match iter.clone().last() {
        Some(last) => last,
        None => return 0.0,
    };

    let mut area = 0.0;
    for p in iter {
        area -= prev.perp_dot(p);
        prev = p;
    }

    area / 2.0
}

/// Tests two line segments for intersection.
///
/// Returns the hit point and the `Ua`/`Ub` parametric positions along each
/// segment, or `None` if the segments are parallel or do not cross.
pub fn line_intersect(
    a_start: Vec2,
    a_end: Vec2,
    b_start: Vec2,
    b_end: Vec2,
) -> Option<(Vec2, f32, f32)> {
    let denom = (b_end.y - b_start.y) * (a_end.x - a_start.x)
        - (b_end.x - b_start.x) * (a_end.y - a_start.y);

    // Parallel lines never intersect - being a bit generous on this one.
    if denom.abs() < f32::MIN_POSITIVE {
        return None;
    }

    let ua_top = (b_end.x - b_start.x) * (a_start.y - b_start.y)
        - (b_end.y - b_start.y) * (a_start.x - b_start.x);
    let ub_top = (a_end.x - a_start.x) * (a_start.y - b_start.y)
        - (a_end.y - a_start.y) * (a_start.x - b_start.x);

    let ua = ua_top / denom;
    let ub = ub_top / denom;

    if (0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub) {
        let hit = a_start + (a_end - a_start) * ua;
        return Some((hit, ua, ub));
    }

    None
}

/// Mean rotation angle carrying each `from` direction onto its `to`
/// direction.
///
/// Angles near the +-PI seam are unwrapped against the first pair so the
/// average stays meaningful for rigid rotations close to a half turn.
pub fn averaged_angle<I>(pairs: I) -> f32
where
    I: IntoIterator<Item = (Vec2, Vec2)>,
{
    use std::f32::consts::PI;

    let mut sum = 0.0;
    let mut count = 0usize;
    let mut original_sign = 1.0f32;
    let mut original_angle = 0.0;

    for (i, (from, to)) in pairs.into_iter().enumerate() {
        let from = from.normalize_or_zero();
        let to = to.normalize_or_zero();
        let mut angle = from.perp_dot(to).atan2(from.dot(to));

        if i == 0 {
            original_sign = if angle >= 0.0 { 1.0 } else { -1.0 };
            original_angle = angle;
        } else {
            let sign = if angle >= 0.0 { 1.0 } else { -1.0 };
            if (angle - original_angle).abs() > PI && sign != original_sign {
                angle = if sign < 0.0 {
                    PI + (PI + angle)
                } else {
                    (PI - angle) - PI
                };
            }
        }

        sum += angle;
        count += 1;
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Interpolates between `a` and `b` by the given ratio.
#[inline]
pub fn vector_ratio(a: Vec2, b: Vec2, ratio: f32) -> Vec2 {
    a + (b - a) * ratio
}

/// Wraps an angle difference into the `(-PI, PI]` range.
#[inline]
pub fn wrap_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;

    if angle.abs() >= PI {
        if angle < 0.0 {
            angle += PI * 2.0;
        } else {
            angle -= PI * 2.0;
        }
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unit_square_area_is_four() {
        // Half-extent 1 square in body winding order.
        let points = [
            Vec2::new(-1.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(-1.0, -1.0),
        ];

        assert_relative_eq!(polygon_area(points.iter().copied()), 4.0);

        let reversed: Vec<Vec2> = points.iter().rev().copied().collect();
        assert_relative_eq!(polygon_area(reversed.iter().copied()), -4.0);
    }

    #[test]
    fn crossing_segments_intersect_at_midpoint() {
        let hit = line_intersect(
            Vec2::new(-1.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(0.0, 1.0),
        );

        let (point, ua, ub) = hit.unwrap();
        assert_relative_eq!(point.x, 0.0);
        assert_relative_eq!(point.y, 0.0);
        assert_relative_eq!(ua, 0.5);
        assert_relative_eq!(ub, 0.5);
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let hit = line_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn wrap_angle_stays_in_range() {
        use std::f32::consts::PI;

        assert_relative_eq!(wrap_angle(PI * 1.5), -PI * 0.5);
        assert_relative_eq!(wrap_angle(-PI * 1.5), PI * 0.5);
        assert_relative_eq!(wrap_angle(0.25), 0.25);
    }
}
