use crate::collision::CollisionInfo;
use crate::core::Body;

/// Narrow-phase pass of `body_a`'s points against `body_b`'s perimeter.
///
/// For every point of `body_a` inside `body_b`, the penetrated edge is
/// chosen by scanning `body_b`'s perimeter twice over: edges facing away
/// from the point normal are preferred, but when the nearest such edge is
/// already past the penetration threshold and a same-facing edge lies
/// closer, the point most likely tunneled through and the same-facing edge
/// is used instead.
///
/// Collisions are one-directional; callers run this twice with the bodies
/// swapped.
pub fn body_collide(
    body_a: &Body,
    body_b: &Body,
    penetration_threshold: f32,
    out: &mut Vec<CollisionInfo>,
) {
    let count_b = body_b.point_masses.len();
    if count_b == 0 {
        return;
    }

    for (point_index, pm) in body_a.point_masses.iter().enumerate() {
        let point = pm.position;
        if !body_b.contains(point) {
            continue;
        }

        let point_normal = body_a.point_normals[point_index];

        let mut info_away: Option<CollisionInfo> = None;
        let mut info_same: Option<CollisionInfo> = None;
        // Both tracked as squared distances until a winner is picked.
        let mut closest_away = f32::INFINITY;
        let mut closest_same = f32::INFINITY;
        let mut found_away = false;

        for edge_index in 0..count_b {
            let edge_start = edge_index;
            let edge_end = (edge_index + 1) % count_b;

            let distance_to_start =
                point.distance_squared(body_b.point_masses[edge_start].position);
            let distance_to_end = point.distance_squared(body_b.point_masses[edge_end].position);
            let edge_length_sq = body_b.edges[edge_index].length_squared;

            // Edge is entirely farther than the best candidates so far.
            if edge_length_sq < distance_to_start
                && edge_length_sq < distance_to_end
                && distance_to_start > closest_away
                && distance_to_start > closest_same
                && distance_to_end > closest_away
                && distance_to_end > closest_same
            {
                continue;
            }

            let (hit_point, normal, edge_ratio, distance_sq) =
                body_b.closest_point_on_edge_squared(point, edge_index);

            let candidate = CollisionInfo {
                body_a: body_a.id,
                body_a_point: point_index,
                body_b: body_b.id,
                body_b_edge_a: edge_start,
                body_b_edge_b: edge_end,
                hit_point,
                edge_ratio,
                normal,
                penetration: distance_sq,
            };

            if point_normal.dot(normal) <= 0.0 {
                if distance_sq < closest_away {
                    closest_away = distance_sq;
                    info_away = Some(candidate);
                    found_away = true;
                }
            } else if distance_sq < closest_same {
                closest_same = distance_sq;
                info_same = Some(candidate);
            }
        }

        let chosen = if found_away
            && closest_away > penetration_threshold
            && closest_same < closest_away
        {
            info_same
        } else {
            info_away
        };

        // A point can sit inside the body with no candidate edge when the
        // perimeter is degenerate; drop it rather than fabricate a contact.
        let Some(mut info) = chosen else {
            continue;
        };

        info.penetration = info.penetration.sqrt();
        out.push(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClosedShape;
    use glam::Vec2;

    fn square_at(position: Vec2, side: f32) -> Body {
        let mut body = Body::new(ClosedShape::square(side), position, 0.0, Vec2::ONE, 1.0);
        body.update_edges_and_normals();
        body.update_aabb(0.0, true);
        body
    }

    #[test]
    fn separated_bodies_produce_no_contacts() {
        let a = square_at(Vec2::ZERO, 2.0);
        let b = square_at(Vec2::new(5.0, 0.0), 2.0);

        let mut contacts = Vec::new();
        body_collide(&a, &b, 0.3, &mut contacts);
        assert!(contacts.is_empty());
    }

    #[test]
    fn overlapping_squares_report_penetrating_points() {
        let a = square_at(Vec2::ZERO, 2.0);
        let b = square_at(Vec2::new(1.8, 0.5), 2.0);

        let mut contacts = Vec::new();
        body_collide(&a, &b, 0.3, &mut contacts);

        assert!(!contacts.is_empty());
        for contact in &contacts {
            assert_eq!(contact.body_a, a.id);
            assert_eq!(contact.body_b, b.id);
            assert!(contact.penetration > 0.0);
            assert!(contact.penetration < 0.3);
            // The right-side points of A sank into B's left edge, so the
            // reported normal faces back toward A.
            assert!(contact.normal.x < 0.0);
        }
    }

    #[test]
    fn contact_edge_indices_are_adjacent() {
        let a = square_at(Vec2::ZERO, 2.0);
        let b = square_at(Vec2::new(0.0, 1.9), 2.0);

        let mut contacts = Vec::new();
        body_collide(&a, &b, 0.3, &mut contacts);

        for contact in &contacts {
            let count = b.point_masses.len();
            assert_eq!(contact.body_b_edge_b, (contact.body_b_edge_a + 1) % count);
            assert!((0.0..=1.0).contains(&contact.edge_ratio));
        }
    }
}
