//! Built-in box-versus-box handlers.
//!
//! Resolution is sequential per axis, not a general separating-axis solver:
//! x is checked and separated first, then the working boxes are re-centred
//! and y is checked. Diagonal corner hits can therefore resolve in an
//! order-dependent way.

use crate::math::{single_axis_overlap, Rect, Vec2};
use crate::physics::{
    Aabb, Body, BodyMut, InteractionField, Manifold, SEPARATION_EPSILON,
};

pub(crate) fn register(field: &mut InteractionField) {
    field.register_detector(Aabb::KIND, Aabb::KIND, detect_aabb_aabb);
    field.register_resolver(Aabb::KIND, Aabb::KIND, resolve_aabb_aabb);
}

/// Manifold carrying half the per-axis overlap (plus a small epsilon) when
/// the two boxes overlap at their current positions.
pub fn detect_aabb_aabb(a: &Body<'_>, b: &Body<'_>) -> Option<Manifold> {
    let rect_a = a.collider.shape().bounds(a.position);
    let rect_b = b.collider.shape().bounds(b.position);
    if !rect_a.overlaps(&rect_b) {
        return None;
    }

    let corners_a = rect_a.corners();
    let corners_b = rect_b.corners();
    let penetration = Vec2::new(
        single_axis_overlap(&corners_a, &corners_b, Vec2::X) / 2.0 + SEPARATION_EPSILON,
        single_axis_overlap(&corners_a, &corners_b, Vec2::Y) / 2.0 + SEPARATION_EPSILON,
    );

    Some(Manifold {
        a: a.id,
        b: b.id,
        owner_a: a.collider.owner(),
        owner_b: b.collider.owner(),
        penetration,
    })
}

/// Exchange velocities and push the boxes apart, x first, then y.
pub fn resolve_aabb_aabb(manifold: &Manifold, a: &mut BodyMut<'_>, b: &mut BodyMut<'_>) {
    // start from where the bodies were and re-enter one axis at a time
    let mut rect_a = a.collider.shape().bounds(Vec2::new(a.position.x, a.prev_position.y));
    let mut rect_b = b.collider.shape().bounds(Vec2::new(b.position.x, b.prev_position.y));

    if rect_a.overlaps(&rect_b) {
        resolve_axis(Axis::X, manifold.penetration.x, a, b, &mut rect_a, &mut rect_b);
    }

    rect_a.set_center_y(a.position.y);
    rect_b.set_center_y(b.position.y);

    if rect_a.overlaps(&rect_b) {
        resolve_axis(Axis::Y, manifold.penetration.y, a, b, &mut rect_a, &mut rect_b);
    }

    *a.position = rect_a.center();
    *b.position = rect_b.center();
}

#[derive(Copy, Clone)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn get(self, v: Vec2) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    fn set(self, v: &mut Vec2, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
        }
    }

    fn unit(self) -> Vec2 {
        match self {
            Axis::X => Vec2::X,
            Axis::Y => Vec2::Y,
        }
    }
}

fn resolve_axis(
    axis: Axis,
    penetration: f32,
    a: &mut BodyMut<'_>,
    b: &mut BodyMut<'_>,
    rect_a: &mut Rect,
    rect_b: &mut Rect,
) {
    let (va, vb) = elastic_exchange(
        axis.get(a.collider.velocity),
        axis.get(b.collider.velocity),
        a.collider.mass(),
        b.collider.mass(),
        a.collider.is_static,
        b.collider.is_static,
    );
    axis.set(&mut a.collider.velocity, va);
    axis.set(&mut b.collider.velocity, vb);

    // +1 when b sits on the positive side of a
    let direction = if axis.get(rect_b.center()) >= axis.get(rect_a.center()) {
        1.0
    } else {
        -1.0
    };
    let push = axis.unit() * (penetration * direction);

    match (a.collider.is_static, b.collider.is_static) {
        (true, true) => {}
        (true, false) => rect_b.min += push * 2.0,
        (false, true) => rect_a.min -= push * 2.0,
        (false, false) => {
            rect_a.min -= push;
            rect_b.min += push;
        }
    }
}

/// Post-collision velocities along one axis. A static body has infinite mass:
/// it ends at rest and the other body bounces back.
/// The static body's own velocity is not used, so a moving "static" body
/// does not push.
fn elastic_exchange(v1: f32, v2: f32, m1: f32, m2: f32, static1: bool, static2: bool) -> (f32, f32) {
    match (static1, static2) {
        (true, true) => (0.0, 0.0),
        (true, false) => (0.0, -v2),
        (false, true) => (-v1, 0.0),
        (false, false) => {
            let total = m1 + m2;
            (
                ((m1 - m2) * v1 + 2.0 * m2 * v2) / total,
                ((m2 - m1) * v2 + 2.0 * m1 * v1) / total,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::entity::{Entity, EntityMap};
    use crate::ids::{EntityId, IdAllocator};
    use crate::math::Vec2;
    use crate::physics::{Aabb, Collider, ColliderId, InteractionField};
    use crate::world::WorldConfig;
    use std::sync::Arc;

    struct Scene {
        field: InteractionField,
        entities: EntityMap,
        ids: Arc<IdAllocator>,
    }

    impl Scene {
        fn new() -> Self {
            let ids = Arc::new(IdAllocator::new());
            Self {
                field: InteractionField::new(Arc::clone(&ids)),
                entities: EntityMap::new(),
                ids,
            }
        }

        fn body(&mut self, position: Vec2, collider: impl FnOnce(EntityId) -> Collider) -> (EntityId, ColliderId) {
            let mut e = Entity::new(self.ids.next_entity(), "body").with_position(position);
            e.attach(&WorldConfig::default());
            let id = e.id();
            self.entities.insert(id, e);
            let cid = self.field.add_collider(collider(id)).unwrap();
            (id, cid)
        }
    }

    #[test]
    fn separated_boxes_do_not_collide() {
        let mut scene = Scene::new();
        scene.body(Vec2::ZERO, |e| Collider::new(e, Aabb::new(10.0, 10.0)));
        scene.body(Vec2::new(10.0, 0.0), |e| Collider::new(e, Aabb::new(10.0, 10.0)));
        assert!(scene.field.step(&mut scene.entities, 0.0).unwrap().is_empty());
    }

    #[test]
    fn penetration_is_half_the_overlap() {
        let mut scene = Scene::new();
        scene.body(Vec2::ZERO, |e| Collider::new(e, Aabb::new(10.0, 10.0)).fixed());
        scene.body(Vec2::new(6.0, 2.0), |e| Collider::new(e, Aabb::new(10.0, 10.0)).fixed());
        let manifolds = scene.field.detect(&scene.entities).unwrap();
        assert_eq!(manifolds.len(), 1);
        let pen = manifolds[0].penetration;
        assert!((pen.x - 2.0001).abs() < 1e-4);
        assert!((pen.y - 4.0001).abs() < 1e-4);
    }

    #[test]
    fn equal_masses_swap_velocities_head_on() {
        let mut scene = Scene::new();
        let (a, ca) = scene.body(Vec2::new(-4.0, 0.0), |e| {
            Collider::new(e, Aabb::new(10.0, 10.0)).with_velocity(Vec2::new(40.0, 0.0))
        });
        let (b, cb) = scene.body(Vec2::new(4.0, 0.0), |e| {
            Collider::new(e, Aabb::new(10.0, 10.0)).with_velocity(Vec2::new(-40.0, 0.0))
        });

        let manifolds = scene.field.step(&mut scene.entities, 0.0).unwrap();
        assert_eq!(manifolds.len(), 1);
        assert_eq!(scene.field.collider(ca).unwrap().velocity, Vec2::new(-40.0, 0.0));
        assert_eq!(scene.field.collider(cb).unwrap().velocity, Vec2::new(40.0, 0.0));

        // pushed apart symmetrically, no longer overlapping
        let pa = scene.entities[&a].position();
        let pb = scene.entities[&b].position();
        assert!(pa.x < -4.0 && pb.x > 4.0);
        assert!((pa.x + pb.x).abs() < 1e-4);
        assert!(pb.x - pa.x >= 10.0);
    }

    #[test]
    fn unequal_masses_conserve_momentum() {
        let mut scene = Scene::new();
        let (_, ca) = scene.body(Vec2::new(-4.0, 0.0), |e| {
            Collider::new(e, Aabb::new(10.0, 10.0))
                .with_velocity(Vec2::new(30.0, 0.0))
                .with_mass(3.0)
        });
        let (_, cb) = scene.body(Vec2::new(4.0, 0.0), |e| {
            Collider::new(e, Aabb::new(10.0, 10.0)).with_velocity(Vec2::new(-10.0, 0.0))
        });

        scene.field.step(&mut scene.entities, 0.0).unwrap();
        let va = scene.field.collider(ca).unwrap().velocity.x;
        let vb = scene.field.collider(cb).unwrap().velocity.x;
        assert!((3.0 * va + vb - (3.0 * 30.0 - 10.0)).abs() < 1e-4);
        assert!((va - 10.0).abs() < 1e-4);
        assert!((vb - 50.0).abs() < 1e-4);
    }

    #[test]
    fn static_body_is_immovable_and_stops() {
        let mut scene = Scene::new();
        let (wall, cw) = scene.body(Vec2::new(10.0, 0.0), |e| {
            Collider::new(e, Aabb::new(10.0, 10.0))
                .with_velocity(Vec2::new(5.0, 5.0))
                .fixed()
        });
        let (ball, cb) = scene.body(Vec2::new(2.0, 0.0), |e| {
            Collider::new(e, Aabb::new(10.0, 10.0)).with_velocity(Vec2::new(20.0, 0.0))
        });

        scene.field.step(&mut scene.entities, 0.0).unwrap();
        assert_eq!(scene.field.collider(cw).unwrap().velocity.x, 0.0);
        assert_eq!(scene.entities[&wall].position(), Vec2::new(10.0, 0.0));

        // full overlap correction lands on the dynamic body
        let ball_pos = scene.entities[&ball].position();
        assert!(ball_pos.x <= 0.0);
        assert_eq!(scene.field.collider(cb).unwrap().velocity.x, -20.0);
    }

    #[test]
    fn falling_body_lands_on_floor() {
        let mut scene = Scene::new();
        let (_, cf) = scene.body(Vec2::new(0.0, 20.0), |e| Collider::new(e, Aabb::new(100.0, 10.0)).fixed());
        let (body, cb) = scene.body(Vec2::new(0.0, 10.0), |e| {
            Collider::new(e, Aabb::new(10.0, 10.0)).with_velocity(Vec2::new(0.0, 10.0))
        });

        // 0.6s at 10 units/s sinks the body 6 units into the floor
        scene.field.step(&mut scene.entities, 0.6).unwrap();

        let pos = scene.entities[&body].position();
        assert_eq!(pos.x, 0.0);
        assert!(pos.y <= 10.0);
        assert_eq!(scene.field.collider(cb).unwrap().velocity.y, -10.0);
        assert_eq!(scene.field.collider(cf).unwrap().velocity.y, 0.0);
    }
}
