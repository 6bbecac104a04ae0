//! Interaction field: the per-world collision registry.
//!
//! Detection and resolution are looked up by shape-kind pair, so a new shape
//! only has to register its pairwise handlers. Lookup is symmetric: a handler
//! registered for `(A, B)` also serves `(B, A)` with its arguments swapped.

use crate::entity::EntityMap;
use crate::ids::{EntityId, IdAllocator};
use crate::math::Vec2;
use crate::physics::{aabb, Collider, ColliderId, CollisionMask, PhysicsError, ShapeKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Read-only view of one side of a candidate pair.
pub struct Body<'a> {
    pub id: ColliderId,
    pub collider: &'a Collider,
    pub position: Vec2,
    pub prev_position: Vec2,
}

/// Mutable view of one side of a detected pair.
pub struct BodyMut<'a> {
    pub id: ColliderId,
    pub collider: &'a mut Collider,
    pub position: &'a mut Vec2,
    pub prev_position: Vec2,
}

/// Collision detected this frame between two colliders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifold {
    pub a: ColliderId,
    pub b: ColliderId,
    pub owner_a: EntityId,
    pub owner_b: EntityId,
    /// Per-axis separation each dynamic body needs (half the overlap).
    pub penetration: Vec2,
}

pub type DetectFn = fn(&Body<'_>, &Body<'_>) -> Option<Manifold>;
pub type ResolveFn = fn(&Manifold, &mut BodyMut<'_>, &mut BodyMut<'_>);
/// Decides whether two masks may be tested against each other.
pub type MaskPolicy = fn(CollisionMask, CollisionMask) -> bool;

pub struct InteractionField {
    ids: Arc<IdAllocator>,
    colliders: Vec<(ColliderId, Collider)>,
    detectors: HashMap<(ShapeKind, ShapeKind), DetectFn>,
    resolvers: HashMap<(ShapeKind, ShapeKind), ResolveFn>,
    mask_policy: MaskPolicy,
}

impl InteractionField {
    /// Field with the built-in AABB handlers registered.
    pub fn new(ids: Arc<IdAllocator>) -> Self {
        let mut field = Self::empty(ids);
        aabb::register(&mut field);
        field
    }

    /// Field with no shape handlers at all.
    pub fn empty(ids: Arc<IdAllocator>) -> Self {
        Self {
            ids,
            colliders: Vec::new(),
            detectors: HashMap::new(),
            resolvers: HashMap::new(),
            mask_policy: CollisionMask::intersects,
        }
    }

    pub fn register_detector(&mut self, a: ShapeKind, b: ShapeKind, detect: DetectFn) {
        self.detectors.insert((a, b), detect);
    }

    pub fn register_resolver(&mut self, a: ShapeKind, b: ShapeKind, resolve: ResolveFn) {
        self.resolvers.insert((a, b), resolve);
    }

    pub fn set_mask_policy(&mut self, policy: MaskPolicy) {
        self.mask_policy = policy;
    }

    /// Handler for the pair plus whether the arguments must be swapped.
    fn detector(&self, a: ShapeKind, b: ShapeKind) -> Result<(DetectFn, bool), PhysicsError> {
        if let Some(&f) = self.detectors.get(&(a, b)) {
            return Ok((f, false));
        }
        if let Some(&f) = self.detectors.get(&(b, a)) {
            return Ok((f, true));
        }
        Err(PhysicsError::MissingDetector { a, b })
    }

    fn resolver(&self, a: ShapeKind, b: ShapeKind) -> Result<(ResolveFn, bool), PhysicsError> {
        if let Some(&f) = self.resolvers.get(&(a, b)) {
            return Ok((f, false));
        }
        if let Some(&f) = self.resolvers.get(&(b, a)) {
            return Ok((f, true));
        }
        Err(PhysicsError::MissingResolver { a, b })
    }

    // ── Colliders ───────────────────────────────────────────────────

    pub fn add_collider(&mut self, collider: Collider) -> Result<ColliderId, PhysicsError> {
        if !collider.is_static && !(collider.mass() > 0.0 && collider.mass().is_finite()) {
            return Err(PhysicsError::InvalidMass {
                mass: collider.mass(),
            });
        }
        let id = self.ids.next_component();
        trace!(collider = %id, owner = %collider.owner(), shape = %collider.shape_kind(), "collider added");
        self.colliders.push((id, collider));
        Ok(id)
    }

    pub fn remove_collider(&mut self, id: ColliderId) -> Option<Collider> {
        let index = self.index_of(id)?;
        Some(self.colliders.remove(index).1)
    }

    /// Drop every collider owned by `entity`. Returns how many were removed.
    pub fn remove_colliders_of(&mut self, entity: EntityId) -> usize {
        let before = self.colliders.len();
        self.colliders.retain(|(_, c)| c.owner() != entity);
        before - self.colliders.len()
    }

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.index_of(id).map(|i| &self.colliders[i].1)
    }

    pub fn collider_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        self.index_of(id).map(move |i| &mut self.colliders[i].1)
    }

    pub fn colliders(&self) -> impl Iterator<Item = (ColliderId, &Collider)> {
        self.colliders.iter().map(|(id, c)| (*id, c))
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    fn index_of(&self, id: ColliderId) -> Option<usize> {
        // ids are minted in increasing order and removal keeps order
        self.colliders.binary_search_by_key(&id, |(cid, _)| *cid).ok()
    }

    // ── Frame ───────────────────────────────────────────────────────

    /// Advance dynamic bodies by their velocity.
    pub fn integrate(&self, entities: &mut EntityMap, dt: f32) {
        if dt == 0.0 {
            return;
        }
        for (_, collider) in &self.colliders {
            if collider.is_static || collider.velocity == Vec2::ZERO {
                continue;
            }
            if let Some(entity) = entities.get_mut(&collider.owner()) {
                entity.translate(collider.velocity * dt);
            }
        }
    }

    /// Test every compatible unordered pair once.
    pub fn detect(&self, entities: &EntityMap) -> Result<Vec<Manifold>, PhysicsError> {
        let mut manifolds = Vec::new();
        for i in 0..self.colliders.len() {
            for j in (i + 1)..self.colliders.len() {
                let (id_a, a) = &self.colliders[i];
                let (id_b, b) = &self.colliders[j];
                if a.owner() == b.owner() || !(self.mask_policy)(a.mask, b.mask) {
                    continue;
                }
                let (Some(ea), Some(eb)) = (entities.get(&a.owner()), entities.get(&b.owner())) else {
                    continue;
                };

                let (detect, swapped) = self.detector(a.shape_kind(), b.shape_kind())?;
                let body_a = Body {
                    id: *id_a,
                    collider: a,
                    position: ea.position(),
                    prev_position: ea.prev_position(),
                };
                let body_b = Body {
                    id: *id_b,
                    collider: b,
                    position: eb.position(),
                    prev_position: eb.prev_position(),
                };
                let hit = if swapped {
                    detect(&body_b, &body_a)
                } else {
                    detect(&body_a, &body_b)
                };
                manifolds.extend(hit);
            }
        }
        Ok(manifolds)
    }

    /// Apply the pair's resolver and write corrected positions back.
    pub fn resolve(&mut self, manifold: &Manifold, entities: &mut EntityMap) -> Result<(), PhysicsError> {
        let ia = self
            .index_of(manifold.a)
            .ok_or(PhysicsError::UnknownCollider { id: manifold.a })?;
        let ib = self
            .index_of(manifold.b)
            .ok_or(PhysicsError::UnknownCollider { id: manifold.b })?;
        let (resolve, swapped) = self.resolver(
            self.colliders[ia].1.shape_kind(),
            self.colliders[ib].1.shape_kind(),
        )?;

        let (Some(ea), Some(eb)) = (entities.get(&manifold.owner_a), entities.get(&manifold.owner_b)) else {
            return Ok(());
        };
        let (mut pos_a, prev_a) = (ea.position(), ea.prev_position());
        let (mut pos_b, prev_b) = (eb.position(), eb.prev_position());

        let (slot_a, slot_b) = pair_mut(&mut self.colliders, ia, ib);
        let mut body_a = BodyMut {
            id: manifold.a,
            collider: &mut slot_a.1,
            position: &mut pos_a,
            prev_position: prev_a,
        };
        let mut body_b = BodyMut {
            id: manifold.b,
            collider: &mut slot_b.1,
            position: &mut pos_b,
            prev_position: prev_b,
        };
        if swapped {
            resolve(manifold, &mut body_b, &mut body_a);
        } else {
            resolve(manifold, &mut body_a, &mut body_b);
        }

        if let Some(e) = entities.get_mut(&manifold.owner_a) {
            e.set_position(pos_a);
        }
        if let Some(e) = entities.get_mut(&manifold.owner_b) {
            e.set_position(pos_b);
        }
        Ok(())
    }

    /// Integrate, detect, resolve. Returns this frame's manifolds.
    pub fn step(&mut self, entities: &mut EntityMap, dt: f32) -> Result<Vec<Manifold>, PhysicsError> {
        self.integrate(entities, dt);
        let manifolds = self.detect(entities)?;
        for manifold in &manifolds {
            self.resolve(manifold, entities)?;
        }
        trace!(colliders = self.colliders.len(), contacts = manifolds.len(), "physics step");
        Ok(manifolds)
    }
}

fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = items.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = items.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}
