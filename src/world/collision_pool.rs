use std::rc::Rc;

use log::debug;
use slotmap::SlotMap;

use crate::collision::{CollisionDetector, QuadTree};
use crate::config::{BroadPhase, CollisionConfig};
use crate::integration::integrator;
use crate::math::vec2::Vec2;
use crate::objects::{BodyKey, Collidable};

/// Counters from one detection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Bodies placed in the quad tree.
    pub indexed: usize,
    /// Candidate pairs handed to the narrow phase.
    pub pairs_tested: usize,
    /// Pairs that overlapped and were resolved.
    pub collisions: usize,
}

/// Owns a set of bodies and resolves their overlaps once per frame.
pub struct CollisionPool {
    config: CollisionConfig,
    detector: Rc<CollisionDetector>,
    bodies: SlotMap<BodyKey, Collidable>,
    // Registration order, which is also the resolution order
    order: Vec<BodyKey>,
    tree: QuadTree<BodyKey>,
    candidates: Vec<BodyKey>,
}

impl CollisionPool {
    /// Creates an empty pool. The detector may be shared with other pools.
    pub fn new(config: CollisionConfig, detector: Rc<CollisionDetector>) -> Self {
        let tree = QuadTree::new(config.region, config.node_capacity, config.max_depth);
        Self {
            config,
            detector,
            bodies: SlotMap::with_key(),
            order: Vec::new(),
            tree,
            candidates: Vec::new(),
        }
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    pub fn detector(&self) -> &Rc<CollisionDetector> {
        &self.detector
    }

    /// Registers a body. It takes part from the next detection pass.
    pub fn add_body(&mut self, body: Collidable) -> BodyKey {
        let key = self.bodies.insert(body);
        self.order.push(key);
        key
    }

    /// Unregisters a body and hands it back.
    pub fn remove_body(&mut self, key: BodyKey) -> Option<Collidable> {
        let body = self.bodies.remove(key)?;
        self.order.retain(|k| *k != key);
        Some(body)
    }

    pub fn body(&self, key: BodyKey) -> Option<&Collidable> {
        self.bodies.get(key)
    }

    pub fn body_mut(&mut self, key: BodyKey) -> Option<&mut Collidable> {
        self.bodies.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = BodyKey> + '_ {
        self.order.iter().copied()
    }

    /// Integrates every body by `dt` frames, then runs a detection pass.
    pub fn step(&mut self, dt: f64) -> FrameStats {
        for body in self.bodies.values_mut() {
            integrator::integrate(body, dt);
        }
        self.check_collision()
    }

    /// Runs one full detection and resolution pass over all bodies.
    ///
    /// Every unordered pair is resolved at most once: a body that has served
    /// as the reference is skipped as a candidate for the rest of the pass.
    pub fn check_collision(&mut self) -> FrameStats {
        let mut stats = FrameStats::default();

        self.tree.clear();
        for &key in &self.order {
            let Some(body) = self.bodies.get_mut(key) else {
                continue;
            };
            if let Some(rect) = body.bounding_rect() {
                self.tree.insert(key, rect);
                stats.indexed += 1;
            }
        }

        for i in 0..self.order.len() {
            let key_a = self.order[i];
            let Some(reference) = self.bodies.get_mut(key_a) else {
                continue;
            };
            if !reference.collision_enabled {
                continue;
            }
            let Some(rect) = reference.bounding_rect() else {
                continue;
            };

            self.candidates.clear();
            match self.config.broad_phase {
                BroadPhase::Containing => self.tree.retrieve(&mut self.candidates, &rect),
                BroadPhase::Overlapping => {
                    self.tree.retrieve_overlapping(&mut self.candidates, &rect)
                }
            }

            for c in 0..self.candidates.len() {
                let key_b = self.candidates[c];
                if key_b == key_a {
                    continue;
                }
                let Some([a, b]) = self.bodies.get_disjoint_mut([key_a, key_b]) else {
                    continue;
                };
                if b.collision_checked || !b.collision_enabled {
                    continue;
                }
                stats.pairs_tested += 1;
                if self.detector.check_and_respond(a, key_a, b, key_b) {
                    stats.collisions += 1;
                }
            }

            if let Some(reference) = self.bodies.get_mut(key_a) {
                reference.collision_checked = true;
            }
        }

        for body in self.bodies.values_mut() {
            body.collision_checked = false;
        }
        self.tree.clear();

        debug!(
            "collision pass: {} indexed, {} pairs tested, {} resolved",
            stats.indexed, stats.pairs_tested, stats.collisions
        );
        stats
    }

    /// Whether the body would overlap any enabled body if it stood at `position`.
    ///
    /// Scans every body directly, bypassing the quad tree. The body is put back
    /// where it was before returning. Unknown keys never collide.
    pub fn test_collision(&mut self, key: BodyKey, position: Vec2) -> bool {
        let Some(moved) = self.bodies.get_mut(key) else {
            return false;
        };
        let original = moved.position();
        moved.set_position(position);

        let mut hit = false;
        for &other in &self.order {
            if other == key {
                continue;
            }
            let Some([moved, candidate]) = self.bodies.get_disjoint_mut([key, other]) else {
                continue;
            };
            if !candidate.collision_enabled {
                continue;
            }
            if self.detector.check(moved, candidate).is_some() {
                hit = true;
                break;
            }
        }

        if let Some(moved) = self.bodies.get_mut(key) {
            moved.set_position(original);
        }
        hit
    }
}
