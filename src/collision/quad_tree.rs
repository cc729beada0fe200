//! Quad tree broad phase, rebuilt from scratch every frame.
//!
//! Nodes live in an arena that survives [`QuadTree::clear`], so a steady-state
//! frame allocates nothing. Node 0 is always the root.

use log::trace;

use super::aabb::AABB;
use crate::math::Vec2;

#[derive(Debug, Clone)]
struct Node<T> {
    bounds: AABB,
    level: usize,
    items: Vec<(T, AABB)>,
    /// Index of the first of four consecutive children, once split.
    children: Option<usize>,
}

impl<T> Node<T> {
    fn reset(&mut self, bounds: AABB, level: usize) {
        self.bounds = bounds;
        self.level = level;
        self.items.clear();
        self.children = None;
    }
}

/// Spatial index over axis-aligned rectangles tagged with a `Copy` id.
///
/// An item is held by the deepest node whose quadrant fully contains its
/// rectangle. Items straddling a midline stay at the parent.
#[derive(Debug, Clone)]
pub struct QuadTree<T: Copy> {
    nodes: Vec<Node<T>>,
    in_use: usize,
    capacity: usize,
    max_depth: usize,
    len: usize,
    /// Scratch for [`QuadTree::retrieve_overlapping`].
    stack: Vec<usize>,
}

impl<T: Copy> QuadTree<T> {
    /// Creates an empty tree covering `region`.
    ///
    /// A node splits once it holds more than `capacity` items and its level is
    /// below `max_depth`. The root is level 0.
    pub fn new(region: AABB, capacity: usize, max_depth: usize) -> Self {
        let root = Node {
            bounds: region,
            level: 0,
            items: Vec::new(),
            children: None,
        };
        Self {
            nodes: vec![root],
            in_use: 1,
            capacity,
            max_depth,
            len: 0,
            stack: Vec::new(),
        }
    }

    pub fn region(&self) -> AABB {
        self.nodes[0].bounds
    }

    /// Number of items currently indexed.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes in use this frame.
    pub fn node_count(&self) -> usize {
        self.in_use
    }

    /// Deepest level reached this frame.
    pub fn depth(&self) -> usize {
        self.nodes[..self.in_use]
            .iter()
            .map(|n| n.level)
            .max()
            .unwrap_or(0)
    }

    /// Drops every item and child node while keeping the arena allocations.
    pub fn clear(&mut self) {
        let region = self.nodes[0].bounds;
        self.nodes[0].reset(region, 0);
        self.in_use = 1;
        self.len = 0;
    }

    pub fn insert(&mut self, id: T, rect: AABB) {
        self.len += 1;
        self.insert_at(0, id, rect);
    }

    /// Pushes every item held on the path from the root to the deepest node
    /// fully containing `rect`.
    pub fn retrieve(&self, out: &mut Vec<T>, rect: &AABB) {
        let mut index = 0;
        loop {
            let node = &self.nodes[index];
            out.extend(node.items.iter().map(|(id, _)| *id));
            match node.children.zip(quadrant(&node.bounds, rect)) {
                Some((first, q)) => index = first + q,
                None => break,
            }
        }
    }

    /// Like [`QuadTree::retrieve`], but also descends into every quadrant the
    /// query rectangle reaches, so items held below a straddling query are found.
    pub fn retrieve_overlapping(&mut self, out: &mut Vec<T>, rect: &AABB) {
        self.stack.clear();
        self.stack.push(0);
        while let Some(index) = self.stack.pop() {
            let node = &self.nodes[index];
            out.extend(node.items.iter().map(|(id, _)| *id));
            if let Some(first) = node.children {
                let (mid_x, mid_y) = midlines(&node.bounds);
                let top = rect.min.y < mid_y;
                let bottom = rect.max.y > mid_y;
                let left = rect.min.x < mid_x;
                let right = rect.max.x > mid_x;
                // Reverse order so quadrant 0 is visited first
                let reach = [top && right, top && left, bottom && left, bottom && right];
                for q in (0..4).rev() {
                    if reach[q] {
                        self.stack.push(first + q);
                    }
                }
            }
        }
    }

    fn insert_at(&mut self, index: usize, id: T, rect: AABB) {
        if let Some(first) = self.nodes[index].children {
            if let Some(q) = quadrant(&self.nodes[index].bounds, &rect) {
                self.insert_at(first + q, id, rect);
                return;
            }
        }

        self.nodes[index].items.push((id, rect));

        let node = &self.nodes[index];
        if node.items.len() > self.capacity && node.level < self.max_depth {
            if node.children.is_none() {
                self.split(index);
            }
            self.redistribute(index);
        }
    }

    fn split(&mut self, index: usize) {
        let bounds = self.nodes[index].bounds;
        let level = self.nodes[index].level + 1;
        let half_w = bounds.width() / 2.0;
        let half_h = bounds.height() / 2.0;
        let x = bounds.min.x;
        let y = bounds.min.y;

        let first = self.in_use;
        let origins = [
            (x + half_w, y),
            (x, y),
            (x, y + half_h),
            (x + half_w, y + half_h),
        ];
        for (ox, oy) in origins {
            let child = AABB::from_origin_size(Vec2::new(ox, oy), half_w, half_h);
            self.alloc(child, level);
        }
        self.nodes[index].children = Some(first);
        trace!("quad tree node {index} split at level {}", level - 1);
    }

    fn redistribute(&mut self, index: usize) {
        let Some(first) = self.nodes[index].children else {
            return;
        };
        let bounds = self.nodes[index].bounds;
        let mut i = 0;
        while i < self.nodes[index].items.len() {
            let (id, rect) = self.nodes[index].items[i];
            match quadrant(&bounds, &rect) {
                Some(q) => {
                    self.nodes[index].items.remove(i);
                    self.insert_at(first + q, id, rect);
                }
                None => i += 1,
            }
        }
    }

    fn alloc(&mut self, bounds: AABB, level: usize) -> usize {
        let index = self.in_use;
        if let Some(node) = self.nodes.get_mut(index) {
            node.reset(bounds, level);
        } else {
            self.nodes.push(Node {
                bounds,
                level,
                items: Vec::new(),
                children: None,
            });
        }
        self.in_use += 1;
        index
    }
}

fn midlines(bounds: &AABB) -> (f64, f64) {
    (
        bounds.min.x + bounds.width() / 2.0,
        bounds.min.y + bounds.height() / 2.0,
    )
}

/// Quadrant fully containing `rect`: 0 top-right, 1 top-left, 2 bottom-left,
/// 3 bottom-right. `None` when it straddles a midline.
fn quadrant(bounds: &AABB, rect: &AABB) -> Option<usize> {
    let (mid_x, mid_y) = midlines(bounds);

    let top = rect.max.y < mid_y;
    let bottom = rect.min.y > mid_y;
    let left = rect.max.x < mid_x;
    let right = rect.min.x > mid_x;

    match (top, bottom, left, right) {
        (true, _, _, true) => Some(0),
        (true, _, true, _) => Some(1),
        (_, true, true, _) => Some(2),
        (_, true, _, true) => Some(3),
        _ => None,
    }
}
