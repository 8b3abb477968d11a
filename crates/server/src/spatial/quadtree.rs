//! QuadTree for spatial indexing.
//!
//! Entries that fit entirely inside one quadrant are pushed down into it;
//! entries straddling a split line stay in the parent. A query therefore
//! returns every entry of every node whose region it touches, which is a
//! superset of the true hits. Callers refine with exact shape tests.

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Create bounds from center and half extent.
    #[inline]
    pub fn from_center(cx: f32, cy: f32, size: f32) -> Self {
        Self {
            min_x: cx - size,
            min_y: cy - size,
            max_x: cx + size,
            max_y: cy + size,
        }
    }

    /// Check if two bounds intersect. Touching edges count.
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.min_x > self.max_x
            || other.max_x < self.min_x
            || other.min_y > self.max_y
            || other.max_y < self.min_y)
    }

    /// Check if `other` lies entirely inside these bounds.
    #[inline]
    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Get the width of the bounds.
    #[inline]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Get the height of the bounds.
    #[inline]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Get center X.
    #[inline]
    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) / 2.0
    }

    /// Get center Y.
    #[inline]
    pub fn center_y(&self) -> f32 {
        (self.min_y + self.max_y) / 2.0
    }

    fn quadrants(&self) -> [Bounds; 4] {
        let cx = self.center_x();
        let cy = self.center_y();
        [
            Bounds::new(cx, self.min_y, self.max_x, cy),
            Bounds::new(self.min_x, self.min_y, cx, cy),
            Bounds::new(self.min_x, cy, cx, self.max_y),
            Bounds::new(cx, cy, self.max_x, self.max_y),
        ]
    }
}

/// Which collection an entry's id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Pellet,
    Projectile,
}

/// An item stored in the QuadTree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadItem {
    pub kind: EntityKind,
    /// Id in the owning collection.
    pub id: u32,
    pub bound: Bounds,
}

impl QuadItem {
    #[inline]
    pub fn new(kind: EntityKind, id: u32, bound: Bounds) -> Self {
        Self { kind, id, bound }
    }
}

/// QuadTree node for efficient spatial queries.
#[derive(Debug)]
pub struct QuadTree {
    bounds: Bounds,
    max_objects: usize,
    max_levels: u32,
    level: u32,
    items: Vec<QuadItem>,
    nodes: Option<Box<[QuadTree; 4]>>,
}

impl QuadTree {
    /// Create a new QuadTree with the given bounds.
    pub fn new(bounds: Bounds, max_objects: usize, max_levels: u32) -> Self {
        Self::with_level(bounds, max_objects.max(1), max_levels, 0)
    }

    /// Create a QuadTree covering an arena of `[0, width] x [0, height]`.
    pub fn for_world(width: f32, height: f32, max_objects: usize, max_levels: u32) -> Self {
        Self::new(Bounds::new(0.0, 0.0, width, height), max_objects, max_levels)
    }

    fn with_level(bounds: Bounds, max_objects: usize, max_levels: u32, level: u32) -> Self {
        Self {
            bounds,
            max_objects,
            max_levels,
            level,
            items: Vec::new(),
            nodes: None,
        }
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    fn split(&mut self) {
        let [a, b, c, d] = self.bounds.quadrants();
        let level = self.level + 1;
        let (objects, levels) = (self.max_objects, self.max_levels);
        self.nodes = Some(Box::new([
            QuadTree::with_level(a, objects, levels, level),
            QuadTree::with_level(b, objects, levels, level),
            QuadTree::with_level(c, objects, levels, level),
            QuadTree::with_level(d, objects, levels, level),
        ]));
    }

    /// Index of the child that fully contains `bound`, if any.
    #[inline]
    fn fitting_child(nodes: &[QuadTree; 4], bound: &Bounds) -> Option<usize> {
        nodes.iter().position(|n| n.bounds.contains(bound))
    }

    /// Insert an item, subdividing once capacity is exceeded and depth allows.
    pub fn insert(&mut self, item: QuadItem) {
        if let Some(nodes) = self.nodes.as_mut() {
            match Self::fitting_child(nodes, &item.bound) {
                Some(i) => nodes[i].insert(item),
                None => self.items.push(item),
            }
            return;
        }

        self.items.push(item);
        if self.items.len() > self.max_objects && self.level < self.max_levels {
            self.split();
            let items = std::mem::take(&mut self.items);
            for item in items {
                self.insert(item);
            }
        }
    }

    /// Append every entry that may intersect `bound` to `out`.
    ///
    /// No entry whose bounds intersect `bound` is ever omitted.
    pub fn retrieve(&self, bound: &Bounds, out: &mut Vec<QuadItem>) {
        out.extend_from_slice(&self.items);
        if let Some(nodes) = self.nodes.as_ref() {
            for node in nodes.iter() {
                if node.bounds.intersects(bound) {
                    node.retrieve(bound, out);
                }
            }
        }
    }

    /// Total number of entries in this node and all descendants.
    pub fn len(&self) -> usize {
        self.items.len()
            + self
                .nodes
                .as_ref()
                .map_or(0, |nodes| nodes.iter().map(QuadTree::len).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deepest level reached below this node.
    pub fn depth(&self) -> u32 {
        self.nodes
            .as_ref()
            .map_or(self.level, |nodes| nodes.iter().map(QuadTree::depth).max().unwrap_or(self.level))
    }

    /// Drop all entries and children.
    pub fn clear(&mut self) {
        self.items.clear();
        self.nodes = None;
    }
}
