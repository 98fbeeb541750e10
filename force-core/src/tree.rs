//! Generalized quad/oct tree for Barnes-Hut approximation and proximity
//! queries.
//!
//! The tree is generic over the vector type `V` (and therefore over the
//! dimension: a cell has `V::CHILDREN == 2^DIM` children) and over an
//! [`Aggregate`] that summarizes the points below each cell.
//!
//! Cells and bucketed points live in two flat arenas (`Vec`s) that are
//! cleared but never freed by [`Tree::reset`] and [`Tree::rebuild`], so a
//! force can keep one tree around and rebuild it every step without
//! reallocating.

use crate::{
    types::{CellId, NodeIndex},
    vector::Vector,
};
use std::fmt::Debug;

/// The root cell always lives at this index in the arena.
pub const ROOT: CellId = 0;

/// Per-cell summary of every point below the cell.
///
/// An aggregate is built from single points with [`Aggregate::from_point`]
/// and merged with [`Aggregate::combine`]. `combine` must be associative
/// and commutative and [`Aggregate::EMPTY`] must be its identity; the tree
/// then guarantees that every internal cell holds the combination of its
/// children and every leaf the fold of its bucket.
pub trait Aggregate<V: Vector>: Copy + Debug {
    /// Aggregate of a cell with no points.
    const EMPTY: Self;

    /// Aggregate of a single point.
    fn from_point(position: V, weight: f64) -> Self;

    /// Merges two aggregates.
    fn combine(self, other: Self) -> Self;

    /// Representative position of the summarized points, if any.
    ///
    /// Cells whose aggregate has no centroid are never approximated by
    /// [`Tree::approximate`].
    fn centroid(&self) -> Option<V> {
        None
    }
}

/// Total mass and mass-weighted position sum, for many-body forces.
///
/// The centroid is weighted by `|mass|` so that clusters mixing positive
/// and negative masses still have a well-defined center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MassAggregate<V> {
    /// Signed sum of the masses.
    pub mass: f64,
    /// Sum of `|mass|`.
    pub weight: f64,
    /// Sum of `position * |mass|`.
    pub moment: V,
}

impl<V: Vector> Aggregate<V> for MassAggregate<V> {
    const EMPTY: Self = MassAggregate {
        mass: 0.0,
        weight: 0.0,
        moment: V::ZERO,
    };

    #[inline]
    fn from_point(position: V, weight: f64) -> Self {
        let w = weight.abs();
        Self {
            mass: weight,
            weight: w,
            moment: position * w,
        }
    }

    #[inline]
    fn combine(self, other: Self) -> Self {
        Self {
            mass: self.mass + other.mass,
            weight: self.weight + other.weight,
            moment: self.moment + other.moment,
        }
    }

    #[inline]
    fn centroid(&self) -> Option<V> {
        (self.weight > 0.0).then(|| self.moment / self.weight)
    }
}

/// Largest radius below a cell, for collision pruning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusAggregate {
    pub max_radius: f64,
}

impl<V: Vector> Aggregate<V> for RadiusAggregate {
    const EMPTY: Self = RadiusAggregate { max_radius: 0.0 };

    #[inline]
    fn from_point(_position: V, weight: f64) -> Self {
        Self { max_radius: weight }
    }

    #[inline]
    fn combine(self, other: Self) -> Self {
        Self {
            max_radius: self.max_radius.max(other.max_radius),
        }
    }
}

/// Axis-aligned box `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent<V> {
    pub min: V,
    pub max: V,
}

impl<V: Vector> Extent<V> {
    pub fn new(min: V, max: V) -> Self {
        Self { min, max }
    }

    /// Cube with its lower corner at the componentwise minimum of `points`
    /// and a side of the largest spread plus one unit, so it covers every
    /// point and is never zero-sized.
    ///
    /// An empty input yields the unit cube at the origin.
    pub fn covering<I>(points: I) -> Self
    where
        I: IntoIterator<Item = V>,
    {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::new(V::ZERO, V::splat(1.0));
        };
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));

        let spread = max - min;
        let mut side = 0.0_f64;
        for axis in 0..V::DIM {
            side = side.max(spread[axis]);
        }
        Self::new(min, min + V::splat(side + 1.0))
    }

    /// The cube with the same lower corner whose side is the largest side
    /// of this box, or one unit if the box is degenerate.
    pub fn to_cube(self) -> Self {
        let size = self.max - self.min;
        let mut side = 0.0_f64;
        for axis in 0..V::DIM {
            side = side.max(size[axis]);
        }
        if !(side > 0.0) {
            side = 1.0;
        }
        Self::new(self.min, self.min + V::splat(side))
    }

    /// Side length along the first axis (all tree cells are cubes).
    #[inline]
    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    #[inline]
    pub fn center(&self) -> V {
        (self.min + self.max) * 0.5
    }

    /// Inclusive containment test.
    #[inline]
    pub fn contains(&self, p: V) -> bool {
        (0..V::DIM).all(|axis| self.min[axis] <= p[axis] && p[axis] <= self.max[axis])
    }

    /// Squared distance from `p` to the closest point of the box.
    pub fn distance_squared(&self, p: V) -> f64 {
        let mut d2 = 0.0;
        for axis in 0..V::DIM {
            let d = if p[axis] < self.min[axis] {
                self.min[axis] - p[axis]
            } else if p[axis] > self.max[axis] {
                p[axis] - self.max[axis]
            } else {
                0.0
            };
            d2 += d * d;
        }
        d2
    }

    /// Child box `slot` when the box is split at `split`.
    ///
    /// Bit `i` of `slot` selects the upper half `[split, max]` on axis `i`.
    fn child(&self, split: V, slot: usize) -> Self {
        let mut min = self.min;
        let mut max = self.max;
        for axis in 0..V::DIM {
            if slot & (1 << axis) != 0 {
                min[axis] = split[axis];
            } else {
                max[axis] = split[axis];
            }
        }
        Self { min, max }
    }

    /// `true` if splitting at the center yields `2^DIM` non-degenerate
    /// boxes. Boxes shrunk down to floating-point resolution stop here.
    fn can_split(&self) -> bool {
        let c = self.center();
        (0..V::DIM).all(|axis| self.min[axis] < c[axis] && c[axis] < self.max[axis])
    }
}

/// Index of the child of a cell split at `split` that receives `p`.
///
/// Bit `i` is set when `p[i] >= split[i]`.
#[inline]
fn child_slot<V: Vector>(split: V, p: V) -> usize {
    let mut slot = 0;
    for axis in 0..V::DIM {
        if p[axis] >= split[axis] {
            slot |= 1 << axis;
        }
    }
    slot
}

/// A point stored in a leaf bucket.
#[derive(Clone, Copy, Debug)]
struct Entry<V> {
    index: NodeIndex,
    position: V,
    weight: f64,
    /// Next entry of the same bucket.
    next: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
struct Cell<V, A> {
    extent: Extent<V>,
    aggregate: A,
    /// Split point of an internal cell.
    split: V,
    /// First of the `2^DIM` contiguous children, for internal cells.
    first_child: Option<CellId>,
    /// First bucket entry, for leaves.
    head: Option<usize>,
    len: usize,
}

impl<V: Vector, A: Aggregate<V>> Cell<V, A> {
    fn leaf(extent: Extent<V>) -> Self {
        Self {
            extent,
            aggregate: A::EMPTY,
            split: V::ZERO,
            first_child: None,
            head: None,
            len: 0,
        }
    }
}

/// Spatial partitioning tree over dense node indices.
///
/// Cells are stored in an arena; children of an internal cell occupy
/// `2^DIM` consecutive slots. The root is always [`ROOT`].
#[derive(Debug, Clone)]
pub struct Tree<V, A> {
    cells: Vec<Cell<V, A>>,
    entries: Vec<Entry<V>>,
}

/// Borrowed view of one tree cell.
#[derive(Clone, Copy, Debug)]
pub struct CellRef<'a, V, A> {
    tree: &'a Tree<V, A>,
    id: CellId,
}

impl<'a, V: Vector, A: Aggregate<V>> CellRef<'a, V, A> {
    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn extent(&self) -> Extent<V> {
        self.tree.cells[self.id].extent
    }

    pub fn aggregate(&self) -> &'a A {
        &self.tree.cells[self.id].aggregate
    }

    pub fn is_leaf(&self) -> bool {
        self.tree.cells[self.id].first_child.is_none()
    }

    /// Children of an internal cell, in slot order. Empty for leaves.
    pub fn children(&self) -> impl Iterator<Item = CellRef<'a, V, A>> + use<'a, V, A> {
        let tree = self.tree;
        let range = match tree.cells[self.id].first_child {
            Some(first) => first..first + V::CHILDREN,
            None => 0..0,
        };
        range.map(move |id| CellRef { tree, id })
    }

    /// Points bucketed in a leaf as `(index, position, weight)`.
    ///
    /// Empty for internal cells.
    pub fn points(&self) -> impl Iterator<Item = (NodeIndex, V, f64)> + use<'a, V, A> {
        let tree = self.tree;
        let mut next = tree.cells[self.id].head;
        std::iter::from_fn(move || {
            let e = tree.entries[next?];
            next = e.next;
            Some((e.index, e.position, e.weight))
        })
    }

    /// Number of points bucketed in a leaf.
    pub fn len(&self) -> usize {
        self.tree.cells[self.id].len
    }

    pub fn is_empty(&self) -> bool {
        self.is_leaf() && self.len() == 0
    }
}

/// One term of a Barnes-Hut sum, produced by [`Tree::approximate`].
#[derive(Clone, Copy, Debug)]
pub enum Interaction<V, A> {
    /// A distant cell treated as a single pseudo-point at its centroid.
    Cluster { centroid: V, aggregate: A },
    /// A single bucketed point.
    Point {
        index: NodeIndex,
        position: V,
        weight: f64,
    },
}

impl<V: Vector, A: Aggregate<V>> Tree<V, A> {
    /// Creates an empty tree whose root covers `extent`, widened to a cube.
    pub fn new(extent: Extent<V>) -> Self {
        Self {
            cells: vec![Cell::leaf(extent.to_cube())],
            entries: Vec::new(),
        }
    }

    /// Builds a tree over `positions`, indexing each point by its slice
    /// position and weighting it with `weight(index)`.
    ///
    /// ### Parameters
    /// - `positions` - Point positions; every component must be finite.
    /// - `weight` - Weight fed to [`Aggregate::from_point`].
    pub fn build(positions: &[V], weight: impl Fn(NodeIndex) -> f64) -> Self {
        let mut tree = Self::new(Extent::covering(positions.iter().copied()));
        tree.rebuild(positions, weight);
        tree
    }

    /// Clears every cell and point, keeping allocated capacity, and resets
    /// the root to `extent` (widened to a cube).
    pub fn reset(&mut self, extent: Extent<V>) {
        self.cells.clear();
        self.entries.clear();
        self.cells.push(Cell::leaf(extent.to_cube()));
    }

    /// Same as [`Tree::build`] but reuses this tree's storage.
    pub fn rebuild(&mut self, positions: &[V], weight: impl Fn(NodeIndex) -> f64) {
        self.reset(Extent::covering(positions.iter().copied()));
        self.entries.reserve(positions.len());
        for (index, &position) in positions.iter().enumerate() {
            self.insert(index, position, weight(index));
        }
    }

    /// Number of inserted points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Box of the root cell. Contains every inserted point.
    pub fn extent(&self) -> Extent<V> {
        self.cells[ROOT].extent
    }

    /// Aggregate of every inserted point.
    pub fn aggregate(&self) -> &A {
        &self.cells[ROOT].aggregate
    }

    pub fn root(&self) -> CellRef<'_, V, A> {
        self.cell(ROOT)
    }

    /// ### Panics
    /// Panics if `id` is not a cell of this tree.
    pub fn cell(&self, id: CellId) -> CellRef<'_, V, A> {
        assert!(id < self.cells.len(), "cell {id} out of range");
        CellRef { tree: self, id }
    }

    /// Every cell in arena order (the root first).
    pub fn cells(&self) -> impl Iterator<Item = CellRef<'_, V, A>> {
        (0..self.cells.len()).map(move |id| CellRef { tree: self, id })
    }

    /// Leaf cells holding at least one point.
    pub fn leaves(&self) -> impl Iterator<Item = CellRef<'_, V, A>> {
        self.cells().filter(|c| c.is_leaf() && c.len() > 0)
    }

    /// Inserts a point, growing the root first if the point lies outside.
    ///
    /// The aggregate of every cell on the path from the root to the
    /// receiving leaf is combined with the point's own aggregate.
    ///
    /// ### Parameters
    /// - `index` - Dense index stored with the point.
    /// - `position` - Point position.
    /// - `weight` - Weight fed to [`Aggregate::from_point`].
    ///
    /// ### Panics
    /// Panics if `position` has a non-finite component.
    pub fn insert(&mut self, index: NodeIndex, position: V, weight: f64) {
        self.cover(position);
        let entry = self.entries.len();
        self.entries.push(Entry {
            index,
            position,
            weight,
            next: None,
        });
        self.place(ROOT, entry);
    }

    /// Grows the root until it contains `p`.
    ///
    /// Each round doubles the root box; the old root becomes one of the
    /// children of the new root, on the side facing away from `p`.
    ///
    /// ### Panics
    /// Panics if `p` has a non-finite component.
    pub fn cover(&mut self, p: V) {
        assert!(p.is_finite(), "cannot index non-finite position {p:?}");

        while !self.cells[ROOT].extent.contains(p) {
            let old = self.cells[ROOT].extent;
            let width = old.width();
            assert!(width > 0.0, "degenerate root extent {old:?}");

            let mut min = old.min;
            let mut slot = 0;
            for axis in 0..V::DIM {
                if p[axis] < old.min[axis] {
                    min[axis] -= width;
                    slot |= 1 << axis;
                }
            }
            let grown = Extent::new(min, min + V::splat(width * 2.0));

            let root = self.cells[ROOT];
            if root.first_child.is_none() && root.head.is_none() {
                self.cells[ROOT].extent = grown;
                continue;
            }

            // The old root box must line up exactly with the child slot it
            // moves into, so split the new root on the old root's faces.
            let mut split = V::ZERO;
            for axis in 0..V::DIM {
                split[axis] = if slot & (1 << axis) != 0 {
                    old.min[axis]
                } else {
                    old.max[axis]
                };
            }

            let first = self.cells.len();
            for s in 0..V::CHILDREN {
                if s == slot {
                    self.cells.push(root);
                } else {
                    self.cells.push(Cell::leaf(grown.child(split, s)));
                }
            }
            self.cells[ROOT] = Cell {
                extent: grown,
                aggregate: root.aggregate,
                split,
                first_child: Some(first),
                head: None,
                len: 0,
            };
        }
    }

    /// Descends from `cell` to the leaf that receives `entry`, splitting
    /// leaves that hold a different position on the way.
    fn place(&mut self, mut cell: CellId, entry: usize) {
        let Entry {
            position, weight, ..
        } = self.entries[entry];
        let point = A::from_point(position, weight);

        loop {
            if self.must_split(cell, position) {
                self.split(cell);
            }

            let c = &mut self.cells[cell];
            c.aggregate = c.aggregate.combine(point);
            match c.first_child {
                Some(first) => cell = first + child_slot(c.split, position),
                None => {
                    self.entries[entry].next = c.head;
                    c.head = Some(entry);
                    c.len += 1;
                    return;
                }
            }
        }
    }

    /// A leaf must split when it already holds a point at another position
    /// and its box can still be halved.
    ///
    /// Splittable leaves only ever hold coincident points, so comparing
    /// with the bucket head is enough.
    fn must_split(&self, cell: CellId, position: V) -> bool {
        let c = &self.cells[cell];
        match (c.first_child, c.head) {
            (None, Some(head)) => {
                self.entries[head].position != position && c.extent.can_split()
            }
            _ => false,
        }
    }

    /// Turns a leaf into an internal cell and moves its bucket down.
    ///
    /// The cell's own aggregate already accounts for the moved points and
    /// is left unchanged.
    fn split(&mut self, cell: CellId) {
        let extent = self.cells[cell].extent;
        let split = extent.center();
        let first = self.cells.len();
        for s in 0..V::CHILDREN {
            self.cells.push(Cell::leaf(extent.child(split, s)));
        }

        let c = &mut self.cells[cell];
        let mut next = c.head.take();
        c.len = 0;
        c.split = split;
        c.first_child = Some(first);

        while let Some(entry) = next {
            next = self.entries[entry].next.take();
            let slot = child_slot(split, self.entries[entry].position);
            self.place(first + slot, entry);
        }
    }

    /// Pre-order traversal. `f` returns `true` to descend into the
    /// children of the visited cell.
    pub fn visit<F>(&self, mut f: F)
    where
        F: FnMut(CellRef<'_, V, A>) -> bool,
    {
        self.visit_from(ROOT, &mut f);
    }

    fn visit_from<F>(&self, id: CellId, f: &mut F)
    where
        F: FnMut(CellRef<'_, V, A>) -> bool,
    {
        if !f(CellRef { tree: self, id }) {
            return;
        }
        if let Some(first) = self.cells[id].first_child {
            for child in first..first + V::CHILDREN {
                self.visit_from(child, f);
            }
        }
    }

    /// Barnes-Hut traversal around `query`.
    ///
    /// Internal cells whose `width / distance(query, centroid)` is below
    /// `theta` are reported once as an [`Interaction::Cluster`]; other
    /// internal cells are expanded, and leaves report each of their points.
    /// `theta == 0` never approximates and yields the exact pairwise sum.
    ///
    /// ### Parameters
    /// - `query` - Position the interactions are evaluated at.
    /// - `theta` - Opening criterion, `>= 0`.
    /// - `visit` - Called once per cluster or point.
    pub fn approximate<F>(&self, query: V, theta: f64, mut visit: F)
    where
        F: FnMut(Interaction<V, A>),
    {
        let theta2 = theta * theta;
        self.visit(|cell| {
            if cell.is_leaf() {
                for (index, position, weight) in cell.points() {
                    visit(Interaction::Point {
                        index,
                        position,
                        weight,
                    });
                }
                return false;
            }

            let aggregate = *cell.aggregate();
            let Some(centroid) = aggregate.centroid() else {
                return true;
            };
            let width = cell.extent().width();
            let d2 = (centroid - query).length_squared();
            // width / d < theta, without the square root.
            if d2 > 0.0 && width * width < theta2 * d2 {
                visit(Interaction::Cluster {
                    centroid,
                    aggregate,
                });
                false
            } else {
                true
            }
        });
    }

    /// Finds the point closest to `position` within `radius`.
    ///
    /// Ties go to the point found first. Pass `f64::INFINITY` for an
    /// unbounded search.
    pub fn find(&self, position: V, radius: f64) -> Option<NodeIndex> {
        let mut best: Option<NodeIndex> = None;
        let mut best_d2 = radius * radius;
        self.visit(|cell| {
            if cell.extent().distance_squared(position) > best_d2 {
                return false;
            }
            for (index, p, _) in cell.points() {
                let d2 = (p - position).length_squared();
                if d2 < best_d2 || (best.is_none() && d2 <= best_d2) {
                    best_d2 = d2;
                    best = Some(index);
                }
            }
            true
        });
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::Lcg;
    use glam::{DVec2, DVec3};
    use rand::Rng;

    type MassTree2 = Tree<DVec2, MassAggregate<DVec2>>;

    fn random_integer_points(rng: &mut Lcg, n: usize, half_range: i32) -> Vec<DVec2> {
        (0..n)
            .map(|_| {
                DVec2::new(
                    f64::from(rng.random_range(-half_range..=half_range)),
                    f64::from(rng.random_range(-half_range..=half_range)),
                )
            })
            .collect()
    }

    fn assert_aggregates_consistent<V: Vector>(tree: &Tree<V, MassAggregate<V>>) {
        for cell in tree.cells() {
            let expected = if cell.is_leaf() {
                cell.points().fold(<MassAggregate<V> as Aggregate<V>>::EMPTY, |acc, (_, p, w)| {
                    acc.combine(<MassAggregate<V> as Aggregate<V>>::from_point(p, w))
                })
            } else {
                cell.children().fold(<MassAggregate<V> as Aggregate<V>>::EMPTY, |acc, child| {
                    acc.combine(*child.aggregate())
                })
            };
            assert_eq!(*cell.aggregate(), expected, "cell {}", cell.id());
        }
    }

    #[test]
    fn covering_pads_degenerate_box() {
        let extent = Extent::covering([DVec2::new(3.0, 3.0)]);
        assert!(extent.width() >= 1.0);
        assert!(extent.contains(DVec2::new(3.0, 3.0)));

        let empty = Extent::<DVec2>::covering([]);
        assert_eq!(empty, Extent::new(DVec2::ZERO, DVec2::ONE));
    }

    #[test]
    fn covering_is_a_cube_over_all_points() {
        let points = [DVec3::new(-4.5, 0.0, 2.0), DVec3::new(10.0, 1.0, 2.5)];
        let extent = Extent::covering(points);
        let size = extent.max - extent.min;
        assert_eq!(size.x, size.y);
        assert_eq!(size.y, size.z);
        assert!(size.x >= 15.5);
        for p in points {
            assert!(extent.contains(p));
        }
    }

    #[test]
    fn single_point_stays_in_root_leaf() {
        let tree = MassTree2::build(&[DVec2::new(1.0, 2.0)], |_| 2.0);
        assert_eq!(tree.len(), 1);
        assert!(tree.root().is_leaf());
        assert_eq!(tree.aggregate().mass, 2.0);
        assert_eq!(tree.aggregate().centroid(), Some(DVec2::new(1.0, 2.0)));
    }

    #[test]
    fn coincident_points_share_a_bucket() {
        let p = DVec2::new(5.0, 5.0);
        let tree = MassTree2::build(&[p, p, p], |_| 1.0);
        let leaves: Vec<_> = tree.leaves().collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].len(), 3);
        let mut indices: Vec<_> = leaves[0].points().map(|(i, _, _)| i).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn distinct_points_split_into_children() {
        let tree = MassTree2::build(&[DVec2::new(0.0, 0.0), DVec2::new(10.0, 10.0)], |_| 1.0);
        assert!(!tree.root().is_leaf());
        assert_eq!(tree.root().children().count(), 4);
        assert_eq!(tree.leaves().count(), 2);
        for leaf in tree.leaves() {
            assert_eq!(leaf.len(), 1);
        }
    }

    #[test]
    fn child_selector_uses_greater_or_equal() {
        let split = DVec2::new(0.0, 0.0);
        assert_eq!(child_slot(split, DVec2::new(-1.0, -1.0)), 0);
        assert_eq!(child_slot(split, DVec2::new(0.0, -1.0)), 1);
        assert_eq!(child_slot(split, DVec2::new(-1.0, 0.0)), 2);
        assert_eq!(child_slot(split, DVec2::new(0.0, 0.0)), 3);
        assert_eq!(child_slot(DVec3::ZERO, DVec3::new(-1.0, -1.0, 2.0)), 4);
    }

    #[test]
    fn insert_outside_extent_grows_root() {
        let mut tree = MassTree2::new(Extent::new(DVec2::ZERO, DVec2::ONE));
        tree.insert(0, DVec2::new(0.5, 0.5), 1.0);
        tree.insert(1, DVec2::new(-40.0, 7.0), 1.0);
        tree.insert(2, DVec2::new(100.0, -3.0), 1.0);

        let extent = tree.extent();
        for cell in tree.leaves() {
            for (_, p, _) in cell.points() {
                assert!(extent.contains(p));
                assert!(cell.extent().contains(p));
            }
        }
        assert_eq!(tree.aggregate().mass, 3.0);
        assert_aggregates_consistent(&tree);
    }

    #[test]
    fn growing_an_empty_root_only_moves_the_box() {
        let mut tree = MassTree2::new(Extent::new(DVec2::ZERO, DVec2::ONE));
        tree.cover(DVec2::new(-5.0, 9.0));
        assert!(tree.root().is_leaf());
        assert!(tree.extent().contains(DVec2::new(-5.0, 9.0)));
    }

    #[test]
    fn random_insertions_keep_every_point_contained() {
        let mut rng = Lcg::new(11);
        let mut tree = MassTree2::new(Extent::new(DVec2::ZERO, DVec2::ONE));
        for i in 0..500 {
            let p = DVec2::new(rng.random_range(-1e3..1e3), rng.random_range(-1e3..1e3));
            tree.insert(i, p, 1.0);
        }
        assert_eq!(tree.len(), 500);
        let root = tree.extent();
        let mut seen = 0;
        for leaf in tree.leaves() {
            for (_, p, _) in leaf.points() {
                assert!(root.contains(p));
                assert!(leaf.extent().contains(p));
                seen += 1;
            }
        }
        assert_eq!(seen, 500);
    }

    #[test]
    fn aggregates_match_children_exactly() {
        // Integer coordinates and masses keep every sum exact.
        let mut rng = Lcg::new(5);
        let points = random_integer_points(&mut rng, 300, 200);
        let tree = MassTree2::build(&points, |i| (i % 7 + 1) as f64);
        assert_aggregates_consistent(&tree);

        let total: f64 = (0..points.len()).map(|i| (i % 7 + 1) as f64).sum();
        assert_eq!(tree.aggregate().mass, total);
    }

    #[test]
    fn root_aggregate_equals_fold_of_leaves() {
        let mut rng = Lcg::new(9);
        let points = random_integer_points(&mut rng, 200, 50);
        let tree = MassTree2::build(&points, |_| 1.0);
        let folded = tree
            .leaves()
            .fold(<MassAggregate<DVec2> as Aggregate<DVec2>>::EMPTY, |acc, leaf| {
                acc.combine(*leaf.aggregate())
            });
        assert_eq!(folded, *tree.aggregate());
    }

    #[test]
    fn radius_aggregate_tracks_maximum() {
        let points = [DVec2::new(0.0, 0.0), DVec2::new(8.0, 1.0), DVec2::new(-3.0, 4.0)];
        let radii = [1.0, 4.5, 2.0];
        let tree: Tree<DVec2, RadiusAggregate> = Tree::build(&points, |i| radii[i]);
        assert_eq!(tree.aggregate().max_radius, 4.5);
        for cell in tree.cells().filter(|c| !c.is_leaf()) {
            let expected = cell
                .children()
                .map(|c| c.aggregate().max_radius)
                .fold(0.0, f64::max);
            assert_eq!(cell.aggregate().max_radius, expected);
        }
    }

    #[test]
    fn nearly_coincident_points_terminate() {
        let a = DVec2::new(1.0, 1.0);
        let b = DVec2::new(1.0 + f64::EPSILON, 1.0);
        let tree = MassTree2::build(&[a, b, a], |_| 1.0);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.leaves().map(|l| l.len()).sum::<usize>(), 3);
    }

    #[test]
    fn octree_splits_into_eight() {
        let points = [DVec3::new(0.0, 0.0, 0.0), DVec3::new(4.0, 4.0, 4.0)];
        let tree: Tree<DVec3, MassAggregate<DVec3>> = Tree::build(&points, |_| 1.0);
        assert_eq!(tree.root().children().count(), 8);
        assert_eq!(tree.aggregate().centroid(), Some(DVec3::splat(2.0)));
    }

    #[test]
    fn theta_zero_visits_every_point() {
        let mut rng = Lcg::new(3);
        let points = random_integer_points(&mut rng, 100, 100);
        let tree = MassTree2::build(&points, |_| 1.0);

        let mut visited = Vec::new();
        tree.approximate(DVec2::new(1000.0, 1000.0), 0.0, |interaction| match interaction {
            Interaction::Point { index, .. } => visited.push(index),
            Interaction::Cluster { .. } => panic!("theta = 0 must not approximate"),
        });
        visited.sort_unstable();
        assert_eq!(visited, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn distant_query_sees_a_single_cluster() {
        let points = [
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(0.0, 2.0),
            DVec2::new(2.0, 2.0),
        ];
        let tree = MassTree2::build(&points, |_| 1.0);

        let mut clusters = Vec::new();
        tree.approximate(DVec2::new(1e4, 1e4), 0.9, |interaction| {
            if let Interaction::Cluster {
                centroid,
                aggregate,
            } = interaction
            {
                clusters.push((centroid, aggregate.mass));
            }
        });
        assert_eq!(clusters, vec![(DVec2::new(1.0, 1.0), 4.0)]);
    }

    #[test]
    fn approximation_conserves_total_mass() {
        let mut rng = Lcg::new(21);
        let points = random_integer_points(&mut rng, 400, 300);
        let tree = MassTree2::build(&points, |_| 1.0);

        let mut mass = 0.0;
        tree.approximate(DVec2::new(0.0, 0.0), 0.9, |interaction| match interaction {
            Interaction::Cluster { aggregate, .. } => mass += aggregate.mass,
            Interaction::Point { weight, .. } => mass += weight,
        });
        assert_eq!(mass, 400.0);
    }

    #[test]
    fn find_returns_nearest_within_radius() {
        let points = [DVec2::new(0.0, 0.0), DVec2::new(10.0, 0.0), DVec2::new(3.0, 4.0)];
        let tree = MassTree2::build(&points, |_| 1.0);
        assert_eq!(tree.find(DVec2::new(9.0, 1.0), f64::INFINITY), Some(1));
        assert_eq!(tree.find(DVec2::new(2.0, 3.0), 2.0), Some(2));
        assert_eq!(tree.find(DVec2::new(50.0, 50.0), 5.0), None);
    }

    #[test]
    fn rebuild_reuses_storage() {
        let mut rng = Lcg::new(1);
        let points = random_integer_points(&mut rng, 64, 64);
        let mut tree = MassTree2::build(&points, |_| 1.0);
        let cells = tree.cells.capacity();
        let entries = tree.entries.capacity();

        tree.rebuild(&points, |_| 1.0);
        assert_eq!(tree.cells.capacity(), cells);
        assert_eq!(tree.entries.capacity(), entries);
        assert_eq!(tree.len(), 64);
    }

    #[test]
    #[should_panic]
    fn non_finite_position_is_rejected() {
        let mut tree = MassTree2::new(Extent::new(DVec2::ZERO, DVec2::ONE));
        tree.insert(0, DVec2::new(f64::NAN, 0.0), 1.0);
    }
}
