#![forbid(unsafe_code)]

//! Geometric primitives and spatial queries against the host scene.
//!
//! The recognizer never owns geometry. Hosts describe their element tree
//! through the [`Scene`] trait and the stateless [`GeometryOracle`] answers
//! the two questions the state machine asks: "is this point inside the
//! surface?" and "is the surface the topmost thing under this point?".
//!
//! [`SceneGraph`] is an arena-backed [`Scene`] for hosts without a retained
//! element tree of their own (and for tests).
//!
//! # Failure Modes
//!
//! - A handle that no longer resolves (removed, or detached from the scene)
//!   has no bounds. Every query against it returns `false` instead of
//!   failing, so an in-flight gesture resolves as a leave on its next check.

use ahash::AHashMap;

use crate::scroll::ContainerRef;

/// Ancestor walks give up after this many steps (cyclic host trees).
const MAX_ANCESTOR_DEPTH: usize = 4096;

// ---------------------------------------------------------------------------
// Point / Rect
// ---------------------------------------------------------------------------

/// A position in the host's coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned box described by its edges, like a client rect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub left: f64,
    /// Top edge (inclusive).
    pub top: f64,
    /// Right edge (inclusive).
    pub right: f64,
    /// Bottom edge (inclusive).
    pub bottom: f64,
}

impl Rect {
    /// Create a rectangle from its edges.
    #[inline]
    #[must_use]
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from an origin and a size.
    #[inline]
    #[must_use]
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Check if a point lies inside the rectangle. All four edges count as inside.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right
            && point.y >= self.top
            && point.y <= self.bottom
    }

    /// The smallest rectangle containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Opaque reference to an element in the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryHandle(pub u64);

/// The host's view of its element tree.
///
/// Implementations must be cheap to query: the recognizer asks for bounds
/// on every move sample for every active surface.
pub trait Scene {
    /// Current bounding box of `handle`, or `None` if it has no measurable
    /// box (unknown, removed, or detached).
    fn bounds(&self, handle: GeometryHandle) -> Option<Rect>;

    /// Direct children of `handle`, in paint order.
    fn children(&self, handle: GeometryHandle) -> &[GeometryHandle];

    /// Parent of `handle`, or `None` for roots and unknown handles.
    fn parent(&self, handle: GeometryHandle) -> Option<GeometryHandle>;

    /// The visually topmost element at `point`, if any.
    fn element_at(&self, point: Point) -> Option<GeometryHandle>;

    /// Polled scroll offset of a container. `None` means "not known here";
    /// the scroll tracker then falls back to pushed samples or zero.
    fn scroll_offset(&self, container: ContainerRef) -> Option<f64> {
        let _ = container;
        None
    }
}

// ---------------------------------------------------------------------------
// GeometryOracle
// ---------------------------------------------------------------------------

/// Stateless spatial queries over a [`Scene`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryOracle;

impl GeometryOracle {
    /// Effective hit region of `handle`: its own box, optionally unioned with
    /// the box of every direct child that has one.
    #[must_use]
    pub fn hit_region<S: Scene + ?Sized>(
        scene: &S,
        handle: GeometryHandle,
        propagate_children: bool,
    ) -> Option<Rect> {
        let own = scene.bounds(handle)?;
        if !propagate_children {
            return Some(own);
        }
        let region = scene
            .children(handle)
            .iter()
            .filter_map(|&child| scene.bounds(child))
            .fold(own, |acc, child| acc.union(&child));
        Some(region)
    }

    /// Whether `point` lies inside the hit region of `handle` (edges inclusive).
    #[must_use]
    pub fn contains<S: Scene + ?Sized>(
        scene: &S,
        handle: GeometryHandle,
        point: Point,
        propagate_children: bool,
    ) -> bool {
        Self::hit_region(scene, handle, propagate_children).is_some_and(|r| r.contains(point))
    }

    /// Whether the topmost element at `point` is `handle` or one of its descendants.
    #[must_use]
    pub fn is_topmost<S: Scene + ?Sized>(scene: &S, handle: GeometryHandle, point: Point) -> bool {
        let Some(mut node) = scene.element_at(point) else {
            return false;
        };
        for _ in 0..MAX_ANCESTOR_DEPTH {
            if node == handle {
                return true;
            }
            match scene.parent(node) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
        false
    }
}

// ---------------------------------------------------------------------------
// SceneGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Node {
    bounds: Rect,
    parent: Option<GeometryHandle>,
    children: Vec<GeometryHandle>,
    attached: bool,
    scroll_offset: f64,
}

/// Arena-backed [`Scene`] with explicit paint order.
///
/// Paint order is depth-first: a parent paints before its children, and
/// siblings paint in insertion order. The topmost element at a point is the
/// last attached node in paint order whose bounds contain it.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: AHashMap<GeometryHandle, Node>,
    roots: Vec<GeometryHandle>,
    next_handle: u64,
    root_scroll: f64,
}

impl SceneGraph {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes (attached or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert a new top-level element painted above all existing roots.
    pub fn insert_root(&mut self, bounds: Rect) -> GeometryHandle {
        let handle = self.alloc(bounds, None);
        self.roots.push(handle);
        handle
    }

    /// Insert a child painted above its existing siblings.
    ///
    /// Returns `None` if `parent` is unknown.
    pub fn insert_child(&mut self, parent: GeometryHandle, bounds: Rect) -> Option<GeometryHandle> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        let handle = self.alloc(bounds, Some(parent));
        self.nodes.get_mut(&parent)?.children.push(handle);
        Some(handle)
    }

    /// Move or resize an element.
    pub fn set_bounds(&mut self, handle: GeometryHandle, bounds: Rect) -> bool {
        match self.nodes.get_mut(&handle) {
            Some(node) => {
                node.bounds = bounds;
                true
            }
            None => false,
        }
    }

    /// Remove an element and its whole subtree.
    pub fn remove(&mut self, handle: GeometryHandle) -> bool {
        let Some(node) = self.nodes.get(&handle) else {
            return false;
        };
        match node.parent {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(&parent) {
                    p.children.retain(|&c| c != handle);
                }
            }
            None => self.roots.retain(|&r| r != handle),
        }
        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.remove(&h) {
                stack.extend(node.children);
            }
        }
        true
    }

    /// Detach an element (and implicitly its subtree) from the scene while
    /// keeping it in the arena. Detached elements have no bounds.
    pub fn detach(&mut self, handle: GeometryHandle) -> bool {
        self.set_attached(handle, false)
    }

    /// Re-attach a previously detached element.
    pub fn attach(&mut self, handle: GeometryHandle) -> bool {
        self.set_attached(handle, true)
    }

    /// Whether `handle` and all of its ancestors are attached.
    #[must_use]
    pub fn is_attached(&self, handle: GeometryHandle) -> bool {
        let mut current = Some(handle);
        for _ in 0..MAX_ANCESTOR_DEPTH {
            let Some(h) = current else {
                return true;
            };
            match self.nodes.get(&h) {
                Some(node) if node.attached => current = node.parent,
                _ => return false,
            }
        }
        false
    }

    /// Set the scroll offset of a container element.
    pub fn set_scroll_offset(&mut self, handle: GeometryHandle, offset: f64) -> bool {
        match self.nodes.get_mut(&handle) {
            Some(node) => {
                node.scroll_offset = offset;
                true
            }
            None => false,
        }
    }

    /// Set the document-level scroll offset.
    pub fn set_root_scroll_offset(&mut self, offset: f64) {
        self.root_scroll = offset;
    }

    fn alloc(&mut self, bounds: Rect, parent: Option<GeometryHandle>) -> GeometryHandle {
        let handle = GeometryHandle(self.next_handle);
        self.next_handle += 1;
        self.nodes.insert(
            handle,
            Node {
                bounds,
                parent,
                children: Vec::new(),
                attached: true,
                scroll_offset: 0.0,
            },
        );
        handle
    }

    fn set_attached(&mut self, handle: GeometryHandle, attached: bool) -> bool {
        match self.nodes.get_mut(&handle) {
            Some(node) => {
                node.attached = attached;
                true
            }
            None => false,
        }
    }
}

impl Scene for SceneGraph {
    fn bounds(&self, handle: GeometryHandle) -> Option<Rect> {
        if !self.is_attached(handle) {
            return None;
        }
        self.nodes.get(&handle).map(|n| n.bounds)
    }

    fn children(&self, handle: GeometryHandle) -> &[GeometryHandle] {
        match self.nodes.get(&handle) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    fn parent(&self, handle: GeometryHandle) -> Option<GeometryHandle> {
        self.nodes.get(&handle).and_then(|n| n.parent)
    }

    fn element_at(&self, point: Point) -> Option<GeometryHandle> {
        let mut topmost = None;
        // Reverse push so the stack pops in paint order.
        let mut stack: Vec<GeometryHandle> = self.roots.iter().rev().copied().collect();
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(&handle) else {
                continue;
            };
            if !node.attached {
                continue;
            }
            if node.bounds.contains(point) {
                topmost = Some(handle);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        topmost
    }

    fn scroll_offset(&self, container: ContainerRef) -> Option<f64> {
        match container {
            ContainerRef::Root => Some(self.root_scroll),
            ContainerRef::Element(handle) => self.nodes.get(&handle).map(|n| n.scroll_offset),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn boxed(left: f64, top: f64, right: f64, bottom: f64) -> Rect {
        Rect::new(left, top, right, bottom)
    }

    // === Rect ===

    #[test]
    fn rect_contains_is_edge_inclusive() {
        let r = boxed(0.0, 0.0, 100.0, 100.0);
        assert!(r.contains(pt(0.0, 0.0)));
        assert!(r.contains(pt(100.0, 100.0)));
        assert!(r.contains(pt(100.0, 0.0)));
        assert!(r.contains(pt(50.0, 50.0)));
        assert!(!r.contains(pt(100.5, 50.0)));
        assert!(!r.contains(pt(50.0, -0.1)));
    }

    #[test]
    fn rect_union_spans_both() {
        let a = boxed(0.0, 0.0, 10.0, 10.0);
        let b = boxed(5.0, -5.0, 20.0, 8.0);
        assert_eq!(a.union(&b), boxed(0.0, -5.0, 20.0, 10.0));
    }

    #[test]
    fn rect_from_origin_size() {
        let r = Rect::from_origin_size(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r, boxed(10.0, 20.0, 40.0, 60.0));
    }

    // === contains ===

    #[test]
    fn contains_without_children_ignores_overflowing_child() {
        let mut scene = SceneGraph::new();
        let parent = scene.insert_root(boxed(0.0, 0.0, 100.0, 100.0));
        scene.insert_child(parent, boxed(90.0, 90.0, 150.0, 150.0));

        assert!(GeometryOracle::contains(&scene, parent, pt(50.0, 50.0), false));
        assert!(!GeometryOracle::contains(&scene, parent, pt(140.0, 140.0), false));
        assert!(GeometryOracle::contains(&scene, parent, pt(140.0, 140.0), true));
    }

    #[test]
    fn propagated_region_skips_children_without_bounds() {
        let mut scene = SceneGraph::new();
        let parent = scene.insert_root(boxed(0.0, 0.0, 100.0, 100.0));
        let child = scene
            .insert_child(parent, boxed(200.0, 0.0, 300.0, 100.0))
            .unwrap();
        scene.detach(child);

        assert_eq!(
            GeometryOracle::hit_region(&scene, parent, true),
            Some(boxed(0.0, 0.0, 100.0, 100.0))
        );
        assert!(!GeometryOracle::contains(&scene, parent, pt(250.0, 50.0), true));
    }

    #[test]
    fn detached_or_removed_handle_never_contains() {
        let mut scene = SceneGraph::new();
        let a = scene.insert_root(boxed(0.0, 0.0, 100.0, 100.0));
        let b = scene.insert_root(boxed(0.0, 0.0, 100.0, 100.0));
        scene.detach(a);
        scene.remove(b);

        assert!(!GeometryOracle::contains(&scene, a, pt(50.0, 50.0), true));
        assert!(!GeometryOracle::contains(&scene, b, pt(50.0, 50.0), false));
        assert!(!GeometryOracle::is_topmost(&scene, a, pt(50.0, 50.0)));
    }

    // === is_topmost ===

    #[test]
    fn later_sibling_occludes_earlier() {
        let mut scene = SceneGraph::new();
        let below = scene.insert_root(boxed(0.0, 0.0, 100.0, 100.0));
        let above = scene.insert_root(boxed(50.0, 50.0, 150.0, 150.0));

        assert!(GeometryOracle::is_topmost(&scene, below, pt(10.0, 10.0)));
        assert!(!GeometryOracle::is_topmost(&scene, below, pt(75.0, 75.0)));
        assert!(GeometryOracle::is_topmost(&scene, above, pt(75.0, 75.0)));
    }

    #[test]
    fn descendant_on_top_counts_as_target() {
        let mut scene = SceneGraph::new();
        let parent = scene.insert_root(boxed(0.0, 0.0, 100.0, 100.0));
        let child = scene
            .insert_child(parent, boxed(10.0, 10.0, 40.0, 40.0))
            .unwrap();
        let grandchild = scene
            .insert_child(child, boxed(20.0, 20.0, 30.0, 30.0))
            .unwrap();

        assert_eq!(scene.element_at(pt(25.0, 25.0)), Some(grandchild));
        assert!(GeometryOracle::is_topmost(&scene, parent, pt(25.0, 25.0)));
        assert!(GeometryOracle::is_topmost(&scene, child, pt(25.0, 25.0)));
        assert!(!GeometryOracle::is_topmost(&scene, grandchild, pt(15.0, 15.0)));
    }

    #[test]
    fn nothing_under_point_is_not_topmost() {
        let mut scene = SceneGraph::new();
        let a = scene.insert_root(boxed(0.0, 0.0, 10.0, 10.0));
        assert_eq!(scene.element_at(pt(500.0, 500.0)), None);
        assert!(!GeometryOracle::is_topmost(&scene, a, pt(500.0, 500.0)));
    }

    // === SceneGraph ===

    #[test]
    fn detaching_parent_hides_subtree() {
        let mut scene = SceneGraph::new();
        let parent = scene.insert_root(boxed(0.0, 0.0, 100.0, 100.0));
        let child = scene
            .insert_child(parent, boxed(10.0, 10.0, 20.0, 20.0))
            .unwrap();

        scene.detach(parent);
        assert!(!scene.is_attached(child));
        assert_eq!(scene.bounds(child), None);
        assert_eq!(scene.element_at(pt(15.0, 15.0)), None);

        scene.attach(parent);
        assert_eq!(scene.bounds(child), Some(boxed(10.0, 10.0, 20.0, 20.0)));
        assert_eq!(scene.element_at(pt(15.0, 15.0)), Some(child));
    }

    #[test]
    fn remove_drops_subtree_and_unlinks() {
        let mut scene = SceneGraph::new();
        let parent = scene.insert_root(boxed(0.0, 0.0, 100.0, 100.0));
        let child = scene
            .insert_child(parent, boxed(10.0, 10.0, 20.0, 20.0))
            .unwrap();
        scene.insert_child(child, boxed(12.0, 12.0, 14.0, 14.0));
        assert_eq!(scene.len(), 3);

        assert!(scene.remove(child));
        assert_eq!(scene.len(), 1);
        assert!(scene.children(parent).is_empty());
        assert!(!scene.remove(child));
    }

    #[test]
    fn insert_child_of_unknown_parent_fails() {
        let mut scene = SceneGraph::new();
        assert!(scene.insert_child(GeometryHandle(99), Rect::default()).is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn scroll_offsets_are_polled_per_container() {
        let mut scene = SceneGraph::new();
        let list = scene.insert_root(boxed(0.0, 0.0, 100.0, 400.0));
        scene.set_scroll_offset(list, 42.0);
        scene.set_root_scroll_offset(7.0);

        assert_eq!(scene.scroll_offset(ContainerRef::Element(list)), Some(42.0));
        assert_eq!(scene.scroll_offset(ContainerRef::Root), Some(7.0));
        assert_eq!(
            scene.scroll_offset(ContainerRef::Element(GeometryHandle(77))),
            None
        );
    }
}
