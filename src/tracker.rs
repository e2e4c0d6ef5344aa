//! Reference tracking for one encode session.
//!
//! Before anything is written the tracker walks the graph once and gives
//! every object it registers an id in first-visit order. An object reached a
//! second time is flagged `has_reference`; from then on every write site
//! emits a `ref` token for it instead of its body, and the planner hoists the
//! body into the reference block.
//!
//! Two walks exist:
//!
//! - alias-preserving: every object is registered, an object root as id 0
//! - copy: the root is not registered, and only objects that close a cycle
//!   (targets of a depth-first back edge) are registered, starting at id 1.
//!   Acyclic sharing is then written inline at each occurrence, which
//!   decodes as independent copies.
//!
//! A root that is not itself an object (a sequence or dictionary) is walked
//! through its elements and ids start at 1 in both modes, so every shared
//! object is hoisted into a block. Id 0 only ever names an inline root.
//!
//! Both walks visit members in schema declaration order, the same order the
//! writer uses.

use crate::{Error, ObjectGraph, ObjectId, Result, Value};
use indexmap::IndexMap;
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub id: usize,
    pub target: ObjectId,
    pub has_reference: bool,
    referenced: bool,
    hoisted: bool,
}

#[derive(Debug, Default)]
pub struct ReferenceTracker {
    /// Insertion order is id order, starting at `base`.
    entries: IndexMap<ObjectId, ReferenceEntry>,
    base: usize,
    next_id: usize,
    /// Ids in the order a write site first emitted a `ref` to them.
    discovered: Vec<usize>,
    cursor: usize,
}

impl ReferenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the tracking pass from `root`, which may be any value.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedShape`] if the graph refers to an
    /// object id it does not hold.
    pub fn track(&mut self, graph: &ObjectGraph, root: &Value, preserve_aliases: bool) -> Result<()> {
        let root_object = root.as_object();
        // id 0 is reserved for an inline object root, registered or not
        if !preserve_aliases || root_object.is_none() {
            self.next_id = 1;
        }
        self.base = self.next_id;

        if preserve_aliases {
            return match root_object {
                Some(target) => self.track_object(graph, target),
                None => self.track_value(graph, root),
            };
        }
        let mut walk = CycleWalk::default();
        for_each_child(root, &mut |child| walk.visit(graph, child))?;
        for target in walk.order.into_iter().filter(|t| walk.targets.contains(t)) {
            self.register(target, true);
        }
        Ok(())
    }

    fn register(&mut self, target: ObjectId, has_reference: bool) {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            target,
            ReferenceEntry {
                id,
                target,
                has_reference,
                referenced: false,
                hoisted: false,
            },
        );
    }

    fn track_object(&mut self, graph: &ObjectGraph, target: ObjectId) -> Result<()> {
        if let Some(entry) = self.entries.get_mut(&target) {
            entry.has_reference = true;
            return Ok(());
        }
        self.register(target, false);
        for value in eligible_values(graph, target)? {
            self.track_value(graph, value)?;
        }
        Ok(())
    }

    fn track_value(&mut self, graph: &ObjectGraph, value: &Value) -> Result<()> {
        for_each_child(value, &mut |child| self.track_object(graph, child))
    }

    /// Returns the id a write site must reference instead of inlining.
    ///
    /// `None` means the object is written inline here. A hit marks the entry
    /// as referenced, which queues it for hoisting.
    pub fn lookup(&mut self, target: ObjectId) -> Option<usize> {
        let entry = self.entries.get_mut(&target)?;
        if !entry.has_reference {
            return None;
        }
        if !entry.referenced {
            entry.referenced = true;
            self.discovered.push(entry.id);
        }
        Some(entry.id)
    }

    /// Takes the next referenced, not yet hoisted object other than the root.
    pub fn next_pending(&mut self) -> Option<(usize, ObjectId)> {
        while let Some(&id) = self.discovered.get(self.cursor) {
            self.cursor += 1;
            if id == 0 {
                continue;
            }
            let Some((_, entry)) = id
                .checked_sub(self.base)
                .and_then(|index| self.entries.get_index_mut(index))
            else {
                continue;
            };
            if !entry.hoisted {
                entry.hoisted = true;
                return Some((entry.id, entry.target));
            }
        }
        None
    }

    #[must_use]
    pub fn entry(&self, target: ObjectId) -> Option<&ReferenceEntry> {
        self.entries.get(&target)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Depth-first search collecting back-edge targets.
#[derive(Default)]
struct CycleWalk {
    on_path: HashSet<ObjectId>,
    done: HashSet<ObjectId>,
    order: Vec<ObjectId>,
    targets: HashSet<ObjectId>,
}

impl CycleWalk {
    fn visit(&mut self, graph: &ObjectGraph, target: ObjectId) -> Result<()> {
        if self.on_path.contains(&target) {
            self.targets.insert(target);
            return Ok(());
        }
        if self.done.contains(&target) {
            return Ok(());
        }
        self.order.push(target);
        self.on_path.insert(target);
        for value in eligible_values(graph, target)? {
            for_each_child(value, &mut |child| self.visit(graph, child))?;
        }
        self.on_path.remove(&target);
        self.done.insert(target);
        Ok(())
    }
}

/// Values of `target`'s eligible members, in declaration order.
fn eligible_values(graph: &ObjectGraph, target: ObjectId) -> Result<Vec<&Value>> {
    let node = graph
        .node(target)
        .ok_or_else(|| Error::unsupported_shape(&format!("dangling object id {}", target)))?;
    Ok(node
        .schema()
        .eligible_members()
        .filter_map(|m| node.get(&m.name))
        .collect())
}

/// Calls `f` for every object directly reachable from `value`.
fn for_each_child(value: &Value, f: &mut impl FnMut(ObjectId) -> Result<()>) -> Result<()> {
    match value {
        Value::Object(id) => f(*id),
        Value::Seq(seq) => seq.items.iter().try_for_each(|item| for_each_child(item, &mut *f)),
        Value::Dict(dict) => dict.entries.iter().try_for_each(|(k, v)| {
            for_each_child(k, &mut *f)?;
            for_each_child(v, &mut *f)
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Member, Schema, Sequence, Shape};
    use std::sync::Arc;

    fn pair_schema() -> Arc<Schema> {
        Arc::new(
            Schema::new("demo.Pair")
                .with_member(Member::new("left", Shape::named("demo.Pair")))
                .with_member(Member::new("right", Shape::named("demo.Pair")))
                .with_member(Member::new("hidden", Shape::named("demo.Pair")).ignored()),
        )
    }

    #[test]
    fn test_ids_follow_first_visit_order() {
        let schema = pair_schema();
        let mut graph = ObjectGraph::new();
        let root = graph.alloc(&schema);
        let a = graph.alloc(&schema);
        let b = graph.alloc(&schema);
        graph.set(root, "left", Value::Object(b)).unwrap();
        graph.set(root, "right", Value::Object(a)).unwrap();
        graph.set(a, "left", Value::Object(b)).unwrap();

        let mut tracker = ReferenceTracker::new();
        tracker.track(&graph, &Value::Object(root), true).unwrap();

        assert_eq!(tracker.entry(root).map(|e| e.id), Some(0));
        assert_eq!(tracker.entry(b).map(|e| e.id), Some(1));
        assert_eq!(tracker.entry(a).map(|e| e.id), Some(2));
        assert!(tracker.entry(b).unwrap().has_reference);
        assert!(!tracker.entry(a).unwrap().has_reference);
        assert!(!tracker.entry(root).unwrap().has_reference);
    }

    #[test]
    fn test_ignored_members_are_not_tracked() {
        let schema = pair_schema();
        let mut graph = ObjectGraph::new();
        let root = graph.alloc(&schema);
        let hidden = graph.alloc(&schema);
        graph.set(root, "hidden", Value::Object(hidden)).unwrap();

        let mut tracker = ReferenceTracker::new();
        tracker.track(&graph, &Value::Object(root), true).unwrap();
        assert!(tracker.entry(hidden).is_none());
    }

    #[test]
    fn test_lookup_queues_hoists_in_discovery_order() {
        let schema = pair_schema();
        let mut graph = ObjectGraph::new();
        let root = graph.alloc(&schema);
        let shared = graph.alloc(&schema);
        let list = Sequence::list(
            Shape::named("demo.Pair"),
            vec![Value::Object(shared), Value::Object(shared), Value::Object(root)],
        );
        let holder = Arc::new(
            Schema::new("demo.Holder").with_member(Member::new("items", list.shape())),
        );
        let top = graph.alloc(&holder);
        graph.set(top, "items", Value::Seq(list)).unwrap();
        graph.set(root, "left", Value::Object(top)).unwrap();

        let mut tracker = ReferenceTracker::new();
        tracker.track(&graph, &Value::Object(root), true).unwrap();

        assert_eq!(tracker.lookup(top), None);
        assert_eq!(tracker.lookup(root), Some(0));
        assert_eq!(tracker.lookup(shared), Some(2));
        assert_eq!(tracker.next_pending(), Some((2, shared)));
        assert_eq!(tracker.next_pending(), None);
    }

    #[test]
    fn test_copy_walk_registers_only_cycle_targets() {
        let schema = pair_schema();
        let mut graph = ObjectGraph::new();
        let root = graph.alloc(&schema);
        let shared = graph.alloc(&schema);
        let looped = graph.alloc(&schema);
        graph.set(root, "left", Value::Object(shared)).unwrap();
        graph.set(root, "right", Value::Object(shared)).unwrap();
        graph.set(shared, "left", Value::Object(looped)).unwrap();
        graph.set(looped, "left", Value::Object(looped)).unwrap();
        graph.set(looped, "right", Value::Object(root)).unwrap();

        let mut tracker = ReferenceTracker::new();
        tracker.track(&graph, &Value::Object(root), false).unwrap();

        assert!(tracker.entry(shared).is_none());
        assert_eq!(tracker.entry(root).map(|e| e.id), Some(1));
        assert_eq!(tracker.entry(looped).map(|e| e.id), Some(2));
        assert!(tracker.entry(looped).unwrap().has_reference);
    }

    #[test]
    fn test_collection_root_is_walked_from_id_one() {
        let schema = pair_schema();
        let mut graph = ObjectGraph::new();
        let shared = graph.alloc(&schema);
        let looped = graph.alloc(&schema);
        let single = graph.alloc(&schema);
        graph.set(looped, "left", Value::Object(looped)).unwrap();
        let root = Value::Seq(Sequence::list(
            Shape::named("demo.Pair"),
            vec![
                Value::Object(shared),
                Value::Object(looped),
                Value::Object(shared),
                Value::Object(single),
            ],
        ));

        let mut tracker = ReferenceTracker::new();
        tracker.track(&graph, &root, true).unwrap();
        assert_eq!(tracker.entry(shared).map(|e| e.id), Some(1));
        assert_eq!(tracker.entry(looped).map(|e| e.id), Some(2));
        assert_eq!(tracker.entry(single).map(|e| e.id), Some(3));
        assert!(tracker.entry(shared).unwrap().has_reference);
        assert!(tracker.entry(looped).unwrap().has_reference);
        assert!(!tracker.entry(single).unwrap().has_reference);

        assert_eq!(tracker.lookup(looped), Some(2));
        assert_eq!(tracker.lookup(shared), Some(1));
        assert_eq!(tracker.lookup(single), None);
        assert_eq!(tracker.next_pending(), Some((2, looped)));
        assert_eq!(tracker.next_pending(), Some((1, shared)));
        assert_eq!(tracker.next_pending(), None);

        let mut copy = ReferenceTracker::new();
        copy.track(&graph, &root, false).unwrap();
        assert!(copy.entry(shared).is_none());
        assert_eq!(copy.entry(looped).map(|e| e.id), Some(1));
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn test_next_pending_hoists_each_id_once() {
        let schema = pair_schema();
        let mut graph = ObjectGraph::new();
        let root = graph.alloc(&schema);
        let chain: Vec<_> = (0..64).map(|_| graph.alloc(&schema)).collect();
        let mut items = Vec::new();
        for target in &chain {
            items.push(Value::Object(*target));
            items.push(Value::Object(*target));
        }
        let list = Sequence::list(Shape::named("demo.Pair"), items);
        let holder = Arc::new(
            Schema::new("demo.Holder").with_member(Member::new("items", list.shape())),
        );
        let top = graph.alloc(&holder);
        graph.set(top, "items", Value::Seq(list)).unwrap();
        graph.set(root, "left", Value::Object(top)).unwrap();

        let mut tracker = ReferenceTracker::new();
        tracker.track(&graph, &Value::Object(root), true).unwrap();
        for target in chain.iter().rev() {
            assert!(tracker.lookup(*target).is_some());
            assert!(tracker.lookup(*target).is_some());
        }
        let hoisted: Vec<_> = std::iter::from_fn(|| tracker.next_pending()).collect();
        let expected: Vec<_> = chain.iter().rev().map(|t| (tracker.entry(*t).unwrap().id, *t)).collect();
        assert_eq!(hoisted, expected);
    }
}
