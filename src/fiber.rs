//! Per-position bookkeeping mirroring the last render.
//!
//! Fibers live in a slot map and link to each other by [`FiberId`]:
//! each has a `parent`, its first `child` and its `next` sibling.
//! A fiber that renders "through" its children (lists, components, empty renders) has no `dom` node of its own,
//! so DOM positions are always derived from this graph rather than from sibling adjacency in the live DOM.

use crate::{
	coerce::Coerced,
	component::Component,
	dom::Namespace,
	refs::{Ref, RefTarget},
	renderable::{ElementType, Key},
};
use core::{
	cell::RefCell,
	iter,
	ops::{Index, IndexMut},
};
use slotmap::SlotMap;
use std::rc::Rc;

slotmap::new_key_type! {
	/// Identifies a fiber within its tree.
	pub struct FiberId;
}

pub(crate) struct Fiber<N> {
	pub data: Coerced<N>,
	pub key: Option<Key>,
	pub dom: Option<N>,
	pub namespace: Namespace,
	pub parent: Option<FiberId>,
	pub child: Option<FiberId>,
	pub next: Option<FiberId>,
	pub component: Option<Rc<RefCell<dyn Component<N>>>>,
	pub ref_: Option<Ref<N>>,
}

impl<N> Fiber<N> {
	pub fn new(data: Coerced<N>, parent: Option<FiberId>) -> Self {
		Self {
			key: data.key().cloned(),
			data,
			dom: None,
			namespace: Namespace::Html,
			parent,
			child: None,
			next: None,
			component: None,
			ref_: None,
		}
	}
}

pub(crate) struct FiberTree<N> {
	fibers: SlotMap<FiberId, Fiber<N>>,
}

impl<N> Index<FiberId> for FiberTree<N> {
	type Output = Fiber<N>;

	fn index(&self, id: FiberId) -> &Self::Output {
		&self.fibers[id]
	}
}

impl<N> IndexMut<FiberId> for FiberTree<N> {
	fn index_mut(&mut self, id: FiberId) -> &mut Self::Output {
		&mut self.fibers[id]
	}
}

impl<N> FiberTree<N> {
	pub fn new() -> Self {
		Self { fibers: SlotMap::with_key() }
	}

	pub fn insert(&mut self, fiber: Fiber<N>) -> FiberId {
		self.fibers.insert(fiber)
	}

	pub fn get(&self, id: FiberId) -> Option<&Fiber<N>> {
		self.fibers.get(id)
	}

	pub fn iter(&self) -> impl '_ + Iterator<Item = (FiberId, &Fiber<N>)> {
		self.fibers.iter()
	}

	pub fn len(&self) -> usize {
		self.fibers.len()
	}

	pub fn children(&self, id: FiberId) -> impl '_ + Iterator<Item = FiberId> {
		iter::successors(self[id].child, move |&child| self[child].next)
	}

	/// Puts `new` into the slot after `previous` (or first under `parent`), in front of `next`.
	pub fn splice(&mut self, parent: Option<FiberId>, previous: Option<FiberId>, next: Option<FiberId>, new: FiberId) {
		let fiber = &mut self[new];
		fiber.parent = parent;
		fiber.next = next;
		match (previous, parent) {
			(Some(previous), _) => self[previous].next = Some(new),
			(None, Some(parent)) => self[parent].child = Some(new),
			(None, None) => (),
		}
	}

	/// Inserts `new` after `previous` (or first under `parent`), shifting the current occupant of that slot back.
	pub fn link(&mut self, parent: Option<FiberId>, previous: Option<FiberId>, new: FiberId) {
		let next = match (previous, parent) {
			(Some(previous), _) => self[previous].next,
			(None, Some(parent)) => self[parent].child,
			(None, None) => None,
		};
		self.splice(parent, previous, next, new)
	}

	/// Cuts off all siblings after `previous`, or all children of `parent` if there is no `previous`.
	pub fn truncate_after(&mut self, parent: FiberId, previous: Option<FiberId>) {
		match previous {
			Some(previous) => self[previous].next = None,
			None => self[parent].child = None,
		}
	}

	/// Frees `id` and all of its descendants. Sibling links pointing at `id` are left for the caller to fix.
	pub fn remove_subtree(&mut self, id: FiberId) -> usize {
		let mut freed = 0;
		let mut stack = vec![id];
		while let Some(current) = stack.pop() {
			if let Some(fiber) = self.fibers.remove(current) {
				freed += 1;
				let mut child = fiber.child;
				while let Some(c) = child {
					stack.push(c);
					child = self.fibers.get(c).and_then(|fiber| fiber.next);
				}
			}
		}
		freed
	}
}

impl<N: Clone> FiberTree<N> {
	/// The first DOM node owned by `id` or (in document order) by its descendants.
	pub fn first_dom(&self, id: FiberId) -> Option<N> {
		let fiber = &self[id];
		if let Some(dom) = &fiber.dom {
			return Some(dom.clone());
		}
		self.children(id).find_map(|child| self.first_dom(child))
	}

	/// The DOM node that content rendered at `id` has to be inserted before.
	///
	/// This is the first DOM node among the following siblings, continuing with the parent's siblings
	/// as long as the parent doesn't own a DOM node itself. [`None`] means "append to the container".
	pub fn anchor_after(&self, id: FiberId) -> Option<N> {
		let mut current = id;
		loop {
			let fiber = &self[current];
			if let Some(node) = iter::successors(fiber.next, |&sibling| self[sibling].next).find_map(|sibling| self.first_dom(sibling)) {
				return Some(node);
			}
			match fiber.parent {
				Some(parent) if self[parent].dom.is_none() => current = parent,
				_ => return None,
			}
		}
	}

	/// What a ref at `id` is attached to: the host node, the class instance,
	/// or for function components whatever their output resolves to.
	pub fn ref_target(&self, id: FiberId) -> Option<RefTarget<N>> {
		let fiber = &self[id];
		if let Some(component) = &fiber.component {
			return Some(RefTarget::Instance(Rc::clone(component)));
		}
		if let Some(dom) = &fiber.dom {
			return Some(RefTarget::Node(dom.clone()));
		}
		match &fiber.data {
			Coerced::Element(element) if matches!(element.ty, ElementType::Function(_)) => fiber.child.and_then(|child| self.ref_target(child)),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// `list[ text(1), list[ null, list[] ], text(2) ]` under an element owning node 0.
	fn sample() -> (FiberTree<u32>, [FiberId; 7]) {
		let mut tree = FiberTree::new();
		let element = tree.insert(Fiber { dom: Some(0), ..Fiber::new(Coerced::Null, None) });
		let outer = tree.insert(Fiber::new(Coerced::Null, Some(element)));
		tree.link(Some(element), None, outer);

		let text_1 = tree.insert(Fiber { dom: Some(1), ..Fiber::new(Coerced::Null, Some(outer)) });
		tree.link(Some(outer), None, text_1);
		let inner = tree.insert(Fiber::new(Coerced::Null, Some(outer)));
		tree.link(Some(outer), Some(text_1), inner);
		let text_2 = tree.insert(Fiber { dom: Some(2), ..Fiber::new(Coerced::Null, Some(outer)) });
		tree.link(Some(outer), Some(inner), text_2);

		let null = tree.insert(Fiber::new(Coerced::Null, Some(inner)));
		tree.link(Some(inner), None, null);
		let empty = tree.insert(Fiber::new(Coerced::Null, Some(inner)));
		tree.link(Some(inner), Some(null), empty);

		(tree, [element, outer, text_1, inner, text_2, null, empty])
	}

	#[test]
	fn children_follow_sibling_links() {
		let (tree, [_, outer, text_1, inner, text_2, ..]) = sample();
		assert_eq!(tree.children(outer).collect::<Vec<_>>(), vec![text_1, inner, text_2]);
	}

	#[test]
	fn first_dom_descends_into_children() {
		let (tree, [element, outer, _, inner, ..]) = sample();
		assert_eq!(tree.first_dom(element), Some(0));
		assert_eq!(tree.first_dom(outer), Some(1));
		assert_eq!(tree.first_dom(inner), None);
	}

	#[test]
	fn anchors_skip_empty_ranges_and_climb_through_lists() {
		let (tree, [element, outer, text_1, inner, text_2, null, empty]) = sample();
		assert_eq!(tree.anchor_after(text_1), Some(2));
		assert_eq!(tree.anchor_after(null), Some(2));
		assert_eq!(tree.anchor_after(empty), Some(2));
		assert_eq!(tree.anchor_after(inner), Some(2));
		// The element owns its node, so its children append.
		assert_eq!(tree.anchor_after(text_2), None);
		assert_eq!(tree.anchor_after(outer), None);
		assert_eq!(tree.anchor_after(element), None);
	}

	#[test]
	fn splice_replaces_in_place() {
		let (mut tree, [_, outer, text_1, inner, text_2, ..]) = sample();
		let replacement = tree.insert(Fiber { dom: Some(9), ..Fiber::new(Coerced::Null, None) });
		let next = tree[inner].next;
		assert_eq!(tree.remove_subtree(inner), 3);
		tree.splice(Some(outer), Some(text_1), next, replacement);

		assert_eq!(tree.children(outer).collect::<Vec<_>>(), vec![text_1, replacement, text_2]);
		assert_eq!(tree[replacement].parent, Some(outer));
		assert_eq!(tree.anchor_after(text_1), Some(9));
		assert_eq!(tree.len(), 5);
	}

	#[test]
	fn truncation_drops_the_tail() {
		let (mut tree, [_, outer, text_1, ..]) = sample();
		tree.truncate_after(outer, Some(text_1));
		assert_eq!(tree.children(outer).collect::<Vec<_>>(), vec![text_1]);
		tree.truncate_after(outer, None);
		assert_eq!(tree.children(outer).count(), 0);
	}
}
