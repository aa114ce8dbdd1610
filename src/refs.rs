//! Refs and their deferred application.

use crate::component::Component;
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	mem,
};
use std::rc::Rc;
use tracing::trace;

/// What a [`Ref`] is attached to.
pub enum RefTarget<N> {
	/// A host element or text node.
	Node(N),
	Instance(Rc<RefCell<dyn Component<N>>>),
}

impl<N> RefTarget<N> {
	#[must_use]
	pub fn as_node(&self) -> Option<&N> {
		match self {
			Self::Node(node) => Some(node),
			Self::Instance(_) => None,
		}
	}

	#[must_use]
	pub fn as_instance(&self) -> Option<&Rc<RefCell<dyn Component<N>>>> {
		match self {
			Self::Node(_) => None,
			Self::Instance(instance) => Some(instance),
		}
	}
}

impl<N: Clone> Clone for RefTarget<N> {
	fn clone(&self) -> Self {
		match self {
			Self::Node(node) => Self::Node(node.clone()),
			Self::Instance(instance) => Self::Instance(Rc::clone(instance)),
		}
	}
}

/// Nodes compare by value, instances by identity.
impl<N: PartialEq> PartialEq for RefTarget<N> {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Node(n_1), Self::Node(n_2)) => n_1 == n_2,
			(Self::Instance(i_1), Self::Instance(i_2)) => Rc::as_ptr(i_1).cast::<()>() == Rc::as_ptr(i_2).cast::<()>(),
			_ => false,
		}
	}
}

impl<N: Debug> Debug for RefTarget<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
			Self::Instance(instance) => f.debug_tuple("Instance").field(&Rc::as_ptr(instance).cast::<()>()).finish(),
		}
	}
}

/// A handle through which the current [`RefTarget`] at an element's position is published.
///
/// Refs are compared by handle: clones of one [`Ref`] are equal, separately created ones are not.
pub enum Ref<N> {
	/// Called with the target once it is attached, and with [`None`] once it is detached.
	Callback(Rc<dyn Fn(Option<RefTarget<N>>)>),
	/// A box whose content is replaced, see [`Ref::current`].
	Object(Rc<RefCell<Option<RefTarget<N>>>>),
}

impl<N> Ref<N> {
	pub fn callback(f: impl 'static + Fn(Option<RefTarget<N>>)) -> Self {
		Self::Callback(Rc::new(f))
	}

	#[must_use]
	pub fn object() -> Self {
		Self::Object(Rc::new(RefCell::new(None)))
	}

	/// The current target of an [`Ref::Object`]. Always [`None`] for callbacks.
	#[must_use]
	pub fn current(&self) -> Option<RefTarget<N>>
	where
		N: Clone,
	{
		match self {
			Self::Callback(_) => None,
			Self::Object(current) => current.borrow().clone(),
		}
	}

	fn apply(&self, target: Option<RefTarget<N>>) {
		match self {
			Self::Callback(callback) => callback(target),
			Self::Object(current) => *current.borrow_mut() = target,
		}
	}
}

impl<N> Clone for Ref<N> {
	fn clone(&self) -> Self {
		match self {
			Self::Callback(callback) => Self::Callback(Rc::clone(callback)),
			Self::Object(current) => Self::Object(Rc::clone(current)),
		}
	}
}

impl<N> PartialEq for Ref<N> {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Callback(c_1), Self::Callback(c_2)) => Rc::ptr_eq(c_1, c_2),
			(Self::Object(o_1), Self::Object(o_2)) => Rc::ptr_eq(o_1, o_2),
			_ => false,
		}
	}
}
impl<N> Eq for Ref<N> {}

impl<N> Debug for Ref<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Callback(callback) => f.debug_tuple("Ref::Callback").field(&Rc::as_ptr(callback).cast::<()>()).finish(),
			Self::Object(current) => f.debug_tuple("Ref::Object").field(&Rc::as_ptr(current)).finish(),
		}
	}
}

/// Ref updates collected during a render, applied in order once all DOM work is done.
///
/// Mounting pushes children before their parent and teardown pushes detachments bottom-up too,
/// so a parent's ref always observes fully populated children.
pub(crate) struct RefQueue<N> {
	pending: Vec<(Ref<N>, Option<RefTarget<N>>)>,
}

impl<N> RefQueue<N> {
	pub fn new() -> Self {
		Self { pending: Vec::new() }
	}

	pub fn attach(&mut self, r: Ref<N>, target: Option<RefTarget<N>>) {
		self.pending.push((r, target))
	}

	pub fn detach(&mut self, r: Ref<N>) {
		self.pending.push((r, None))
	}

	/// Applies and drains all pending updates. Returns how many there were.
	pub fn flush(&mut self) -> usize {
		let pending = mem::take(&mut self.pending);
		let count = pending.len();
		for (r, target) in pending {
			r.apply(target)
		}
		count
	}

	/// Drops pending updates without applying them.
	pub fn clear(&mut self) {
		if !self.pending.is_empty() {
			trace!("Discarding {} pending ref update(s).", self.pending.len());
		}
		self.pending.clear()
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.pending.len()
	}
}

/// Queues the transition from `old` to `new` at a position whose current target is `target`.
///
/// Nothing happens if both are absent or identical. Otherwise the old ref is detached before the new one is attached.
pub(crate) fn diff_ref<N>(queue: &mut RefQueue<N>, old: Option<&Ref<N>>, new: Option<&Ref<N>>, target: Option<RefTarget<N>>) {
	if old == new {
		return;
	}
	if let Some(old) = old {
		queue.detach(old.clone());
	}
	if let Some(new) = new {
		queue.attach(new.clone(), target);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn recording(log: &Rc<RefCell<Vec<(&'static str, Option<u32>)>>>, name: &'static str) -> Ref<u32> {
		let log = Rc::clone(log);
		Ref::callback(move |target| log.borrow_mut().push((name, target.and_then(|target| target.as_node().copied()))))
	}

	#[test]
	fn identical_refs_are_left_alone() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let r = recording(&log, "r");
		let mut queue = RefQueue::new();

		diff_ref(&mut queue, Some(&r), Some(&r.clone()), Some(RefTarget::Node(1)));
		diff_ref(&mut queue, None, None, Some(RefTarget::Node(1)));
		assert_eq!(queue.len(), 0);
	}

	#[test]
	fn old_ref_detaches_before_new_ref_attaches() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let (a, b) = (recording(&log, "a"), recording(&log, "b"));
		let mut queue = RefQueue::new();

		diff_ref(&mut queue, Some(&a), Some(&b), Some(RefTarget::Node(7)));
		assert!(log.borrow().is_empty(), "Refs must not fire before the queue is flushed.");

		assert_eq!(queue.flush(), 2);
		assert_eq!(*log.borrow(), vec![("a", None), ("b", Some(7))]);
		assert_eq!(queue.flush(), 0);
	}

	#[test]
	fn object_refs_hold_the_current_target() {
		let r = Ref::<u32>::object();
		let mut queue = RefQueue::new();

		queue.attach(r.clone(), Some(RefTarget::Node(3)));
		queue.flush();
		assert_eq!(r.current().and_then(|target| target.as_node().copied()), Some(3));

		queue.detach(r.clone());
		queue.clear();
		assert!(r.current().is_some(), "Cleared updates must not be applied.");

		queue.detach(r.clone());
		queue.flush();
		assert!(r.current().is_none());
	}
}
