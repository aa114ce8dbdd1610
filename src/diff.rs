//! The [`Reconciler`]: mounting, diffing and tearing down fibers against a [`Dom`].

use crate::{
	coerce::{coerce, Coerced},
	config::Config,
	dom::{Dom, Namespace},
	fiber::{Fiber, FiberId, FiberTree},
	props::{self, ElementListeners},
	refs::{diff_ref, RefQueue, RefTarget},
	renderable::{Element, ElementType, Renderable},
	Error,
};
use core::fmt::{self, Debug, Display, Formatter};
use slotmap::SecondaryMap;
use std::rc::Rc;
use tracing::{error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Owns a render root: everything that was rendered into a container element's child nodes, and how to update it.
///
/// The container's children are managed by the [`Reconciler`] from the first [`render`](`Reconciler::render`) on.
/// Nodes rendered earlier are located through the [`Reconciler`]'s own bookkeeping rather than the live DOM,
/// so other code must not move or remove them.
///
/// # Correct Use
///
/// Content that should stay identical between renders can be passed as clones of the same [`Rc`]
/// (see [`Renderable`]), in which case the [`Reconciler`] skips it without looking inside.
///
/// Refs are never called during DOM manipulation.
/// They are collected and applied in order once [`render`](`Reconciler::render`) has finished all DOM work.
pub struct Reconciler<D: Dom> {
	dom: D,
	container: D::Node,
	namespace: Namespace,
	fibers: FiberTree<D::Node>,
	root: Option<FiberId>,
	listeners: SecondaryMap<FiberId, ElementListeners<D::Listener>>,
	refs: RefQueue<D::Node>,
	config: Config,
	poisoned: bool,
}

impl<D: Dom> Reconciler<D> {
	/// Attaches a new [`Reconciler`] to the child nodes of `container`, with the default [`Config`].
	pub fn new(dom: D, container: D::Node) -> Self {
		Self::with_config(dom, container, Config::default())
	}

	pub fn with_config(dom: D, container: D::Node, config: Config) -> Self {
		Self {
			namespace: dom.namespace_of(&container),
			dom,
			container,
			fibers: FiberTree::new(),
			root: None,
			listeners: SecondaryMap::new(),
			refs: RefQueue::new(),
			config,
			poisoned: false,
		}
	}

	/// Brings the container's child nodes in line with `renderable`.
	///
	/// The first call mounts, later calls diff against the previous render.
	/// Rendering the same `renderable` twice in a row causes no DOM mutations.
	///
	/// # Errors
	///
	/// If anything fails, the DOM may be left partially updated and this [`Reconciler`] is poisoned:
	/// further renders fail with [`Error::Poisoned`] until [`unmount`](`Reconciler::unmount`) is called.
	/// Pending ref updates of the failed render are discarded.
	#[instrument(skip(self, renderable))]
	pub fn render(&mut self, renderable: Renderable<D::Node>) -> Result<(), Error> {
		if self.poisoned {
			return Err(Error::Poisoned);
		}

		let root = self.root;
		let container = self.container.clone();
		match self.diff_child(root, &renderable, None, None, &container, self.namespace, self.config.depth_limit) {
			Ok(root) => {
				self.root = Some(root);
				let applied = self.refs.flush();
				trace!("Applied {} ref update(s).", applied);
				self.log_metrics();
				Ok(())
			}
			Err(error) => {
				self.poison(&error);
				Err(error)
			}
		}
	}

	/// Removes everything this [`Reconciler`] rendered, detaching all refs and event listeners.
	///
	/// Afterwards, the next [`render`](`Reconciler::render`) mounts from scratch.
	///
	/// This also recovers a poisoned [`Reconciler`]. Since the fiber tree may be inconsistent in that case,
	/// all fibers are discarded individually and DOM errors are only logged.
	///
	/// # Errors
	///
	/// Iff removing a node fails while the [`Reconciler`] isn't poisoned. It is poisoned afterwards.
	#[instrument(skip(self))]
	pub fn unmount(&mut self) -> Result<(), Error> {
		if self.poisoned {
			self.root = None;
			self.discard_fibers();
		} else if let Some(root) = self.root.take() {
			if let Err(error) = self.teardown(root) {
				self.poison(&error);
				return Err(error);
			}
		}

		let applied = self.refs.flush();
		trace!("Applied {} ref update(s).", applied);
		self.poisoned = false;
		self.log_metrics();
		Ok(())
	}

	#[must_use]
	pub fn dom(&self) -> &D {
		&self.dom
	}

	/// Grants mutable access to the DOM backend.
	///
	/// Changing nodes this [`Reconciler`] manages may cause later renders to fail.
	pub fn dom_mut(&mut self) -> &mut D {
		&mut self.dom
	}

	#[must_use]
	pub fn container(&self) -> &D::Node {
		&self.container
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The number of tree positions currently tracked. Zero after [`unmount`](`Reconciler::unmount`).
	#[must_use]
	pub fn fiber_count(&self) -> usize {
		self.fibers.len()
	}

	#[must_use]
	pub fn is_poisoned(&self) -> bool {
		self.poisoned
	}

	/// Gives up the DOM backend. Rendered nodes stay where they are.
	pub fn into_dom(self) -> D {
		self.dom
	}

	fn poison(&mut self, error: &Error) {
		error!("Render failed: {}", error);
		self.poisoned = true;
		self.refs.clear();
	}

	/// Drops all fibers without following their links.
	///
	/// DOM nodes are removed where no fiber above them owns a node, listeners are released and refs detached.
	fn discard_fibers(&mut self) {
		let fibers = &self.fibers;
		let top_level = |fiber: &Fiber<D::Node>| {
			let mut ancestor = fiber.parent;
			while let Some(id) = ancestor {
				match fibers.get(id) {
					Some(parent) if parent.dom.is_some() => return false,
					Some(parent) => ancestor = parent.parent,
					None => break,
				}
			}
			true
		};

		let mut removed = 0_usize;
		for (id, fiber) in fibers.iter() {
			if let Some(node) = &fiber.dom {
				if let Some(listeners) = self.listeners.remove(id) {
					props::release_listeners(&mut self.dom, node, listeners);
				}
				if top_level(fiber) {
					if let Some(parent) = self.dom.parent_node(node) {
						match self.dom.remove_child(&parent, node) {
							Ok(()) => removed += 1,
							Err(error) => warn!("Failed to remove {:?} while discarding fibers: {}", node, error),
						}
					}
				}
			}
			if let Some(r) = &fiber.ref_ {
				self.refs.detach(r.clone())
			}
		}

		warn!("Discarded {} fiber(s) and removed {} top-level node(s).", fibers.len(), removed);
		self.listeners = SecondaryMap::new();
		self.fibers = FiberTree::new();
	}

	fn log_metrics(&self) {
		let native_listeners: usize = self.listeners.values().map(ElementListeners::installed_count).sum();
		info!("Fiber count: {}", self.fibers.len());
		info!("Elements with event handlers/native listeners: {}/{}", self.listeners.len(), native_listeners);
		if STATIC_MAX_LEVEL >= Level::WARN && native_listeners >= self.config.listener_warning_threshold {
			warn!(
				"The number of native event listeners is large ({}).\n\
				This may point to event handlers being set on many repeated elements.",
				native_listeners
			)
		}
	}

	/// Diffs the fiber `old` (if any) against `renderable`, in the slot after `previous` (or first under `parent`).
	///
	/// Returns the fiber now occupying the slot, which is `old` unless it had to be replaced.
	#[allow(clippy::too_many_arguments)]
	#[instrument(skip(self, renderable, container))]
	fn diff_child(
		&mut self,
		old: Option<FiberId>,
		renderable: &Renderable<D::Node>,
		parent: Option<FiberId>,
		previous: Option<FiberId>,
		container: &D::Node,
		namespace: Namespace,
		depth_limit: usize,
	) -> Result<FiberId, Error> {
		if depth_limit == 0 {
			return Err(Error::DepthLimit(self.config.depth_limit));
		}

		let coerced = coerce(renderable);
		let old = match old {
			Some(old) => old,
			None => {
				let anchor = match (previous, parent) {
					(Some(previous), _) => self.fibers.anchor_after(previous),
					(None, Some(parent)) if self.fibers[parent].dom.is_none() => self.fibers.anchor_after(parent),
					_ => None,
				};
				let id = self.mount(&coerced, parent, container, anchor.as_ref(), namespace, depth_limit)?;
				self.fibers.link(parent, previous, id);
				return Ok(id);
			}
		};

		let old_data = self.fibers[old].data.clone();
		if old_data.is_identical(&coerced) {
			trace!("Unchanged {}.", coerced.kind());
			return Ok(old);
		}
		if self.fibers[old].key.as_ref() != coerced.key() {
			let span = trace_span!("Key mismatch", old = ?self.fibers[old].key, new = ?coerced.key());
			let _enter = span.enter();
			return self.replace(old, &coerced, parent, previous, container, namespace, depth_limit);
		}

		match (&old_data, &coerced) {
			(Coerced::Text(_), Coerced::Text(text)) => {
				let span = trace_span!("Updating text", text = %LoggedText(text));
				let _enter = span.enter();
				match &self.fibers[old].dom {
					Some(node) => {
						let node = node.clone();
						self.dom.set_text(&node, text)?
					}
					None => return Err(Error::dom("setData", "text fiber without a node")),
				}
			}
			(Coerced::List(_), Coerced::List(items)) => self.diff_list(old, items, container, namespace, depth_limit)?,
			(Coerced::Element(e_1), Coerced::Element(e_2)) if e_1.ty.same_type(&e_2.ty) => self.update_element(old, e_1, e_2, container, namespace, depth_limit)?,
			_ => return self.replace(old, &coerced, parent, previous, container, namespace, depth_limit),
		}

		self.fibers[old].data = coerced;
		Ok(old)
	}

	/// Tears `old` down and mounts `coerced` in its place.
	#[allow(clippy::too_many_arguments)]
	fn replace(
		&mut self,
		old: FiberId,
		coerced: &Coerced<D::Node>,
		parent: Option<FiberId>,
		previous: Option<FiberId>,
		container: &D::Node,
		namespace: Namespace,
		depth_limit: usize,
	) -> Result<FiberId, Error> {
		let span = trace_span!("Replacing", old = self.fibers[old].data.kind(), new = coerced.kind());
		let _enter = span.enter();

		let anchor = self.fibers.anchor_after(old);
		let next = self.fibers[old].next;
		self.teardown(old)?;
		let id = self.mount(coerced, parent, container, anchor.as_ref(), namespace, depth_limit)?;
		self.fibers.splice(parent, previous, next, id);
		Ok(id)
	}

	/// Positional list diff: item `i` is diffed against the fiber at index `i`. Surplus fibers are torn down.
	fn diff_list(&mut self, id: FiberId, items: &[Renderable<D::Node>], container: &D::Node, namespace: Namespace, depth_limit: usize) -> Result<(), Error> {
		let span = trace_span!("Diffing list", "items.len()" = items.len());
		let _enter = span.enter();

		let mut old_child = self.fibers[id].child;
		let mut previous = None;
		for item in items {
			let next_old = old_child.and_then(|old_child| self.fibers[old_child].next);
			previous = Some(self.diff_child(old_child, item, Some(id), previous, container, namespace, depth_limit - 1)?);
			old_child = next_old;
		}

		let mut removed = 0_usize;
		while let Some(surplus) = old_child {
			old_child = self.fibers[surplus].next;
			self.teardown(surplus)?;
			removed += 1;
		}
		if removed > 0 {
			trace!("Removed {} surplus item(s).", removed);
		}
		self.fibers.truncate_after(id, previous);
		Ok(())
	}

	/// Updates a fiber whose element type stayed the same.
	fn update_element(
		&mut self,
		id: FiberId,
		old: &Rc<Element<D::Node>>,
		new: &Rc<Element<D::Node>>,
		container: &D::Node,
		namespace: Namespace,
		depth_limit: usize,
	) -> Result<(), Error> {
		let child = self.fibers[id].child;
		match &new.ty {
			ElementType::Tag(tag) => {
				let span = trace_span!("Updating element", %tag);
				let _enter = span.enter();

				let node = self.fibers[id].dom.clone().ok_or_else(|| Error::dom("update", "element fiber without a node"))?;
				let element_namespace = self.fibers[id].namespace;
				let mut listeners = self.listeners.remove(id).unwrap_or_default();
				let result = props::diff_props(&mut self.dom, &mut listeners, &node, element_namespace, Some(&old.props), &new.props);
				if !listeners.is_empty() {
					self.listeners.insert(id, listeners);
				}
				result?;

				self.diff_child(child, new.props.children(), Some(id), None, &node, element_namespace.for_children(tag), depth_limit - 1)?;
				diff_ref(&mut self.refs, old.ref_.as_ref(), new.ref_.as_ref(), Some(RefTarget::Node(node)));
			}
			ElementType::Function(function) => {
				let span = trace_span!("Updating function component", name = function.name());
				let _enter = span.enter();

				let output = function.call(&new.props);
				let previous_target = self.fibers.ref_target(id);
				self.diff_child(child, &output, Some(id), None, container, namespace, depth_limit - 1)?;
				let target = self.fibers.ref_target(id);
				match &new.ref_ {
					// The output was replaced underneath an unchanged ref.
					Some(r) if old.ref_.as_ref() == Some(r) && previous_target != target => {
						trace!("Re-attaching ref to the function component's new output.");
						self.refs.detach(r.clone());
						self.refs.attach(r.clone(), target);
					}
					_ => diff_ref(&mut self.refs, old.ref_.as_ref(), new.ref_.as_ref(), target),
				}
			}
			ElementType::Class(class) => {
				let span = trace_span!("Updating class component", name = class.name());
				let _enter = span.enter();

				let instance = self.fibers[id].component.clone().ok_or_else(|| Error::dom("update", "class fiber without an instance"))?;
				let output = instance.borrow_mut().render(&new.props);
				self.diff_child(child, &output, Some(id), None, container, namespace, depth_limit - 1)?;
				diff_ref(&mut self.refs, old.ref_.as_ref(), new.ref_.as_ref(), Some(RefTarget::Instance(instance)));
			}
		}
		self.fibers[id].ref_ = new.ref_.clone();
		Ok(())
	}

	/// Creates a fiber for `coerced` with all of its DOM, inserted into `container` before `anchor`.
	///
	/// The new fiber points to `parent` but isn't linked into the tree yet.
	#[instrument(skip(self, coerced, container, anchor))]
	fn mount(
		&mut self,
		coerced: &Coerced<D::Node>,
		parent: Option<FiberId>,
		container: &D::Node,
		anchor: Option<&D::Node>,
		namespace: Namespace,
		depth_limit: usize,
	) -> Result<FiberId, Error> {
		if depth_limit == 0 {
			return Err(Error::DepthLimit(self.config.depth_limit));
		}

		let id = self.fibers.insert(Fiber::new(coerced.clone(), parent));
		match coerced {
			Coerced::Null => trace!("Nothing to mount."),
			Coerced::Text(text) => {
				let span = trace_span!("Mounting text", text = %LoggedText(text));
				let _enter = span.enter();

				let node = self.dom.create_text_node(text);
				self.dom.insert_before(container, &node, anchor)?;
				self.fibers[id].dom = Some(node);
			}
			Coerced::List(items) => {
				let span = trace_span!("Mounting list", "items.len()" = items.len());
				let _enter = span.enter();

				let mut previous = None;
				for item in items.iter() {
					let child = self.mount(&coerce(item), Some(id), container, anchor, namespace, depth_limit - 1)?;
					self.fibers.link(Some(id), previous, child);
					previous = Some(child);
				}
			}
			Coerced::Element(element) => self.mount_element(id, element, container, anchor, namespace, depth_limit)?,
		}
		Ok(id)
	}

	fn mount_element(&mut self, id: FiberId, element: &Element<D::Node>, container: &D::Node, anchor: Option<&D::Node>, namespace: Namespace, depth_limit: usize) -> Result<(), Error> {
		let target = match &element.ty {
			ElementType::Tag(tag) => {
				let span = trace_span!("Mounting element", %tag);
				let _enter = span.enter();

				let element_namespace = namespace.for_tag(tag);
				let node = self.dom.create_element(tag, element_namespace)?;
				{
					let fiber = &mut self.fibers[id];
					fiber.dom = Some(node.clone());
					fiber.namespace = element_namespace;
				}

				let mut listeners = ElementListeners::default();
				let result = props::diff_props(&mut self.dom, &mut listeners, &node, element_namespace, None, &element.props);
				if !listeners.is_empty() {
					self.listeners.insert(id, listeners);
				}
				result?;

				let child = self.mount(&coerce(element.props.children()), Some(id), &node, None, element_namespace.for_children(tag), depth_limit - 1)?;
				self.fibers.link(Some(id), None, child);
				self.dom.insert_before(container, &node, anchor)?;
				Some(RefTarget::Node(node))
			}
			ElementType::Function(function) => {
				let span = trace_span!("Mounting function component", name = function.name());
				let _enter = span.enter();

				let output = function.call(&element.props);
				let child = self.mount(&coerce(&output), Some(id), container, anchor, namespace, depth_limit - 1)?;
				self.fibers.link(Some(id), None, child);
				self.fibers.ref_target(id)
			}
			ElementType::Class(class) => {
				let span = trace_span!("Mounting class component", name = class.name());
				let _enter = span.enter();

				let instance = class.construct(&element.props);
				self.fibers[id].component = Some(Rc::clone(&instance));
				let output = instance.borrow_mut().render(&element.props);
				let child = self.mount(&coerce(&output), Some(id), container, anchor, namespace, depth_limit - 1)?;
				self.fibers.link(Some(id), None, child);
				Some(RefTarget::Instance(instance))
			}
		};

		if let Some(r) = &element.ref_ {
			self.refs.attach(r.clone(), target);
			self.fibers[id].ref_ = Some(r.clone());
		}
		Ok(())
	}

	/// Removes `id` and its subtree from the DOM and the fiber tree.
	///
	/// Ref detachments are queued children first. Sibling links pointing at `id` are left for the caller to fix.
	#[instrument(skip(self))]
	fn teardown(&mut self, id: FiberId) -> Result<(), Error> {
		self.remove_dom_range(id)?;
		self.unbind(id);
		let freed = self.fibers.remove_subtree(id);
		trace!("Freed {} fiber(s).", freed);
		Ok(())
	}

	/// Removes the top-most DOM nodes owned by `id` or its descendants.
	fn remove_dom_range(&mut self, id: FiberId) -> Result<(), Error> {
		match self.fibers[id].dom.clone() {
			Some(node) => {
				let parent = self.dom.parent_node(&node).ok_or_else(|| Error::Detached { node: format!("{:?}", node) })?;
				self.dom.remove_child(&parent, &node)
			}
			None => {
				let mut child = self.fibers[id].child;
				while let Some(c) = child {
					self.remove_dom_range(c)?;
					child = self.fibers[c].next;
				}
				Ok(())
			}
		}
	}

	/// Releases listeners and queues ref detachments for `id` and its subtree, children first.
	fn unbind(&mut self, id: FiberId) {
		let mut child = self.fibers[id].child;
		while let Some(c) = child {
			self.unbind(c);
			child = self.fibers[c].next;
		}

		if let Some(listeners) = self.listeners.remove(id) {
			if let Some(node) = self.fibers[id].dom.clone() {
				let released = props::release_listeners(&mut self.dom, &node, listeners);
				trace!("Released {} native listener(s).", released);
			}
		}
		if let Some(r) = self.fibers[id].ref_.clone() {
			self.refs.detach(r)
		}
	}
}

impl<D: Dom + Debug> Debug for Reconciler<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Reconciler")
			.field("dom", &self.dom)
			.field("container", &self.container)
			.field("namespace", &self.namespace)
			.field("root", &self.root)
			.field("fibers.len()", &self.fibers.len())
			.field("listeners.len()", &self.listeners.len())
			.field("config", &self.config)
			.field("poisoned", &self.poisoned)
			.finish()
	}
}

/// Text content for span fields. Only the length is shown unless the `"dangerous-logging"` feature is enabled.
struct LoggedText<'a>(&'a str);

impl Display for LoggedText<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if cfg!(feature = "dangerous-logging") {
			Debug::fmt(self.0, f)
		} else {
			write!(f, "({} bytes)", self.0.len())
		}
	}
}
