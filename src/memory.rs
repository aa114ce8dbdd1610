//! An in-memory [`Dom`] for tests and headless rendering.
//!
//! Nodes live in an arena and are never freed, so [`MemoryNode`] handles stay valid (and comparable) for the lifetime of the [`MemoryDom`],
//! even after the reconciler removed them. That makes it easy to assert on node identity across renders.

use crate::{
	coerce::number_to_string,
	dom::{Dom, EventHandler, Namespace, PropertyValue},
	event::Event,
	Error,
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use std::collections::BTreeMap;
use tracing::{instrument, trace};

/// A node handle into a [`MemoryDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNode(usize);

/// A property value as stored on a [`MemoryDom`] element.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
	Str(String),
	Number(f64),
	Bool(bool),
}

impl Property {
	fn to_attribute_value(&self) -> Option<String> {
		match self {
			Self::Str(s) => Some(s.clone()),
			Self::Number(n) => Some(number_to_string(*n)),
			Self::Bool(true) => Some(String::new()),
			Self::Bool(false) => None,
		}
	}
}

impl From<PropertyValue<'_>> for Property {
	fn from(value: PropertyValue<'_>) -> Self {
		match value {
			PropertyValue::Str(s) => Self::Str(s.to_owned()),
			PropertyValue::Number(n) => Self::Number(n),
			PropertyValue::Bool(b) => Self::Bool(b),
		}
	}
}

/// A native listener registration in a [`MemoryDom`].
#[derive(Debug, PartialEq, Eq)]
pub struct MemoryListener(u64);

/// Counts of DOM mutations, by kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Mutations {
	pub nodes_created: usize,
	pub insertions: usize,
	pub removals: usize,
	pub text_writes: usize,
	pub property_writes: usize,
	pub attribute_writes: usize,
	pub style_writes: usize,
	pub listeners_added: usize,
	pub listeners_removed: usize,
}

impl Mutations {
	#[must_use]
	pub fn total(&self) -> usize {
		self.nodes_created
			+ self.insertions
			+ self.removals
			+ self.text_writes
			+ self.property_writes
			+ self.attribute_writes
			+ self.style_writes
			+ self.listeners_added
			+ self.listeners_removed
	}
}

/// Properties of HTML elements. Everything else is only reachable as an attribute.
const HTML_PROPERTIES: &[&str] = &[
	"checked",
	"className",
	"dir",
	"disabled",
	"hidden",
	"href",
	"id",
	"lang",
	"name",
	"placeholder",
	"selected",
	"src",
	"tabIndex",
	"title",
	"type",
	"value",
];

/// Event handler properties, present on all elements.
const EVENT_PROPERTIES: &[&str] = &[
	"onblur",
	"onchange",
	"onclick",
	"oncontextmenu",
	"ondblclick",
	"onfocus",
	"ongotpointercapture",
	"oninput",
	"onkeydown",
	"onkeyup",
	"onlostpointercapture",
	"onmousedown",
	"onmouseenter",
	"onmouseleave",
	"onmousemove",
	"onmouseout",
	"onmouseover",
	"onmouseup",
	"onpointerdown",
	"onpointermove",
	"onpointerup",
	"onscroll",
	"onsubmit",
	"onwheel",
];

/// Properties that are mirrored into an attribute when assigned, and the attribute's name.
fn reflected_attribute(property: &str) -> Option<&'static str> {
	Some(match property {
		"className" => "class",
		"dir" => "dir",
		"disabled" => "disabled",
		"hidden" => "hidden",
		"href" => "href",
		"id" => "id",
		"lang" => "lang",
		"name" => "name",
		"placeholder" => "placeholder",
		"src" => "src",
		"tabIndex" => "tabindex",
		"title" => "title",
		"type" => "type",
		_ => return None,
	})
}

fn is_valid_tag(tag: &str) -> bool {
	let mut chars = tag.chars();
	chars.next().map_or(false, |first| first.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

/// `backgroundColor` to `background-color`. Custom properties are kept as they are.
fn css_name(name: &str) -> String {
	if name.starts_with('-') {
		return name.to_owned();
	}
	let mut css = String::with_capacity(name.len() + 2);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			css.push('-');
			css.push(c.to_ascii_lowercase());
		} else {
			css.push(c)
		}
	}
	css
}

struct ElementData {
	tag: String,
	namespace: Namespace,
	attributes: BTreeMap<String, String>,
	properties: HashMap<String, Property>,
	style: BTreeMap<String, String>,
}

enum NodeKind {
	Text(String),
	Element(ElementData),
}

struct ListenerData {
	id: u64,
	name: String,
	capture: bool,
	handler: EventHandler,
}

struct NodeData {
	kind: NodeKind,
	parent: Option<MemoryNode>,
	children: Vec<MemoryNode>,
	listeners: Vec<ListenerData>,
}

impl NodeData {
	fn element(&self) -> Option<&ElementData> {
		match &self.kind {
			NodeKind::Element(element) => Some(element),
			NodeKind::Text(_) => None,
		}
	}
}

/// A minimal DOM: elements with attributes, properties and inline styles, text nodes, and event listeners with capture and bubbling.
#[derive(Default)]
pub struct MemoryDom {
	nodes: Vec<NodeData>,
	next_listener: u64,
	mutations: Mutations,
}

impl Debug for MemoryDom {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDom").field("nodes.len()", &self.nodes.len()).field("mutations", &self.mutations).finish()
	}
}

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a detached HTML element to render into.
	///
	/// # Errors
	///
	/// Iff `tag` is not a valid tag name.
	pub fn create_root(&mut self, tag: &str) -> Result<MemoryNode, Error> {
		self.create_element(tag, Namespace::Html)
	}

	fn push(&mut self, kind: NodeKind) -> MemoryNode {
		self.mutations.nodes_created += 1;
		self.nodes.push(NodeData {
			kind,
			parent: None,
			children: Vec::new(),
			listeners: Vec::new(),
		});
		MemoryNode(self.nodes.len() - 1)
	}

	fn node(&self, node: MemoryNode) -> Result<&NodeData, Error> {
		self.nodes.get(node.0).ok_or_else(|| Error::dom("lookup", format!("{:?} does not belong to this `MemoryDom`", node)))
	}

	fn node_mut(&mut self, node: MemoryNode) -> Result<&mut NodeData, Error> {
		self.nodes.get_mut(node.0).ok_or_else(|| Error::dom("lookup", format!("{:?} does not belong to this `MemoryDom`", node)))
	}

	fn element_mut(&mut self, node: MemoryNode, operation: &'static str) -> Result<&mut ElementData, Error> {
		match &mut self.node_mut(node)?.kind {
			NodeKind::Element(element) => Ok(element),
			NodeKind::Text(_) => Err(Error::dom(operation, format!("{:?} is not an element", node))),
		}
	}

	fn detach(&mut self, node: MemoryNode) -> Result<(), Error> {
		if let Some(parent) = self.node_mut(node)?.parent.take() {
			self.node_mut(parent)?.children.retain(|&child| child != node);
		}
		Ok(())
	}

	fn is_inclusive_ancestor(&self, ancestor: MemoryNode, node: MemoryNode) -> bool {
		let mut current = Some(node);
		while let Some(c) = current {
			if c == ancestor {
				return true;
			}
			current = self.parent(c);
		}
		false
	}

	#[must_use]
	pub fn mutations(&self) -> Mutations {
		self.mutations
	}

	pub fn reset_mutations(&mut self) {
		self.mutations = Mutations::default()
	}

	#[must_use]
	pub fn tag_name(&self, node: MemoryNode) -> Option<&str> {
		self.nodes.get(node.0)?.element().map(|element| element.tag.as_str())
	}

	#[must_use]
	pub fn namespace(&self, node: MemoryNode) -> Option<Namespace> {
		self.nodes.get(node.0)?.element().map(|element| element.namespace)
	}

	/// The data of a text node.
	#[must_use]
	pub fn text(&self, node: MemoryNode) -> Option<&str> {
		match &self.nodes.get(node.0)?.kind {
			NodeKind::Text(text) => Some(text),
			NodeKind::Element(_) => None,
		}
	}

	#[must_use]
	pub fn parent(&self, node: MemoryNode) -> Option<MemoryNode> {
		self.nodes.get(node.0)?.parent
	}

	#[must_use]
	pub fn children(&self, node: MemoryNode) -> &[MemoryNode] {
		self.nodes.get(node.0).map_or(&[], |node| &node.children)
	}

	#[must_use]
	pub fn first_child(&self, node: MemoryNode) -> Option<MemoryNode> {
		self.children(node).first().copied()
	}

	#[must_use]
	pub fn attribute(&self, node: MemoryNode, name: &str) -> Option<&str> {
		self.nodes.get(node.0)?.element()?.attributes.get(name).map(String::as_str)
	}

	#[must_use]
	pub fn property(&self, node: MemoryNode, name: &str) -> Option<&Property> {
		self.nodes.get(node.0)?.element()?.properties.get(name)
	}

	/// An inline style value, by camel-cased or custom property name.
	#[must_use]
	pub fn style(&self, node: MemoryNode, name: &str) -> Option<&str> {
		self.nodes.get(node.0)?.element()?.style.get(&css_name(name)).map(String::as_str)
	}

	#[must_use]
	pub fn listener_count(&self, node: MemoryNode) -> usize {
		self.nodes.get(node.0).map_or(0, |node| node.listeners.len())
	}

	/// The concatenated data of all descendant text nodes.
	#[must_use]
	pub fn text_content(&self, node: MemoryNode) -> String {
		let mut text = String::new();
		self.write_text_content(node, &mut text);
		text
	}

	fn write_text_content(&self, node: MemoryNode, out: &mut String) {
		if let Some(data) = self.nodes.get(node.0) {
			match &data.kind {
				NodeKind::Text(text) => out.push_str(text),
				NodeKind::Element(_) => {
					for &child in &data.children {
						self.write_text_content(child, out)
					}
				}
			}
		}
	}

	/// Serialises the children of `node`. The inline style is written as `style` attribute.
	#[must_use]
	pub fn inner_html(&self, node: MemoryNode) -> String {
		let mut html = String::new();
		for &child in self.children(node) {
			self.write_outer_html(child, &mut html)
		}
		html
	}

	#[must_use]
	pub fn outer_html(&self, node: MemoryNode) -> String {
		let mut html = String::new();
		self.write_outer_html(node, &mut html);
		html
	}

	fn write_outer_html(&self, node: MemoryNode, out: &mut String) {
		let data = match self.nodes.get(node.0) {
			Some(data) => data,
			None => return,
		};
		match &data.kind {
			NodeKind::Text(text) => out.push_str(&escape(text, false)),
			NodeKind::Element(element) => {
				let mut attributes = element.attributes.clone();
				if !element.style.is_empty() {
					let style = element.style.iter().map(|(name, value)| format!("{}: {};", name, value)).collect::<Vec<_>>().join(" ");
					attributes.insert("style".to_owned(), style);
				}

				out.push('<');
				out.push_str(&element.tag);
				for (name, value) in &attributes {
					out.push_str(&format!(" {}=\"{}\"", name, escape(value, true)));
				}
				out.push('>');
				for &child in &data.children {
					self.write_outer_html(child, out)
				}
				out.push_str("</");
				out.push_str(&element.tag);
				out.push('>');
			}
		}
	}

	/// Dispatches a synthetic event of type `event_type` at `target`.
	///
	/// Capturing listeners run from the root down, then the target's listeners, then bubbling listeners up to the root.
	/// Returns the number of listeners that were called.
	#[instrument(skip(self))]
	pub fn dispatch_event(&self, target: MemoryNode, event_type: &str) -> usize {
		let mut path = Vec::new();
		let mut current = Some(target);
		while let Some(node) = current {
			path.push(node);
			current = self.parent(node);
		}
		path.reverse();

		let mut handlers = Vec::new();
		let mut collect = |node: MemoryNode, phase: Option<bool>| {
			if let Some(data) = self.nodes.get(node.0) {
				handlers.extend(
					data.listeners
						.iter()
						.filter(|listener| listener.name == event_type && phase.map_or(true, |capture| listener.capture == capture))
						.map(|listener| EventHandler::clone(&listener.handler)),
				)
			}
		};
		let ancestors = &path[..path.len() - 1];
		for &node in ancestors {
			collect(node, Some(true))
		}
		collect(target, None);
		for &node in ancestors.iter().rev() {
			collect(node, Some(false))
		}

		let event = Event::synthetic(event_type);
		for handler in &handlers {
			handler(&event)
		}
		trace!("Called {} listener(s).", handlers.len());
		handlers.len()
	}
}

fn escape(text: &str, attribute: bool) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' if attribute => escaped.push_str("&quot;"),
			c => escaped.push(c),
		}
	}
	escaped
}

impl Dom for MemoryDom {
	type Node = MemoryNode;
	type Listener = MemoryListener;

	fn create_text_node(&mut self, data: &str) -> MemoryNode {
		self.push(NodeKind::Text(data.to_owned()))
	}

	fn create_element(&mut self, tag: &str, namespace: Namespace) -> Result<MemoryNode, Error> {
		if !is_valid_tag(tag) {
			return Err(Error::ElementCreation {
				tag: tag.to_owned(),
				reason: "InvalidCharacterError: not a valid tag name".to_owned(),
			});
		}
		Ok(self.push(NodeKind::Element(ElementData {
			tag: tag.to_owned(),
			namespace,
			attributes: BTreeMap::new(),
			properties: HashMap::new(),
			style: BTreeMap::new(),
		})))
	}

	fn insert_before(&mut self, parent: &MemoryNode, node: &MemoryNode, anchor: Option<&MemoryNode>) -> Result<(), Error> {
		let (parent, node) = (*parent, *node);
		if self.node(parent)?.element().is_none() {
			return Err(Error::dom("insertBefore", "text nodes can't have children"));
		}
		if self.is_inclusive_ancestor(node, parent) {
			return Err(Error::dom("insertBefore", "HierarchyRequestError: the new child is an ancestor of the parent"));
		}
		if let Some(anchor) = anchor {
			if self.node(*anchor)?.parent != Some(parent) {
				return Err(Error::dom("insertBefore", "NotFoundError: the anchor is not a child of the parent"));
			}
		}

		self.detach(node)?;
		let children = &mut self.node_mut(parent)?.children;
		let index = match anchor {
			Some(anchor) => children.iter().position(|child| child == anchor).unwrap_or(children.len()),
			None => children.len(),
		};
		children.insert(index, node);
		self.node_mut(node)?.parent = Some(parent);
		self.mutations.insertions += 1;
		Ok(())
	}

	fn remove_child(&mut self, parent: &MemoryNode, node: &MemoryNode) -> Result<(), Error> {
		if self.node(*node)?.parent != Some(*parent) {
			return Err(Error::dom("removeChild", "NotFoundError: the node is not a child of the parent"));
		}
		self.detach(*node)?;
		self.mutations.removals += 1;
		Ok(())
	}

	fn parent_node(&self, node: &MemoryNode) -> Option<MemoryNode> {
		self.parent(*node)
	}

	fn set_text(&mut self, node: &MemoryNode, data: &str) -> Result<(), Error> {
		match &mut self.node_mut(*node)?.kind {
			NodeKind::Text(text) => {
				text.clear();
				text.push_str(data);
			}
			NodeKind::Element(_) => return Err(Error::dom("setData", "not a text node")),
		}
		self.mutations.text_writes += 1;
		Ok(())
	}

	fn has_property(&self, element: &MemoryNode, name: &str) -> bool {
		match self.nodes.get(element.0).and_then(NodeData::element) {
			Some(element) => {
				EVENT_PROPERTIES.contains(&name)
					|| match element.namespace {
						Namespace::Html => HTML_PROPERTIES.contains(&name),
						Namespace::Svg => name == "id",
					}
			}
			None => false,
		}
	}

	fn set_property(&mut self, element: &MemoryNode, name: &str, value: PropertyValue<'_>) -> Result<(), Error> {
		let element = self.element_mut(*element, "setProperty")?;
		let value = Property::from(value);
		if let Some(attribute) = reflected_attribute(name) {
			match value.to_attribute_value() {
				Some(value) => element.attributes.insert(attribute.to_owned(), value),
				None => element.attributes.remove(attribute),
			};
		}
		element.properties.insert(name.to_owned(), value);
		self.mutations.property_writes += 1;
		Ok(())
	}

	fn set_attribute(&mut self, element: &MemoryNode, name: &str, value: &str) -> Result<(), Error> {
		self.element_mut(*element, "setAttribute")?.attributes.insert(name.to_owned(), value.to_owned());
		self.mutations.attribute_writes += 1;
		Ok(())
	}

	fn remove_attribute(&mut self, element: &MemoryNode, name: &str) -> Result<(), Error> {
		self.element_mut(*element, "removeAttribute")?.attributes.remove(name);
		self.mutations.attribute_writes += 1;
		Ok(())
	}

	fn set_style_text(&mut self, element: &MemoryNode, text: &str) -> Result<(), Error> {
		let style = &mut self.element_mut(*element, "style.cssText")?.style;
		style.clear();
		for declaration in text.split(';') {
			if let Some((name, value)) = declaration.split_once(':') {
				let (name, value) = (name.trim(), value.trim());
				if !name.is_empty() && !value.is_empty() {
					style.insert(name.to_owned(), value.to_owned());
				}
			}
		}
		self.mutations.style_writes += 1;
		Ok(())
	}

	fn set_style(&mut self, element: &MemoryNode, name: &str, value: &str) -> Result<(), Error> {
		self.set_style_custom_property(element, &css_name(name), value)
	}

	fn set_style_custom_property(&mut self, element: &MemoryNode, name: &str, value: &str) -> Result<(), Error> {
		let style = &mut self.element_mut(*element, "style.setProperty")?.style;
		if value.is_empty() {
			style.remove(name);
		} else {
			style.insert(name.to_owned(), value.to_owned());
		}
		self.mutations.style_writes += 1;
		Ok(())
	}

	fn add_event_listener(&mut self, element: &MemoryNode, name: &str, capture: bool, handler: EventHandler) -> Result<MemoryListener, Error> {
		let id = self.next_listener;
		self.node_mut(*element)?.listeners.push(ListenerData {
			id,
			name: name.to_owned(),
			capture,
			handler,
		});
		self.next_listener += 1;
		self.mutations.listeners_added += 1;
		Ok(MemoryListener(id))
	}

	fn remove_event_listener(&mut self, element: &MemoryNode, name: &str, capture: bool, listener: MemoryListener) -> Result<(), Error> {
		let listeners = &mut self.node_mut(*element)?.listeners;
		match listeners.iter().position(|l| l.id == listener.0 && l.name == name && l.capture == capture) {
			Some(index) => {
				listeners.remove(index);
				self.mutations.listeners_removed += 1;
				Ok(())
			}
			None => Err(Error::dom("removeEventListener", format!("{:?} ({:?}, capture: {}) is not registered", listener, name, capture))),
		}
	}

	fn namespace_of(&self, container: &MemoryNode) -> Namespace {
		match self.nodes.get(container.0).and_then(NodeData::element) {
			Some(element) => element.namespace.for_children(&element.tag),
			None => Namespace::Html,
		}
	}
}
