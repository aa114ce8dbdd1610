//! The DOM primitives the reconciler is written against.

use crate::{event::Event, Error};
use core::fmt::Debug;
use std::rc::Rc;

/// Which tag-creation call an element needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
	Html,
	Svg,
}

impl Namespace {
	pub const SVG_URI: &'static str = "http://www.w3.org/2000/svg";

	/// The namespace of a `tag` element created under a parent in `self`.
	#[must_use]
	pub fn for_tag(self, tag: &str) -> Self {
		if tag == "svg" {
			Self::Svg
		} else {
			self
		}
	}

	/// The namespace of the children of a `tag` element in `self`.
	#[must_use]
	pub fn for_children(self, tag: &str) -> Self {
		match self {
			Self::Svg if tag == "foreignObject" => Self::Html,
			other => other,
		}
	}

	#[must_use]
	pub fn uri(self) -> Option<&'static str> {
		match self {
			Self::Html => None,
			Self::Svg => Some(Self::SVG_URI),
		}
	}
}

/// A value assigned directly to an element property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue<'a> {
	Str(&'a str),
	Number(f64),
	Bool(bool),
}

/// Handler installed as a native event listener.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// A DOM implementation.
///
/// All node arguments are handles previously returned by the same implementation.
/// The reconciler never inspects the live DOM beyond [`Dom::parent_node`] and [`Dom::has_property`],
/// so implementations are free to be as thin as a binding layer.
pub trait Dom {
	/// A cheap handle to a DOM node.
	type Node: Clone + Debug + PartialEq + 'static;
	/// Keeps a native event listener registration alive until it is passed back to [`Dom::remove_event_listener`].
	type Listener;

	fn create_text_node(&mut self, data: &str) -> Self::Node;

	/// # Errors
	///
	/// [`Error::ElementCreation`] if `tag` is not a valid element name.
	fn create_element(&mut self, tag: &str, namespace: Namespace) -> Result<Self::Node, Error>;

	/// Inserts `node` into `parent` before `anchor`, or at the end if `anchor` is [`None`].
	///
	/// `node` is moved if it is already attached elsewhere.
	fn insert_before(&mut self, parent: &Self::Node, node: &Self::Node, anchor: Option<&Self::Node>) -> Result<(), Error>;

	fn remove_child(&mut self, parent: &Self::Node, node: &Self::Node) -> Result<(), Error>;

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;

	/// Replaces the data of a text node.
	fn set_text(&mut self, node: &Self::Node, data: &str) -> Result<(), Error>;

	/// Whether `name` is a property of `element` (like JavaScript's `name in element`).
	fn has_property(&self, element: &Self::Node, name: &str) -> bool;

	fn set_property(&mut self, element: &Self::Node, name: &str, value: PropertyValue<'_>) -> Result<(), Error>;

	fn set_attribute(&mut self, element: &Self::Node, name: &str, value: &str) -> Result<(), Error>;

	fn remove_attribute(&mut self, element: &Self::Node, name: &str) -> Result<(), Error>;

	/// Replaces the whole inline style (`style.cssText`).
	fn set_style_text(&mut self, element: &Self::Node, text: &str) -> Result<(), Error>;

	/// Sets one camel-cased inline style property. The empty string clears it.
	fn set_style(&mut self, element: &Self::Node, name: &str, value: &str) -> Result<(), Error>;

	/// Sets a custom property like `--accent` (`style.setProperty`). The empty string clears it.
	fn set_style_custom_property(&mut self, element: &Self::Node, name: &str, value: &str) -> Result<(), Error>;

	fn add_event_listener(&mut self, element: &Self::Node, name: &str, capture: bool, handler: EventHandler) -> Result<Self::Listener, Error>;

	fn remove_event_listener(&mut self, element: &Self::Node, name: &str, capture: bool, listener: Self::Listener) -> Result<(), Error>;

	/// The namespace children of `container` are created in.
	fn namespace_of(&self, container: &Self::Node) -> Namespace;
}
