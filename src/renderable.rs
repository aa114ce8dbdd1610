//! The "what to render" model: [`Renderable`] trees of text, [`Element`]s and lists.

use crate::{
	coerce::number_to_string,
	component::{ClassType, ComponentClass},
	event::Callback,
	refs::Ref,
};
use core::{
	any::{type_name, TypeId},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::{borrow::Cow, rc::Rc};
use tracing::warn;

/// An element's optional identity among its siblings.
pub type Key = Cow<'static, str>;

/// A description of what to display at one position of the tree.
///
/// `N` is the DOM node handle type of the [`Dom`](`crate::dom::Dom`) backend the tree is rendered with.
/// It only shows up in [`Ref`] targets.
///
/// [`Element`]s and lists are reference-counted.
/// Handing the same [`Rc`] to consecutive renders marks that position as unchanged, which the reconciler skips entirely.
pub enum Renderable<N> {
	Null,
	Undefined,
	/// Renders nothing, like [`Renderable::Null`].
	Bool(bool),
	/// Rendered as text, formatted like JavaScript's `String(number)`.
	Number(f64),
	/// A text node. The empty string renders no visible text but still occupies a position.
	Text(Rc<str>),
	Element(Rc<Element<N>>),
	/// Sibling nodes without a wrapping element.
	List(Rc<[Renderable<N>]>),
}

impl<N> Renderable<N> {
	pub fn list(items: impl IntoIterator<Item = Renderable<N>>) -> Self {
		Self::List(items.into_iter().collect::<Vec<_>>().into())
	}
}

impl<N> Clone for Renderable<N> {
	fn clone(&self) -> Self {
		match self {
			Self::Null => Self::Null,
			Self::Undefined => Self::Undefined,
			Self::Bool(b) => Self::Bool(*b),
			Self::Number(n) => Self::Number(*n),
			Self::Text(text) => Self::Text(Rc::clone(text)),
			Self::Element(element) => Self::Element(Rc::clone(element)),
			Self::List(items) => Self::List(Rc::clone(items)),
		}
	}
}

impl<N: Debug> Debug for Renderable<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("Null"),
			Self::Undefined => f.write_str("Undefined"),
			Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
			Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Element(element) => f.debug_tuple("Element").field(element).finish(),
			Self::List(items) => f.debug_tuple("List").field(items).finish(),
		}
	}
}

impl<N> Default for Renderable<N> {
	fn default() -> Self {
		Self::Null
	}
}

impl<N> From<&str> for Renderable<N> {
	fn from(text: &str) -> Self {
		Self::Text(text.into())
	}
}
impl<N> From<String> for Renderable<N> {
	fn from(text: String) -> Self {
		Self::Text(text.into())
	}
}
impl<N> From<f64> for Renderable<N> {
	fn from(number: f64) -> Self {
		Self::Number(number)
	}
}
impl<N> From<i32> for Renderable<N> {
	fn from(number: i32) -> Self {
		Self::Number(number.into())
	}
}
impl<N> From<u32> for Renderable<N> {
	fn from(number: u32) -> Self {
		Self::Number(number.into())
	}
}
impl<N> From<bool> for Renderable<N> {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}
impl<N> From<Element<N>> for Renderable<N> {
	fn from(element: Element<N>) -> Self {
		Self::Element(Rc::new(element))
	}
}
impl<N> From<Vec<Renderable<N>>> for Renderable<N> {
	fn from(items: Vec<Renderable<N>>) -> Self {
		Self::List(items.into())
	}
}
impl<N, T: Into<Renderable<N>>> From<Option<T>> for Renderable<N> {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Undefined, Into::into)
	}
}

/// A host tag, function component or class component invocation.
pub struct Element<N> {
	pub ty: ElementType<N>,
	pub key: Option<Key>,
	pub ref_: Option<Ref<N>>,
	pub props: Props<N>,
}

impl<N: Debug> Debug for Element<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Element").field("ty", &self.ty).field("key", &self.key).field("ref_", &self.ref_).field("props", &self.props).finish()
	}
}

/// What an [`Element`] instantiates.
pub enum ElementType<N> {
	/// A host element, created through the DOM.
	Tag(Cow<'static, str>),
	Function(FunctionComponent<N>),
	Class(ClassType<N>),
}

impl<N> ElementType<N> {
	pub fn tag(name: impl Into<Cow<'static, str>>) -> Self {
		Self::Tag(name.into())
	}

	/// A function component.
	///
	/// Identity is the type of `render`: each `fn` item (and each closure expression) is its own component.
	pub fn function<F>(render: F) -> Self
	where
		F: 'static + Fn(&Props<N>) -> Renderable<N>,
	{
		Self::Function(FunctionComponent {
			type_id: TypeId::of::<F>(),
			name: type_name::<F>(),
			render: Rc::new(render),
		})
	}

	pub fn class<T: ComponentClass<N>>() -> Self
	where
		N: 'static,
	{
		Self::Class(ClassType::of::<T>())
	}

	/// Whether a fiber rendered from `self` can be updated in place to `other`.
	#[must_use]
	pub fn same_type(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Tag(t_1), Self::Tag(t_2)) => t_1 == t_2,
			(Self::Function(f_1), Self::Function(f_2)) => f_1.type_id == f_2.type_id,
			(Self::Class(c_1), Self::Class(c_2)) => c_1.type_id() == c_2.type_id(),
			_ => false,
		}
	}
}

impl<N> Debug for ElementType<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
			Self::Function(function) => f.debug_tuple("Function").field(&function.name).finish(),
			Self::Class(class) => f.debug_tuple("Class").field(&class.name()).finish(),
		}
	}
}

impl<N> From<&'static str> for ElementType<N> {
	fn from(tag: &'static str) -> Self {
		Self::Tag(tag.into())
	}
}
impl<N> From<String> for ElementType<N> {
	fn from(tag: String) -> Self {
		Self::Tag(tag.into())
	}
}

pub struct FunctionComponent<N> {
	type_id: TypeId,
	name: &'static str,
	render: Rc<dyn Fn(&Props<N>) -> Renderable<N>>,
}

impl<N> FunctionComponent<N> {
	pub fn call(&self, props: &Props<N>) -> Renderable<N> {
		(self.render)(props)
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl<N> Clone for FunctionComponent<N> {
	fn clone(&self) -> Self {
		Self {
			type_id: self.type_id,
			name: self.name,
			render: Rc::clone(&self.render),
		}
	}
}

/// An [`Element`]'s properties. Always carries a `children` renderable.
pub struct Props<N> {
	values: HashMap<Cow<'static, str>, PropValue<N>>,
	children: Renderable<N>,
}

impl<N> Props<N> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			values: HashMap::new(),
			children: Renderable::Null,
		}
	}

	#[must_use]
	pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<PropValue<N>>) -> Self {
		self.set(name, value);
		self
	}

	#[must_use]
	pub fn with_children(mut self, children: impl Into<Renderable<N>>) -> Self {
		self.children = children.into();
		self
	}

	pub fn set(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<PropValue<N>>) -> Option<PropValue<N>> {
		self.values.insert(name.into(), value.into())
	}

	pub fn remove(&mut self, name: &str) -> Option<PropValue<N>> {
		self.values.remove(name)
	}

	/// Looks up a prop other than `children`.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&PropValue<N>> {
		self.values.get(name)
	}

	#[must_use]
	pub fn contains_key(&self, name: &str) -> bool {
		self.values.contains_key(name)
	}

	/// Iterates all props except `children`, in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue<N>)> {
		self.values.iter().map(|(name, value)| (name.as_ref(), value))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.values.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	#[must_use]
	pub fn children(&self) -> &Renderable<N> {
		&self.children
	}

	pub fn set_children(&mut self, children: impl Into<Renderable<N>>) {
		self.children = children.into();
	}
}

impl<N> Default for Props<N> {
	fn default() -> Self {
		Self::new()
	}
}

impl<N> Clone for Props<N> {
	fn clone(&self) -> Self {
		Self {
			values: self.values.clone(),
			children: self.children.clone(),
		}
	}
}

impl<N: Debug> Debug for Props<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.values.iter()).entry(&"children", &self.children).finish()
	}
}

/// A single prop's value.
pub enum PropValue<N> {
	/// `null` or `undefined`.
	Null,
	Bool(bool),
	Number(f64),
	Str(Cow<'static, str>),
	/// The object form of `style`.
	Style(Style),
	Callback(Callback),
	/// Only meaningful under the name `ref`, which [`create_element`] moves into [`Element::ref_`].
	Ref(Ref<N>),
}

impl<N> Clone for PropValue<N> {
	fn clone(&self) -> Self {
		match self {
			Self::Null => Self::Null,
			Self::Bool(b) => Self::Bool(*b),
			Self::Number(n) => Self::Number(*n),
			Self::Str(s) => Self::Str(s.clone()),
			Self::Style(style) => Self::Style(style.clone()),
			Self::Callback(callback) => Self::Callback(callback.clone()),
			Self::Ref(r) => Self::Ref(r.clone()),
		}
	}
}

impl<N> PartialEq for PropValue<N> {
	fn eq(&self, other: &Self) -> bool {
		#[allow(clippy::float_cmp)]
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Bool(b_1), Self::Bool(b_2)) => b_1 == b_2,
			(Self::Number(n_1), Self::Number(n_2)) => n_1 == n_2,
			(Self::Str(s_1), Self::Str(s_2)) => s_1 == s_2,
			(Self::Style(s_1), Self::Style(s_2)) => s_1 == s_2,
			(Self::Callback(c_1), Self::Callback(c_2)) => c_1 == c_2,
			(Self::Ref(r_1), Self::Ref(r_2)) => r_1 == r_2,
			_ => false,
		}
	}
}

impl<N> Debug for PropValue<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("Null"),
			Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
			Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
			Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
			Self::Style(style) => f.debug_tuple("Style").field(style).finish(),
			Self::Callback(callback) => callback.fmt(f),
			Self::Ref(r) => r.fmt(f),
		}
	}
}

impl<N> From<&'static str> for PropValue<N> {
	fn from(s: &'static str) -> Self {
		Self::Str(s.into())
	}
}
impl<N> From<String> for PropValue<N> {
	fn from(s: String) -> Self {
		Self::Str(s.into())
	}
}
impl<N> From<bool> for PropValue<N> {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}
impl<N> From<f64> for PropValue<N> {
	fn from(n: f64) -> Self {
		Self::Number(n)
	}
}
impl<N> From<i32> for PropValue<N> {
	fn from(n: i32) -> Self {
		Self::Number(n.into())
	}
}
impl<N> From<u32> for PropValue<N> {
	fn from(n: u32) -> Self {
		Self::Number(n.into())
	}
}
impl<N> From<Style> for PropValue<N> {
	fn from(style: Style) -> Self {
		Self::Style(style)
	}
}
impl<N> From<Callback> for PropValue<N> {
	fn from(callback: Callback) -> Self {
		Self::Callback(callback)
	}
}
impl<N> From<Ref<N>> for PropValue<N> {
	fn from(r: Ref<N>) -> Self {
		Self::Ref(r)
	}
}
impl<N, T: Into<PropValue<N>>> From<Option<T>> for PropValue<N> {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

/// The object form of the `style` prop, keyed by camel-cased property name (or `--custom-property`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style(HashMap<Cow<'static, str>, StyleValue>);

impl Style {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<StyleValue>) -> Self {
		self.0.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&StyleValue> {
		self.0.get(name)
	}

	#[must_use]
	pub fn contains_key(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
		self.0.iter().map(|(name, value)| (name.as_ref(), value))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
	Null,
	/// Gets a `px` suffix unless the property is unitless.
	Number(f64),
	Str(Cow<'static, str>),
}

impl From<&'static str> for StyleValue {
	fn from(s: &'static str) -> Self {
		Self::Str(s.into())
	}
}
impl From<String> for StyleValue {
	fn from(s: String) -> Self {
		Self::Str(s.into())
	}
}
impl From<f64> for StyleValue {
	fn from(n: f64) -> Self {
		Self::Number(n)
	}
}
impl From<i32> for StyleValue {
	fn from(n: i32) -> Self {
		Self::Number(n.into())
	}
}

/// Builds an [`Element`].
///
/// `key` and `ref` are moved out of `props`.
/// `children` replace `props.children` unless there are none: a single child is stored as-is, several as a list.
pub fn create_element<N>(ty: impl Into<ElementType<N>>, mut props: Props<N>, children: impl IntoIterator<Item = Renderable<N>>) -> Renderable<N> {
	let key = match props.remove("key") {
		None | Some(PropValue::Null) => None,
		Some(PropValue::Str(key)) => Some(key),
		Some(PropValue::Number(n)) => Some(number_to_string(n).into()),
		Some(other) => {
			warn!("Ignoring unsupported `key` value: {:?}", other);
			None
		}
	};
	let ref_ = match props.remove("ref") {
		None | Some(PropValue::Null) => None,
		Some(PropValue::Ref(r)) => Some(r),
		Some(other) => {
			warn!("Ignoring unsupported `ref` value: {:?}", other);
			None
		}
	};

	let mut children: Vec<_> = children.into_iter().collect();
	match children.len() {
		0 => (),
		1 => {
			if let Some(only) = children.pop() {
				props.children = only;
			}
		}
		_ => props.children = children.into(),
	}

	Renderable::Element(Rc::new(Element { ty: ty.into(), key, ref_, props }))
}

/// Renders its children without a wrapping element.
pub fn fragment<N>(props: &Props<N>) -> Renderable<N> {
	props.children().clone()
}

/// Shorthand for a [`fragment`] element.
pub fn create_fragment<N: 'static>(key: Option<Key>, children: impl IntoIterator<Item = Renderable<N>>) -> Renderable<N> {
	let mut props = Props::new();
	if let Some(key) = key {
		props.set("key", PropValue::Str(key));
	}
	create_element(ElementType::function(fragment::<N>), props, children)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn children_fold_into_props() {
		let none: Renderable<()> = create_element("div", Props::new().with_children("kept"), vec![]);
		let one: Renderable<()> = create_element("div", Props::new(), vec!["only".into()]);
		let many: Renderable<()> = create_element("div", Props::new(), vec!["a".into(), "b".into()]);

		let children = |renderable: &Renderable<()>| match renderable {
			Renderable::Element(element) => element.props.children().clone(),
			_ => unreachable!(),
		};
		assert!(matches!(children(&none), Renderable::Text(text) if &*text == "kept"));
		assert!(matches!(children(&one), Renderable::Text(text) if &*text == "only"));
		assert!(matches!(children(&many), Renderable::List(items) if items.len() == 2));
	}

	#[test]
	fn key_and_ref_are_moved_out_of_props() {
		let r = Ref::<()>::object();
		let element = create_element("li", Props::new().with("key", 7).with("ref", r.clone()).with("id", "x"), vec![]);
		let element = match element {
			Renderable::Element(element) => element,
			_ => unreachable!(),
		};
		assert_eq!(element.key.as_deref(), Some("7"));
		assert_eq!(element.ref_.as_ref(), Some(&r));
		assert!(!element.props.contains_key("key"));
		assert!(!element.props.contains_key("ref"));
		assert_eq!(element.props.len(), 1);
	}

	fn first(_: &Props<()>) -> Renderable<()> {
		Renderable::Null
	}
	fn second(_: &Props<()>) -> Renderable<()> {
		Renderable::Null
	}

	#[test]
	fn function_identity_follows_the_fn_item() {
		assert!(ElementType::function(first).same_type(&ElementType::function(first)));
		assert!(!ElementType::function(first).same_type(&ElementType::function(second)));
		assert!(!ElementType::<()>::tag("first").same_type(&ElementType::function(first)));
		assert!(ElementType::<()>::tag("div").same_type(&"div".into()));
	}
}
