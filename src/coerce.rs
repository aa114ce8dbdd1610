//! Normalisation of [`Renderable`]s into the reduced set the fiber code matches on.

use crate::renderable::{Element, Key, Renderable};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// A [`Renderable`] after [`coerce`]: booleans and `undefined` are folded into [`Coerced::Null`],
/// numbers into [`Coerced::Text`].
pub enum Coerced<N> {
	Null,
	Text(Rc<str>),
	Element(Rc<Element<N>>),
	List(Rc<[Renderable<N>]>),
}

impl<N> Coerced<N> {
	/// The identity fast path: text compares by value, elements and lists by [`Rc`] identity.
	#[must_use]
	pub fn is_identical(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Text(t_1), Self::Text(t_2)) => t_1 == t_2,
			(Self::Element(e_1), Self::Element(e_2)) => Rc::ptr_eq(e_1, e_2),
			(Self::List(l_1), Self::List(l_2)) => Rc::ptr_eq(l_1, l_2),
			_ => false,
		}
	}

	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		match self {
			Self::Element(element) => element.key.as_ref(),
			Self::Null | Self::Text(_) | Self::List(_) => None,
		}
	}

	/// A short description for logging.
	#[must_use]
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Text(_) => "text",
			Self::Element(_) => "element",
			Self::List(_) => "list",
		}
	}
}

impl<N> Clone for Coerced<N> {
	fn clone(&self) -> Self {
		match self {
			Self::Null => Self::Null,
			Self::Text(text) => Self::Text(Rc::clone(text)),
			Self::Element(element) => Self::Element(Rc::clone(element)),
			Self::List(items) => Self::List(Rc::clone(items)),
		}
	}
}

impl<N: Debug> Debug for Coerced<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("Null"),
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Element(element) => f.debug_tuple("Element").field(element).finish(),
			Self::List(items) => f.debug_tuple("List").field(&items.len()).finish(),
		}
	}
}

#[must_use]
pub fn coerce<N>(renderable: &Renderable<N>) -> Coerced<N> {
	match renderable {
		Renderable::Null | Renderable::Undefined | Renderable::Bool(_) => Coerced::Null,
		Renderable::Number(number) => Coerced::Text(number_to_string(*number).into()),
		Renderable::Text(text) => Coerced::Text(Rc::clone(text)),
		Renderable::Element(element) => Coerced::Element(Rc::clone(element)),
		Renderable::List(items) => Coerced::List(Rc::clone(items)),
	}
}

/// Formats `number` the way JavaScript's `String(number)` does.
#[must_use]
pub fn number_to_string(number: f64) -> String {
	if number.is_nan() {
		return "NaN".to_owned();
	}
	if number.is_infinite() {
		return if number > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
	}
	if number == 0.0 {
		// Also `-0`.
		return "0".to_owned();
	}

	let magnitude = number.abs();
	if (1e-6..1e21).contains(&magnitude) {
		return number.to_string();
	}

	let exponential = format!("{:e}", number);
	match exponential.split_once('e') {
		Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{}e+{}", mantissa, exponent),
		_ => exponential,
	}
}
