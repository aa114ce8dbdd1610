//! Applying [`Props`] to host elements: properties, attributes, inline styles and event handlers.

use crate::{
	coerce::number_to_string,
	dom::{Dom, EventHandler, Namespace, PropertyValue},
	event::{Callback, Event},
	renderable::{PropValue, Props, StyleValue},
	Error,
};
use core::cell::RefCell;
use hashbrown::HashMap;
use std::{
	borrow::Cow,
	rc::{Rc, Weak},
};
use tracing::{instrument, trace, trace_span, warn};

/// Style properties whose numeric values don't get a `px` suffix. Sorted.
const UNITLESS: &[&str] = &[
	"animationIterationCount",
	"aspectRatio",
	"borderImageOutset",
	"borderImageSlice",
	"borderImageWidth",
	"boxFlex",
	"boxFlexGroup",
	"boxOrdinalGroup",
	"columnCount",
	"columns",
	"fillOpacity",
	"flex",
	"flexGrow",
	"flexNegative",
	"flexOrder",
	"flexPositive",
	"flexShrink",
	"floodOpacity",
	"fontWeight",
	"gridArea",
	"gridColumn",
	"gridColumnEnd",
	"gridColumnSpan",
	"gridColumnStart",
	"gridRow",
	"gridRowEnd",
	"gridRowSpan",
	"gridRowStart",
	"initialLetter",
	"lineClamp",
	"lineHeight",
	"opacity",
	"order",
	"orphans",
	"scale",
	"stopOpacity",
	"strokeDasharray",
	"strokeDashoffset",
	"strokeMiterlimit",
	"strokeOpacity",
	"strokeWidth",
	"tabSize",
	"widows",
	"zIndex",
	"zoom",
];

fn is_unitless(name: &str) -> bool {
	UNITLESS.binary_search(&name).is_ok()
}

type ListenerKey = (String, bool);

/// The event handlers of one element, and the native listeners forwarding to them.
///
/// Exactly one native listener is installed per event name and phase.
/// Changing the handler only swaps the table entry.
pub(crate) struct ElementListeners<L> {
	handlers: Rc<RefCell<HashMap<ListenerKey, Callback>>>,
	installed: HashMap<ListenerKey, L>,
}

impl<L> Default for ElementListeners<L> {
	fn default() -> Self {
		Self {
			handlers: Rc::default(),
			installed: HashMap::new(),
		}
	}
}

impl<L> ElementListeners<L> {
	pub fn installed_count(&self) -> usize {
		self.installed.len()
	}

	pub fn is_empty(&self) -> bool {
		self.installed.is_empty() && self.handlers.borrow().is_empty()
	}
}

/// Brings `element` from `old` (or a freshly created state) to `new`.
///
/// # Errors
///
/// Fails on the first prop that can't be applied.
#[instrument(skip(dom, listeners, element, old, new))]
pub(crate) fn diff_props<D: Dom>(
	dom: &mut D,
	listeners: &mut ElementListeners<D::Listener>,
	element: &D::Node,
	namespace: Namespace,
	old: Option<&Props<D::Node>>,
	new: &Props<D::Node>,
) -> Result<(), Error> {
	if let Some(old) = old {
		for (name, value) in old.iter().filter(|(name, _)| !new.contains_key(name)) {
			diff_prop(dom, listeners, element, namespace, name, Some(value), None)?
		}
	}
	for (name, value) in new.iter() {
		let previous = old.and_then(|old| old.get(name));
		if previous != Some(value) {
			diff_prop(dom, listeners, element, namespace, name, previous, Some(value))?
		}
	}
	Ok(())
}

/// Applies the change of a single prop. [`None`] means the prop is absent.
pub(crate) fn diff_prop<D: Dom>(
	dom: &mut D,
	listeners: &mut ElementListeners<D::Listener>,
	element: &D::Node,
	namespace: Namespace,
	name: &str,
	old: Option<&PropValue<D::Node>>,
	new: Option<&PropValue<D::Node>>,
) -> Result<(), Error> {
	let span = trace_span!("Diffing prop", name);
	let _enter = span.enter();

	match name {
		"children" | "key" | "ref" => Ok(()),
		"dangerouslySetInnerHTML" => Err(Error::UnsupportedProp("dangerouslySetInnerHTML")),
		"style" => diff_style(dom, element, old, new),
		_ if name.starts_with("on") => diff_event(dom, listeners, element, name, new),
		_ => {
			let name = match (namespace, name) {
				(Namespace::Svg, "className") => "class",
				(Namespace::Html, "class") => "className",
				_ => name,
			};
			if dom.has_property(element, name) {
				set_property(dom, element, name, new)
			} else {
				set_attribute(dom, element, name, new)
			}
		}
	}
}

fn set_property<D: Dom>(dom: &mut D, element: &D::Node, name: &str, value: Option<&PropValue<D::Node>>) -> Result<(), Error> {
	let value = match value {
		None | Some(PropValue::Null) => PropertyValue::Str(""),
		Some(PropValue::Bool(b)) => PropertyValue::Bool(*b),
		Some(PropValue::Number(n)) => PropertyValue::Number(*n),
		Some(PropValue::Str(s)) => PropertyValue::Str(&**s),
		Some(other @ (PropValue::Style(_) | PropValue::Callback(_) | PropValue::Ref(_))) => {
			warn!("Ignoring unsupported value for property {:?}: {:?}", name, other);
			return Ok(());
		}
	};
	dom.set_property(element, name, value)
}

fn set_attribute<D: Dom>(dom: &mut D, element: &D::Node, name: &str, value: Option<&PropValue<D::Node>>) -> Result<(), Error> {
	let name = if name == "className" { "class" } else { name };
	let value: Cow<'_, str> = match value {
		None | Some(PropValue::Null) | Some(PropValue::Bool(false)) => return dom.remove_attribute(element, name),
		Some(PropValue::Bool(true)) => "true".into(),
		Some(PropValue::Number(n)) => number_to_string(*n).into(),
		Some(PropValue::Str(s)) => Cow::Borrowed(&**s),
		Some(PropValue::Callback(_)) => {
			trace!("No property to assign the function to. Ignoring.");
			return Ok(());
		}
		Some(other @ (PropValue::Style(_) | PropValue::Ref(_))) => {
			warn!("Ignoring unsupported value for attribute {:?}: {:?}", name, other);
			return Ok(());
		}
	};
	dom.set_attribute(element, name, &value)
}

fn diff_style<D: Dom>(dom: &mut D, element: &D::Node, old: Option<&PropValue<D::Node>>, new: Option<&PropValue<D::Node>>) -> Result<(), Error> {
	let old = match old {
		Some(PropValue::Style(style)) => Some(style),
		Some(PropValue::Str(_)) => {
			if !matches!(new, Some(PropValue::Str(_))) {
				dom.set_style_text(element, "")?
			}
			None
		}
		_ => None,
	};

	match new {
		Some(PropValue::Str(text)) => dom.set_style_text(element, text),
		Some(PropValue::Style(style)) => {
			if let Some(old) = old {
				for (name, _) in old.iter().filter(|(name, _)| !style.contains_key(name)) {
					set_style_value(dom, element, name, &StyleValue::Null)?
				}
			}
			for (name, value) in style.iter() {
				if old.and_then(|old| old.get(name)) != Some(value) {
					set_style_value(dom, element, name, value)?
				}
			}
			Ok(())
		}
		other => {
			if let Some(other @ (PropValue::Bool(_) | PropValue::Number(_) | PropValue::Callback(_) | PropValue::Ref(_))) = other {
				warn!("Ignoring unsupported `style` value {:?}. Clearing the inline style instead.", other)
			}
			if let Some(old) = old {
				for (name, _) in old.iter() {
					set_style_value(dom, element, name, &StyleValue::Null)?
				}
			}
			Ok(())
		}
	}
}

fn set_style_value<D: Dom>(dom: &mut D, element: &D::Node, name: &str, value: &StyleValue) -> Result<(), Error> {
	let custom = name.starts_with('-');
	let text: Cow<'_, str> = match value {
		StyleValue::Null => "".into(),
		StyleValue::Number(n) if custom || is_unitless(name) => number_to_string(*n).into(),
		StyleValue::Number(n) => format!("{}px", number_to_string(*n)).into(),
		StyleValue::Str(s) => Cow::Borrowed(&**s),
	};
	if custom {
		dom.set_style_custom_property(element, name, &text)
	} else {
		dom.set_style(element, name, &text)
	}
}

/// Maps an `on*` prop name to the native event name and phase.
fn event_name<D: Dom>(dom: &D, element: &D::Node, prop: &str) -> ListenerKey {
	let (prop, capture) = match prop.strip_suffix("Capture") {
		Some(stripped) if !prop.ends_with("PointerCapture") => (stripped, true),
		_ => (prop, false),
	};
	let lower = prop.to_ascii_lowercase();
	let name = if prop == "onFocusIn" || prop == "onFocusOut" || dom.has_property(element, &lower) {
		&lower[2..]
	} else {
		&prop[2..]
	};
	(name.to_owned(), capture)
}

fn diff_event<D: Dom>(dom: &mut D, listeners: &mut ElementListeners<D::Listener>, element: &D::Node, prop: &str, new: Option<&PropValue<D::Node>>) -> Result<(), Error> {
	let key = event_name(dom, element, prop);
	match new {
		Some(PropValue::Callback(callback)) => {
			listeners.handlers.borrow_mut().insert(key.clone(), callback.clone());
			if !listeners.installed.contains_key(&key) {
				trace!(event = %key.0, capture = key.1, "Installing native listener.");
				let listener = dom.add_event_listener(element, &key.0, key.1, forwarding_handler(Rc::downgrade(&listeners.handlers), key.clone()))?;
				listeners.installed.insert(key, listener);
			}
			Ok(())
		}
		other => {
			if let Some(other @ (PropValue::Bool(_) | PropValue::Number(_) | PropValue::Str(_) | PropValue::Style(_) | PropValue::Ref(_))) = other {
				warn!("Ignoring unsupported event handler {:?} for {:?}. Removing the handler instead.", other, prop)
			}
			listeners.handlers.borrow_mut().remove(&key);
			match listeners.installed.remove(&key) {
				Some(listener) => dom.remove_event_listener(element, &key.0, key.1, listener),
				None => Ok(()),
			}
		}
	}
}

/// The native listener body: looks up the current handler for `key` and calls it.
///
/// The table is only borrowed for the lookup, so handlers are free to change props of their own element.
fn forwarding_handler(handlers: Weak<RefCell<HashMap<ListenerKey, Callback>>>, key: ListenerKey) -> EventHandler {
	Rc::new(move |event: &Event| {
		let span = trace_span!("Forwarding event", event = %key.0, capture = key.1);
		let _enter = span.enter();

		let callback = handlers.upgrade().and_then(|handlers| handlers.borrow().get(&key).cloned());
		match callback {
			Some(callback) => callback.call(event),
			None => trace!("No handler is registered anymore."),
		}
	})
}

/// Uninstalls all native listeners of a torn-down `element`. Returns how many were removed.
pub(crate) fn release_listeners<D: Dom>(dom: &mut D, element: &D::Node, listeners: ElementListeners<D::Listener>) -> usize {
	listeners.handlers.borrow_mut().clear();
	let mut released = 0;
	for ((name, capture), listener) in listeners.installed {
		match dom.remove_event_listener(element, &name, capture, listener) {
			Ok(()) => released += 1,
			Err(error) => warn!("Failed to remove event listener {:?} (capture: {}): {}", name, capture, error),
		}
	}
	released
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryDom;

	#[test]
	fn unitless_properties_are_sorted() {
		assert!(UNITLESS.windows(2).all(|pair| pair[0] < pair[1]));
		assert!(is_unitless("zIndex"));
		assert!(is_unitless("flexGrow"));
		assert!(!is_unitless("width"));
	}

	#[test]
	fn event_names() {
		let mut dom = MemoryDom::new();
		let div = dom.create_element("div", Namespace::Html).unwrap();

		let cases = [
			("onClick", ("click", false)),
			("onClickCapture", ("click", true)),
			("onMouseMove", ("mousemove", false)),
			("onFocusIn", ("focusin", false)),
			("onGotPointerCapture", ("gotpointercapture", false)),
			("onMyCustomEvent", ("MyCustomEvent", false)),
			("onMyCustomEventCapture", ("MyCustomEvent", true)),
		];
		for &(prop, (name, capture)) in cases.iter() {
			assert_eq!(event_name(&dom, &div, prop), (name.to_owned(), capture), "{}", prop);
		}
	}

	#[test]
	fn style_values() {
		let mut dom = MemoryDom::new();
		let div = dom.create_element("div", Namespace::Html).unwrap();

		set_style_value(&mut dom, &div, "width", &StyleValue::Number(10.0)).unwrap();
		set_style_value(&mut dom, &div, "opacity", &StyleValue::Number(0.5)).unwrap();
		set_style_value(&mut dom, &div, "--gap", &StyleValue::Number(2.0)).unwrap();
		set_style_value(&mut dom, &div, "color", &"red".into()).unwrap();
		assert_eq!(dom.style(div, "width"), Some("10px"));
		assert_eq!(dom.style(div, "opacity"), Some("0.5"));
		assert_eq!(dom.style(div, "--gap"), Some("2"));
		assert_eq!(dom.style(div, "color"), Some("red"));

		set_style_value(&mut dom, &div, "color", &StyleValue::Null).unwrap();
		assert_eq!(dom.style(div, "color"), None);
	}
}
