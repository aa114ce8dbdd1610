//! The browser [`Dom`], backed by [`web_sys`].

use crate::{
	dom::{Dom, EventHandler, Namespace, PropertyValue},
	event::Event,
	Error, Reconciler,
};
use js_sys::Reflect;
use tracing::instrument;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

fn js_error(operation: &'static str, error: &JsValue) -> Error {
	Error::dom(operation, format!("{:?}", error))
}

fn as_element<'a>(node: &'a web_sys::Node, operation: &'static str) -> Result<&'a web_sys::Element, Error> {
	node.dyn_ref::<web_sys::Element>().ok_or_else(|| Error::dom(operation, "not an element"))
}

fn style_of(node: &web_sys::Node) -> Result<web_sys::CssStyleDeclaration, Error> {
	if let Some(html_element) = node.dyn_ref::<web_sys::HtmlElement>() {
		Ok(html_element.style())
	} else if let Some(svg_element) = node.dyn_ref::<web_sys::SvgElement>() {
		Ok(svg_element.style())
	} else {
		Err(Error::dom("style", "neither an HTML nor an SVG element"))
	}
}

/// Renders into a live [***Document***](https://developer.mozilla.org/en-US/docs/Web/API/Document).
///
/// Event handlers are installed as [`Closure`]s, which are dropped as soon as the listener is removed.
#[derive(Debug, Clone)]
pub struct WebDom {
	document: web_sys::Document,
}

impl WebDom {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self { document }
	}

	/// A [`WebDom`] for the document `element` belongs to.
	#[must_use]
	pub fn for_element(element: &web_sys::Element) -> Option<Self> {
		element.owner_document().map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}
}

impl Dom for WebDom {
	type Node = web_sys::Node;
	type Listener = Closure<dyn Fn(web_sys::Event)>;

	fn create_text_node(&mut self, data: &str) -> web_sys::Node {
		self.document.create_text_node(data).into()
	}

	fn create_element(&mut self, tag: &str, namespace: Namespace) -> Result<web_sys::Node, Error> {
		match namespace.uri() {
			None => self.document.create_element(tag),
			Some(uri) => self.document.create_element_ns(Some(uri), tag),
		}
		.map(Into::into)
		.map_err(|error| Error::ElementCreation {
			tag: tag.to_owned(),
			reason: format!("{:?}", error),
		})
	}

	fn insert_before(&mut self, parent: &web_sys::Node, node: &web_sys::Node, anchor: Option<&web_sys::Node>) -> Result<(), Error> {
		parent.insert_before(node, anchor).map(drop).map_err(|error| js_error("insertBefore", &error))
	}

	fn remove_child(&mut self, parent: &web_sys::Node, node: &web_sys::Node) -> Result<(), Error> {
		parent.remove_child(node).map(drop).map_err(|error| js_error("removeChild", &error))
	}

	fn parent_node(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn set_text(&mut self, node: &web_sys::Node, data: &str) -> Result<(), Error> {
		let character_data = node.dyn_ref::<web_sys::CharacterData>().ok_or_else(|| Error::dom("setData", "not character data"))?;
		character_data.set_data(data);
		Ok(())
	}

	fn has_property(&self, element: &web_sys::Node, name: &str) -> bool {
		Reflect::has(element, &JsValue::from_str(name)).unwrap_or(false)
	}

	fn set_property(&mut self, element: &web_sys::Node, name: &str, value: PropertyValue<'_>) -> Result<(), Error> {
		let value = match value {
			PropertyValue::Str(s) => JsValue::from_str(s),
			PropertyValue::Number(n) => JsValue::from_f64(n),
			PropertyValue::Bool(b) => JsValue::from_bool(b),
		};
		match Reflect::set(element, &JsValue::from_str(name), &value) {
			Ok(true) => Ok(()),
			Ok(false) => Err(Error::dom("setProperty", format!("{:?} is read-only", name))),
			Err(error) => Err(js_error("setProperty", &error)),
		}
	}

	fn set_attribute(&mut self, element: &web_sys::Node, name: &str, value: &str) -> Result<(), Error> {
		as_element(element, "setAttribute")?.set_attribute(name, value).map_err(|error| js_error("setAttribute", &error))
	}

	fn remove_attribute(&mut self, element: &web_sys::Node, name: &str) -> Result<(), Error> {
		as_element(element, "removeAttribute")?.remove_attribute(name).map_err(|error| js_error("removeAttribute", &error))
	}

	fn set_style_text(&mut self, element: &web_sys::Node, text: &str) -> Result<(), Error> {
		style_of(element)?.set_css_text(text);
		Ok(())
	}

	fn set_style(&mut self, element: &web_sys::Node, name: &str, value: &str) -> Result<(), Error> {
		let style = style_of(element)?;
		Reflect::set(&style, &JsValue::from_str(name), &JsValue::from_str(value))
			.map(drop)
			.map_err(|error| js_error("style[name]", &error))
	}

	fn set_style_custom_property(&mut self, element: &web_sys::Node, name: &str, value: &str) -> Result<(), Error> {
		style_of(element)?.set_property(name, value).map_err(|error| js_error("style.setProperty", &error))
	}

	#[instrument(skip(self, handler))]
	fn add_event_listener(&mut self, element: &web_sys::Node, name: &str, capture: bool, handler: EventHandler) -> Result<Self::Listener, Error> {
		let closure = Closure::wrap(Box::new(move |event: web_sys::Event| handler(&Event::from_web(event))) as Box<dyn Fn(web_sys::Event)>);
		element
			.add_event_listener_with_callback_and_bool(name, closure.as_ref().unchecked_ref(), capture)
			.map_err(|error| js_error("addEventListener", &error))?;
		Ok(closure)
	}

	fn remove_event_listener(&mut self, element: &web_sys::Node, name: &str, capture: bool, listener: Self::Listener) -> Result<(), Error> {
		element
			.remove_event_listener_with_callback_and_bool(name, listener.as_ref().unchecked_ref(), capture)
			.map_err(|error| js_error("removeEventListener", &error))
	}

	fn namespace_of(&self, container: &web_sys::Node) -> Namespace {
		match container.dyn_ref::<web_sys::Element>() {
			Some(element) if element.namespace_uri().as_deref() == Some(Namespace::SVG_URI) => Namespace::Svg.for_children(&element.local_name()),
			_ => Namespace::Html,
		}
	}
}

impl Reconciler<WebDom> {
	/// Attaches a new [`Reconciler`] to the [***childNodes***](https://developer.mozilla.org/en-US/docs/Web/API/Node/childNodes) of `element`.
	///
	/// Note that this does not include the [***Element***](https://developer.mozilla.org/en-US/docs/Web/API/element)
	/// itself, and also does not include the [***Attr***](https://developer.mozilla.org/en-US/docs/Web/API/Attr)ibutes of that element.
	///
	/// # Errors
	///
	/// Iff `element` has no owner document.
	#[instrument]
	pub fn new_for_element_child_nodes(element: web_sys::Element) -> Result<Self, Error> {
		let dom = WebDom::for_element(&element).ok_or_else(|| Error::dom("ownerDocument", "the element has no owner document"))?;
		Ok(Self::new(dom, element.into()))
	}
}
