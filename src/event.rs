use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// An event as seen by [`Callback`]s.
///
/// Events coming from a browser carry the original [`web_sys::Event`].
/// Events dispatched by [`MemoryDom`](`crate::memory::MemoryDom`) only know their type.
#[derive(Debug, Clone)]
pub struct Event {
	event_type: String,
	web: Option<web_sys::Event>,
}

impl Event {
	#[must_use]
	pub fn synthetic(event_type: impl Into<String>) -> Self {
		Self { event_type: event_type.into(), web: None }
	}

	#[must_use]
	pub fn from_web(event: web_sys::Event) -> Self {
		Self { event_type: event.type_(), web: Some(event) }
	}

	/// The event's type, e.g. `"click"`.
	#[must_use]
	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	#[must_use]
	pub fn as_web(&self) -> Option<&web_sys::Event> {
		self.web.as_ref()
	}
}

/// An event handler prop value.
///
/// Two [`Callback`]s are equal only if they are clones of the same handle.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event)>);

impl Callback {
	pub fn new(f: impl 'static + Fn(&Event)) -> Self {
		Self(Rc::new(f))
	}

	pub fn call(&self, event: &Event) {
		(self.0)(event)
	}
}

impl PartialEq for Callback {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for Callback {}

impl Debug for Callback {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Callback").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
	}
}
