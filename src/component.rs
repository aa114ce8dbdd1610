//! Class components: stateful objects that persist across renders at a stable position.

use crate::renderable::{Props, Renderable};
use core::{
	any::{type_name, TypeId},
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;

/// An instantiated class component.
///
/// The reconciler keeps one instance per tree position and calls [`render`](`Component::render`) again
/// (on the same instance) whenever that position is updated with the same [`ClassType`].
pub trait Component<N>: 'static {
	fn render(&mut self, props: &Props<N>) -> Renderable<N>;
}

/// The constructor half of a class component.
pub trait ComponentClass<N>: Component<N> + Sized {
	fn create(props: &Props<N>) -> Self;
}

/// A type-erased [`ComponentClass`], identified by its [`TypeId`].
pub struct ClassType<N> {
	type_id: TypeId,
	name: &'static str,
	construct: fn(&Props<N>) -> Rc<RefCell<dyn Component<N>>>,
}

impl<N: 'static> ClassType<N> {
	#[must_use]
	pub fn of<T: ComponentClass<N>>() -> Self {
		fn construct<N: 'static, T: ComponentClass<N>>(props: &Props<N>) -> Rc<RefCell<dyn Component<N>>> {
			Rc::new(RefCell::new(T::create(props)))
		}

		Self {
			type_id: TypeId::of::<T>(),
			name: type_name::<T>(),
			construct: construct::<N, T>,
		}
	}
}

impl<N> ClassType<N> {
	#[must_use]
	pub fn construct(&self, props: &Props<N>) -> Rc<RefCell<dyn Component<N>>> {
		(self.construct)(props)
	}

	#[must_use]
	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl<N> Clone for ClassType<N> {
	fn clone(&self) -> Self {
		Self {
			type_id: self.type_id,
			name: self.name,
			construct: self.construct,
		}
	}
}

impl<N> Debug for ClassType<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ClassType").field(&self.name).finish()
	}
}
