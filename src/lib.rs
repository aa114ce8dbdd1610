#![doc(html_root_url = "https://docs.rs/xylem-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A fiber-based DOM reconciler.
//!
//! [`Renderable`] trees (text, host elements, function and class components, lists) are mounted into a container node by a [`Reconciler`],
//! which keeps one fiber per tree position and updates the DOM in place on the next [`render`](`Reconciler::render`).
//!
//! The DOM itself is abstracted by the [`Dom`](`dom::Dom`) trait:
//! [`web::WebDom`] renders into a browser document, [`memory::MemoryDom`] into an inspectable in-memory tree.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod coerce;
mod component;
mod config;
mod diff;
pub mod dom;
mod error;
mod event;
mod fiber;
pub mod memory;
mod props;
mod refs;
mod renderable;
pub mod web;

pub use coerce::{coerce, number_to_string, Coerced};
pub use component::{ClassType, Component, ComponentClass};
pub use config::Config;
pub use diff::Reconciler;
pub use error::Error;
pub use event::{Callback, Event};
pub use refs::{Ref, RefTarget};
pub use renderable::{create_element, create_fragment, fragment, Element, ElementType, FunctionComponent, Key, PropValue, Props, Renderable, Style, StyleValue};
