#![cfg(target_arch = "wasm32")]

use std::{cell::Cell, rc::Rc, sync::Once};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlElement};
use xylem_dom::{create_element, web::WebDom, Callback, Props, Reconciler, Style};

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INITIALIZED: Once = Once::new();

fn container() -> web_sys::Element {
	LOG_INITIALIZED.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let container = document.create_element("div").unwrap();
	document.body().unwrap().append_child(&container).unwrap();
	container
}

#[wasm_bindgen_test]
fn click() {
	let container = container();
	let mut reconciler = Reconciler::new_for_element_child_nodes(container.clone()).unwrap();

	let click_count = Rc::new(Cell::new(0));
	let button = || {
		let click_count = Rc::clone(&click_count);
		create_element(
			"button",
			Props::new().with("id", "test-button").with("onClick", Callback::new(move |event| {
				assert!(event.as_web().is_some());
				click_count.set(click_count.get() + 1);
			})),
			vec![],
		)
	};

	reconciler.render(button()).unwrap();
	assert_eq!(click_count.get(), 0);

	let element: HtmlElement = container.first_element_child().unwrap().dyn_into().unwrap();
	assert_eq!(element.id(), "test-button");
	element.click();
	assert_eq!(click_count.get(), 1);

	reconciler.render(button()).unwrap();
	element.click();
	assert_eq!(click_count.get(), 2);

	reconciler.unmount().unwrap();
	element.click();
	assert_eq!(click_count.get(), 2);
	assert_eq!(container.child_nodes().length(), 0);
}

#[wasm_bindgen_test]
fn create_and_update() {
	let container = container();
	let mut reconciler = Reconciler::<WebDom>::new_for_element_child_nodes(container.clone()).unwrap();

	let paragraph = |text: &'static str, width: i32| {
		create_element(
			"p",
			Props::new().with("class", "note").with("aria-live", "polite").with("style", Style::new().with("width", width)),
			vec![text.into()],
		)
	};

	reconciler.render(paragraph("first", 10)).unwrap();
	let p: HtmlElement = container.first_element_child().unwrap().dyn_into().unwrap();
	assert_eq!(p.class_name(), "note");
	assert_eq!(p.get_attribute("aria-live").as_deref(), Some("polite"));
	assert_eq!(p.style().get_property_value("width").unwrap(), "10px");
	assert_eq!(p.text_content().as_deref(), Some("first"));

	reconciler.render(paragraph("second", 20)).unwrap();
	assert_eq!(p.style().get_property_value("width").unwrap(), "20px");
	assert_eq!(p.text_content().as_deref(), Some("second"));
	assert!(container.first_child().unwrap().is_same_node(Some(&p)));
	assert_eq!(container.child_nodes().length(), 1);
}

#[wasm_bindgen_test]
fn svg_children_use_the_svg_namespace() {
	let container = container();
	let mut reconciler = Reconciler::new_for_element_child_nodes(container.clone()).unwrap();

	reconciler
		.render(create_element(
			"svg",
			Props::new().with("className", "icon"),
			vec![create_element("circle", Props::new().with("fill", "red"), vec![])],
		))
		.unwrap();

	let svg = container.first_element_child().unwrap();
	let circle = svg.first_element_child().unwrap();
	assert_eq!(svg.namespace_uri().as_deref(), Some("http://www.w3.org/2000/svg"));
	assert_eq!(circle.namespace_uri().as_deref(), Some("http://www.w3.org/2000/svg"));
	assert_eq!(svg.get_attribute("class").as_deref(), Some("icon"));
	assert_eq!(circle.get_attribute("fill").as_deref(), Some("red"));
}
