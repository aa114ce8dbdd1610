use std::{cell::RefCell, rc::Rc};
use xylem_dom::{
	create_element,
	memory::{MemoryDom, MemoryNode},
	Component, ComponentClass, ElementType, Error, PropValue, Props, Reconciler, Ref, Renderable,
};

type R = Renderable<MemoryNode>;
type Log = Rc<RefCell<Vec<(&'static str, Option<MemoryNode>)>>>;

fn reconciler() -> (Reconciler<MemoryDom>, MemoryNode) {
	let mut dom = MemoryDom::new();
	let root = dom.create_root("main").unwrap();
	(Reconciler::new(dom, root), root)
}

fn recording(log: &Log, name: &'static str) -> Ref<MemoryNode> {
	let log = Rc::clone(log);
	Ref::callback(move |target| log.borrow_mut().push((name, target.and_then(|target| target.as_node().copied()))))
}

fn with_ref(tag: &'static str, r: &Ref<MemoryNode>, children: Vec<R>) -> R {
	create_element(tag, Props::new().with("ref", r.clone()), children)
}

#[test]
fn children_attach_before_parents() {
	let (mut reconciler, root) = reconciler();
	let log = Log::default();
	let (p, c) = (recording(&log, "p"), recording(&log, "c"));

	reconciler.render(with_ref("p", &p, vec![with_ref("b", &c, vec![])])).unwrap();

	let p_node = reconciler.dom().first_child(root).unwrap();
	let c_node = reconciler.dom().first_child(p_node).unwrap();
	assert_eq!(*log.borrow(), vec![("c", Some(c_node)), ("p", Some(p_node))]);
}

#[test]
fn refs_detach_children_first_before_replacements_attach() {
	let (mut reconciler, root) = reconciler();
	let log = Log::default();
	let (p, c, n) = (recording(&log, "p"), recording(&log, "c"), recording(&log, "n"));

	reconciler.render(with_ref("div", &p, vec![with_ref("b", &c, vec![])])).unwrap();
	log.borrow_mut().clear();

	reconciler.render(with_ref("span", &n, vec![])).unwrap();
	let span = reconciler.dom().first_child(root).unwrap();
	assert_eq!(*log.borrow(), vec![("c", None), ("p", None), ("n", Some(span))]);

	log.borrow_mut().clear();
	reconciler.unmount().unwrap();
	assert_eq!(*log.borrow(), vec![("n", None)]);
}

#[test]
fn swapped_refs_detach_then_attach() {
	let (mut reconciler, root) = reconciler();
	let log = Log::default();
	let (a, b) = (recording(&log, "a"), recording(&log, "b"));

	reconciler.render(with_ref("input", &a, vec![])).unwrap();
	let input = reconciler.dom().first_child(root).unwrap();
	log.borrow_mut().clear();

	reconciler.render(with_ref("input", &b, vec![])).unwrap();
	assert_eq!(*log.borrow(), vec![("a", None), ("b", Some(input))]);
}

#[test]
fn unchanged_refs_are_not_called_again() {
	let (mut reconciler, _) = reconciler();
	let log = Log::default();
	let r = recording(&log, "r");

	reconciler.render(with_ref("div", &r, vec!["1".into()])).unwrap();
	reconciler.render(with_ref("div", &r, vec!["2".into()])).unwrap();
	reconciler.render(with_ref("div", &r.clone(), vec!["3".into()])).unwrap();
	assert_eq!(log.borrow().len(), 1);
}

#[test]
fn object_refs_hold_the_current_node() {
	let (mut reconciler, root) = reconciler();
	let r = Ref::object();

	reconciler.render(with_ref("canvas", &r, vec![])).unwrap();
	let canvas = reconciler.dom().first_child(root);
	assert_eq!(r.current().and_then(|target| target.as_node().copied()), canvas);

	reconciler.render(R::Null).unwrap();
	assert!(r.current().is_none());
}

struct Stateful;

impl Component<MemoryNode> for Stateful {
	fn render(&mut self, _: &Props<MemoryNode>) -> R {
		"stateful".into()
	}
}

impl ComponentClass<MemoryNode> for Stateful {
	fn create(_: &Props<MemoryNode>) -> Self {
		Self
	}
}

#[test]
fn class_refs_receive_the_instance() {
	let (mut reconciler, _) = reconciler();
	let r = Ref::object();
	let stateful = || create_element(ElementType::class::<Stateful>(), Props::new().with("ref", r.clone()), vec![]);

	reconciler.render(stateful()).unwrap();
	let first = r.current().and_then(|target| target.as_instance().map(|instance| Rc::as_ptr(instance).cast::<()>()));
	assert!(first.is_some());

	reconciler.render(stateful()).unwrap();
	let second = r.current().and_then(|target| target.as_instance().map(|instance| Rc::as_ptr(instance).cast::<()>()));
	assert_eq!(first, second);
}

fn labelled(props: &Props<MemoryNode>) -> R {
	create_element("label", Props::new(), vec![props.children().clone()])
}

#[test]
fn function_refs_resolve_to_the_rendered_node() {
	let (mut reconciler, root) = reconciler();
	let r = Ref::object();

	reconciler.render(create_element(ElementType::function(labelled), Props::new().with("ref", r.clone()), vec!["name".into()])).unwrap();
	let label = reconciler.dom().first_child(root);
	assert_eq!(reconciler.dom().tag_name(label.unwrap()), Some("label"));
	assert_eq!(r.current().and_then(|target| target.as_node().copied()), label);
}

#[test]
fn failed_renders_apply_no_refs() {
	let (mut reconciler, root) = reconciler();
	let log = Log::default();
	let r = recording(&log, "r");

	let result = reconciler.render(R::list(vec![with_ref("p", &r, vec![]), create_element("not a tag", Props::new(), vec![])]));
	assert!(matches!(result, Err(Error::ElementCreation { .. })));
	assert!(log.borrow().is_empty());

	reconciler.unmount().unwrap();
	assert_eq!(reconciler.dom().inner_html(root), "");
	assert!(log.borrow().iter().all(|(_, target)| target.is_none()));
}

fn switcher(props: &Props<MemoryNode>) -> R {
	match props.get("as") {
		Some(PropValue::Str(tag)) if tag == "span" => create_element("span", Props::new(), vec![]),
		_ => create_element("div", Props::new(), vec![]),
	}
}

#[test]
fn function_refs_follow_replaced_output() {
	let (mut reconciler, root) = reconciler();
	let log = Log::default();
	let r = recording(&log, "r");
	let switched = |tag: &'static str| create_element(ElementType::function(switcher), Props::new().with("as", tag).with("ref", r.clone()), vec![]);

	reconciler.render(switched("div")).unwrap();
	let div = reconciler.dom().first_child(root).unwrap();

	reconciler.render(switched("div")).unwrap();
	assert_eq!(*log.borrow(), vec![("r", Some(div))], "An unchanged target isn't re-attached.");

	reconciler.render(switched("span")).unwrap();
	let span = reconciler.dom().first_child(root).unwrap();
	assert_ne!(span, div);
	assert_eq!(reconciler.dom().tag_name(span), Some("span"));
	assert_eq!(*log.borrow(), vec![("r", Some(div)), ("r", None), ("r", Some(span))]);
}
