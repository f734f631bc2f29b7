//! The document collaborator.
//!
//! Views only need a small slice of a DOM: build detached nodes from a
//! [`Page`], find marked elements in a subtree, swap and detach nodes,
//! replace inner content, read attributes, and attach delegated event
//! listeners. [`Dom`] captures exactly that; [`MemoryDom`] is an
//! arena-backed implementation that also drives events for tests and
//! non-browser hosts.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::page::{Page, PageElement, html_escape};

/// Handle to a node owned by a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A dispatched DOM event.
#[derive(Debug)]
pub struct DomEvent {
	event_type: String,
	target: NodeId,
	current_target: Cell<NodeId>,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
}

impl DomEvent {
	/// Creates an event of `event_type` originating at `target`.
	pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
		Self {
			event_type: event_type.into(),
			target,
			current_target: Cell::new(target),
			default_prevented: Cell::new(false),
			propagation_stopped: Cell::new(false),
		}
	}

	/// Event type, e.g. `"click"`.
	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	/// Node the event originated at.
	pub fn target(&self) -> NodeId {
		self.target
	}

	/// Marked element a delegated listener matched.
	pub fn current_target(&self) -> NodeId {
		self.current_target.get()
	}

	/// Suppresses the default action.
	pub fn prevent_default(&self) {
		self.default_prevented.set(true);
	}

	/// Whether the default action was suppressed.
	pub fn is_default_prevented(&self) -> bool {
		self.default_prevented.get()
	}

	/// Stops the event from reaching outer listeners.
	pub fn stop_propagation(&self) {
		self.propagation_stopped.set(true);
	}

	/// Whether propagation was stopped.
	pub fn is_propagation_stopped(&self) -> bool {
		self.propagation_stopped.get()
	}
}

/// Delegated event listener.
pub type DomListener = Rc<dyn Fn(&Rc<DomEvent>) -> Result<()>>;

/// The DOM capabilities views rely on.
pub trait Dom {
	/// Finds an attached element by `#id` or tag name.
	fn query_selector(&self, selector: &str) -> Option<NodeId>;

	/// Builds detached nodes for `page`, returning its top-level nodes.
	fn create_fragment(&self, page: &Page) -> Vec<NodeId>;

	/// Builds a single detached element.
	fn create_element(&self, element: &PageElement) -> NodeId;

	/// `root` and its descendants carrying attribute `attr`, in document order.
	fn query_marked(&self, root: NodeId, attr: &str) -> Vec<NodeId>;

	/// Reads an attribute.
	fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

	/// Parent of `node`, if attached to one.
	fn parent(&self, node: NodeId) -> Option<NodeId>;

	/// Appends `page` under `parent`, returning the new top-level nodes.
	fn append(&self, parent: NodeId, page: &Page) -> Vec<NodeId>;

	/// Replaces the children of `node` with `page`, returning the new children.
	fn set_content(&self, node: NodeId, page: &Page) -> Vec<NodeId>;

	/// Replaces the children of `parent` with existing nodes.
	fn set_children(&self, parent: NodeId, children: &[NodeId]);

	/// Puts `new` where `old` is and detaches `old`.
	fn replace(&self, old: NodeId, new: NodeId);

	/// Detaches `node` from its parent.
	fn remove(&self, node: NodeId);

	/// Attaches a listener on `root` for `event_type` events raised on
	/// descendants carrying attribute `attr`.
	fn listen(&self, root: NodeId, event_type: &str, attr: &str, listener: DomListener);
}

#[derive(Debug, Clone)]
enum NodeKind {
	Element {
		tag: String,
		attrs: Vec<(String, String)>,
	},
	Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
	kind: NodeKind,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

#[derive(Clone)]
struct Delegation {
	event_type: String,
	attr: String,
	listener: DomListener,
}

/// In-memory document.
///
/// Nodes live in an arena and are never freed; detached nodes simply have
/// no parent. The document root is a `body` element.
pub struct MemoryDom {
	nodes: RefCell<Vec<NodeData>>,
	delegations: RefCell<HashMap<NodeId, Vec<Delegation>>>,
	body: NodeId,
}

impl Default for MemoryDom {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDom {
	/// Creates a document holding an empty `body`.
	pub fn new() -> Self {
		Self {
			nodes: RefCell::new(vec![NodeData {
				kind: NodeKind::Element {
					tag: "body".to_string(),
					attrs: Vec::new(),
				},
				parent: None,
				children: Vec::new(),
			}]),
			delegations: RefCell::new(HashMap::new()),
			body: NodeId(0),
		}
	}

	/// The `body` element.
	pub fn body(&self) -> NodeId {
		self.body
	}

	/// Appends an element with the given id under `body` (page scaffolding).
	pub fn add_container(&self, tag: &'static str, id: &'static str) -> NodeId {
		let node = self.create_element(&PageElement::new(tag).attr("id", id));
		self.attach(self.body, node);
		node
	}

	/// Whether `node` is reachable from `body`.
	pub fn is_attached(&self, node: NodeId) -> bool {
		let nodes = self.nodes.borrow();
		let mut current = Some(node);
		while let Some(id) = current {
			if id == self.body {
				return true;
			}
			current = nodes[id.0].parent;
		}
		false
	}

	/// First attached node whose attribute `attr` equals `value`.
	pub fn find_marked(&self, attr: &str, value: &str) -> Option<NodeId> {
		self.descendants(self.body)
			.into_iter()
			.find(|node| self.attribute(*node, attr).as_deref() == Some(value))
	}

	/// Attached elements with tag `tag`, in document order.
	pub fn find_all_by_tag(&self, tag: &str) -> Vec<NodeId> {
		let nodes = self.nodes.borrow();
		self.descendants(self.body)
			.into_iter()
			.filter(|node| matches!(&nodes[node.0].kind, NodeKind::Element { tag: t, .. } if t == tag))
			.collect()
	}

	/// Children of `node`.
	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.nodes.borrow()[node.0].children.clone()
	}

	/// Concatenated text of `node` and its descendants.
	pub fn text_content(&self, node: NodeId) -> String {
		let nodes = self.nodes.borrow();
		let mut out = String::new();
		Self::collect_text(&nodes, node, &mut out);
		out
	}

	/// Serialized children of `node`.
	pub fn inner_html(&self, node: NodeId) -> String {
		let nodes = self.nodes.borrow();
		let mut out = String::new();
		for child in &nodes[node.0].children {
			Self::serialize(&nodes, *child, &mut out);
		}
		out
	}

	/// Raises `event_type` at `target` and bubbles it through delegated listeners.
	///
	/// Each listener sees the innermost element between the target and the
	/// listener's root that carries its marker attribute.
	pub fn dispatch(&self, target: NodeId, event_type: &str) -> Result<Rc<DomEvent>> {
		let event = Rc::new(DomEvent::new(event_type, target));
		let path = self.ancestors_inclusive(target);

		for (depth, node) in path.iter().enumerate() {
			let delegations = self
				.delegations
				.borrow()
				.get(node)
				.cloned()
				.unwrap_or_default();
			for delegation in delegations {
				if delegation.event_type != event_type {
					continue;
				}
				let marked = path[..=depth]
					.iter()
					.find(|candidate| self.attribute(**candidate, &delegation.attr).is_some());
				if let Some(marked) = marked {
					event.current_target.set(*marked);
					(delegation.listener)(&event)?;
				}
			}
			if event.is_propagation_stopped() {
				break;
			}
		}
		Ok(event)
	}

	fn ancestors_inclusive(&self, node: NodeId) -> Vec<NodeId> {
		let nodes = self.nodes.borrow();
		let mut path = vec![node];
		let mut current = nodes[node.0].parent;
		while let Some(id) = current {
			path.push(id);
			current = nodes[id.0].parent;
		}
		path
	}

	fn descendants(&self, root: NodeId) -> Vec<NodeId> {
		let nodes = self.nodes.borrow();
		let mut out = Vec::new();
		let mut stack = vec![root];
		while let Some(id) = stack.pop() {
			out.push(id);
			stack.extend(nodes[id.0].children.iter().rev().copied());
		}
		out
	}

	fn alloc(&self, kind: NodeKind) -> NodeId {
		let mut nodes = self.nodes.borrow_mut();
		nodes.push(NodeData {
			kind,
			parent: None,
			children: Vec::new(),
		});
		NodeId(nodes.len() - 1)
	}

	fn build(&self, page: &Page, out: &mut Vec<NodeId>) {
		match page {
			Page::Element(element) => out.push(self.create_element(element)),
			Page::Text(text) => out.push(self.alloc(NodeKind::Text(text.to_string()))),
			Page::Fragment(children) => {
				for child in children {
					self.build(child, out);
				}
			}
			Page::Empty => {}
		}
	}

	fn detach(&self, node: NodeId) {
		let mut nodes = self.nodes.borrow_mut();
		if let Some(parent) = nodes[node.0].parent.take() {
			nodes[parent.0].children.retain(|c| *c != node);
		}
	}

	fn attach(&self, parent: NodeId, child: NodeId) {
		self.detach(child);
		let mut nodes = self.nodes.borrow_mut();
		nodes[child.0].parent = Some(parent);
		nodes[parent.0].children.push(child);
	}

	fn collect_text(nodes: &[NodeData], node: NodeId, out: &mut String) {
		match &nodes[node.0].kind {
			NodeKind::Text(text) => out.push_str(text),
			NodeKind::Element { .. } => {
				for child in &nodes[node.0].children {
					Self::collect_text(nodes, *child, out);
				}
			}
		}
	}

	fn serialize(nodes: &[NodeData], node: NodeId, out: &mut String) {
		match &nodes[node.0].kind {
			NodeKind::Text(text) => out.push_str(&html_escape(text)),
			NodeKind::Element { tag, attrs } => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in attrs {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					out.push_str(&html_escape(value));
					out.push('"');
				}
				out.push('>');
				for child in &nodes[node.0].children {
					Self::serialize(nodes, *child, out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
		}
	}
}

impl Dom for MemoryDom {
	fn query_selector(&self, selector: &str) -> Option<NodeId> {
		let candidates = self.descendants(self.body);
		match selector.strip_prefix('#') {
			Some(id) => candidates
				.into_iter()
				.find(|node| self.attribute(*node, "id").as_deref() == Some(id)),
			None => {
				let nodes = self.nodes.borrow();
				candidates.into_iter().find(|node| {
					matches!(&nodes[node.0].kind, NodeKind::Element { tag, .. } if tag == selector)
				})
			}
		}
	}

	fn create_fragment(&self, page: &Page) -> Vec<NodeId> {
		let mut out = Vec::new();
		self.build(page, &mut out);
		out
	}

	fn create_element(&self, element: &PageElement) -> NodeId {
		let node = self.alloc(NodeKind::Element {
			tag: element.tag_name().to_string(),
			attrs: element
				.attrs()
				.iter()
				.map(|(n, v)| (n.to_string(), v.to_string()))
				.collect(),
		});
		for child in element.child_views() {
			for built in self.create_fragment(child) {
				self.attach(node, built);
			}
		}
		node
	}

	fn query_marked(&self, root: NodeId, attr: &str) -> Vec<NodeId> {
		self.descendants(root)
			.into_iter()
			.filter(|node| self.attribute(*node, attr).is_some())
			.collect()
	}

	fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
		match &self.nodes.borrow()[node.0].kind {
			NodeKind::Element { attrs, .. } => attrs
				.iter()
				.find(|(n, _)| n == name)
				.map(|(_, v)| v.clone()),
			NodeKind::Text(_) => None,
		}
	}

	fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.nodes.borrow()[node.0].parent
	}

	fn append(&self, parent: NodeId, page: &Page) -> Vec<NodeId> {
		let built = self.create_fragment(page);
		for node in &built {
			self.attach(parent, *node);
		}
		built
	}

	fn set_content(&self, node: NodeId, page: &Page) -> Vec<NodeId> {
		for child in self.children(node) {
			self.detach(child);
		}
		self.append(node, page)
	}

	fn set_children(&self, parent: NodeId, children: &[NodeId]) {
		for child in self.children(parent) {
			self.detach(child);
		}
		for child in children {
			self.attach(parent, *child);
		}
	}

	fn replace(&self, old: NodeId, new: NodeId) {
		self.detach(new);
		let mut nodes = self.nodes.borrow_mut();
		let Some(parent) = nodes[old.0].parent.take() else {
			return;
		};
		if let Some(slot) = nodes[parent.0].children.iter_mut().find(|c| **c == old) {
			*slot = new;
		}
		nodes[new.0].parent = Some(parent);
	}

	fn remove(&self, node: NodeId) {
		self.detach(node);
	}

	fn listen(&self, root: NodeId, event_type: &str, attr: &str, listener: DomListener) {
		self.delegations
			.borrow_mut()
			.entry(root)
			.or_default()
			.push(Delegation {
				event_type: event_type.to_string(),
				attr: attr.to_string(),
				listener,
			});
	}
}

impl fmt::Debug for MemoryDom {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDom")
			.field("nodes", &self.nodes.borrow().len())
			.field("body", &self.inner_html(self.body))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn list_page() -> Page {
		Page::Element(
			Page::element("ul")
				.attr("id", "list")
				.child(Page::element("li").attr("data-mark", "1").child("one"))
				.child(Page::element("li").child("two")),
		)
	}

	#[test]
	fn test_create_and_attach() {
		let dom = MemoryDom::new();
		let nodes = dom.create_fragment(&list_page());
		assert_eq!(nodes.len(), 1);
		assert!(!dom.is_attached(nodes[0]));
		assert_eq!(dom.query_selector("#list"), None);

		dom.set_children(dom.body(), &nodes);
		assert!(dom.is_attached(nodes[0]));
		assert_eq!(dom.query_selector("#list"), Some(nodes[0]));
		assert_eq!(dom.query_selector("ul"), Some(nodes[0]));
		assert_eq!(dom.text_content(nodes[0]), "onetwo");
	}

	#[test]
	fn test_query_marked_in_document_order() {
		let dom = MemoryDom::new();
		let root = dom.create_fragment(&list_page())[0];
		let marked = dom.query_marked(root, "data-mark");
		assert_eq!(marked.len(), 1);
		assert_eq!(dom.attribute(marked[0], "data-mark").as_deref(), Some("1"));
	}

	#[test]
	fn test_set_content_and_replace() {
		let dom = MemoryDom::new();
		let holder = dom.add_container("div", "holder");
		dom.set_content(holder, &Page::text("<b>"));
		assert_eq!(dom.inner_html(holder), "&lt;b&gt;");

		let fresh = dom.create_element(&PageElement::new("p").child("new"));
		dom.replace(holder, fresh);
		assert!(!dom.is_attached(holder));
		assert_eq!(dom.parent(fresh), Some(dom.body()));
		assert_eq!(dom.inner_html(dom.body()), "<p>new</p>");
	}

	#[test]
	fn test_delegated_dispatch_and_stop_propagation() {
		let dom = MemoryDom::new();
		let outer = dom.add_container("div", "outer");
		let nodes = dom.append(
			outer,
			&Page::Element(
				Page::element("div")
					.attr("data-act", "inner-root")
					.child(Page::element("button").attr("data-act", "btn").child("go")),
			),
		);
		let inner_root = nodes[0];
		let button = dom.query_marked(inner_root, "data-act")[1];
		let seen = Rc::new(RefCell::new(Vec::new()));

		for (root, stop) in [(inner_root, true), (outer, false)] {
			let seen = seen.clone();
			dom.listen(
				root,
				"click",
				"data-act",
				Rc::new(move |event: &Rc<DomEvent>| {
					seen.borrow_mut().push(event.current_target());
					if stop {
						event.stop_propagation();
					}
					Ok(())
				}),
			);
		}

		let event = dom.dispatch(button, "click").unwrap();
		assert_eq!(*seen.borrow(), vec![button]);
		assert!(event.is_propagation_stopped());

		dom.dispatch(button, "keyup").unwrap();
		assert_eq!(seen.borrow().len(), 1);
	}
}
