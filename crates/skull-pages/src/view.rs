//! Views: template rendering and live wiring.
//!
//! [`View::render`] evaluates the view's template with `view` and
//! `controller` in scope, wraps the result in a `<div data-skull-view>`
//! element and attaches it (in place of the previous render, or under the
//! root element). The attached fragment is then wired:
//!
//! 1. one delegated listener per supported event type dispatches
//!    `data-skull-action` elements to their target's method;
//! 2. every `data-skull-binding` element observes the last segment of its
//!    path and re-renders its content on change;
//! 3. every `data-skull-collection` element is filled with one rendered
//!    item per list element and rebuilt whenever the list property changes.
//!
//! Content produced by a binding or collection update is wired again, so
//! nested markers stay live.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use skull_core::{Class, Handler, NativeValue, ObjectRef, Observable, Value, array};

use crate::app::Application;
use crate::dom::{Dom, DomEvent, DomListener, NodeId};
use crate::error::{Error, Result};
use crate::markers::{
	ACTION_ATTR, BINDING_ATTR, COLLECTION_ATTR, CollectionMarker, MarkerRegistry, parse_marker_id,
};
use crate::page::{Page, PageElement};
use crate::template::{RenderFn, RenderScope, TemplateLoader, render_binding_content};

/// Attribute carrying the view class name on the wrapper element.
pub const VIEW_ATTR: &str = "data-skull-view";

/// DOM event types delegated for actions.
pub const SUPPORTED_EVENTS: [&str; 15] = [
	"keydown",
	"keyup",
	"keypress",
	"mousedown",
	"mouseup",
	"click",
	"doubleclick",
	"mousemove",
	"focusin",
	"focusout",
	"mouseenter",
	"mouseleave",
	"submit",
	"input",
	"change",
];

thread_local! {
	static VIEW_CLASS: Rc<Class> = Class::extend(&Class::base(), "View")
		.property("template_id", Value::Null)
		.property("root_el", Value::Null)
		.property("controller", Value::Null)
		.build();
}

struct ViewInner {
	object: ObjectRef,
	template: RenderFn,
	root_el: String,
	dom: Rc<dyn Dom>,
	markers: MarkerRegistry,
	element: Cell<Option<NodeId>>,
}

impl ViewInner {
	fn controller(&self) -> Option<ObjectRef> {
		self.object.get("controller").as_object().cloned()
	}

	fn scope(&self, this: Value) -> RenderScope<'_> {
		RenderScope::new(this, &self.markers).with_view(self.object.clone(), self.controller())
	}
}

/// A rendered view instance.
#[derive(Clone)]
pub struct View {
	inner: Rc<ViewInner>,
}

impl View {
	/// The `View` base class (`template_id`, `root_el`, `controller`).
	pub fn class() -> Rc<Class> {
		VIEW_CLASS.with(Rc::clone)
	}

	/// Creates a view for `object` using the application's collaborators.
	pub fn new(object: ObjectRef, app: &Application) -> Result<Self> {
		let templates = app.templates();
		Self::with_parts(
			object,
			&*templates,
			app.dom(),
			&app.settings().view.root_element,
		)
	}

	/// Creates a view from explicit collaborators.
	///
	/// The template named by the object's `template_id` is loaded here;
	/// `default_root` is used when the object has no `root_el`.
	pub fn with_parts(
		object: ObjectRef,
		templates: &dyn TemplateLoader,
		dom: Rc<dyn Dom>,
		default_root: &str,
	) -> Result<Self> {
		let template_id = object.get("template_id");
		let Some(template_id) = template_id.as_str() else {
			return Err(Error::TemplateNotFound(format!(
				"{} declares no template_id",
				object.class_name()
			)));
		};
		let template = templates.load(template_id)?;
		let root_el = object
			.get("root_el")
			.as_str()
			.map_or_else(|| default_root.to_string(), str::to_string);

		Ok(Self {
			inner: Rc::new(ViewInner {
				object,
				template,
				root_el,
				dom,
				markers: MarkerRegistry::new(),
				element: Cell::new(None),
			}),
		})
	}

	/// The view object.
	pub fn object(&self) -> &ObjectRef {
		&self.inner.object
	}

	/// The controller, if the view object has one.
	pub fn controller(&self) -> Option<ObjectRef> {
		self.inner.controller()
	}

	/// The wrapper element of the last render, if attached.
	pub fn element(&self) -> Option<NodeId> {
		self.inner.element.get()
	}

	/// Selector of the element the view attaches under.
	pub fn root_el(&self) -> &str {
		&self.inner.root_el
	}

	/// This view's marker registry.
	pub fn markers(&self) -> &MarkerRegistry {
		&self.inner.markers
	}

	/// Renders, attaches and wires the view. Returns the wrapper element.
	pub fn render(&self) -> Result<NodeId> {
		let inner = &self.inner;
		let this = Value::map([
			("view", Value::from(&inner.object)),
			("controller", inner.object.get("controller")),
		]);
		let page = (inner.template)(&mut inner.scope(this))?;
		let wrapper = Page::element("div")
			.attr(VIEW_ATTR, inner.object.class_name().to_string())
			.child(page);
		let element = inner.dom.create_element(&wrapper);

		match inner.element.get() {
			Some(previous) => inner.dom.replace(previous, element),
			None => {
				let root = inner
					.dom
					.query_selector(&inner.root_el)
					.ok_or_else(|| Error::RootElementNotFound(inner.root_el.clone()))?;
				inner.dom.set_children(root, &[element]);
			}
		}
		inner.element.set(Some(element));

		delegate_actions(inner, element);
		wire(inner, element)?;

		tracing::debug!(
			view = %inner.object.class_name(),
			markers = inner.markers.len(),
			"rendered view"
		);
		Ok(element)
	}

	/// Detaches the rendered element. Registered markers stay in the registry.
	pub fn cleanup(&self) {
		if let Some(element) = self.inner.element.take() {
			self.inner.dom.remove(element);
			tracing::debug!(view = %self.inner.object.class_name(), "view cleaned up");
		}
	}
}

impl fmt::Debug for View {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("View")
			.field("class", &self.inner.object.class_name())
			.field("root_el", &self.inner.root_el)
			.field("element", &self.inner.element.get())
			.finish()
	}
}

fn delegate_actions(inner: &Rc<ViewInner>, element: NodeId) {
	for event_type in SUPPORTED_EVENTS {
		inner
			.dom
			.listen(element, event_type, ACTION_ATTR, action_listener(Rc::downgrade(inner)));
	}
}

fn action_listener(view: Weak<ViewInner>) -> DomListener {
	Rc::new(move |event: &Rc<DomEvent>| -> Result<()> {
		let Some(inner) = view.upgrade() else {
			return Ok(());
		};
		let Some(id) = inner
			.dom
			.attribute(event.current_target(), ACTION_ATTR)
			.as_deref()
			.and_then(parse_marker_id)
		else {
			return Ok(());
		};
		let action = inner
			.markers
			.action(id)
			.ok_or(Error::UnknownMarker { kind: "action", id })?;
		if action.event_type != event.event_type() {
			return Ok(());
		}

		event.prevent_default();
		if !action.bubbles {
			event.stop_propagation();
		}

		let mut args = Vec::with_capacity(action.params.len() + 1);
		args.push(Value::Native(NativeValue::from_rc(event.clone())));
		args.extend(action.params.iter().cloned());

		tracing::debug!(
			action = %action.name,
			target = %action.target.class_name(),
			event = event.event_type(),
			"dispatching action"
		);
		action.target.send(&action.name, &args)?;
		Ok(())
	})
}

fn marker_id(inner: &ViewInner, node: NodeId, attr: &str) -> Option<u64> {
	let raw = inner.dom.attribute(node, attr)?;
	let id = parse_marker_id(&raw);
	if id.is_none() {
		tracing::warn!(attr, value = %raw, "ignoring malformed marker");
	}
	id
}

fn wire(inner: &Rc<ViewInner>, node: NodeId) -> Result<()> {
	let bindings = inner.dom.query_marked(node, BINDING_ATTR);
	let collections = inner.dom.query_marked(node, COLLECTION_ATTR);
	for element in bindings {
		bind_element(inner, element)?;
	}
	for element in collections {
		bind_collection(inner, element)?;
	}
	Ok(())
}

fn bind_element(inner: &Rc<ViewInner>, element: NodeId) -> Result<()> {
	let Some(id) = marker_id(inner, element, BINDING_ATTR) else {
		return Ok(());
	};
	let marker = inner
		.markers
		.binding(id)
		.ok_or(Error::UnknownMarker { kind: "binding", id })?;

	let owner = match marker.path.resolve_owner(&marker.root) {
		Ok(Value::Object(owner)) => owner,
		Ok(_) => {
			tracing::debug!(path = %marker.path, "binding owner is not observable");
			return Ok(());
		}
		Err(err) => {
			tracing::warn!(path = %marker.path, error = %err, "binding not wired");
			return Ok(());
		}
	};

	let view = Rc::downgrade(inner);
	owner.add_observer(
		marker.path.property_name(),
		Handler::new(move |_| {
			let Some(inner) = view.upgrade() else {
				return Ok(());
			};
			refresh_binding(&inner, element, id)?;
			Ok(())
		}),
	);
	Ok(())
}

fn refresh_binding(inner: &Rc<ViewInner>, element: NodeId, id: u64) -> Result<()> {
	let marker = inner
		.markers
		.binding(id)
		.ok_or(Error::UnknownMarker { kind: "binding", id })?;
	let page = render_binding_content(&inner.scope(Value::Null), &marker)?;
	tracing::trace!(path = %marker.path, "refreshing binding");
	for node in inner.dom.set_content(element, &page) {
		wire(inner, node)?;
	}
	Ok(())
}

fn bind_collection(inner: &Rc<ViewInner>, element: NodeId) -> Result<()> {
	let Some(id) = marker_id(inner, element, COLLECTION_ATTR) else {
		return Ok(());
	};
	let marker = inner
		.markers
		.collection(id)
		.ok_or(Error::UnknownMarker {
			kind: "collection",
			id,
		})?;
	fill_collection(inner, element, &marker)?;

	let owner = match marker.path.resolve_owner(&marker.root) {
		Ok(Value::Object(owner)) => owner,
		Ok(_) => {
			tracing::debug!(path = %marker.path, "collection owner is not observable");
			return Ok(());
		}
		Err(err) => {
			tracing::warn!(path = %marker.path, error = %err, "collection not wired");
			return Ok(());
		}
	};

	let view = Rc::downgrade(inner);
	let current = Rc::new(Cell::new(element));
	owner.add_observer(
		marker.path.property_name(),
		Handler::new(move |_| {
			let Some(inner) = view.upgrade() else {
				return Ok(());
			};
			let marker = inner.markers.collection(id).ok_or(Error::UnknownMarker {
				kind: "collection",
				id,
			})?;
			let fresh = inner
				.dom
				.create_element(&PageElement::new("div").attr(COLLECTION_ATTR, id.to_string()));
			inner.dom.replace(current.get(), fresh);
			current.set(fresh);
			tracing::trace!(path = %marker.path, "rebuilding collection");
			fill_collection(&inner, fresh, &marker)?;
			Ok(())
		}),
	);
	Ok(())
}

fn fill_collection(
	inner: &Rc<ViewInner>,
	container: NodeId,
	marker: &CollectionMarker,
) -> Result<()> {
	let list = match marker.path.resolve(&marker.root) {
		Ok(list) => list,
		Err(err) => {
			tracing::warn!(path = %marker.path, error = %err, "collection path did not resolve");
			return Ok(());
		}
	};

	let view = Rc::downgrade(inner);
	let item = marker.item.clone();
	array::for_each(
		&list,
		Rc::new(move |value: &Value| -> skull_core::Result<()> {
			let Some(inner) = view.upgrade() else {
				return Ok(());
			};
			let page = item(&mut inner.scope(value.clone()))?;
			for node in inner.dom.append(container, &page) {
				wire(&inner, node)?;
			}
			Ok(())
		}),
	)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::MemoryDom;
	use crate::page::IntoPage;
	use crate::template::{ActionOptions, TemplateRegistry};
	use skull_core::Overrides;
	use std::cell::RefCell;

	struct Fixture {
		dom: Rc<MemoryDom>,
		templates: TemplateRegistry,
		controller: ObjectRef,
	}

	fn fixture() -> Fixture {
		let controller = Class::base().new_instance().unwrap();
		controller.set("title", "Heat").unwrap();
		Fixture {
			dom: Rc::new(MemoryDom::new()),
			templates: TemplateRegistry::new(),
			controller,
		}
	}

	impl Fixture {
		fn view(&self, template_id: &str) -> View {
			let object = View::class()
				.create(
					Overrides::new()
						.property("template_id", template_id)
						.property("controller", &self.controller),
				)
				.unwrap();
			View::with_parts(object, &self.templates, self.dom.clone(), "body").unwrap()
		}
	}

	#[test]
	fn test_render_attaches_under_root() {
		let fx = fixture();
		fx.templates.register("title", |scope| {
			Ok(Page::element("h1").child(scope.get("controller.title")).into_page())
		});
		let view = fx.view("title");

		let element = view.render().unwrap();
		assert!(fx.dom.is_attached(element));
		assert_eq!(
			fx.dom.inner_html(fx.dom.body()),
			r#"<div data-skull-view="View"><h1>Heat</h1></div>"#
		);
	}

	#[test]
	fn test_rerender_replaces_in_place() {
		let fx = fixture();
		fx.templates
			.register("title", |scope| Ok(scope.get("controller.title").into_page()));
		let view = fx.view("title");

		let first = view.render().unwrap();
		fx.controller.set("title", "Ronin").unwrap();
		let second = view.render().unwrap();

		assert!(!fx.dom.is_attached(first));
		assert!(fx.dom.is_attached(second));
		assert_eq!(fx.dom.children(fx.dom.body()), vec![second]);
		assert_eq!(fx.dom.text_content(fx.dom.body()), "Ronin");
	}

	#[test]
	fn test_missing_template_and_root() {
		let fx = fixture();
		let object = View::class()
			.create(Overrides::new().property("template_id", "nope"))
			.unwrap();
		assert!(matches!(
			View::with_parts(object, &fx.templates, fx.dom.clone(), "body"),
			Err(Error::TemplateNotFound(_))
		));

		fx.templates.register("empty", |_| Ok(Page::empty()));
		let object = View::class()
			.create(
				Overrides::new()
					.property("template_id", "empty")
					.property("root_el", "#missing"),
			)
			.unwrap();
		let view = View::with_parts(object, &fx.templates, fx.dom.clone(), "body").unwrap();
		assert!(matches!(view.render(), Err(Error::RootElementNotFound(root)) if root == "#missing"));
	}

	#[test]
	fn test_binding_updates_on_set() {
		let fx = fixture();
		fx.templates.register("title", |scope| scope.bind("controller.title"));
		let view = fx.view("title");
		view.render().unwrap();

		fx.controller.set("title", "Ronin").unwrap();
		let span = fx.dom.find_marked(BINDING_ATTR, "0").unwrap();
		assert_eq!(fx.dom.text_content(span), "Ronin");
	}

	#[test]
	fn test_action_dispatches_with_event_and_params() {
		let fx = fixture();
		let calls = Rc::new(RefCell::new(Vec::new()));
		let sink = calls.clone();
		let controller = Class::extend(&Class::base(), "MoviesController")
			.method("select", move |_, args| {
				assert!(args[0].downcast_native::<DomEvent>().is_some());
				sink.borrow_mut().push(args[1].clone());
				Ok(Value::Null)
			})
			.build()
			.new_instance()
			.unwrap();
		fx.templates.register("list", |scope| {
			Ok(Page::element("button")
				.attr_pair(scope.action("select", ActionOptions::new().param(42))?)
				.child("pick")
				.into_page())
		});
		let object = View::class()
			.create(
				Overrides::new()
					.property("template_id", "list")
					.property("controller", &controller),
			)
			.unwrap();
		let view = View::with_parts(object, &fx.templates, fx.dom.clone(), "body").unwrap();
		view.render().unwrap();

		let button = fx.dom.find_marked(ACTION_ATTR, "0").unwrap();
		let event = fx.dom.dispatch(button, "click").unwrap();
		assert!(event.is_default_prevented());
		assert!(event.is_propagation_stopped());
		assert_eq!(calls.borrow().len(), 1);
		assert_eq!(calls.borrow()[0].as_i64(), Some(42));

		fx.dom.dispatch(button, "keyup").unwrap();
		assert_eq!(calls.borrow().len(), 1);
	}

	#[test]
	fn test_cleanup_detaches() {
		let fx = fixture();
		fx.templates.register("empty", |_| Ok(Page::empty()));
		let view = fx.view("empty");
		let element = view.render().unwrap();

		view.cleanup();
		assert!(!fx.dom.is_attached(element));
		assert_eq!(view.element(), None);
		assert_eq!(SUPPORTED_EVENTS.len(), 15);
	}
}
