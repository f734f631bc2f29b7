//! Templates and the rendering scope.
//!
//! ## Providers
//!
//! A [`TemplateProvider`] turns a template id into source and source into a
//! [`RenderFn`]. Views use the object-safe [`TemplateLoader`] facade, which
//! every provider gets for free. [`TemplateRegistry`] is the built-in
//! provider: its "source" is already a Rust render closure.
//!
//! ## Rendering
//!
//! A render function receives a [`RenderScope`]. Besides plain reads
//! ([`RenderScope::get`]), the scope offers the three live helpers:
//!
//! - [`RenderScope::bind`]: a `<span>` whose content follows a property
//! - [`RenderScope::each`]: a `<div>` whose children follow a list
//! - [`RenderScope::action`]: an attribute dispatching a DOM event to a method
//!
//! ```ignore
//! registry.register("movie", |scope| {
//!     Ok(Page::element("div")
//!         .child(Page::element("h1").child(scope.bind("controller.movie.title")?))
//!         .child(
//!             Page::element("button")
//!                 .attr_pair(scope.action("next_page", ActionOptions::new())?)
//!                 .child("Next"),
//!         )
//!         .into_page())
//! });
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use skull_core::{Error as CoreError, ObjectRef, PropertyPath, Value, get_path};

use crate::error::{Error, Result};
use crate::markers::{
	ACTION_ATTR, ActionMarker, BINDING_ATTR, BindingMarker, BindingRender, COLLECTION_ATTR,
	CollectionMarker, ItemRender, MarkerRegistry,
};
use crate::page::{IntoPage, Page};

/// A compiled template.
pub type RenderFn = Rc<dyn Fn(&mut RenderScope<'_>) -> Result<Page>>;

/// Source lookup and compilation.
pub trait TemplateProvider {
	/// Template source representation.
	type Source;

	/// Returns the source registered under `id`.
	fn source(&self, id: &str) -> Result<Self::Source>;

	/// Compiles source into a render function.
	fn compile(&self, source: Self::Source) -> Result<RenderFn>;
}

/// Object-safe template loading.
pub trait TemplateLoader {
	/// Looks up and compiles the template `id`.
	fn load(&self, id: &str) -> Result<RenderFn>;
}

impl<P: TemplateProvider> TemplateLoader for P {
	fn load(&self, id: &str) -> Result<RenderFn> {
		self.compile(self.source(id)?)
	}
}

/// Templates written as Rust render closures, keyed by id.
#[derive(Default)]
pub struct TemplateRegistry {
	templates: RefCell<HashMap<String, RenderFn>>,
}

impl TemplateRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers (or replaces) template `id`.
	pub fn register<F>(&self, id: impl Into<String>, render: F)
	where
		F: Fn(&mut RenderScope<'_>) -> Result<Page> + 'static,
	{
		self.templates
			.borrow_mut()
			.insert(id.into(), Rc::new(render));
	}

	/// Whether template `id` exists.
	pub fn contains(&self, id: &str) -> bool {
		self.templates.borrow().contains_key(id)
	}
}

impl TemplateProvider for TemplateRegistry {
	type Source = RenderFn;

	fn source(&self, id: &str) -> Result<RenderFn> {
		self.templates
			.borrow()
			.get(id)
			.cloned()
			.ok_or_else(|| Error::TemplateNotFound(id.to_string()))
	}

	fn compile(&self, source: RenderFn) -> Result<RenderFn> {
		Ok(source)
	}
}

/// Options for [`RenderScope::action`].
#[derive(Debug, Clone)]
pub struct ActionOptions {
	on: String,
	target: Option<ObjectRef>,
	bubbles: bool,
	params: Vec<Value>,
}

impl Default for ActionOptions {
	fn default() -> Self {
		Self {
			on: "click".to_string(),
			target: None,
			bubbles: false,
			params: Vec::new(),
		}
	}
}

impl ActionOptions {
	/// Click action on the default target.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the triggering DOM event type.
	pub fn on(mut self, event_type: impl Into<String>) -> Self {
		self.on = event_type.into();
		self
	}

	/// Sets an explicit target, taking precedence over controller and view.
	pub fn target(mut self, target: ObjectRef) -> Self {
		self.target = Some(target);
		self
	}

	/// Lets the event keep propagating after dispatch.
	pub fn bubbles(mut self, bubbles: bool) -> Self {
		self.bubbles = bubbles;
		self
	}

	/// Appends a parameter passed after the DOM event.
	pub fn param(mut self, value: impl Into<Value>) -> Self {
		self.params.push(value.into());
		self
	}
}

/// Evaluation context of a template.
pub struct RenderScope<'a> {
	this: Value,
	markers: &'a MarkerRegistry,
	view: Option<ObjectRef>,
	controller: Option<ObjectRef>,
}

impl<'a> RenderScope<'a> {
	/// Creates a scope over `this`, registering markers in `markers`.
	pub fn new(this: Value, markers: &'a MarkerRegistry) -> Self {
		Self {
			this,
			markers,
			view: None,
			controller: None,
		}
	}

	/// Sets the view and controller used as default action targets.
	pub fn with_view(mut self, view: ObjectRef, controller: Option<ObjectRef>) -> Self {
		self.view = Some(view);
		self.controller = controller;
		self
	}

	/// A scope over another `this`, sharing registry, view and controller.
	pub fn child(&self, this: Value) -> RenderScope<'a> {
		RenderScope {
			this,
			markers: self.markers,
			view: self.view.clone(),
			controller: self.controller.clone(),
		}
	}

	/// The value paths are resolved against.
	pub fn this(&self) -> &Value {
		&self.this
	}

	/// The rendering view object.
	pub fn view(&self) -> Option<&ObjectRef> {
		self.view.as_ref()
	}

	/// The view's controller.
	pub fn controller(&self) -> Option<&ObjectRef> {
		self.controller.as_ref()
	}

	/// The marker registry of the rendering view.
	pub fn markers(&self) -> &MarkerRegistry {
		self.markers
	}

	/// Resolves `path`, reporting unresolvable intermediate segments.
	pub fn try_get(&self, path: &str) -> Result<Value> {
		Ok(get_path(&self.this, path)?)
	}

	/// Resolves `path`; unresolvable paths read as null and are logged.
	pub fn get(&self, path: &str) -> Value {
		match get_path(&self.this, path) {
			Ok(value) => value,
			Err(err) => {
				tracing::warn!(path, error = %err, "template path did not resolve");
				Value::Null
			}
		}
	}

	/// A `<span>` showing the value at `path`, kept in sync with it.
	pub fn bind(&mut self, path: &str) -> Result<Page> {
		self.register_binding(path, None, None)
	}

	/// Like [`bind`](Self::bind) but renders the value with `render`.
	pub fn bind_with<F>(&mut self, path: &str, render: F) -> Result<Page>
	where
		F: Fn(&mut RenderScope<'_>, &Value) -> Result<Page> + 'static,
	{
		self.register_binding(path, Some(Rc::new(render)), None)
	}

	/// Like [`bind_with`](Self::bind_with), rendering with `context` as `this`.
	pub fn bind_in<F>(&mut self, path: &str, context: Value, render: F) -> Result<Page>
	where
		F: Fn(&mut RenderScope<'_>, &Value) -> Result<Page> + 'static,
	{
		self.register_binding(path, Some(Rc::new(render)), Some(context))
	}

	fn register_binding(
		&mut self,
		path: &str,
		render: Option<BindingRender>,
		context: Option<Value>,
	) -> Result<Page> {
		let marker = BindingMarker {
			root: self.this.clone(),
			path: PropertyPath::parse(path)?,
			render,
			context,
		};
		let content = render_binding_content(self, &marker)?;
		let id = self.markers.register_binding(marker);
		Ok(Page::element("span")
			.attr(BINDING_ATTR, id.to_string())
			.child(content)
			.into_page())
	}

	/// An empty `<div>` that the view fills with one `item` render per element
	/// of the list at `path`, rebuilt whenever that property changes.
	pub fn each<F>(&mut self, path: &str, item: F) -> Result<Page>
	where
		F: Fn(&mut RenderScope<'_>) -> Result<Page> + 'static,
	{
		let item: ItemRender = Rc::new(item);
		let id = self.markers.register_collection(CollectionMarker {
			root: self.this.clone(),
			path: PropertyPath::parse(path)?,
			item,
		});
		Ok(Page::element("div")
			.attr(COLLECTION_ATTR, id.to_string())
			.into_page())
	}

	/// Registers an action, returning the marker attribute for the element.
	///
	/// The target is the explicit one from `options`, else the controller,
	/// else the view.
	pub fn action(&mut self, name: &str, options: ActionOptions) -> Result<(&'static str, String)> {
		let target = options
			.target
			.or_else(|| self.controller.clone())
			.or_else(|| self.view.clone())
			.ok_or_else(|| CoreError::MissingCapability {
				capability: "action target",
				operation: format!("action '{}'", name),
			})?;
		let id = self.markers.register_action(ActionMarker {
			name: name.to_string(),
			event_type: options.on,
			target,
			bubbles: options.bubbles,
			params: options.params,
		});
		Ok((ACTION_ATTR, id.to_string()))
	}
}

/// Renders the current content of a binding.
pub(crate) fn render_binding_content(scope: &RenderScope<'_>, marker: &BindingMarker) -> Result<Page> {
	let value = match marker.path.resolve(&marker.root) {
		Ok(value) => value,
		Err(err) => {
			tracing::warn!(path = %marker.path, error = %err, "binding path did not resolve");
			Value::Null
		}
	};
	match &marker.render {
		Some(render) => {
			let this = marker.context.clone().unwrap_or_else(|| marker.root.clone());
			render(&mut scope.child(this), &value)
		}
		None => Ok(value.into_page()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use skull_core::{Class, Observable};

	fn controller() -> ObjectRef {
		let controller = Class::base().new_instance().unwrap();
		controller.set("title", "Heat").unwrap();
		controller
	}

	#[test]
	fn test_registry_lookup() {
		let registry = TemplateRegistry::new();
		registry.register("hello", |_| Ok(Page::text("hi")));
		let markers = MarkerRegistry::new();

		let render = registry.load("hello").unwrap();
		let page = render(&mut RenderScope::new(Value::Null, &markers)).unwrap();
		assert_eq!(page.render_to_string(), "hi");
		assert!(matches!(registry.load("nope"), Err(Error::TemplateNotFound(id)) if id == "nope"));
	}

	#[test]
	fn test_bind_renders_marked_span() {
		let markers = MarkerRegistry::new();
		let this = Value::map([("controller", Value::from(controller()))]);
		let mut scope = RenderScope::new(this, &markers);

		let page = scope.bind("controller.title").unwrap();
		assert_eq!(
			page.render_to_string(),
			r#"<span data-skull-binding="0">Heat</span>"#
		);
		assert!(markers.binding(0).is_some());
	}

	#[test]
	fn test_bind_with_custom_render_and_context() {
		let markers = MarkerRegistry::new();
		let this = Value::map([("controller", Value::from(controller()))]);
		let mut scope = RenderScope::new(this, &markers);

		let page = scope
			.bind_in("controller.title", Value::from("ctx"), |scope, value| {
				Ok(Page::text(format!("{}/{}", scope.this(), value)))
			})
			.unwrap();
		assert_eq!(
			page.render_to_string(),
			r#"<span data-skull-binding="0">ctx/Heat</span>"#
		);
	}

	#[test]
	fn test_unresolved_binding_renders_empty() {
		let markers = MarkerRegistry::new();
		let mut scope = RenderScope::new(Value::map([("controller", Value::Null)]), &markers);
		let page = scope.bind("controller.movie.title").unwrap();
		assert_eq!(page.render_to_string(), r#"<span data-skull-binding="0"></span>"#);
		assert!(scope.get("controller.movie").is_null());
		assert!(scope.try_get("controller.movie").is_err());
	}

	#[test]
	fn test_each_renders_empty_container() {
		let markers = MarkerRegistry::new();
		let mut scope = RenderScope::new(Value::Null, &markers);
		let page = scope.each("items", |item| Ok(item.this().into_page())).unwrap();
		assert_eq!(
			page.render_to_string(),
			r#"<div data-skull-collection="0"></div>"#
		);
	}

	#[test]
	fn test_action_target_precedence() {
		let markers = MarkerRegistry::new();
		let view = Class::base().new_instance().unwrap();
		let ctrl = controller();
		let custom = Class::base().new_instance().unwrap();

		let mut scope =
			RenderScope::new(Value::Null, &markers).with_view(view.clone(), Some(ctrl.clone()));
		let (_, first) = scope.action("a", ActionOptions::new()).unwrap();
		let (_, second) = scope
			.action("b", ActionOptions::new().target(custom.clone()).on("submit"))
			.unwrap();
		let mut view_only = RenderScope::new(Value::Null, &markers).with_view(view.clone(), None);
		let (attr, third) = view_only.action("c", ActionOptions::new()).unwrap();

		assert_eq!(attr, ACTION_ATTR);
		let first = markers.action(first.parse().unwrap()).unwrap();
		let second = markers.action(second.parse().unwrap()).unwrap();
		let third = markers.action(third.parse().unwrap()).unwrap();
		assert!(first.target.ptr_eq(&ctrl));
		assert!(second.target.ptr_eq(&custom));
		assert_eq!(second.event_type, "submit");
		assert!(third.target.ptr_eq(&view));
	}

	#[test]
	fn test_action_without_any_target_fails() {
		let markers = MarkerRegistry::new();
		let mut scope = RenderScope::new(Value::Null, &markers);
		assert!(matches!(
			scope.action("save", ActionOptions::new()),
			Err(Error::Core(CoreError::MissingCapability { .. }))
		));
	}
}
