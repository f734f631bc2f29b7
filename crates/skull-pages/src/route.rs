//! Routes: the unit tying a URL match to a controller and a view.
//!
//! A [`RouteClass`] declares which controller and view classes a match
//! instantiates and optionally overrides the `setup` and `execute` hooks.
//! Every match creates a fresh [`Route`] with its own controller and view;
//! nothing is pooled across navigations.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use skull_core::{Class, ObjectRef, Overrides, Value};

use crate::app::Application;
use crate::error::Result;
use crate::view::View;

/// `setup` / `execute` override, called with the captured parameters.
pub type RouteHook = Rc<dyn Fn(&Route, &Application, &[Option<String>]) -> Result<()>>;

thread_local! {
	static CONTROLLER_CLASS: Rc<Class> = Class::extend(&Class::base(), "Controller").build();
}

/// Base class for controllers.
pub struct Controller;

impl Controller {
	/// The shared `Controller` class.
	pub fn class() -> Rc<Class> {
		CONTROLLER_CLASS.with(Rc::clone)
	}
}

/// A route declaration.
pub struct RouteClass {
	name: String,
	parent: Option<Rc<RouteClass>>,
	controller: Option<Rc<Class>>,
	view: Option<Rc<Class>>,
	setup: Option<RouteHook>,
	execute: Option<RouteHook>,
}

impl RouteClass {
	/// Starts a route declaration.
	pub fn builder(name: impl Into<String>) -> RouteClassBuilder {
		RouteClassBuilder {
			class: RouteClass {
				name: name.into(),
				parent: None,
				controller: None,
				view: None,
				setup: None,
				execute: None,
			},
		}
	}

	/// Starts a declaration inheriting everything from `parent`.
	pub fn extend(parent: &Rc<RouteClass>, name: impl Into<String>) -> RouteClassBuilder {
		RouteClassBuilder {
			class: RouteClass {
				name: name.into(),
				parent: Some(parent.clone()),
				controller: parent.controller.clone(),
				view: parent.view.clone(),
				setup: parent.setup.clone(),
				execute: parent.execute.clone(),
			},
		}
	}

	/// Route class name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Whether `self` is `other` or derives from it.
	pub fn is_subclass_of(self: &Rc<Self>, other: &Rc<RouteClass>) -> bool {
		let mut current = Some(self.clone());
		while let Some(class) = current {
			if Rc::ptr_eq(&class, other) {
				return true;
			}
			current = class.parent.clone();
		}
		false
	}

	/// Creates an initialized route: controller first, then the view with
	/// the controller as its `controller` property.
	pub fn instantiate(self: &Rc<Self>, app: &Application) -> Result<Rc<Route>> {
		let controller = match &self.controller {
			Some(class) => Some(class.new_instance()?),
			None => None,
		};
		let view = match &self.view {
			Some(class) => {
				let object = class.create(
					Overrides::new().property("controller", Value::from(controller.clone())),
				)?;
				Some(View::new(object, app)?)
			}
			None => None,
		};
		let route = Route {
			class: self.clone(),
			controller,
			view,
			state: Cell::new(RouteState::Initialized),
		};
		tracing::debug!(route = %self.name, "route initialized");
		Ok(Rc::new(route))
	}
}

impl fmt::Debug for RouteClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteClass")
			.field("name", &self.name)
			.field("controller", &self.controller.as_ref().map(|c| c.name().to_string()))
			.field("view", &self.view.as_ref().map(|c| c.name().to_string()))
			.field("custom_setup", &self.setup.is_some())
			.field("custom_execute", &self.execute.is_some())
			.finish()
	}
}

/// Builder returned by [`RouteClass::builder`] and [`RouteClass::extend`].
pub struct RouteClassBuilder {
	class: RouteClass,
}

impl RouteClassBuilder {
	/// Controller class instantiated per match.
	pub fn controller(mut self, class: Rc<Class>) -> Self {
		self.class.controller = Some(class);
		self
	}

	/// View class instantiated per match.
	pub fn view(mut self, class: Rc<Class>) -> Self {
		self.class.view = Some(class);
		self
	}

	/// Hook run before rendering.
	pub fn setup<F>(mut self, hook: F) -> Self
	where
		F: Fn(&Route, &Application, &[Option<String>]) -> Result<()> + 'static,
	{
		self.class.setup = Some(Rc::new(hook));
		self
	}

	/// Replaces the whole `execute` step, e.g. to redirect.
	pub fn execute<F>(mut self, hook: F) -> Self
	where
		F: Fn(&Route, &Application, &[Option<String>]) -> Result<()> + 'static,
	{
		self.class.execute = Some(Rc::new(hook));
		self
	}

	/// Finishes the declaration.
	pub fn build(self) -> Rc<RouteClass> {
		Rc::new(self.class)
	}
}

/// Lifecycle of a [`Route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
	/// Controller and view exist.
	Initialized,
	/// `execute` is running.
	Executing,
	/// The view was rendered.
	Rendered,
	/// A custom `execute` returned without rendering.
	Completed,
}

/// A matched route instance.
pub struct Route {
	class: Rc<RouteClass>,
	controller: Option<ObjectRef>,
	view: Option<View>,
	state: Cell<RouteState>,
}

impl Route {
	/// The declaring class.
	pub fn class(&self) -> &Rc<RouteClass> {
		&self.class
	}

	/// Route class name.
	pub fn name(&self) -> &str {
		self.class.name()
	}

	/// Whether this route was created from `class` or a subclass of it.
	pub fn is_instance_of(&self, class: &Rc<RouteClass>) -> bool {
		self.class.is_subclass_of(class)
	}

	/// The controller, if declared.
	pub fn controller(&self) -> Option<&ObjectRef> {
		self.controller.as_ref()
	}

	/// The view, if declared.
	pub fn view(&self) -> Option<&View> {
		self.view.as_ref()
	}

	/// Current lifecycle state.
	pub fn state(&self) -> RouteState {
		self.state.get()
	}

	/// Runs the `execute` override, or [`execute_default`](Self::execute_default).
	pub fn execute(&self, app: &Application, params: &[Option<String>]) -> Result<()> {
		self.state.set(RouteState::Executing);
		tracing::debug!(route = %self.name(), ?params, "executing route");
		match self.class.execute.clone() {
			Some(hook) => {
				hook(self, app, params)?;
				if self.state.get() == RouteState::Executing {
					self.state.set(RouteState::Completed);
				}
				Ok(())
			}
			None => self.execute_default(app, params),
		}
	}

	/// Calls [`setup`](Self::setup), then renders the view if there is one.
	pub fn execute_default(&self, app: &Application, params: &[Option<String>]) -> Result<()> {
		self.setup(app, params)?;
		match &self.view {
			Some(view) => {
				view.render()?;
				self.state.set(RouteState::Rendered);
			}
			None => self.state.set(RouteState::Completed),
		}
		Ok(())
	}

	/// Runs the `setup` override; the default does nothing.
	pub fn setup(&self, app: &Application, params: &[Option<String>]) -> Result<()> {
		match self.class.setup.clone() {
			Some(hook) => hook(self, app, params),
			None => Ok(()),
		}
	}
}

impl fmt::Debug for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("class", &self.class.name)
			.field("state", &self.state.get())
			.field("controller", &self.controller)
			.field("view", &self.view)
			.finish()
	}
}
