//! Markup trees produced by templates.
//!
//! A template evaluates to a [`Page`]; the view hands it to the DOM
//! collaborator to build detached nodes. Marker attributes for actions,
//! bindings and collections are ordinary attributes on [`PageElement`]s.

use std::borrow::Cow;

use skull_core::Value;

/// Renderable content.
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
	/// An element.
	Element(PageElement),
	/// A text node.
	Text(Cow<'static, str>),
	/// Several siblings without a wrapper element.
	Fragment(Vec<Page>),
	/// Nothing.
	Empty,
}

/// An element in a markup tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PageElement {
	tag: Cow<'static, str>,
	attrs: Vec<(Cow<'static, str>, Cow<'static, str>)>,
	children: Vec<Page>,
	is_void: bool,
}

impl PageElement {
	/// Creates an element.
	pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
		let tag = tag.into();
		let is_void = matches!(
			tag.as_ref(),
			"area"
				| "base" | "br"
				| "col" | "embed"
				| "hr" | "img"
				| "input" | "link"
				| "meta" | "source"
				| "track" | "wbr"
		);
		Self {
			tag,
			attrs: Vec::new(),
			children: Vec::new(),
			is_void,
		}
	}

	/// Adds an attribute.
	pub fn attr(
		mut self,
		name: impl Into<Cow<'static, str>>,
		value: impl Into<Cow<'static, str>>,
	) -> Self {
		self.attrs.push((name.into(), value.into()));
		self
	}

	/// Adds an attribute given as a `(name, value)` pair, e.g. an action marker.
	pub fn attr_pair(self, (name, value): (&'static str, String)) -> Self {
		self.attr(name, value)
	}

	/// Adds a child.
	pub fn child(mut self, child: impl IntoPage) -> Self {
		self.children.push(child.into_page());
		self
	}

	/// Adds several children.
	pub fn children(mut self, children: impl IntoIterator<Item = impl IntoPage>) -> Self {
		self.children
			.extend(children.into_iter().map(|c| c.into_page()));
		self
	}

	/// Tag name.
	pub fn tag_name(&self) -> &str {
		&self.tag
	}

	/// Attributes in insertion order.
	pub fn attrs(&self) -> &[(Cow<'static, str>, Cow<'static, str>)] {
		&self.attrs
	}

	/// Value of the first attribute named `name`.
	pub fn get_attr(&self, name: &str) -> Option<&str> {
		self.attrs
			.iter()
			.find(|(n, _)| n == name)
			.map(|(_, v)| v.as_ref())
	}

	/// Children.
	pub fn child_views(&self) -> &[Page] {
		&self.children
	}

	/// Whether the element has no closing tag.
	pub fn is_void(&self) -> bool {
		self.is_void
	}
}

impl Page {
	/// Creates an element.
	pub fn element(tag: impl Into<Cow<'static, str>>) -> PageElement {
		PageElement::new(tag)
	}

	/// Creates a text node.
	pub fn text(content: impl Into<Cow<'static, str>>) -> Self {
		Self::Text(content.into())
	}

	/// Creates a fragment.
	pub fn fragment(children: impl IntoIterator<Item = impl IntoPage>) -> Self {
		Self::Fragment(children.into_iter().map(|c| c.into_page()).collect())
	}

	/// Creates empty content.
	pub fn empty() -> Self {
		Self::Empty
	}

	/// Serializes the tree to HTML.
	pub fn render_to_string(&self) -> String {
		let mut output = String::new();
		self.render_into(&mut output);
		output
	}

	fn render_into(&self, output: &mut String) {
		match self {
			Page::Element(el) => {
				output.push('<');
				output.push_str(el.tag_name());
				for (name, value) in el.attrs() {
					output.push(' ');
					output.push_str(name);
					output.push_str("=\"");
					output.push_str(&html_escape(value));
					output.push('"');
				}
				if el.is_void() {
					output.push_str(" />");
				} else {
					output.push('>');
					for child in el.child_views() {
						child.render_into(output);
					}
					output.push_str("</");
					output.push_str(el.tag_name());
					output.push('>');
				}
			}
			Page::Text(text) => output.push_str(&html_escape(text)),
			Page::Fragment(children) => {
				for child in children {
					child.render_into(output);
				}
			}
			Page::Empty => {}
		}
	}
}

/// Escapes `&`, `<`, `>`, `"` and `'`.
pub fn html_escape(s: &str) -> Cow<'_, str> {
	if s.contains(['&', '<', '>', '"', '\'']) {
		let mut escaped = String::with_capacity(s.len() + 8);
		for c in s.chars() {
			match c {
				'&' => escaped.push_str("&amp;"),
				'<' => escaped.push_str("&lt;"),
				'>' => escaped.push_str("&gt;"),
				'"' => escaped.push_str("&quot;"),
				'\'' => escaped.push_str("&#x27;"),
				_ => escaped.push(c),
			}
		}
		Cow::Owned(escaped)
	} else {
		Cow::Borrowed(s)
	}
}

/// Conversion into a [`Page`].
pub trait IntoPage {
	/// Converts self into a Page.
	fn into_page(self) -> Page;
}

impl IntoPage for Page {
	fn into_page(self) -> Page {
		self
	}
}

impl IntoPage for PageElement {
	fn into_page(self) -> Page {
		Page::Element(self)
	}
}

impl IntoPage for String {
	fn into_page(self) -> Page {
		Page::Text(Cow::Owned(self))
	}
}

impl IntoPage for &'static str {
	fn into_page(self) -> Page {
		Page::Text(Cow::Borrowed(self))
	}
}

impl IntoPage for Value {
	fn into_page(self) -> Page {
		Page::Text(Cow::Owned(self.to_string()))
	}
}

impl IntoPage for &Value {
	fn into_page(self) -> Page {
		Page::Text(Cow::Owned(self.to_string()))
	}
}

impl<T: IntoPage> IntoPage for Option<T> {
	fn into_page(self) -> Page {
		match self {
			Some(v) => v.into_page(),
			None => Page::Empty,
		}
	}
}

impl<T: IntoPage> IntoPage for Vec<T> {
	fn into_page(self) -> Page {
		Page::Fragment(self.into_iter().map(|v| v.into_page()).collect())
	}
}

impl IntoPage for () {
	fn into_page(self) -> Page {
		Page::Empty
	}
}
