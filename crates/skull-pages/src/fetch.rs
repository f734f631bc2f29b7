//! The fetch collaborator.
//!
//! A [`FetchProvider`] turns a [`FetchRequest`] into a [`PendingFetch`]: a
//! settle-once handle with success and failure continuations. Callbacks
//! registered before settling run when the fetch settles; callbacks
//! registered afterwards run immediately. Settling releases every callback.
//!
//! [`MockFetcher`] records requests and leaves settling to the caller.
//! With the `http` feature, `HttpFetcher` performs real requests with
//! reqwest on a tokio runtime and settles them on the caller's thread.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use thiserror::Error;

/// Fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FetchError {
	/// The server answered with a non-success status.
	#[error("request to {url} failed with status {status}")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Requested URL.
		url: String,
	},

	/// The request could not be sent or the response not received.
	#[error("transport error: {0}")]
	Transport(String),

	/// The response body is not valid JSON.
	#[error("invalid response body: {0}")]
	Decode(String),

	/// The query could not be encoded.
	#[error("invalid query: {0}")]
	Encode(String),
}

/// HTTP method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMethod {
	/// GET.
	#[default]
	Get,
	/// POST.
	Post,
	/// PUT.
	Put,
	/// DELETE.
	Delete,
}

/// A request handed to a [`FetchProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
	/// Method.
	pub method: FetchMethod,
	/// URL without the query string.
	pub url: String,
	/// Encoded query string, without `?`.
	pub query: Option<String>,
	/// JSON body.
	pub body: Option<serde_json::Value>,
}

impl FetchRequest {
	/// A GET request.
	pub fn get(url: impl Into<String>) -> Self {
		Self {
			method: FetchMethod::Get,
			url: url.into(),
			query: None,
			body: None,
		}
	}

	/// Sets the query string from any serializable key/value structure.
	pub fn with_query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self, FetchError> {
		let encoded =
			serde_urlencoded::to_string(query).map_err(|e| FetchError::Encode(e.to_string()))?;
		self.query = (!encoded.is_empty()).then_some(encoded);
		Ok(self)
	}

	/// Sets method and JSON body.
	pub fn with_body(mut self, method: FetchMethod, body: serde_json::Value) -> Self {
		self.method = method;
		self.body = Some(body);
		self
	}

	/// URL including the query string.
	pub fn full_url(&self) -> String {
		match &self.query {
			Some(query) if self.url.contains('?') => format!("{}&{}", self.url, query),
			Some(query) => format!("{}?{}", self.url, query),
			None => self.url.clone(),
		}
	}
}

type SuccessCallback = Box<dyn FnOnce(&serde_json::Value) -> skull_core::Result<()>>;
type FailureCallback = Box<dyn FnOnce(&FetchError) -> skull_core::Result<()>>;

enum FetchState {
	Pending,
	Resolved(serde_json::Value),
	Rejected(FetchError),
}

struct PendingInner {
	request: FetchRequest,
	state: RefCell<FetchState>,
	on_success: RefCell<Vec<SuccessCallback>>,
	on_failure: RefCell<Vec<FailureCallback>>,
}

/// Handle to an in-flight fetch.
#[derive(Clone)]
pub struct PendingFetch(Rc<PendingInner>);

impl PendingFetch {
	/// A pending handle for `request`.
	pub fn new(request: FetchRequest) -> Self {
		Self(Rc::new(PendingInner {
			request,
			state: RefCell::new(FetchState::Pending),
			on_success: RefCell::new(Vec::new()),
			on_failure: RefCell::new(Vec::new()),
		}))
	}

	/// The originating request.
	pub fn request(&self) -> &FetchRequest {
		&self.0.request
	}

	/// Whether the fetch has not settled yet.
	pub fn is_pending(&self) -> bool {
		matches!(*self.0.state.borrow(), FetchState::Pending)
	}

	/// Whether both handles refer to the same fetch.
	pub fn ptr_eq(&self, other: &PendingFetch) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Registers the success continuation.
	pub fn on_success<F>(&self, callback: F) -> skull_core::Result<()>
	where
		F: FnOnce(&serde_json::Value) -> skull_core::Result<()> + 'static,
	{
		let resolved = match &*self.0.state.borrow() {
			FetchState::Pending => None,
			FetchState::Resolved(json) => Some(json.clone()),
			FetchState::Rejected(_) => return Ok(()),
		};
		match resolved {
			Some(json) => callback(&json),
			None => {
				self.0.on_success.borrow_mut().push(Box::new(callback));
				Ok(())
			}
		}
	}

	/// Registers the failure continuation.
	pub fn on_failure<F>(&self, callback: F) -> skull_core::Result<()>
	where
		F: FnOnce(&FetchError) -> skull_core::Result<()> + 'static,
	{
		let rejected = match &*self.0.state.borrow() {
			FetchState::Pending => None,
			FetchState::Rejected(err) => Some(err.clone()),
			FetchState::Resolved(_) => return Ok(()),
		};
		match rejected {
			Some(err) => callback(&err),
			None => {
				self.0.on_failure.borrow_mut().push(Box::new(callback));
				Ok(())
			}
		}
	}

	/// Settles successfully. Later settle calls are ignored.
	pub fn resolve(&self, json: serde_json::Value) -> skull_core::Result<()> {
		if !self.is_pending() {
			tracing::warn!(url = %self.0.request.url, "ignoring resolve of a settled fetch");
			return Ok(());
		}
		*self.0.state.borrow_mut() = FetchState::Resolved(json.clone());
		let callbacks = std::mem::take(&mut *self.0.on_success.borrow_mut());
		self.0.on_failure.borrow_mut().clear();

		tracing::debug!(url = %self.0.request.url, callbacks = callbacks.len(), "fetch resolved");
		for callback in callbacks {
			callback(&json)?;
		}
		Ok(())
	}

	/// Settles with a failure. Later settle calls are ignored.
	pub fn reject(&self, err: FetchError) -> skull_core::Result<()> {
		if !self.is_pending() {
			tracing::warn!(url = %self.0.request.url, "ignoring reject of a settled fetch");
			return Ok(());
		}
		*self.0.state.borrow_mut() = FetchState::Rejected(err.clone());
		let callbacks = std::mem::take(&mut *self.0.on_failure.borrow_mut());
		self.0.on_success.borrow_mut().clear();

		if callbacks.is_empty() {
			tracing::warn!(url = %self.0.request.url, error = %err, "fetch failed with no failure handler");
		}
		for callback in callbacks {
			callback(&err)?;
		}
		Ok(())
	}
}

impl fmt::Debug for PendingFetch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = match &*self.0.state.borrow() {
			FetchState::Pending => "pending",
			FetchState::Resolved(_) => "resolved",
			FetchState::Rejected(_) => "rejected",
		};
		f.debug_struct("PendingFetch")
			.field("url", &self.0.request.full_url())
			.field("state", &state)
			.finish()
	}
}

/// Performs fetches.
pub trait FetchProvider {
	/// Starts `request`.
	fn fetch(&self, request: FetchRequest) -> PendingFetch;
}

/// Records requests; tests settle them explicitly, oldest first.
#[derive(Debug, Default)]
pub struct MockFetcher {
	requests: RefCell<Vec<FetchRequest>>,
	pending: RefCell<VecDeque<PendingFetch>>,
}

impl MockFetcher {
	/// Creates an empty mock.
	pub fn new() -> Self {
		Self::default()
	}

	/// Every request received so far.
	pub fn requests(&self) -> Vec<FetchRequest> {
		self.requests.borrow().clone()
	}

	/// Number of unsettled fetches.
	pub fn pending_count(&self) -> usize {
		self.pending.borrow().len()
	}

	/// Removes the oldest unsettled fetch.
	pub fn take_next(&self) -> Option<PendingFetch> {
		self.pending.borrow_mut().pop_front()
	}

	/// Resolves the oldest unsettled fetch.
	pub fn resolve_next(&self, json: serde_json::Value) -> skull_core::Result<()> {
		self.take_next()
			.ok_or_else(|| skull_core::Error::custom("no pending fetch to resolve"))?
			.resolve(json)
	}

	/// Rejects the oldest unsettled fetch.
	pub fn reject_next(&self, err: FetchError) -> skull_core::Result<()> {
		self.take_next()
			.ok_or_else(|| skull_core::Error::custom("no pending fetch to reject"))?
			.reject(err)
	}

	/// Resolves the oldest unsettled fetch of `url` (query included).
	pub fn resolve_url(&self, url: &str, json: serde_json::Value) -> skull_core::Result<()> {
		let position = self
			.pending
			.borrow()
			.iter()
			.position(|pending| pending.request().full_url() == url);
		let pending = position
			.and_then(|index| self.pending.borrow_mut().remove(index))
			.ok_or_else(|| skull_core::Error::custom(format!("no pending fetch for {}", url)))?;
		pending.resolve(json)
	}
}

impl FetchProvider for MockFetcher {
	fn fetch(&self, request: FetchRequest) -> PendingFetch {
		tracing::debug!(url = %request.full_url(), "mock fetch");
		self.requests.borrow_mut().push(request.clone());
		let pending = PendingFetch::new(request);
		self.pending.borrow_mut().push_back(pending.clone());
		pending
	}
}

#[cfg(feature = "http")]
pub use http::HttpFetcher;

#[cfg(feature = "http")]
mod http {
	use std::cell::{Cell, RefCell};
	use std::collections::HashMap;

	use tokio::runtime::Runtime;
	use tokio::sync::mpsc;

	use super::{FetchError, FetchMethod, FetchProvider, FetchRequest, PendingFetch};

	type Completion = (u64, Result<serde_json::Value, FetchError>);

	/// Network fetches with reqwest.
	///
	/// Requests run on an internal tokio runtime. Completions are queued and
	/// settled on the owning thread by [`poll`](Self::poll) or
	/// [`wait`](Self::wait), keeping every callback single-threaded.
	pub struct HttpFetcher {
		client: reqwest::Client,
		runtime: Runtime,
		sender: mpsc::UnboundedSender<Completion>,
		receiver: RefCell<mpsc::UnboundedReceiver<Completion>>,
		in_flight: RefCell<HashMap<u64, PendingFetch>>,
		next_id: Cell<u64>,
	}

	impl HttpFetcher {
		/// Creates a fetcher with its own runtime.
		pub fn new() -> Result<Self, FetchError> {
			let runtime = tokio::runtime::Builder::new_multi_thread()
				.worker_threads(1)
				.enable_all()
				.build()
				.map_err(|e| FetchError::Transport(e.to_string()))?;
			let (sender, receiver) = mpsc::unbounded_channel();
			Ok(Self {
				client: reqwest::Client::new(),
				runtime,
				sender,
				receiver: RefCell::new(receiver),
				in_flight: RefCell::new(HashMap::new()),
				next_id: Cell::new(0),
			})
		}

		/// Number of fetches not yet settled.
		pub fn in_flight(&self) -> usize {
			self.in_flight.borrow().len()
		}

		/// Settles every completion received so far. Returns how many settled.
		pub fn poll(&self) -> usize {
			let mut settled = 0;
			loop {
				let next = self.receiver.borrow_mut().try_recv();
				match next {
					Ok(completion) => {
						self.settle(completion);
						settled += 1;
					}
					Err(_) => return settled,
				}
			}
		}

		/// Blocks until every in-flight fetch has settled.
		pub fn wait(&self) {
			while self.in_flight() > 0 {
				let next = self
					.runtime
					.block_on(async { self.receiver.borrow_mut().recv().await });
				match next {
					Some(completion) => self.settle(completion),
					None => return,
				}
			}
		}

		fn settle(&self, (id, result): Completion) {
			let Some(pending) = self.in_flight.borrow_mut().remove(&id) else {
				return;
			};
			let outcome = match result {
				Ok(json) => pending.resolve(json),
				Err(err) => pending.reject(err),
			};
			if let Err(err) = outcome {
				tracing::error!(url = %pending.request().full_url(), error = %err, "fetch callback failed");
			}
		}
	}

	async fn perform(
		client: reqwest::Client,
		method: FetchMethod,
		url: String,
		body: Option<serde_json::Value>,
	) -> Result<serde_json::Value, FetchError> {
		let method = match method {
			FetchMethod::Get => reqwest::Method::GET,
			FetchMethod::Post => reqwest::Method::POST,
			FetchMethod::Put => reqwest::Method::PUT,
			FetchMethod::Delete => reqwest::Method::DELETE,
		};
		let mut builder = client.request(method, &url);
		if let Some(body) = &body {
			builder = builder.json(body);
		}
		let response = builder
			.send()
			.await
			.map_err(|e| FetchError::Transport(e.to_string()))?;
		if !response.status().is_success() {
			return Err(FetchError::Status {
				status: response.status().as_u16(),
				url,
			});
		}
		response
			.json::<serde_json::Value>()
			.await
			.map_err(|e| FetchError::Decode(e.to_string()))
	}

	impl FetchProvider for HttpFetcher {
		fn fetch(&self, request: FetchRequest) -> PendingFetch {
			let id = self.next_id.get();
			self.next_id.set(id + 1);
			let pending = PendingFetch::new(request.clone());
			self.in_flight.borrow_mut().insert(id, pending.clone());

			let client = self.client.clone();
			let sender = self.sender.clone();
			let url = request.full_url();
			tracing::debug!(url = %url, "http fetch");
			self.runtime.spawn(async move {
				let result = perform(client, request.method, url, request.body).await;
				// the receiver only goes away with the fetcher
				let _ = sender.send((id, result));
			});
			pending
		}
	}
}
