//! The store: issues fetches for models and hands back observable results.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use skull_core::Value;

use crate::error::Result;
use crate::fetch::{FetchProvider, FetchRequest};
use crate::model::{Model, Record, RecordArray};

/// Result of [`Store::find`].
#[derive(Debug, Clone)]
pub enum Found {
	/// One record, when an id was given.
	Record(Record),
	/// All records, when no id was given.
	Records(RecordArray),
}

impl Found {
	/// The record, if this is one.
	pub fn into_record(self) -> Option<Record> {
		match self {
			Found::Record(record) => Some(record),
			Found::Records(_) => None,
		}
	}

	/// The record array, if this is one.
	pub fn into_records(self) -> Option<RecordArray> {
		match self {
			Found::Records(records) => Some(records),
			Found::Record(_) => None,
		}
	}
}

impl From<Found> for Value {
	fn from(found: Found) -> Self {
		match found {
			Found::Record(record) => record.into(),
			Found::Records(records) => records.into(),
		}
	}
}

/// Model lookups over a [`FetchProvider`].
pub struct Store {
	fetcher: Rc<dyn FetchProvider>,
	base_url: Option<String>,
}

impl Store {
	/// Creates a store.
	pub fn new(fetcher: Rc<dyn FetchProvider>) -> Self {
		Self {
			fetcher,
			base_url: None,
		}
	}

	/// Prefixes relative model URLs with `base_url`.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = Some(base_url.into());
		self
	}

	/// The configured base URL.
	pub fn base_url(&self) -> Option<&str> {
		self.base_url.as_deref()
	}

	fn absolute(&self, url: &str) -> String {
		match &self.base_url {
			Some(base) if !url.contains("://") => {
				format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
			}
			_ => url.to_string(),
		}
	}

	/// One record when `id` is given, otherwise [`find_all`](Self::find_all).
	pub fn find(&self, model: &dyn Model, id: Option<&str>) -> Result<Found> {
		match id {
			Some(id) => Ok(Found::Record(self.find_record(model, id)?)),
			None => Ok(Found::Records(self.find_all(model)?)),
		}
	}

	/// Fetches the record `id` of `model`.
	pub fn find_record(&self, model: &dyn Model, id: &str) -> Result<Record> {
		let url = self.absolute(&model.record_url(id));
		tracing::debug!(model = model.name(), id, url = %url, "finding record");
		let pending = self.fetcher.fetch(FetchRequest::get(url));
		Record::from_fetch(&model.record_class(), &pending)
	}

	/// Fetches every record of `model`.
	pub fn find_all(&self, model: &dyn Model) -> Result<RecordArray> {
		let url = self.absolute(model.url());
		tracing::debug!(model = model.name(), url = %url, "finding all records");
		RecordArray::from_fetch(&self.fetcher.fetch(FetchRequest::get(url)))
	}

	/// Fetches the records of `model` matching `query`.
	pub fn find_query<Q: Serialize + ?Sized>(&self, model: &dyn Model, query: &Q) -> Result<RecordArray> {
		let request = FetchRequest::get(self.absolute(model.url())).with_query(query)?;
		tracing::debug!(model = model.name(), url = %request.full_url(), "querying records");
		RecordArray::from_fetch(&self.fetcher.fetch(request))
	}
}

impl fmt::Debug for Store {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Store")
			.field("base_url", &self.base_url)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fetch::MockFetcher;
	use crate::model::Resource;
	use serde_json::json;

	fn store() -> (Rc<MockFetcher>, Store) {
		let fetcher = Rc::new(MockFetcher::new());
		(fetcher.clone(), Store::new(fetcher))
	}

	#[test]
	fn test_find_with_and_without_id() {
		let (fetcher, store) = store();
		let movies = Resource::new("Movie", "/movies.json").with_record_url("/movies/{id}.json");

		let record = store.find(&movies, Some("7")).unwrap().into_record().unwrap();
		let all = store.find(&movies, None).unwrap().into_records().unwrap();

		let urls: Vec<String> = fetcher.requests().iter().map(FetchRequest::full_url).collect();
		assert_eq!(urls, vec!["/movies/7.json", "/movies.json"]);
		assert!(!record.is_loaded());
		assert!(!all.is_loaded());
	}

	#[test]
	fn test_find_query_encodes_params() {
		let (fetcher, store) = store();
		let reviews = Resource::new("Review", "/reviews.json");
		store.find_query(&reviews, &[("movie_id", "7")]).unwrap();
		assert_eq!(fetcher.requests()[0].full_url(), "/reviews.json?movie_id=7");
	}

	#[test]
	fn test_base_url_prefixes_relative_urls() {
		let fetcher = Rc::new(MockFetcher::new());
		let store = Store::new(fetcher.clone()).with_base_url("https://api.example.com/");
		store.find_all(&Resource::new("Movie", "/movies.json")).unwrap();
		store
			.find_all(&Resource::new("Other", "http://other.example.com/x.json"))
			.unwrap();

		let urls: Vec<String> = fetcher.requests().iter().map(FetchRequest::full_url).collect();
		assert_eq!(
			urls,
			vec!["https://api.example.com/movies.json", "http://other.example.com/x.json"]
		);
	}

	#[test]
	fn test_failed_fetch_stays_unloaded() {
		let (fetcher, store) = store();
		let all = store.find_all(&Resource::new("Movie", "/movies.json")).unwrap();
		fetcher
			.reject_next(crate::fetch::FetchError::Status {
				status: 500,
				url: "/movies.json".to_string(),
			})
			.unwrap();
		assert!(!all.is_loaded());
		fetcher.resolve_next(json!([])).unwrap_err();
	}
}
