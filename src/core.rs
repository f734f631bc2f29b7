//! Object model module.
//!
//! Classes, objects, events, observation, array proxies and property paths.
//!
//! # Examples
//!
//! ```rust
//! use skull::core::{Class, Observable};
//!
//! let movie = Class::base().new_instance().unwrap();
//! movie.set("title", "Heat").unwrap();
//! assert_eq!(movie.get("title").as_str(), Some("Heat"));
//! ```

pub use skull_core::*;
