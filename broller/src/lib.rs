//! Fetches b-roll footage, music, gifs, photos and icons by link.
//!
//! A request flows through the [`resolver`], the platform's catalog lookup,
//! the [`selector`], the [`fetcher`] into the [`cache`], the [`processor`]
//! and finally the [`publisher`]. Successful requests are credited in the
//! attribution ledger kept by [`credits`].

pub mod cache;
pub mod config;
pub mod credits;
pub mod error;
pub mod fetcher;
pub mod pipeline;
pub mod platforms;
pub mod processor;
pub mod publisher;
pub mod resolver;
pub mod selector;
pub mod timecode;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Outcome, Pipeline, Request};
pub use platforms::Mode;
