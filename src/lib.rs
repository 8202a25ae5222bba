//! Configuration-driven RSS/Atom feed aggregator.
//!
//! A declarative list of feed groups (see [`config`]) is fetched
//! concurrently ([`feed::fetch_all`]), parsed and keyword-filtered
//! ([`feed::parse_and_filter`]), joined per group ([`aggregator`]), and
//! rendered to one normalized Atom-shaped XML file per group ([`writer`]).
//! [`pipeline`] wires one pass of that sequence together against a shared
//! conditional-GET cache ([`storage`]); [`scheduler`] drives repeated passes
//! on a fixed interval.

pub mod aggregator;
pub mod config;
pub mod feed;
pub mod pipeline;
pub mod scheduler;
pub mod storage;
pub mod util;
pub mod writer;
