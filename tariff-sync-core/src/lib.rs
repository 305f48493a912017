#![doc = "tariff-sync-core: duty-rate resolution and synchronisation engine."]

//! This crate holds the lookup adapters, the measure resolver, the orchestrator and the
//! row store client. The CLI crate only parses arguments, loads configuration and wires
//! concrete clients into [`synchronise::synchronise`].
//!
//! # Usage
//! Build a [`config::RegimeConfig`], pick a [`contract::RateSource`] and a
//! [`contract::DutyRateStore`], and call [`synchronise::synchronise`].

pub mod catalog;
pub mod config;
pub mod contract;
pub mod error;
pub mod http;
pub mod model;
pub mod probe;
pub mod resolve;
pub mod store;
pub mod synchronise;
pub mod taric;
pub mod wove;
