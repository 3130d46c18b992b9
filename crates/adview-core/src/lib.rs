//! Client-side core of the ad-view reward platform.
//!
//! Everything here is host-agnostic: storage, clocks and the network sit behind
//! traits so the same watch timer, response cache and balance ledger run in the
//! browser build and in the terminal simulator. All state is single-threaded
//! (`Rc`/`RefCell`), matching the event-loop model of the hosts.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod ledger;
pub mod profile;
pub mod queue;
pub mod reward;
pub mod store;
pub mod timer;
pub mod types;
