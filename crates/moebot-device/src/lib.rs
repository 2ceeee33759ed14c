//! Device client interface for MoeBot mowers
//!
//! The wire protocol lives in an external client; this crate only describes
//! what the integration needs from it ([`MoebotClient`], [`Connector`]) and
//! provides the [`UpdateBus`] clients use to fan out push notifications.
//!
//! [`sim::SimulatedMower`] implements the interface in memory. It backs the
//! test suites and the server's demo mode.

mod bus;
mod client;
pub mod sim;

pub use bus::{ListenerId, Subscription, UpdateBus};
pub use client::{ConnectionParams, Connector, MoebotClient, SharedClient};
