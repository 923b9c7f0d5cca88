//! Kitchen ticket printing
//!
//! - [`resolver`] picks the printer for a ticket
//! - [`renderer`] turns a ticket into ESC/POS bytes
//! - [`transport`] chooses how bytes reach a printer
//! - [`driver`] runs the ticket state machine
//! - [`poller`] is the claim-and-process loop
//! - [`printer_health`] probes printers in the background

pub mod driver;
pub mod error;
pub mod metrics;
pub mod poller;
pub mod printer_health;
pub mod renderer;
pub mod resolver;
pub mod transport;

pub use driver::{PrintDriver, TicketOutcome};
pub use error::PrintJobError;
pub use metrics::{AgentMetrics, MetricsSnapshot};
pub use poller::{PollerConfig, TicketPoller};
pub use printer_health::PrinterHealthSweep;
pub use renderer::{KitchenTicketRenderer, RenderError};
pub use transport::{Transport, TransportFactory};
