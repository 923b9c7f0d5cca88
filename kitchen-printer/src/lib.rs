//! # kitchen-printer
//!
//! Turns text into ESC/POS bytes and delivers them. It has no notion of
//! tickets, stations or stores; the print agent decides what goes on paper.
//!
//! - [`EscPosBuilder`] and [`Profile`] for HRPT and Epson command dialects
//! - [`TextEncoding`] for UTF-8 pass-through or GBK conversion
//! - [`NetworkPrinter`] (raw TCP with a reachability probe) and
//!   [`SpoolerPrinter`] (`lp`/`lpr`) behind the [`Printer`] trait
//!
//! ```ignore
//! use kitchen_printer::{EscPosBuilder, NetworkPrinter, Printer, Profile};
//!
//! let mut ticket = EscPosBuilder::new(32).with_profile(Profile::Epson);
//! ticket.center().bold().line("BAR").bold_off();
//! ticket.left().line("2x Es Teh Manis");
//! ticket.cut();
//!
//! NetworkPrinter::new("10.0.0.31", 9100)?.print(&ticket.build()).await?;
//! ```

mod encoding;
mod error;
mod escpos;
mod printer;

pub use encoding::{TextEncoding, convert_to_gbk, pad_right, text_width};
pub use error::{PrintError, PrintResult};
pub use escpos::{EscPosBuilder, Profile};
pub use printer::{DEFAULT_PORT, NetworkPrinter, Printer, SpoolerPrinter};
