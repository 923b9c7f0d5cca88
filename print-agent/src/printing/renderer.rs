//! Kitchen ticket renderer
//!
//! Renders a claimed ticket into ESC/POS bytes. Rendering is pure: the clock
//! is passed in, so the same ticket and instant always give the same bytes.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use kitchen_printer::{EscPosBuilder, Profile, TextEncoding, pad_right};
use thiserror::Error;

use crate::db::models::{PrinterConfig, Ticket, TicketItem};

/// Column the `Time:` field starts at on the info line
const INFO_COLUMN: usize = 16;

/// Malformed ticket data; never retried
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("ticket has no items")]
    NoItems,

    #[error("item '{name}' has invalid quantity {quantity}")]
    InvalidQuantity { name: String, quantity: i64 },
}

/// Kitchen ticket renderer
#[derive(Debug, Clone)]
pub struct KitchenTicketRenderer {
    width: usize,
    timezone: Tz,
    profile: Profile,
    encoding: TextEncoding,
}

impl KitchenTicketRenderer {
    /// Create a renderer for a paper width (in characters) and display zone
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize, timezone: Tz) -> Self {
        Self {
            width,
            timezone,
            profile: Profile::default(),
            encoding: TextEncoding::default(),
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Renderer matching a printer row's width, profile and code page
    pub fn for_printer(printer: &PrinterConfig, timezone: Tz) -> Self {
        Self::new(printer.width(), timezone)
            .with_profile(printer.command_profile())
            .with_encoding(printer.text_encoding())
    }

    /// Render a ticket to ESC/POS bytes
    pub fn render(&self, ticket: &Ticket, now: DateTime<Utc>) -> Result<Vec<u8>, RenderError> {
        validate(&ticket.items)?;

        let mut b = EscPosBuilder::new(self.width)
            .with_profile(self.profile)
            .with_encoding(self.encoding);

        self.render_header(&mut b);
        self.render_info(&mut b, ticket, now);
        self.render_items(&mut b, &ticket.items);
        self.render_footer(&mut b, ticket);

        Ok(b.build())
    }

    fn render_header(&self, b: &mut EscPosBuilder) {
        // Double-size glyphs take two columns each
        let header_rule = self.width / 2;
        b.center();
        b.bold();
        b.double_size();
        b.rule('=', header_rule);
        b.line("KITCHEN ORDER");
        b.rule('=', header_rule);
        b.reset_size();
        b.bold_off();
        b.newline();
    }

    fn render_info(&self, b: &mut EscPosBuilder, ticket: &Ticket, now: DateTime<Utc>) {
        let table = non_empty(ticket.table_name.as_deref()).unwrap_or("N/A");
        let bill_number = non_empty(ticket.bill_number.as_deref()).unwrap_or("N/A");
        let time = now.with_timezone(&self.timezone).format("%H:%M");

        b.left();
        b.bold();
        b.line(&format!(
            "{}Time: {}",
            pad_right(&format!("Table: {}", table), INFO_COLUMN, self.encoding),
            time
        ));
        b.line(&format!("Order: #{}", bill_number));
        b.bold_off();
        b.newline();
    }

    fn render_items(&self, b: &mut EscPosBuilder, items: &[TicketItem]) {
        b.sep_single();
        b.bold();
        b.line("ITEMS:");
        b.bold_off();
        b.sep_single();

        for item in items {
            let name = non_empty(Some(item.name.as_str())).unwrap_or("Unknown");
            b.bold();
            b.line(&format!("{}x {}", item.quantity, name));
            b.bold_off();

            if let Some(notes) = item.notes.as_deref() {
                for note in notes.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    b.line(&format!("   {}", note));
                }
            }
            b.newline();
        }
    }

    fn render_footer(&self, b: &mut EscPosBuilder, ticket: &Ticket) {
        b.sep_double();
        b.line(&format!("Station: {}", ticket.station.to_uppercase()));
        if let Some(brand) = non_empty(ticket.brand_name.as_deref()) {
            b.line(&format!("Brand: {}", brand));
        }
        b.line(&format!("Ticket ID: #{}", ticket.id));
        b.sep_double();
        b.newline();
        b.newline();
        b.newline();
        b.cut();
    }
}

fn validate(items: &[TicketItem]) -> Result<(), RenderError> {
    if items.is_empty() {
        return Err(RenderError::NoItems);
    }
    if let Some(bad) = items.iter().find(|i| i.quantity <= 0) {
        return Err(RenderError::InvalidQuantity {
            name: bad.name.clone(),
            quantity: bad.quantity,
        });
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{TicketScope, TicketStatus};
    use chrono::TimeZone;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn ticket(items: Vec<TicketItem>) -> Ticket {
        Ticket {
            id: 16,
            bill_id: 4,
            station: "kitchen".into(),
            status: TicketStatus::Printing,
            print_attempts: 0,
            max_retries: 3,
            last_error: None,
            printer_id: None,
            created_at: 0,
            claimed_at: Some(0),
            printed_at: None,
            bill_number: Some("B-0042".into()),
            table_name: Some("T5".into()),
            brand_name: Some("Warung Pak Ali".into()),
            scope: TicketScope::default(),
            items,
        }
    }

    fn item(quantity: i64, name: &str, notes: Option<&str>) -> TicketItem {
        TicketItem {
            quantity,
            name: name.into(),
            notes: notes.map(String::from),
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 4, 30, 0).unwrap()
    }

    #[test]
    fn test_render_contains_item_line() {
        let renderer = KitchenTicketRenderer::new(32, Tz::UTC);
        let bytes = renderer
            .render(&ticket(vec![item(2, "Nasi Goreng", None)]), noon())
            .unwrap();
        assert!(contains(&bytes, b"2x Nasi Goreng\n"));
        assert!(contains(&bytes, b"KITCHEN ORDER\n"));
        assert!(contains(&bytes, b"Order: #B-0042\n"));
        assert!(contains(&bytes, b"Station: KITCHEN\n"));
        assert!(contains(&bytes, b"Brand: Warung Pak Ali\n"));
        assert!(contains(&bytes, b"Ticket ID: #16\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = KitchenTicketRenderer::new(32, Tz::UTC);
        let t = ticket(vec![item(2, "Nasi Goreng", Some("no chili")), item(1, "Teh Tarik", None)]);
        assert_eq!(renderer.render(&t, noon()).unwrap(), renderer.render(&t, noon()).unwrap());
    }

    #[test]
    fn test_layout_and_control_bytes() {
        let renderer = KitchenTicketRenderer::new(32, Tz::UTC);
        let bytes = renderer.render(&ticket(vec![item(1, "Soup", None)]), noon()).unwrap();

        // ESC @ first, HRPT cut last, three blank lines before it
        assert_eq!(&bytes[..2], &[0x1B, 0x40]);
        assert!(bytes.ends_with(b"\n\n\n\x1B\x64\x03\x1B\x6D"));
        // Centred bold double-size header with half-width rules
        assert!(contains(
            &bytes,
            b"\x1B\x61\x01\x1B\x45\x01\x1D\x21\x11================\nKITCHEN ORDER\n================\n\x1D\x21\x00"
        ));
        assert!(contains(&bytes, &[b'-'; 32]));
        assert!(contains(&bytes, b"\x1B\x45\x01ITEMS:\n\x1B\x45\x00"));
    }

    #[test]
    fn test_info_line_uses_configured_zone() {
        let kl: Tz = "Asia/Kuala_Lumpur".parse().unwrap();
        let bytes = KitchenTicketRenderer::new(32, kl)
            .render(&ticket(vec![item(1, "Soup", None)]), noon())
            .unwrap();
        // "Table: T5" padded to 16 columns, 04:30 UTC is 12:30 in UTC+8
        assert!(contains(&bytes, b"Table: T5       Time: 12:30\n"));
    }

    #[test]
    fn test_notes_are_trimmed_and_indented() {
        let bytes = KitchenTicketRenderer::new(32, Tz::UTC)
            .render(
                &ticket(vec![item(1, "Mee Goreng", Some("  no egg \n\n extra spicy\r\n"))]),
                noon(),
            )
            .unwrap();
        assert!(contains(&bytes, b"1x Mee Goreng\n\x1B\x45\x00   no egg\n   extra spicy\n\n"));
        assert!(!contains(&bytes, b"   \n"));
    }

    #[test]
    fn test_placeholders_for_missing_fields() {
        let mut t = ticket(vec![item(3, "  ", None)]);
        t.table_name = None;
        t.bill_number = Some(String::new());
        t.brand_name = None;

        let bytes = KitchenTicketRenderer::new(32, Tz::UTC).render(&t, noon()).unwrap();
        assert!(contains(&bytes, b"Table: N/A      Time: 04:30\n"));
        assert!(contains(&bytes, b"Order: #N/A\n"));
        assert!(contains(&bytes, b"3x Unknown\n"));
        assert!(!contains(&bytes, b"Brand:"));
    }

    #[test]
    fn test_epson_profile() {
        let bytes = KitchenTicketRenderer::new(48, Tz::UTC)
            .with_profile(Profile::Epson)
            .render(&ticket(vec![item(1, "Soup", None)]), noon())
            .unwrap();
        assert!(contains(&bytes, &[0x1B, 0x21, 0x30]));
        assert!(!contains(&bytes, &[0x1D, 0x21, 0x11]));
        assert!(bytes.ends_with(&[0x1D, 0x56, 0x00]));
        assert!(contains(&bytes, &[b'='; 48]));
    }

    #[test]
    fn test_gbk_code_page() {
        let bytes = KitchenTicketRenderer::new(32, Tz::UTC)
            .with_encoding(TextEncoding::Gbk)
            .render(&ticket(vec![item(1, "炒饭", None)]), noon())
            .unwrap();
        // 炒饭 in GBK
        assert!(contains(&bytes, b"1x \xB3\xB4\xB7\xB9\n"));
        assert!(!contains(&bytes, "炒饭".as_bytes()));
    }

    #[test]
    fn test_invalid_tickets() {
        let renderer = KitchenTicketRenderer::new(32, Tz::UTC);
        assert_eq!(renderer.render(&ticket(vec![]), noon()), Err(RenderError::NoItems));
        assert_eq!(
            renderer.render(&ticket(vec![item(1, "Soup", None), item(0, "Rice", None)]), noon()),
            Err(RenderError::InvalidQuantity {
                name: "Rice".into(),
                quantity: 0
            })
        );
    }
}
