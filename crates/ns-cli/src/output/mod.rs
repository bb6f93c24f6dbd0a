//! Output formatting utilities for the CLI
//!
//! Tables for the catalog, summaries of fetched content, and colored status
//! messages.

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use ns_core::{Catalog, PeerCount};
use ns_session::FetchedContent;

/// Format the catalog as an ASCII table
///
/// Content IDs are shortened unless `long` is set. Returns "Catalog is empty"
/// when there are no entries.
pub fn format_catalog(catalog: &Catalog, long: bool) -> String {
    if catalog.is_empty() {
        return "Catalog is empty".to_string();
    }

    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "EP")]
        episode: u32,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "CID")]
        cid: String,
    }

    let rows: Vec<EntryRow> = catalog
        .entries()
        .iter()
        .map(|e| EntryRow {
            episode: e.episode,
            name: e.name.clone(),
            cid: if long {
                e.content_id.to_string()
            } else {
                truncate(e.content_id.as_str(), 16)
            },
        })
        .collect();

    if long {
        Table::new(rows).with(Style::rounded()).to_string()
    } else {
        Table::new(rows)
            .with(Style::rounded())
            .with(Width::wrap(100))
            .to_string()
    }
}

/// One-paragraph summary of a successful fetch
pub fn format_fetched(content: &FetchedContent) -> String {
    format!(
        "{}\n  CID:    {}\n  Image:  {} {}x{}\n  Size:   {}\n  Took:   {:.2}s",
        content.title,
        content.entry.content_id,
        content.image.mime_type,
        content.image.width,
        content.image.height,
        format_bytes(content.payload.len()),
        content.elapsed.as_secs_f64()
    )
}

pub fn format_peers(count: PeerCount) -> String {
    match count.count {
        1 => "1 peer".to_string(),
        n => format!("{} peers", n),
    }
}

fn format_bytes(len: usize) -> String {
    const KIB: f64 = 1024.0;
    let len_f = len as f64;
    if len_f < KIB {
        format!("{} B", len)
    } else if len_f < KIB * KIB {
        format!("{:.1} KiB", len_f / KIB)
    } else {
        format!("{:.1} MiB", len_f / (KIB * KIB))
    }
}

/// Truncate a string to a maximum length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success message with green checkmark
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message with red X
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message with yellow warning sign
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an info message with cyan info icon
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_core::CatalogEntry;

    #[test]
    fn test_format_catalog_empty() {
        assert_eq!(format_catalog(&Catalog::default(), false), "Catalog is empty");
    }

    #[test]
    fn test_format_catalog_rows() {
        let catalog = Catalog::new(vec![
            CatalogEntry::new(614, "Designated Drivers", "QmXYZ"),
            CatalogEntry::new(
                1,
                "Barrel - Part 1",
                "QmVeryLongContentIdentifierThatWillBeShortened",
            ),
        ]);

        let table = format_catalog(&catalog, false);
        assert!(table.contains("EP"));
        assert!(table.contains("Designated Drivers"));
        assert!(table.contains("QmVeryLongCon..."));

        let long = format_catalog(&catalog, true);
        assert!(long.contains("QmVeryLongContentIdentifierThatWillBeShortened"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("QmShort", 16), "QmShort");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_format_peers() {
        assert_eq!(format_peers(PeerCount::new(1)), "1 peer");
        assert_eq!(format_peers(PeerCount::new(0)), "0 peers");
        assert_eq!(format_peers(PeerCount::new(12)), "12 peers");
    }
}
