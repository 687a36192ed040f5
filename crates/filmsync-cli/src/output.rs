use std::io::Write;
use std::path::{Path, PathBuf};

use filmsync_core::{InventoryItem, MatchEvent, MatchResult, MatchTier, RunSummary};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the banner for one list before its results.
pub fn print_list_header(
    w: &mut dyn Write,
    name: &str,
    catalog_len: usize,
    inventory_len: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    let line = format!("{name}: {catalog_len} films, {inventory_len} in library");
    if color.enabled() {
        writeln!(w, "{}", line.bold().cyan())?;
    } else {
        writeln!(w, "{line}")?;
    }
    Ok(())
}

fn tier_label(tier: MatchTier, color: ColorMode) -> String {
    let label = tier.label();
    if !color.enabled() {
        return label.to_string();
    }
    match tier {
        MatchTier::Exact => label.green().to_string(),
        MatchTier::FuzzyAccepted => label.yellow().to_string(),
        MatchTier::FuzzyRejected => label.magenta().to_string(),
        MatchTier::None => label.red().to_string(),
    }
}

/// Print one decided catalog item, e.g.
/// `[  3] 霸王别姬(1993) -> EXACT 霸王別姬(1993) 0.90 script variant`.
pub fn print_result(
    w: &mut dyn Write,
    result: &MatchResult,
    color: ColorMode,
) -> std::io::Result<()> {
    let item = &result.catalog_item;
    let year = item.year.as_deref().unwrap_or("");
    let label = tier_label(result.tier, color);

    match &result.candidate {
        Some(candidate) => {
            let diagnostic = result.diagnostic();
            let diagnostic = if color.enabled() {
                diagnostic.dimmed().to_string()
            } else {
                diagnostic
            };
            writeln!(
                w,
                "[{:>3}] {}({}) -> {} {}({}) {:.2} {}",
                item.rank,
                item.title,
                year,
                label,
                candidate.title,
                candidate.year,
                result.similarity_ratio,
                diagnostic
            )
        }
        None => writeln!(w, "[{:>3}] {}({}) -> {}", item.rank, item.title, year, label),
    }
}

/// Print a progress event from a running reconciliation.
pub fn print_progress(
    w: &mut dyn Write,
    event: &MatchEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        MatchEvent::Scanning { .. } => Ok(()),
        MatchEvent::Decided { result, .. } => print_result(w, result, color),
    }
}

/// Print the per-list summary.
pub fn print_summary(
    w: &mut dyn Write,
    summary: &RunSummary,
    remaining: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{sep}")?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{sep}")?;
    }

    writeln!(w, "  Films in list: {}", summary.total)?;
    if color.enabled() {
        writeln!(w, "  {} {}", "Exact:".green(), summary.exact)?;
        writeln!(w, "  {} {}", "Fuzzy accepted:".yellow(), summary.fuzzy_accepted)?;
        writeln!(w, "  {} {}", "Fuzzy rejected:".magenta(), summary.fuzzy_rejected)?;
        writeln!(w, "  {} {}", "Not in library:".red(), summary.not_found)?;
    } else {
        writeln!(w, "  Exact: {}", summary.exact)?;
        writeln!(w, "  Fuzzy accepted: {}", summary.fuzzy_accepted)?;
        writeln!(w, "  Fuzzy rejected: {}", summary.fuzzy_rejected)?;
        writeln!(w, "  Not in library: {}", summary.not_found)?;
    }
    let unused = format!("Library items left unassigned: {remaining}");
    if color.enabled() {
        writeln!(w, "  {}", unused.dimmed())?;
    } else {
        writeln!(w, "  {unused}")?;
    }
    writeln!(w)?;
    Ok(())
}

/// Playlist handed to the media server: name plus item handles in rank order.
#[derive(Debug, Serialize)]
pub struct Playlist<'a> {
    pub name: &'a str,
    pub handles: Vec<&'a str>,
}

/// Replace characters that cannot appear in a file name.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        "playlist".to_string()
    } else {
        stem
    }
}

/// Write `<dir>/<name>.json`, replacing any earlier playlist of that name.
pub fn write_playlist(dir: &Path, playlist: &Playlist<'_>) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", file_stem(playlist.name)));
    let json = serde_json::to_string_pretty(playlist)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Full outcome for one list, as written by `--report`.
#[derive(Debug, Serialize)]
pub struct ListReport<'a> {
    pub list: &'a str,
    pub name: &'a str,
    pub summary: RunSummary,
    pub results: &'a [MatchResult],
    pub remaining: &'a [InventoryItem],
}

pub fn write_report(path: &Path, reports: &[ListReport<'_>]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(reports)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmsync_core::{CatalogItem, MatchReason};

    fn decided(tier: MatchTier) -> MatchResult {
        MatchResult {
            catalog_item: CatalogItem {
                rank: 7,
                title: "霸王别姬".into(),
                original_title: None,
                year: Some("1993".into()),
            },
            matched_handle: tier.is_accepted().then(|| "h7".to_string()),
            candidate: Some(InventoryItem {
                handle: "h7".into(),
                title: "霸王別姬".into(),
                year: "1993".into(),
            }),
            similarity_ratio: 0.9,
            year_deviation: 0,
            tier,
            reasons: vec![MatchReason::ScriptVariant],
        }
    }

    fn render(result: &MatchResult) -> String {
        let mut buf = Vec::new();
        print_result(&mut buf, result, ColorMode(false)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn result_line_plain() {
        let line = render(&decided(MatchTier::Exact));
        assert!(line.starts_with("[  7] 霸王别姬(1993) -> EXACT 霸王別姬(1993) 0.90"));
    }

    #[test]
    fn not_found_line_has_no_candidate() {
        let result = MatchResult::not_found(CatalogItem {
            rank: 12,
            title: "无间道".into(),
            original_title: None,
            year: None,
        });
        assert_eq!(render(&result), "[ 12] 无间道() -> NONE\n");
    }

    #[test]
    fn colored_label_differs_from_plain() {
        let plain = tier_label(MatchTier::FuzzyRejected, ColorMode(false));
        let colored = tier_label(MatchTier::FuzzyRejected, ColorMode(true));
        assert_eq!(plain, "FUZZY_REJECTED");
        assert_ne!(plain, colored);
        assert!(colored.contains("FUZZY_REJECTED"));
    }

    #[test]
    fn file_stem_replaces_separators() {
        assert_eq!(file_stem("豆瓣TOP250"), "豆瓣TOP250");
        assert_eq!(file_stem("a/b: c?"), "a_b_ c_");
        assert_eq!(file_stem("   "), "playlist");
    }

    #[test]
    fn playlist_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let first = Playlist {
            name: "片单",
            handles: vec!["a", "b"],
        };
        let path = write_playlist(dir.path(), &first).unwrap();
        let second = Playlist {
            name: "片单",
            handles: vec!["c"],
        };
        assert_eq!(write_playlist(dir.path(), &second).unwrap(), path);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["name"], "片单");
        assert_eq!(written["handles"], serde_json::json!(["c"]));
    }
}
