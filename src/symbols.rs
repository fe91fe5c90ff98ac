//! Catalog of the P&ID symbol artwork shipped with the editor.
//!
//! Symbols are discovered from asset paths of the form
//! `/symbols/{ISO|PIP}/PID-{STD}-{Category}-Symbols/svg/{file}.svg`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SymbolStandard {
    #[serde(rename = "ISO")]
    Iso,
    #[serde(rename = "PIP")]
    Pip,
}

impl SymbolStandard {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolStandard::Iso => "ISO",
            SymbolStandard::Pip => "PIP",
        }
    }

    fn from_segment(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ISO" => Some(SymbolStandard::Iso),
            "PIP" => Some(SymbolStandard::Pip),
            _ => None,
        }
    }
}

impl fmt::Display for SymbolStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolCategory {
    Equipment,
    Valves,
    Instruments,
    Fittings,
    Pipes,
}

// Checked in order against the lowercased folder name.
const CATEGORY_KEYS: &[(&str, SymbolCategory)] = &[
    ("equipment", SymbolCategory::Equipment),
    ("equipments", SymbolCategory::Equipment),
    ("valves", SymbolCategory::Valves),
    ("instruments", SymbolCategory::Instruments),
    ("fittings", SymbolCategory::Fittings),
    ("pipes-and-signal-lines", SymbolCategory::Pipes),
    ("pipes_and_signal_lines", SymbolCategory::Pipes),
];

impl SymbolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolCategory::Equipment => "equipment",
            SymbolCategory::Valves => "valves",
            SymbolCategory::Instruments => "instruments",
            SymbolCategory::Fittings => "fittings",
            SymbolCategory::Pipes => "pipes",
        }
    }

    /// Category for a `PID-*-Symbols` folder, if it is one we know.
    pub fn from_folder(folder: &str) -> Option<Self> {
        let folder = folder.to_ascii_lowercase();
        CATEGORY_KEYS
            .iter()
            .find(|(key, _)| folder.contains(key))
            .map(|(_, category)| *category)
    }
}

impl fmt::Display for SymbolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: String,
    pub name: String,
    pub category: SymbolCategory,
    pub standard: SymbolStandard,
    pub path: String,
}

fn file_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^pid_(iso|pip)_[a-z_]+_\d{3}_(.+)$").expect("symbol file regex must compile"))
}

fn leftover_prefix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Pid (?:Iso|Pip) (?:Pipes Signal|\w+) \d{3} ").expect("symbol prefix regex must compile")
    })
}

/// Word-initial letters upper, the rest lower. A letter following a digit
/// starts a new word.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Human-readable name for a symbol file such as
/// `pid_iso_equipment_000_tank_general_basin.svg`.
pub fn display_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".svg").unwrap_or(file_name);

    let name = match file_name_pattern().captures(stem) {
        Some(caps) => title_case(&caps[2].replace('_', " ")),
        None => title_case(stem.rsplit('_').next().unwrap_or(stem)),
    };

    leftover_prefix_pattern().replace(&name, "").into_owned()
}

/// Symbols indexed in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SymbolCatalog {
    symbols: Vec<Symbol>,
}

impl SymbolCatalog {
    /// Build the catalog from asset paths. Paths outside a known standard or
    /// category folder, and non-SVG files, are skipped.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::default();
        for path in paths {
            let path = path.as_ref();
            match parse_path(path) {
                Some((standard, category, file)) => {
                    let id = format!(
                        "{}_{}_{}",
                        standard.as_str().to_ascii_lowercase(),
                        category,
                        catalog.symbols.len()
                    );
                    catalog.symbols.push(Symbol {
                        id,
                        name: display_name(file),
                        category,
                        standard,
                        path: path.to_string(),
                    });
                }
                None => tracing::debug!(path, "skipping unrecognized symbol path"),
            }
        }
        catalog
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.id == id)
    }

    pub fn by_category(&self, category: SymbolCategory) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(move |s| s.category == category)
    }

    pub fn count_standard(&self, standard: SymbolStandard) -> usize {
        self.symbols.iter().filter(|s| s.standard == standard).count()
    }

    pub fn counts(&self) -> BTreeMap<(SymbolStandard, SymbolCategory), usize> {
        let mut counts = BTreeMap::new();
        for symbol in &self.symbols {
            *counts.entry((symbol.standard, symbol.category)).or_insert(0) += 1;
        }
        counts
    }
}

/// Split `.../{STD}/{folder}/svg/{file}.svg`.
fn parse_path(path: &str) -> Option<(SymbolStandard, SymbolCategory, &str)> {
    let mut segments = path.rsplit('/');
    let file = segments.next()?;
    if segments.next()? != "svg" || !file.to_ascii_lowercase().ends_with(".svg") {
        return None;
    }
    let folder = segments.next()?;
    let standard = SymbolStandard::from_segment(segments.next()?)?;
    let category = SymbolCategory::from_folder(folder)?;
    Some((standard, category, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_from_pattern() {
        assert_eq!(
            display_name("pid_iso_equipment_000_tank_general_basin.svg"),
            "Tank General Basin"
        );
        assert_eq!(display_name("pid_pip_valves_012_gate_valve.svg"), "Gate Valve");
        assert_eq!(display_name("pid_iso_fittings_003_3way_tee.svg"), "3Way Tee");
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(display_name("reducer_concentric.svg"), "Concentric");
        assert_eq!(display_name("orifice.svg"), "Orifice");
    }

    #[test]
    fn test_leftover_prefix_removed() {
        assert_eq!(
            display_name("pid_iso_pipes_signal_001_pid_iso_pipes_signal_001_capillary_tube.svg"),
            "Capillary Tube"
        );
        assert_eq!(
            display_name("pid_iso_valves_004_pid_iso_valves_004_ball_valve.svg"),
            "Ball Valve"
        );
    }

    #[test]
    fn test_category_from_folder() {
        assert_eq!(
            SymbolCategory::from_folder("PID-ISO-Equipments-Symbols"),
            Some(SymbolCategory::Equipment)
        );
        assert_eq!(
            SymbolCategory::from_folder("PID-PIP-Pipes-And-Signal-Lines-Symbols"),
            Some(SymbolCategory::Pipes)
        );
        assert_eq!(SymbolCategory::from_folder("PID-ISO-Misc-Symbols"), None);
    }

    #[test]
    fn test_catalog_ids_and_lookup() {
        let catalog = SymbolCatalog::from_paths([
            "/symbols/ISO/PID-ISO-Valves-Symbols/svg/pid_iso_valves_000_gate_valve.svg",
            "/symbols/ISO/PID-ISO-Misc-Symbols/svg/pid_iso_misc_000_thing.svg",
            "/symbols/PIP/PID-PIP-Instruments-Symbols/svg/pid_pip_instruments_001_flow_meter.svg",
            "/symbols/PIP/PID-PIP-Instruments-Symbols/png/pid_pip_instruments_001_flow_meter.png",
            "/symbols/ISO/PID-ISO-Equipment-Symbols/svg/pid_iso_equipment_002_pump.svg",
        ]);
        assert_eq!(catalog.len(), 3);
        let ids: Vec<&str> = catalog.symbols().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["iso_valves_0", "pip_instruments_1", "iso_equipment_2"]);

        let meter = catalog.get("pip_instruments_1").unwrap();
        assert_eq!(meter.name, "Flow Meter");
        assert_eq!(meter.standard, SymbolStandard::Pip);
        assert!(catalog.get("iso_valves_9").is_none());
    }

    #[test]
    fn test_catalog_counts() {
        let catalog = SymbolCatalog::from_paths([
            "/symbols/ISO/PID-ISO-Valves-Symbols/svg/pid_iso_valves_000_gate_valve.svg",
            "/symbols/ISO/PID-ISO-Valves-Symbols/svg/pid_iso_valves_001_globe_valve.svg",
            "/symbols/PIP/PID-PIP-Valves-Symbols/svg/pid_pip_valves_000_gate_valve.svg",
        ]);
        assert_eq!(catalog.count_standard(SymbolStandard::Iso), 2);
        assert_eq!(catalog.count_standard(SymbolStandard::Pip), 1);
        assert_eq!(catalog.counts()[&(SymbolStandard::Iso, SymbolCategory::Valves)], 2);
        assert_eq!(catalog.by_category(SymbolCategory::Valves).count(), 3);
    }

    #[test]
    fn test_catalog_serializes_as_array() {
        let catalog = SymbolCatalog::from_paths([
            "/symbols/ISO/PID-ISO-Fittings-Symbols/svg/pid_iso_fittings_000_flange.svg",
        ]);
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json[0]["standard"], "ISO");
        assert_eq!(json[0]["category"], "fittings");
        assert_eq!(json[0]["name"], "Flange");
    }
}
