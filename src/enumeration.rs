use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Label used for codes (or addresses) with no table entry.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Name of the built-in safety/regulatory standard table.
pub const SAFETY_STANDARD: &str = "safety_standard";

// Safety type selector, holding register 0x001D. Index is the register code.
const SAFETY_STANDARDS: [&str; 33] = [
    "VDE0126",
    "VDE4105",
    "AS4777",
    "G98",
    "C10/11",
    "TOR",
    "EN50438_NL",
    "Denmark",
    "CEB",
    "CEI021",
    "NRS097",
    "VDE0126_Greece",
    "UTE_C15_712",
    "IEC61727",
    "G99",
    "VDE0126_Greece_Island",
    "C15_712_Island_50",
    "C15_712_Island_60",
    "Guyana",
    "MEA_Thailand",
    "PEA_Thailand",
    "NewZealand",
    "Ireland",
    "CEI016",
    "Czech_PPDS",
    "Sweden",
    "EN50549_PL",
    "Spain",
    "Chile",
    "Israel",
    "Philippines",
    "Norway",
    "Brazil",
];

/// One code to label table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumerationTable {
    name: String,
    labels: BTreeMap<u16, String>,
}

impl EnumerationTable {
    pub fn new<S: Into<String>>(name: S, labels: BTreeMap<u16, String>) -> Self {
        Self {
            name: name.into(),
            labels,
        }
    }

    /// Built-in tables, looked up by the name a catalog entry references.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            SAFETY_STANDARD => Some(Self::new(
                SAFETY_STANDARD,
                SAFETY_STANDARDS
                    .iter()
                    .enumerate()
                    .map(|(code, label)| (code as u16, label.to_string()))
                    .collect(),
            )),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, code: u16) -> Option<&str> {
        self.labels.get(&code).map(String::as_str)
    }
}

/// Enumeration tables keyed by register address within one address space.
#[derive(Clone, Debug, Default)]
pub struct EnumerationResolver {
    tables: HashMap<u16, Arc<EnumerationTable>>,
}

impl EnumerationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, address: u16, table: Arc<EnumerationTable>) {
        self.tables.insert(address, table);
    }

    pub fn is_enumerated(&self, address: u16) -> bool {
        self.tables.contains_key(&address)
    }

    pub fn table(&self, address: u16) -> Option<&EnumerationTable> {
        self.tables.get(&address).map(Arc::as_ref)
    }

    pub fn resolve(&self, address: u16, code: u16) -> String {
        self.table(address)
            .and_then(|table| table.label(code))
            .unwrap_or(UNKNOWN_LABEL)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> EnumerationResolver {
        let mut resolver = EnumerationResolver::new();
        resolver.register(
            0x001D,
            Arc::new(EnumerationTable::builtin(SAFETY_STANDARD).unwrap()),
        );
        resolver
    }

    #[test]
    fn safety_standard_table() {
        let table = EnumerationTable::builtin(SAFETY_STANDARD).unwrap();
        assert_eq!(table.len(), 33);
        assert_eq!(table.label(0), Some("VDE0126"));
        assert_eq!(table.label(32), Some("Brazil"));
        assert_eq!(table.label(33), None);
    }

    #[test]
    fn resolve_known_and_unknown() {
        let resolver = resolver();
        assert_eq!(resolver.resolve(0x001D, 0), "VDE0126");
        assert_eq!(resolver.resolve(0x001D, 1), "VDE4105");
        assert_eq!(resolver.resolve(0x001D, 999), "Unknown");
        // not an enumerated address at all
        assert_eq!(resolver.resolve(0x001E, 0), "Unknown");
        assert!(resolver.is_enumerated(0x001D));
        assert!(!resolver.is_enumerated(0x001E));
    }

    #[test]
    fn unknown_builtin() {
        assert!(EnumerationTable::builtin("grid_code").is_none());
    }
}
