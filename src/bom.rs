use std::collections::{BTreeMap, BTreeSet};

use crate::parser::extract::Mention;

/// One bill-of-materials line: every mention sharing a normalized component name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BomEntry {
    pub mentions: usize,
    pub pages: BTreeSet<u32>,
    pub quantity: Option<String>,
}

/// Entries keyed by normalized component text, iterated in ascending key order.
pub type Bom = BTreeMap<String, BomEntry>;

pub fn normalize_key(component: &str) -> String {
    component.trim().to_uppercase()
}

/// Fold mentions into BOM entries. Labels are ignored; a later non-empty
/// quantity replaces an earlier one.
pub fn aggregate(mentions: &[Mention]) -> Bom {
    let mut bom = Bom::new();
    for m in mentions {
        let entry = bom.entry(normalize_key(&m.component)).or_default();
        entry.mentions += 1;
        entry.pages.insert(m.page);
        if let Some(qty) = m.quantity.as_ref().filter(|q| !q.is_empty()) {
            entry.quantity = Some(qty.clone());
        }
    }
    bom
}
