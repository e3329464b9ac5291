use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::bom::Bom;
use crate::parser::extract::Mention;

const BOM_HEADER: [&str; 5] = ["Component Name", "Quantity", "Mentions", "Pages Found", "Type"];
const PAGES_FIELD_MAX: usize = 100;

/// `Page <n>: <component> (<quantity>) - <context>`
pub fn detail_line(m: &Mention) -> String {
    format!(
        "Page {}: {} ({}) - {}",
        m.page,
        m.component,
        m.quantity.as_deref().unwrap_or(""),
        m.context
    )
}

pub fn write_detail<W: Write>(mut w: W, mentions: &[Mention]) -> Result<()> {
    for m in mentions {
        writeln!(w, "{}", detail_line(m))?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_bom<W: Write>(w: W, bom: &Bom) -> Result<()> {
    let mut csv = csv::Writer::from_writer(w);
    csv.write_record(BOM_HEADER)?;
    for (component, entry) in bom {
        let pages = entry
            .pages
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let pages: String = pages.chars().take(PAGES_FIELD_MAX).collect();
        let mentions = entry.mentions.to_string();
        csv.write_record([
            component.as_str(),
            entry.quantity.as_deref().unwrap_or("Unknown"),
            mentions.as_str(),
            pages.as_str(),
            "Hardware",
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Overwrite `path` with the detail listing.
pub fn save_detail(path: &Path, mentions: &[Mention]) -> Result<()> {
    let file = create(path)?;
    write_detail(BufWriter::new(file), mentions)
        .with_context(|| format!("Failed to write {:?}", path))
}

/// Overwrite `path` with the aggregated BOM CSV.
pub fn save_bom(path: &Path, bom: &Bom) -> Result<()> {
    let file = create(path)?;
    write_bom(BufWriter::new(file), bom).with_context(|| format!("Failed to write {:?}", path))
}

fn create(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }
    File::create(path).with_context(|| format!("Failed to create {:?}", path))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::bom::{aggregate, BomEntry};
    use crate::parser::extract::ComponentKind;

    fn mention(page: u32, component: &str, quantity: Option<&str>, context: &str) -> Mention {
        Mention {
            page,
            kind: ComponentKind::Screw,
            component: component.to_string(),
            quantity: quantity.map(str::to_string),
            context: context.to_string(),
        }
    }

    fn bom_text(bom: &Bom) -> String {
        let mut buf = Vec::new();
        write_bom(&mut buf, bom).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn detail_lines_keep_encounter_order() {
        let mentions = vec![
            mention(3, "M3x10 screw", Some("4"), "the M3x10 screw (4x) from"),
            mention(1, "M3 nut", None, "Push the M3 nut into"),
        ];
        let mut buf = Vec::new();
        write_detail(&mut buf, &mentions).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Page 3: M3x10 screw (4) - the M3x10 screw (4x) from\n\
             Page 1: M3 nut () - Push the M3 nut into\n"
        );
    }

    #[test]
    fn bom_rows() {
        let mentions = vec![
            mention(7, "M3x10 screw", None, ""),
            mention(5, "M3x10 SCREW", Some("4"), ""),
            mention(2, "GT2 belt", None, ""),
        ];
        let text = bom_text(&aggregate(&mentions));
        assert_eq!(
            text,
            "Component Name,Quantity,Mentions,Pages Found,Type\n\
             GT2 BELT,Unknown,1,2,Hardware\n\
             M3X10 SCREW,4,2,\"5,7\",Hardware\n"
        );
    }

    #[test]
    fn pages_field_is_truncated() {
        let mut bom = Bom::new();
        bom.insert(
            "MOTOR".to_string(),
            BomEntry {
                mentions: 200,
                pages: (100..200).collect::<BTreeSet<u32>>(),
                quantity: None,
            },
        );
        let text = bom_text(&bom);
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "MOTOR");
        assert_eq!(&row[1], "Unknown");
        assert_eq!(row[3].len(), 100);
        assert!(row[3].starts_with("100,101,102"));
        assert_eq!(&row[4], "Hardware");
    }

    #[test]
    fn save_overwrites_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let detail = dir.path().join("out/raw.txt");
        let csv_path = dir.path().join("out/bom.csv");

        let first = vec![
            mention(1, "M3 nut", None, "a"),
            mention(2, "M3 nut", None, "b"),
        ];
        save_detail(&detail, &first).unwrap();
        save_detail(&detail, &first[..1]).unwrap();
        assert_eq!(fs::read_to_string(&detail).unwrap(), "Page 1: M3 nut () - a\n");

        save_bom(&csv_path, &aggregate(&first)).unwrap();
        let text = fs::read_to_string(&csv_path).unwrap();
        assert!(text.ends_with("M3 NUT,Unknown,2,\"1,2\",Hardware\n"));
    }

    #[test]
    fn empty_run_still_writes_header() {
        assert_eq!(bom_text(&Bom::new()), "Component Name,Quantity,Mentions,Pages Found,Type\n");
    }
}
