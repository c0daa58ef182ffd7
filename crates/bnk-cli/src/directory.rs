//! Contractor directory loading.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use bnk_core::Contractor;

/// Load contractors from a JSON array or a CSV file with a header row.
///
/// CSV columns are `id`, `name` and `accountCode` (or `nazwa` and `konto`);
/// the delimiter is `;` when the header uses it, `,` otherwise.
pub fn load_contractors(path: &Path) -> anyhow::Result<Vec<Contractor>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read contractor directory {}", path.display()))?;

    let contractors: Vec<Contractor> = match extension.as_str() {
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Invalid contractor JSON in {}", path.display()))?,
        "csv" | "txt" => parse_csv(&content)
            .with_context(|| format!("Invalid contractor CSV in {}", path.display()))?,
        _ => anyhow::bail!("Unsupported contractor file format: {}", extension),
    };

    debug!(count = contractors.len(), path = %path.display(), "loaded contractors");
    Ok(contractors)
}

fn parse_csv(content: &str) -> anyhow::Result<Vec<Contractor>> {
    let content = content.trim_start_matches('\u{feff}');
    let header = content.lines().next().unwrap_or("");
    let delimiter = if header.contains(';') { b';' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut contractors = Vec::new();
    for row in reader.deserialize() {
        contractors.push(row?);
    }
    Ok(contractors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semicolon_csv_with_polish_headers() {
        let contractors =
            parse_csv("\u{feff}id;nazwa;konto\n1;ENERGA OPERATOR;201-0001\n2; PGNiG ;201-0002\n").unwrap();
        assert_eq!(contractors.len(), 2);
        assert_eq!(contractors[1], Contractor::new(2, "PGNiG", "201-0002"));
    }

    #[test]
    fn test_comma_csv() {
        let contractors = parse_csv("id,name,accountCode\n7,ORANGE POLSKA,201-0007\n").unwrap();
        assert_eq!(contractors[0].account_code, "201-0007");
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kontrahenci.json");
        fs::write(&path, r#"[{"id": 3, "nazwa": "MPWiK", "kontoKontrahenta": "201-0003"}]"#).unwrap();

        let contractors = load_contractors(&path).unwrap();
        assert_eq!(contractors, vec![Contractor::new(3, "MPWiK", "201-0003")]);
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kontrahenci.xlsx");
        fs::write(&path, "").unwrap();
        assert!(load_contractors(&path).is_err());
    }
}
