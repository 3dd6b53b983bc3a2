//! Projection table export
//!
//! One row per player: identity columns, the raw odds and line of every market,
//! then the projected total. Markets a position does not use are left blank.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::models::{Projection, MARKETS};

pub const DEFAULT_DELIMITER: char = ',';

/// Tab for `.tsv`/`.tab` paths, comma otherwise
pub fn delimiter_for_path<P: AsRef<Path>>(path: P) -> char {
    match path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("tab") => '\t',
        _ => DEFAULT_DELIMITER,
    }
}

/// Column names in output order
pub fn headers() -> Vec<String> {
    let mut headers = vec![
        "Player".to_string(),
        "Game".to_string(),
        "Position".to_string(),
    ];
    for descriptor in MARKETS.iter() {
        if descriptor.market.is_binary() {
            headers.push(format!("{} Yes", descriptor.label));
            headers.push(format!("{} No", descriptor.label));
        } else {
            headers.push(format!("{} Over", descriptor.label));
            headers.push(format!("{} Under", descriptor.label));
            headers.push(format!("{} Line", descriptor.label));
        }
    }
    headers.push("Total".to_string());
    headers
}

fn row(projection: &Projection) -> Vec<String> {
    let mut cells = vec![
        projection.player.clone(),
        projection
            .game
            .as_ref()
            .map(|g| g.to_string())
            .unwrap_or_default(),
        projection.position.to_string(),
    ];

    for descriptor in MARKETS.iter() {
        let quote = projection.quotes.get(descriptor.market);
        cells.push(quote.map(|q| q.over.to_string()).unwrap_or_default());
        cells.push(quote.map(|q| q.under.to_string()).unwrap_or_default());
        if !descriptor.market.is_binary() {
            cells.push(
                quote
                    .and_then(|q| q.line)
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
            );
        }
    }

    cells.push(format!("{:.2}", projection.total));
    cells
}

/// Quote a field when it contains the delimiter, a quote or a line break
fn escape(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_record<W: Write>(writer: &mut W, fields: &[String], delimiter: char) -> Result<()> {
    let line: Vec<String> = fields.iter().map(|f| escape(f, delimiter)).collect();
    writeln!(writer, "{}", line.join(&delimiter.to_string()))?;
    Ok(())
}

/// Write the table with a header row
pub fn write_delimited<W: Write>(
    writer: &mut W,
    projections: &[Projection],
    delimiter: char,
) -> Result<()> {
    write_record(writer, &headers(), delimiter)?;
    for projection in projections {
        write_record(writer, &row(projection), delimiter)?;
    }
    Ok(())
}

pub fn to_delimited_string(projections: &[Projection], delimiter: char) -> Result<String> {
    let mut buffer = Vec::new();
    write_delimited(&mut buffer, projections, delimiter)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Save the table; the delimiter follows the extension unless given
pub fn save_table<P: AsRef<Path>>(
    path: P,
    projections: &[Projection],
    delimiter: Option<char>,
) -> Result<()> {
    let path = path.as_ref();
    let delimiter = delimiter.unwrap_or_else(|| delimiter_for_path(path));
    let mut writer = BufWriter::new(File::create(path)?);
    write_delimited(&mut writer, projections, delimiter)?;
    writer.flush()?;
    tracing::info!("Wrote {} rows to {}", projections.len(), path.display());
    Ok(())
}

pub fn to_json(projections: &[Projection]) -> Result<String> {
    Ok(serde_json::to_string_pretty(projections)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formulas::project;
    use crate::models::{GameId, MarketQuote, MarketType, PlayerMarketSet, Position};

    fn skill_projection(name: &str) -> Projection {
        let mut set = PlayerMarketSet::new();
        set.insert(MarketQuote::binary(MarketType::AnytimeTd, 1.9, 1.9).unwrap());
        set.insert(MarketQuote::over_under(MarketType::ReceivingYards, 1.9, 1.9, 40.0).unwrap());
        set.insert(MarketQuote::over_under(MarketType::Receptions, 1.9, 1.9, 4.0).unwrap());
        set.insert(MarketQuote::over_under(MarketType::RushingYards, 1.9, 1.9, 0.0).unwrap());
        let game = GameId {
            slug: "seattle-seahawks-vs-dallas-cowboys".to_string(),
            id: 1582399805,
        };
        project(name, Some(game), Position::Skill, &set).unwrap()
    }

    #[test]
    fn test_headers() {
        let headers = headers();
        assert_eq!(headers.len(), 3 + 2 + 6 * 3 + 1);
        assert_eq!(headers[0], "Player");
        assert_eq!(headers[3], "Anytime TD Yes");
        assert_eq!(headers[4], "Anytime TD No");
        assert_eq!(headers[5], "Interceptions Over");
        assert_eq!(headers.last().unwrap(), "Total");
    }

    #[test]
    fn test_row_layout() {
        let text = to_delimited_string(&[skill_projection("Brandin Cooks")], ',').unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let cells: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(cells.len(), headers().len());
        assert_eq!(cells[0], "Brandin Cooks");
        assert_eq!(cells[1], "seattle-seahawks-vs-dallas-cowboys/1582399805");
        assert_eq!(cells[2], "RB/WR/TE");
        assert_eq!(cells[3], "1.9");
        // Interceptions unused for RB/WR/TE
        assert_eq!(cells[5], "");
        assert_eq!(*cells.last().unwrap(), "11.00");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape("Cooks, Brandin", ','), "\"Cooks, Brandin\"");
        assert_eq!(escape("A \"B\" C", ','), "\"A \"\"B\"\" C\"");
        assert_eq!(escape("Cooks, Brandin", '\t'), "Cooks, Brandin");
        assert_eq!(escape("plain", ','), "plain");
    }

    #[test]
    fn test_delimiter_for_path() {
        assert_eq!(delimiter_for_path("out/week1.tsv"), '\t');
        assert_eq!(delimiter_for_path("out/week1.TSV"), '\t');
        assert_eq!(delimiter_for_path("out/week1.csv"), ',');
        assert_eq!(delimiter_for_path("week1"), ',');
    }

    #[test]
    fn test_json_export() {
        let json = to_json(&[skill_projection("Brandin Cooks")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["player"], "Brandin Cooks");
        assert_eq!(value[0]["position"], "Skill");
        assert_eq!(value[0]["total"], 11.0);
    }
}
