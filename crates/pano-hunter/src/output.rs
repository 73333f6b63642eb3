//! Links file and metadata table.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pano_hunter_core::PanoramaRecord;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DOMAIN: &str = "de";
pub const DEFAULT_OUTPUT: &str = "panoramas.txt";

pub const CSV_HEADER: [&str; 8] = [
    "pano_id",
    "latitude",
    "longitude",
    "date",
    "distance_m",
    "searched_from_lat",
    "searched_from_lon",
    "link",
];

/// What `write_outputs` produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One link per line plus a `<stem>_details.csv` table.
    #[default]
    Txt,
    /// Metadata table only.
    Csv,
    /// Full JSON report.
    Json,
}

impl OutputFormat {
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown output format '{0}' (expected txt, csv or json)")]
pub struct FormatError(pub String);

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" => Ok(OutputFormat::Txt),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(FormatError(s.to_string())),
        }
    }
}

/// Where and how to write the results of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputSpec {
    pub path: PathBuf,
    pub format: OutputFormat,
    /// Google top-level domain used in links (`de`, `com`, `ru`, ...).
    pub domain: String,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT),
            format: OutputFormat::Txt,
            domain: DEFAULT_DOMAIN.to_string(),
        }
    }
}

/// Browser link opening the panorama in Google Maps.
pub fn panorama_link(record: &PanoramaRecord, domain: &str) -> String {
    format!(
        "https://www.google.{domain}/maps/@{:.6},{:.6},3a,75y,2.85h,90t/data=!3m6!1e1!3m4!1s{}!2e0!7i13312!8i6656",
        record.latitude, record.longitude, record.pano_id
    )
}

/// `<dir>/<stem>_details.csv` next to the links file.
pub fn details_path(links: &Path) -> PathBuf {
    let stem = links
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "panoramas".to_string());
    links.with_file_name(format!("{stem}_details.csv"))
}

/// One link per line, in record order.
pub fn write_links<W: Write>(mut w: W, records: &[PanoramaRecord], domain: &str) -> io::Result<()> {
    for record in records {
        writeln!(w, "{}", panorama_link(record, domain))?;
    }
    w.flush()
}

/// Metadata table with a header row.
pub fn write_csv<W: Write>(w: W, records: &[PanoramaRecord], domain: &str) -> csv::Result<()> {
    let mut table = csv::Writer::from_writer(w);
    table.write_record(CSV_HEADER)?;
    for r in records {
        let date = r.capture_date.map(|d| d.to_string()).unwrap_or_default();
        table.write_record([
            r.pano_id.clone(),
            format!("{:.6}", r.latitude),
            format!("{:.6}", r.longitude),
            date,
            format!("{:.1}", r.distance_m),
            format!("{:.5}", r.discovered_from.lat),
            format!("{:.5}", r.discovered_from.lon),
            panorama_link(r, domain),
        ])?;
    }
    table.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pano_hunter_core::{CaptureDate, GridPoint};

    fn record(id: &str) -> PanoramaRecord {
        PanoramaRecord {
            pano_id: id.to_string(),
            latitude: 61.674_123_4,
            longitude: 50.835_551_2,
            capture_date: Some(CaptureDate {
                year: 2021,
                month: Some(8),
            }),
            copyright: None,
            discovered_from: GridPoint {
                lat: 61.674,
                lon: 50.8355,
                sequence_index: 17,
            },
            distance_m: 13.84,
        }
    }

    #[test]
    fn link_uses_six_decimals_and_domain() {
        assert_eq!(
            panorama_link(&record("AbC"), "com"),
            "https://www.google.com/maps/@61.674123,50.835551,3a,75y,2.85h,90t/data=!3m6!1e1!3m4!1sAbC!2e0!7i13312!8i6656"
        );
    }

    #[test]
    fn details_file_sits_next_to_links() {
        assert_eq!(
            details_path(Path::new("out/syktyvkar.txt")),
            PathBuf::from("out/syktyvkar_details.csv")
        );
        assert_eq!(
            details_path(Path::new("panos")),
            PathBuf::from("panos_details.csv")
        );
    }

    #[test]
    fn csv_rows_follow_header() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[record("P1")], "de").expect("csv");
        let text = String::from_utf8(buf).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER.join(",").as_str()));
        let row = lines.next().expect("row");
        assert!(row.starts_with("P1,61.674123,50.835551,2021-08,13.8,61.67400,50.83550,https://www.google.de/"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn csv_quotes_awkward_fields() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[record("a,\"b\"")], "de").expect("csv");
        let text = String::from_utf8(buf).expect("utf8");
        let row = text.lines().nth(1).expect("row");
        assert!(row.starts_with("\"a,\"\"b\"\"\",61.674123,"), "{row}");

        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let parsed = rdr.records().next().expect("record").expect("parse");
        assert_eq!(parsed.get(0), Some("a,\"b\""));
        assert_eq!(parsed.len(), CSV_HEADER.len());
    }

    #[test]
    fn empty_table_keeps_header() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[], "de").expect("csv");
        assert_eq!(String::from_utf8(buf).expect("utf8"), format!("{}\n", CSV_HEADER.join(",")));
    }

    #[test]
    fn links_keep_record_order() {
        let mut buf = Vec::new();
        write_links(&mut buf, &[record("B"), record("A")], "de").expect("links");
        let text = String::from_utf8(buf).expect("utf8");
        let ids: Vec<_> = text
            .lines()
            .map(|l| l.split("!1s").nth(1).and_then(|s| s.split('!').next()))
            .collect();
        assert_eq!(ids, [Some("B"), Some("A")]);
    }

    #[test]
    fn format_names_parse_back() {
        for f in [OutputFormat::Txt, OutputFormat::Csv, OutputFormat::Json] {
            assert_eq!(f.name().parse::<OutputFormat>(), Ok(f));
        }
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
