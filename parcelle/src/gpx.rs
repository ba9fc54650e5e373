//! Écriture de traces GPX 1.1 (streaming)

use std::io::Write;

use crate::geometry::track_segments;
use crate::types::{ParcelRecord, TrackPoint};
use crate::ParcelError;

/// Nom de la trace d'une parcelle : "commune section numero"
pub fn track_name(record: &ParcelRecord) -> String {
    record.query.label()
}

/// Nom de fichier dérivé du nom de trace.
///
/// Les blancs deviennent `_`, puis tout caractère hors `[a-zA-Z0-9_.-]` est supprimé.
pub fn file_name(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join("_");
    let mut out: String = collapsed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    out.push_str(".gpx");
    out
}

/// Document GPX d'une parcelle résolue (`None` si la parcelle n'est pas en succès)
pub fn record_document(record: &ParcelRecord) -> Result<Option<Vec<u8>>, ParcelError> {
    let Some(geometry) = record.geometry() else {
        return Ok(None);
    };

    let mut buf = Vec::with_capacity(4096);
    write_gpx(&mut buf, &track_name(record), &track_segments(geometry))?;
    Ok(Some(buf))
}

/// Écrit un document GPX : une trace, un segment par anneau
pub fn write_gpx<W: Write>(
    writer: &mut W,
    name: &str,
    segments: &[Vec<TrackPoint>],
) -> Result<(), ParcelError> {
    let name = escape_xml(name);

    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        writer,
        r#"<gpx version="1.1" creator="{}" xmlns="http://www.topografix.com/GPX/1/1">"#,
        env!("CARGO_PKG_NAME")
    )?;
    writeln!(writer, "  <metadata><name>{}</name></metadata>", name)?;
    writeln!(writer, "  <trk>")?;
    writeln!(writer, "    <name>{}</name>", name)?;

    for segment in segments {
        writeln!(writer, "    <trkseg>")?;
        for p in segment {
            writeln!(
                writer,
                r#"      <trkpt lat="{}" lon="{}"><ele>{}</ele></trkpt>"#,
                p.lat, p.lon, p.ele
            )?;
        }
        writeln!(writer, "    </trkseg>")?;
    }

    writeln!(writer, "  </trk>")?;
    writeln!(writer, "</gpx>")?;
    writer.flush()?;

    Ok(())
}

/// Échappe une chaîne pour XML
fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            c if c.is_control() => {}
            c => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParcelQuery;
    use geo::{coord, Geometry, LineString, Polygon};

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("SCHORBACH C 0584"), "SCHORBACH_C_0584.gpx");
        assert_eq!(file_name("Saint  Jean\tB 12"), "Saint_Jean_B_12.gpx");
        assert_eq!(
            file_name("Sarreguemines-Rémelfing L'Hôpital A 7"),
            "Sarreguemines-Rmelfing_LHpital_A_7.gpx"
        );
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("A & B <C>"), "A &amp; B &lt;C&gt;");
        assert_eq!(escape_xml("L'Hôpital"), "L&apos;Hôpital");
    }

    #[test]
    fn test_write_gpx() {
        let segments = vec![
            vec![
                TrackPoint { lat: 49.0, lon: 7.0, ele: 0.0 },
                TrackPoint { lat: 49.001, lon: 7.0, ele: 0.0 },
            ],
            vec![TrackPoint { lat: 49.5, lon: 7.5, ele: 0.0 }],
        ];

        let mut buf = Vec::new();
        write_gpx(&mut buf, "SCHORBACH C 0584", &segments).unwrap();
        let xml = String::from_utf8(buf).unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<metadata><name>SCHORBACH C 0584</name></metadata>"));
        assert_eq!(xml.matches("<trk>").count(), 1);
        assert_eq!(xml.matches("<trkseg>").count(), 2);
        assert_eq!(xml.matches("<trkpt ").count(), 3);
        assert!(xml.contains(r#"<trkpt lat="49.001" lon="7"><ele>0</ele></trkpt>"#));
        assert!(xml.trim_end().ends_with("</gpx>"));
    }

    #[test]
    fn test_record_document() {
        let query = ParcelQuery::new("SCHORBACH", "C", "0584");
        let mut record = ParcelRecord::new("1-0", query);
        assert!(record_document(&record).unwrap().is_none());

        let ring = LineString::new(vec![
            coord! { x: 7.0, y: 49.0 },
            coord! { x: 7.001, y: 49.0 },
            coord! { x: 7.001, y: 49.001 },
            coord! { x: 7.0, y: 49.0 },
        ]);
        record.start_loading().unwrap();
        record
            .succeed("57640", Geometry::Polygon(Polygon::new(ring, vec![])))
            .unwrap();

        let doc = String::from_utf8(record_document(&record).unwrap().unwrap()).unwrap();
        assert!(doc.contains("<name>SCHORBACH C 0584</name>"));
        assert_eq!(doc.matches("<trkpt ").count(), 4);
        assert!(doc.contains(r#"lat="49" lon="7.001""#));
    }
}
