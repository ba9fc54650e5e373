//! Archive des traces GPX (tar compressé bzip2)
//!
//! Un fichier GPX par parcelle résolue, dans l'ordre des parcelles. L'export est
//! refusé tant qu'aucune parcelle n'est résolue.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bzip2::write::BzEncoder;
use bzip2::Compression;
use chrono::NaiveDate;
use parcelle::gpx::{file_name, record_document, track_name};
use parcelle::ParcelRecord;
use tracing::{debug, info, warn};

/// Issue d'un export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Aucune parcelle résolue : rien n'est écrit
    Refused,
    /// Archive écrite
    Written { path: PathBuf, files: Vec<String> },
}

/// `parcelles_<AAAA-MM-JJ>.tar.bz2`
pub fn archive_file_name(date: NaiveDate) -> String {
    format!("parcelles_{}.tar.bz2", date.format("%Y-%m-%d"))
}

/// Écrit l'archive dans `writer` et renvoie les noms des fichiers ajoutés
pub fn build_archive<'a, W, I>(writer: W, records: I) -> Result<Vec<String>>
where
    W: Write,
    I: IntoIterator<Item = &'a ParcelRecord>,
{
    let encoder = BzEncoder::new(writer, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut emitted: HashSet<String> = HashSet::new();
    let mut files = Vec::new();

    for record in records {
        let Some(document) = record_document(record)? else {
            continue;
        };

        let name = unique_name(&mut emitted, file_name(&track_name(record)));

        let mut header = tar::Header::new_gnu();
        header.set_size(document.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, &name, document.as_slice())
            .context(format!("Failed to add {} to archive", name))?;

        debug!(id = %record.id, file = %name, "GPX added to archive");
        files.push(name);
    }

    let encoder = builder.into_inner().context("Failed to finish tar stream")?;
    encoder.finish().context("Failed to finish bzip2 stream")?;

    Ok(files)
}

/// Exporte les parcelles résolues dans `<dir>/parcelles_<date>.tar.bz2`
pub fn export_archive(records: &[ParcelRecord], dir: &Path, date: NaiveDate) -> Result<ExportOutcome> {
    let resolved = records.iter().filter(|r| r.is_success()).count();
    if resolved == 0 {
        warn!("No resolved parcel, archive not written");
        return Ok(ExportOutcome::Refused);
    }

    std::fs::create_dir_all(dir)
        .context(format!("Failed to create output directory: {}", dir.display()))?;

    let path = dir.join(archive_file_name(date));
    let files = write_or_remove(&path, |writer| build_archive(writer, records))?;

    info!(path = %path.display(), files = files.len(), "Archive written");
    Ok(ExportOutcome::Written { path, files })
}

/// Écrit un fichier via `write` ; en cas d'échec, le fichier partiel est supprimé
fn write_or_remove<T, F>(path: &Path, write: F) -> Result<T>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<T>,
{
    let file = File::create(path)
        .context(format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let written = write(&mut writer).and_then(|value| {
        writer.flush()?;
        Ok(value)
    });

    if written.is_err() {
        drop(writer);
        std::fs::remove_file(path).ok();
    }
    written.context(format!("Failed to write {}", path.display()))
}

/// Suffixe `_2`, `_3`… avant `.gpx` jusqu'à obtenir un nom encore libre
fn unique_name(emitted: &mut HashSet<String>, name: String) -> String {
    let mut candidate = name.clone();
    let stem = name.strip_suffix(".gpx").unwrap_or(&name);
    let mut n = 2;
    while emitted.contains(&candidate) {
        candidate = format!("{}_{}.gpx", stem, n);
        n += 1;
    }

    emitted.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::read::BzDecoder;
    use geo::{polygon, Geometry};
    use parcelle::ParcelQuery;
    use std::io::Read;

    fn record(id: &str, commune: &str, section: &str, numero: &str, ok: bool) -> ParcelRecord {
        let mut r = ParcelRecord::new(id, ParcelQuery::new(commune, section, numero));
        r.start_loading().unwrap();
        if ok {
            let geometry = Geometry::Polygon(polygon![
                (x: 7.0, y: 49.0),
                (x: 7.001, y: 49.0),
                (x: 7.001, y: 49.001),
                (x: 7.0, y: 49.0),
            ]);
            r.succeed("57640", geometry).unwrap();
        } else {
            r.fail(None, "Commune not found").unwrap();
        }
        r
    }

    fn read_archive(bytes: &[u8]) -> Vec<(String, String)> {
        let mut archive = tar::Archive::new(BzDecoder::new(bytes));
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let path = entry.path().unwrap().to_string_lossy().into_owned();
                let mut content = String::new();
                entry.read_to_string(&mut content).unwrap();
                (path, content)
            })
            .collect()
    }

    #[test]
    fn test_archive_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(archive_file_name(date), "parcelles_2024-03-07.tar.bz2");
    }

    #[test]
    fn test_unique_name() {
        let mut emitted = HashSet::new();
        assert_eq!(unique_name(&mut emitted, "A_B_1.gpx".into()), "A_B_1.gpx");
        assert_eq!(unique_name(&mut emitted, "A_B_1.gpx".into()), "A_B_1_2.gpx");
        assert_eq!(unique_name(&mut emitted, "A_B_1.gpx".into()), "A_B_1_3.gpx");
        assert_eq!(unique_name(&mut emitted, "C_D_2.gpx".into()), "C_D_2.gpx");
        // nom déjà pris par un suffixe
        assert_eq!(unique_name(&mut emitted, "A_B_1_2.gpx".into()), "A_B_1_2_2.gpx");
    }

    #[test]
    fn test_build_archive_only_successes() {
        let records = vec![
            record("1-0", "SCHORBACH", "C", "0584", true),
            record("1-1", "NULLEPART", "B", "45", false),
            record("1-2", "SAINT LOUIS", "A", "12", true),
        ];

        let mut bytes = Vec::new();
        let files = build_archive(&mut bytes, &records).unwrap();
        assert_eq!(files, vec!["SCHORBACH_C_0584.gpx", "SAINT_LOUIS_A_12.gpx"]);

        let entries = read_archive(&bytes);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "SCHORBACH_C_0584.gpx");
        assert!(entries[0].1.contains("<name>SCHORBACH C 0584</name>"));
        assert!(entries[1].1.contains("<trkseg>"));
    }

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let records = vec![
            record("1-0", "SCHORBACH", "C", "0584", true),
            record("1-1", "SCHORBACH", "C", "0584", true),
        ];

        let mut bytes = Vec::new();
        let files = build_archive(&mut bytes, &records).unwrap();
        assert_eq!(files, vec!["SCHORBACH_C_0584.gpx", "SCHORBACH_C_0584_2.gpx"]);
    }

    #[test]
    fn test_suffix_never_collides_with_real_name() {
        let records: Vec<ParcelRecord> = parcelle::extract::extract_queries("X A 1\nX A 1\nX A 1 2")
            .into_iter()
            .enumerate()
            .map(|(i, q)| record(&format!("1-{}", i), &q.commune_name, &q.section, &q.numero, true))
            .collect();

        let mut bytes = Vec::new();
        let files = build_archive(&mut bytes, &records).unwrap();
        assert_eq!(files, vec!["X_A_1.gpx", "X_A_1_2.gpx", "X_A_1_2_2.gpx"]);

        let names: HashSet<String> = read_archive(&bytes).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let path = std::env::temp_dir().join("cadastre_gpx_partial.tar.bz2");

        let result: Result<()> = write_or_remove(&path, |writer| {
            writer.write_all(b"partial")?;
            writer.flush()?;
            anyhow::bail!("interrupted")
        });

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_export_refused_without_success() {
        let dir = std::env::temp_dir().join("cadastre_gpx_refused");
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let records = vec![record("1-0", "NULLEPART", "B", "45", false)];

        let outcome = export_archive(&records, &dir, date).unwrap();
        assert_eq!(outcome, ExportOutcome::Refused);
        assert!(!dir.join(archive_file_name(date)).exists());
    }

    #[test]
    fn test_export_archive() {
        let dir = std::env::temp_dir().join("cadastre_gpx_archive_test");
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let records = vec![
            record("1-0", "SCHORBACH", "C", "0584", true),
            record("1-1", "NULLEPART", "B", "45", false),
        ];

        let outcome = export_archive(&records, &dir, date).unwrap();
        let ExportOutcome::Written { path, files } = outcome else {
            panic!("archive should be written");
        };
        assert_eq!(path, dir.join("parcelles_2024-05-17.tar.bz2"));
        assert_eq!(files.len(), 1);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(read_archive(&bytes).len(), 1);

        std::fs::remove_file(path).ok();
    }
}
