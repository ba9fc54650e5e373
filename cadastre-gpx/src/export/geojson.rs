//! Couche cartographique GeoJSON (streaming avec geozero)
//!
//! Une feature par parcelle résolue, puis une feature ponctuelle par cote des
//! parcelles mesurées. Coordonnées en EPSG:4326.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use parcelle::geometry::{format_area, geometry_area, measure_edges};
use parcelle::{Edge, ParcelRecord};
use serde_json::json;
use tracing::info;

/// Ce que la carte affiche : parcelle sélectionnée, parcelles mesurées
#[derive(Debug, Clone, Default)]
pub struct MapView {
    pub selected: Option<String>,
    pub measured: HashSet<String>,
}

impl MapView {
    pub fn new(selected: Option<String>, measured: impl IntoIterator<Item = String>) -> Self {
        Self {
            selected,
            measured: measured.into_iter().collect(),
        }
    }

    /// Mesure toutes les parcelles
    pub fn measure_all(selected: Option<String>, records: &[ParcelRecord]) -> Self {
        Self::new(selected, records.iter().map(|r| r.id.clone()))
    }

    fn is_selected(&self, record: &ParcelRecord) -> bool {
        self.selected.as_deref() == Some(record.id.as_str())
    }
}

/// Exporte la couche dans un fichier
pub fn export_map_layer(records: &[ParcelRecord], view: &MapView, output_path: &Path) -> Result<usize> {
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    let count = write_map_layer(&mut writer, records, view)?;
    writer.flush()?;

    info!(path = %output_path.display(), features = count, "Map layer written");
    Ok(count)
}

/// Écrit la FeatureCollection et renvoie le nombre de features
pub fn write_map_layer<W: Write>(
    writer: &mut W,
    records: &[ParcelRecord],
    view: &MapView,
) -> Result<usize> {
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::4326"}}}},"features":["#
    )?;

    let mut count = 0;

    for record in records.iter().filter(|r| r.is_success()) {
        if count > 0 {
            write!(writer, ",")?;
        }
        write_parcel(writer, record, view.is_selected(record))?;
        count += 1;
    }

    for edge in measure_edges(records, &view.measured) {
        if count > 0 {
            write!(writer, ",")?;
        }
        write_edge(writer, &edge)?;
        count += 1;
    }

    write!(writer, "]}}")?;
    Ok(count)
}

/// Écrit une parcelle résolue
fn write_parcel<W: Write>(writer: &mut W, record: &ParcelRecord, selected: bool) -> Result<()> {
    let Some(geometry) = record.geometry() else {
        return Ok(());
    };

    write!(
        writer,
        r#"{{"type":"Feature","id":{},"#,
        serde_json::to_string(&record.id)?
    )?;

    write!(writer, r#""geometry":"#)?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    geometry.process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    let area = geometry_area(geometry);
    let properties = json!({
        "kind": "parcel",
        "label": record.query.label(),
        "status": record.status_kind(),
        "area_m2": (area * 100.0).round() / 100.0,
        "area_label": format_area(area),
        "insee": record.insee_code().unwrap_or_default(),
        "selected": selected,
    });
    write!(writer, r#","properties":{}}}"#, properties)?;

    Ok(())
}

/// Écrit une cote (point au milieu du segment)
fn write_edge<W: Write>(writer: &mut W, edge: &Edge) -> Result<()> {
    let feature = json!({
        "type": "Feature",
        "geometry": {
            "type": "Point",
            "coordinates": [edge.position.lon, edge.position.lat],
        },
        "properties": {
            "kind": "edge",
            "owner": edge.owner_id,
            "length_m": edge.length_meters,
        },
    });
    serde_json::to_writer(&mut *writer, &feature)?;
    Ok(())
}
