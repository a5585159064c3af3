//! Serialization of the point log to the two export formats, plus the small
//! presentation helpers shared by the details panel and the clipboard.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::points::ClickPoint;

#[derive(Serialize)]
struct Coordinates<T: Serialize> {
    x: T,
    y: T,
}

/// One record of the structured export. Field order here is the field order
/// in the output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRecord<'a> {
    id: &'a str,
    image_coordinates: Coordinates<i32>,
    display_coordinates: Coordinates<f32>,
    timestamp: String,
}

fn iso_timestamp(point: &ClickPoint) -> String {
    point.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Pretty-printed JSON array of all points, in log order.
///
/// # Errors
/// Returns `serde_json::Error` if serialization fails (it cannot for these
/// types, but the signature keeps the seam honest).
pub fn to_json(points: &[ClickPoint]) -> Result<String, serde_json::Error> {
    let records: Vec<ExportRecord<'_>> = points
        .iter()
        .map(|p| ExportRecord {
            id: &p.id,
            image_coordinates: Coordinates { x: p.image_x, y: p.image_y },
            display_coordinates: Coordinates { x: p.display_x, y: p.display_y },
            timestamp: iso_timestamp(p),
        })
        .collect();
    serde_json::to_string_pretty(&records)
}

/// CSV with a fixed header and one row per point, in log order.
///
/// Display coordinates are rounded to whole numbers for this format only.
/// Fields are joined without quoting; ids are generator-controlled and never
/// contain commas.
pub fn to_csv(points: &[ClickPoint]) -> String {
    let mut lines = vec!["ID,Image X,Image Y,Display X,Display Y,Timestamp".to_owned()];
    for p in points {
        lines.push(format!(
            "{},{},{},{},{},{}",
            p.id,
            p.image_x,
            p.image_y,
            f64::from(p.display_x).round() as i64,
            f64::from(p.display_y).round() as i64,
            iso_timestamp(p),
        ));
    }
    lines.join("\n")
}

/// Short clipboard text for a single point.
pub fn clipboard_line(point: &ClickPoint) -> String {
    format!("Image: ({}, {})", point.image_x, point.image_y)
}

/// Timestamped file name for an export download, e.g.
/// `coordinates-1722945600000.json`.
pub fn export_file_name(extension: &str) -> String {
    format!("coordinates-{}.{extension}", Utc::now().timestamp_millis())
}

/// Human-readable byte size with up to two decimals: `0 Bytes`, `1.5 KB`,
/// `2.25 MB`.
pub fn format_file_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_owned();
    }
    let exponent = (((bytes as f64).ln() / 1024_f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exponent as i32);
    let mut figure = format!("{value:.2}");
    while figure.ends_with('0') {
        figure.pop();
    }
    if figure.ends_with('.') {
        figure.pop();
    }
    format!("{figure} {}", UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone as _};

    fn sample_point(id: &str, image: (i32, i32), display: (f32, f32)) -> ClickPoint {
        ClickPoint {
            id: id.to_owned(),
            display_x: display.0,
            display_y: display.1,
            image_x: image.0,
            image_y: image.1,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 7, 12, 30, 45).unwrap(),
        }
    }

    #[test]
    fn json_round_trips_image_coordinates_in_order() {
        let points = vec![
            sample_point("click-one", (12, 34), (11.6, 33.2)),
            sample_point("click-two", (-5, 900), (0.0, 0.0)),
        ];

        let json = to_json(&points).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let records = parsed.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], "click-one");
        assert_eq!(records[0]["imageCoordinates"]["x"], 12);
        assert_eq!(records[0]["imageCoordinates"]["y"], 34);
        assert_eq!(records[1]["imageCoordinates"]["x"], -5);
        assert_eq!(records[1]["imageCoordinates"]["y"], 900);
        assert_eq!(records[0]["timestamp"], "2024-03-07T12:30:45.000Z");
    }

    #[test]
    fn json_field_order_is_stable() {
        let json = to_json(&[sample_point("p", (1, 2), (1.0, 2.0))]).unwrap();
        let id_at = json.find("\"id\"").unwrap();
        let image_at = json.find("\"imageCoordinates\"").unwrap();
        let display_at = json.find("\"displayCoordinates\"").unwrap();
        let ts_at = json.find("\"timestamp\"").unwrap();
        assert!(id_at < image_at && image_at < display_at && display_at < ts_at);
    }

    #[test]
    fn csv_rounds_display_coordinates() {
        let points = vec![sample_point("click-one", (12, 34), (11.6, 33.2))];
        let csv = to_csv(&points);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ID,Image X,Image Y,Display X,Display Y,Timestamp"
        );
        assert_eq!(
            lines.next().unwrap(),
            "click-one,12,34,12,33,2024-03-07T12:30:45.000Z"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_log_exports_are_empty() {
        let json = to_json(&[]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 0);

        let csv = to_csv(&[]);
        assert_eq!(csv, "ID,Image X,Image Y,Display X,Display Y,Timestamp");
    }

    #[test]
    fn clipboard_line_uses_image_coordinates() {
        let p = sample_point("p", (640, 480), (320.0, 240.0));
        assert_eq!(clipboard_line(&p), "Image: (640, 480)");
    }

    #[test]
    fn timestamps_render_with_millisecond_precision() {
        let ts: DateTime<Utc> = Utc.timestamp_millis_opt(1_709_814_645_123).unwrap();
        let mut p = sample_point("p", (0, 0), (0.0, 0.0));
        p.timestamp = ts;
        let csv = to_csv(&[p]);
        assert!(csv.ends_with("2024-03-07T12:30:45.123Z"), "csv was: {csv}");
    }

    #[test]
    fn file_sizes_format_like_the_details_panel_expects() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2_359_296), "2.25 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn export_file_name_has_the_requested_extension() {
        let name = export_file_name("csv");
        assert!(name.starts_with("coordinates-"));
        assert!(name.ends_with(".csv"));
    }
}
