use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Capture date recorded in the file's EXIF block: `DateTimeOriginal`, or
/// `DateTime` when the original is absent. Files that cannot be opened or
/// carry no EXIF yield `None`.
pub fn capture_date(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            log::debug!("No EXIF in {}: {}", path.display(), e);
            return None;
        }
    };

    [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
        .find_map(|field| ascii_value(&field.value).and_then(|s| parse_exif_datetime(&s)))
}

fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_end_matches('\0').trim().to_string()),
        _ => None,
    }
}

pub fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    match NaiveDateTime::parse_from_str(value, EXIF_DATETIME_FORMAT) {
        Ok(dt) => Some(dt),
        Err(_) => {
            log::warn!("Failed to parse EXIF datetime: {}", value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_capture_date_missing_file() {
        assert!(capture_date(Path::new("/non/existent/file.jpg")).is_none());
    }

    #[test]
    fn test_capture_date_without_exif() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("no_exif.jpg");
        fs::write(&file_path, b"This is not an image file").unwrap();

        assert!(capture_date(&file_path).is_none());
    }

    #[test]
    fn test_parse_exif_datetime() {
        let parsed = parse_exif_datetime("2023:12:25 14:30:45").unwrap();
        assert_eq!(parsed.year(), 2023);
        assert_eq!(parsed.month(), 12);
        assert_eq!(parsed.day(), 25);
        assert_eq!(parsed.hour(), 14);
        assert_eq!(parsed.minute(), 30);
        assert_eq!(parsed.second(), 45);

        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("yesterday").is_none());
    }
}
