//! Generic CSV reader with encoding and delimiter auto-detection.
//!
//! Produces a [`RawTable`] of string cells. No FoodData Central specific
//! logic here; typed table readers live in [`fdc`].

pub mod fdc;

pub use fdc::{category_counts, load_foods, load_inputs, read_definitions, read_foods, read_links};

/// CSV parsing error with context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.column, &self.value) {
            (Some(col), Some(val)) => {
                write!(f, "Line {}, column '{}' (value '{}'): {}", self.line, col, val, self.message)
            }
            (Some(col), None) => {
                write!(f, "Line {}, column '{}': {}", self.line, col, self.message)
            }
            _ => {
                write!(f, "Line {}: {}", self.line, self.message)
            }
        }
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// A parsed CSV file with metadata
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Column headers
    pub headers: Vec<String>,
    /// Data rows with their 1-based line numbers
    pub rows: Vec<(usize, csv::StringRecord)>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

impl RawTable {
    /// Index of a header by exact name (cells are already trimmed by the reader).
    pub fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Bytes inspected when guessing the encoding.
const ENCODING_SAMPLE_BYTES: usize = 64 * 1024;

/// Detect the encoding of raw bytes using chardet.
///
/// Valid UTF-8 is reported as such without guessing. Otherwise chardet sees
/// the first [`ENCODING_SAMPLE_BYTES`], cut back to a character boundary when
/// the sample ends inside a UTF-8 sequence.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let mut sample = &bytes[..bytes.len().min(ENCODING_SAMPLE_BYTES)];
    if let Err(e) = std::str::from_utf8(sample) {
        // Truncated sequence at the end of the sample
        if e.error_len().is_none() {
            sample = &sample[..e.valid_up_to()];
        }
    }

    let result = chardet::detect(sample);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // Fallback: UTF-8 with lossy conversion
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Quoted fields may contain the delimiter, as FoodData Central
/// descriptions do ("Apple, raw").
///
/// # Example
/// ```ignore
/// use nutritab::parser::parse_str;
///
/// let table = parse_str("id,name\n1,\"Apple, raw\"", ',', "utf-8").unwrap();
/// assert_eq!(table.headers, vec!["id", "name"]);
/// assert_eq!(&table.rows[0].1[1], "Apple, raw");
/// ```
pub fn parse_str(content: &str, delimiter: char, encoding: &str) -> Result<RawTable, CsvError> {
    if content.trim().is_empty() {
        return Err(CsvError::new(1, "Empty CSV file"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::new(1, format!("Cannot read header: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::new(1, "No headers found"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
            CsvError::new(line, format!("Invalid CSV row: {}", e))
        })?;

        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        rows.push((line, record));
    }

    Ok(RawTable {
        headers,
        rows,
        encoding: encoding.to_string(),
        delimiter,
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<RawTable, CsvError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    parse_str(&content, delimiter, &encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = parse_str("name,age\nAlice,30\nBob,25", ',', "utf-8").unwrap();

        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(&table.rows[0].1[0], "Alice");
        assert_eq!(&table.rows[1].1[1], "25");
    }

    #[test]
    fn test_quoted_values_with_delimiter() {
        let csv = "\"fdc_id\",\"description\"\n\"321358\",\"Hummus, commercial\"";
        let table = parse_str(csv, ',', "utf-8").unwrap();

        assert_eq!(table.headers, vec!["fdc_id", "description"]);
        assert_eq!(&table.rows[0].1[1], "Hummus, commercial");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_str("a,b\n1,2\n\n3,4\n", ',', "utf-8").unwrap();
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_line_numbers() {
        let table = parse_str("a,b\n1,2\n3,4", ',', "utf-8").unwrap();
        assert_eq!(table.rows[0].0, 2);
        assert_eq!(table.rows[1].0, 3);
    }

    #[test]
    fn test_error_message_format() {
        let err = CsvError::new(5, "Invalid value")
            .with_column("amount")
            .with_value("abc");

        let msg = err.to_string();
        assert!(msg.contains("Line 5"));
        assert!(msg.contains("column 'amount'"));
        assert!(msg.contains("value 'abc'"));
    }

    #[test]
    fn test_empty_csv_error() {
        let err = parse_str("", ',', "utf-8").unwrap_err();
        assert!(err.message.contains("Empty"));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_auto_parse_strips_bom() {
        let csv = "\u{feff}id,name\n1,Apple";
        let table = parse_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(table.delimiter, ',');
        assert_eq!(table.headers, vec!["id", "name"]);
        assert_eq!(table.position("id"), Some(0));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Pâté" in ISO-8859-1
        let bytes: &[u8] = &[0x50, 0xE2, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Pâté");

        // ¤ ¼ ½ ¾ keep their Latin-1 meaning
        let bytes: &[u8] = &[0xA4, 0xBC, 0xBD, 0xBE];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "¤¼½¾");
    }

    #[test]
    fn test_utf8_char_across_sample_boundary() {
        let header = "fdc_id,data_type,description\n";
        let prefix = "0,foundation_food,";
        let filler = "a".repeat(ENCODING_SAMPLE_BYTES - 1 - header.len() - prefix.len());
        let csv = format!(
            "{}{}{}é\n1,foundation_food,Crème brûlée\n",
            header, prefix, filler
        );
        // 'é' starts on the last sampled byte
        assert_eq!(csv.as_bytes()[ENCODING_SAMPLE_BYTES - 1], 0xC3);

        assert_eq!(detect_encoding(csv.as_bytes()), "utf-8");

        let table = parse_bytes_auto(csv.as_bytes()).unwrap();
        assert_eq!(table.encoding, "utf-8");
        assert_eq!(&table.rows[1].1[2], "Crème brûlée");
    }
}
