//! Human-readable summaries and processing energy estimates.

use super::detector::Finding;
use super::document::{DocumentMetadata, FileType};

/// kWh per KiB of processed input.
pub const ENERGY_PER_FILE_KB: f64 = 0.001;
/// Fixed kWh cost per processed file.
pub const ENERGY_BASE_PROCESSING: f64 = 0.005;
/// Extra kWh when anomalies were found.
pub const ENERGY_ANOMALY_BONUS: f64 = 0.002;

/// One-paragraph summary shown next to an analysed file.
pub fn generate_summary(
    file_type: FileType,
    metadata: &DocumentMetadata,
    finding: &Finding,
) -> String {
    let mut summary = format!(
        "{} file processed successfully. ",
        file_type.as_str().to_uppercase()
    );

    match (file_type, metadata.page_count, metadata.row_count) {
        (FileType::Pdf, Some(pages), _) if pages > 0 => {
            summary.push_str(&format!("{} pages analyzed. ", pages));
        }
        (FileType::Csv, _, Some(rows)) if rows > 0 => {
            summary.push_str(&format!(
                "{} rows with {} columns analyzed. ",
                rows,
                metadata.headers().len()
            ));
        }
        _ => {}
    }

    if finding.detected() {
        summary.push_str(&format!(
            "⚠️ {} sustainability issue(s) detected ({} priority).",
            finding.issues().len(),
            finding.severity()
        ));
    } else {
        summary.push_str("✅ No critical environmental issues detected.");
    }

    summary
}

/// Estimated kWh spent processing a file, rounded to four decimals.
pub fn estimate_energy(file_size_bytes: u64, has_anomalies: bool) -> f64 {
    let size_kb = file_size_bytes as f64 / 1024.0;
    let bonus = if has_anomalies {
        ENERGY_ANOMALY_BONUS
    } else {
        0.0
    };
    let total = size_kb * ENERGY_PER_FILE_KB + ENERGY_BASE_PROCESSING + bonus;
    (total * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detect;

    #[test]
    fn test_csv_summary_with_anomalies() {
        let metadata = DocumentMetadata::tabular(
            2048,
            12,
            vec!["timestamp".to_string(), "energy_kwh".to_string()],
        );
        let finding = detect("pump failure", &metadata);
        let summary = generate_summary(FileType::Csv, &metadata, &finding);

        assert!(summary.starts_with("CSV file processed successfully. "));
        assert!(summary.contains("12 rows with 2 columns analyzed."));
        assert!(summary.contains("⚠️ 2 sustainability issue(s) detected (high priority)."));
    }

    #[test]
    fn test_pdf_summary_without_anomalies() {
        let metadata = DocumentMetadata {
            page_count: Some(4),
            ..Default::default()
        };
        let summary = generate_summary(FileType::Pdf, &metadata, &Finding::none());
        assert_eq!(
            summary,
            "PDF file processed successfully. 4 pages analyzed. ✅ No critical environmental issues detected."
        );
    }

    #[test]
    fn test_energy_estimate() {
        assert_eq!(estimate_energy(0, false), 0.005);
        assert_eq!(estimate_energy(1024, false), 0.006);
        assert_eq!(estimate_energy(2048, true), 0.009);
    }
}
