use crate::core::models::sample::{Quantity, Sample};
use std::io::Write;

/// Writes one CSV row per sample: its index, atom count, and one column per quantity.
///
/// Values missing from a sample are written as empty fields.
pub fn write_ensemble_csv<W: Write>(
    writer: W,
    samples: &[Sample],
    quantities: &[Quantity],
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["sample".to_string(), "atoms".to_string()];
    header.extend(quantities.iter().map(|q| q.label().to_ascii_lowercase()));
    csv_writer.write_record(&header)?;

    for (idx, sample) in samples.iter().enumerate() {
        let mut row = vec![(idx + 1).to_string(), sample.geometry.len().to_string()];
        row.extend(quantities.iter().map(|q| {
            sample
                .values
                .get(q)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}
