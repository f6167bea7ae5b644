use crate::domain::model::TransferReport;
use crate::utils::error::Result;
use std::io::Write;
use std::path::Path;

pub fn write_csv<W: Write>(writer: W, reports: &[TransferReport]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for report in reports {
        csv_writer.serialize(report)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv_file<P: AsRef<Path>>(path: P, reports: &[TransferReport]) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path.as_ref())?;
    write_csv(file, reports)?;
    tracing::info!("Report written to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Direction;

    #[test]
    fn test_write_csv() {
        let reports = vec![
            TransferReport {
                step: "copy contact notes".to_string(),
                direction: Direction::Forward,
                source: "seqr_matchmakercontactnotes".to_string(),
                destination: "matchmaker_matchmakercontactnotes".to_string(),
                records: 3,
            },
            TransferReport {
                step: "delete table seqr_matchmakerresult".to_string(),
                direction: Direction::Forward,
                source: "seqr_matchmakerresult".to_string(),
                destination: "seqr_matchmakerresult".to_string(),
                records: 0,
            },
        ];

        let mut buffer = Vec::new();
        write_csv(&mut buffer, &reports).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "step,direction,source,destination,records");
        assert_eq!(
            lines[1],
            "copy contact notes,forward,seqr_matchmakercontactnotes,matchmaker_matchmakercontactnotes,3"
        );
        assert_eq!(lines.len(), 3);
    }
}
