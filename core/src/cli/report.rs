use crate::api::Inspection;
use std::fmt;

/// Text report formatter for a scanned tree
pub struct TextReport<'a> {
    inspection: &'a Inspection,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(inspection: &'a Inspection) -> Self {
        Self { inspection }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DICOM Series Summary")?;
        writeln!(f, "====================")?;
        writeln!(f)?;
        writeln!(f, "Subjects:       {}", self.inspection.subjects)?;
        writeln!(f, "Studies:        {}", self.inspection.studies)?;
        writeln!(f, "Series:         {}", self.inspection.series)?;
        writeln!(f)?;

        writeln!(f, "Series Descriptions")?;
        writeln!(f, "-------------------")?;
        for description in &self.inspection.descriptions {
            writeln!(f, "{}", description)?;
        }

        if !self.inspection.duplicates.is_empty() {
            writeln!(f)?;
            writeln!(f, "Duplicates")?;
            writeln!(f, "----------")?;
            for group in &self.inspection.duplicates {
                writeln!(
                    f,
                    "More than one copy of {} for study {} ({} series)",
                    group.description, group.study_id, group.count
                )?;
            }
        }

        Ok(())
    }
}
