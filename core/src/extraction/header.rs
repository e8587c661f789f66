use crate::error::{BidscatError, Result};
use crate::extraction::path::sanitize_subject;
use crate::extraction::tags::{
    get_int_value, get_string_value, PATIENT_AGE, PATIENT_ID, PATIENT_NAME, PATIENT_SEX,
    PIXEL_DATA, SERIES_DESCRIPTION, SERIES_NUMBER, STUDY_DATE,
    STUDY_INSTANCE_UID, STUDY_TIME,
};
use dicom_object::{InMemDicomObject, OpenFileOptions};
use std::path::Path;

/// Series identity read from one representative DICOM file
///
/// # Example
///
/// ```
/// use bidscat_core::extraction::SeriesHeader;
/// use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
/// use dicom_object::InMemDicomObject;
///
/// let mut dcm = InMemDicomObject::new_empty();
/// dcm.put(DataElement::new(Tag(0x0020, 0x000D), VR::UI, PrimitiveValue::from("1.2.3")));
/// dcm.put(DataElement::new(Tag(0x0020, 0x0011), VR::IS, PrimitiveValue::from("4")));
/// dcm.put(DataElement::new(Tag(0x0008, 0x103E), VR::LO, PrimitiveValue::from("T1_MPRAGE")));
/// dcm.put(DataElement::new(Tag(0x0010, 0x0010), VR::PN, PrimitiveValue::from("Doe^Jane")));
///
/// let header = SeriesHeader::from_dicom(&dcm).unwrap();
/// assert_eq!(header.subject, "DoeJane");
/// assert_eq!(header.series_number, 4);
/// assert_eq!(header.description, "T1_MPRAGE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesHeader {
    pub series_number: u32,
    pub description: String,
    pub study_instance_uid: String,
    /// PatientName (falling back to PatientID), sanitized
    pub subject: String,
    pub study_date: Option<String>,
    pub study_time: Option<String>,
    pub age: Option<String>,
    pub sex: Option<String>,
}

impl SeriesHeader {
    /// Reads the header of a DICOM file, stopping before pixel data
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not DICOM or lacks series identity
    pub fn from_file(path: &Path) -> Result<Self> {
        let dcm = OpenFileOptions::new()
            .read_until(PIXEL_DATA)
            .open_file(path)?;
        Self::from_dicom(&dcm)
    }

    /// Extracts series identity from an opened DICOM object
    ///
    /// StudyInstanceUID, SeriesNumber and a patient identifier are required;
    /// a missing SeriesDescription reads as empty.
    pub fn from_dicom(dcm: &InMemDicomObject) -> Result<Self> {
        let study_instance_uid = get_string_value(dcm, STUDY_INSTANCE_UID)
            .ok_or_else(|| BidscatError::TagNotFound("StudyInstanceUID".to_string()))?;

        let series_number = get_int_value(dcm, SERIES_NUMBER)
            .ok_or_else(|| BidscatError::TagNotFound("SeriesNumber".to_string()))?;
        let series_number = u32::try_from(series_number).map_err(|_| {
            BidscatError::InvalidValue(format!("negative SeriesNumber {}", series_number))
        })?;

        let subject = get_string_value(dcm, PATIENT_NAME)
            .or_else(|| get_string_value(dcm, PATIENT_ID))
            .map(|name| sanitize_subject(&name))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BidscatError::TagNotFound("PatientName".to_string()))?;

        Ok(Self {
            series_number,
            description: get_string_value(dcm, SERIES_DESCRIPTION).unwrap_or_default(),
            study_instance_uid,
            subject,
            study_date: get_string_value(dcm, STUDY_DATE),
            study_time: get_string_value(dcm, STUDY_TIME),
            age: get_string_value(dcm, PATIENT_AGE),
            sex: get_string_value(dcm, PATIENT_SEX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::{DataElement, PrimitiveValue, VR};

    fn minimal_series() -> InMemDicomObject {
        let mut dcm = InMemDicomObject::new_empty();
        dcm.put(DataElement::new(
            STUDY_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from("1.2.840.1"),
        ));
        dcm.put(DataElement::new(SERIES_NUMBER, VR::IS, PrimitiveValue::from("2")));
        dcm
    }

    #[test]
    fn test_patient_id_fallback() {
        let mut dcm = minimal_series();
        dcm.put(DataElement::new(PATIENT_ID, VR::LO, PrimitiveValue::from("LC-1042")));
        let header = SeriesHeader::from_dicom(&dcm).unwrap();
        assert_eq!(header.subject, "LC1042");
        assert_eq!(header.description, "");
        assert_eq!(header.study_date, None);
    }

    #[test]
    fn test_missing_study_uid() {
        let mut dcm = InMemDicomObject::new_empty();
        dcm.put(DataElement::new(PATIENT_NAME, VR::PN, PrimitiveValue::from("A1")));
        dcm.put(DataElement::new(SERIES_NUMBER, VR::IS, PrimitiveValue::from("2")));
        assert!(matches!(
            SeriesHeader::from_dicom(&dcm),
            Err(BidscatError::TagNotFound(_))
        ));
    }

    #[test]
    fn test_missing_subject() {
        let dcm = minimal_series();
        assert!(matches!(
            SeriesHeader::from_dicom(&dcm),
            Err(BidscatError::TagNotFound(ref t)) if t == "PatientName"
        ));
    }

    #[test]
    fn test_demographics() {
        let mut dcm = minimal_series();
        dcm.put(DataElement::new(PATIENT_NAME, VR::PN, PrimitiveValue::from("A1")));
        dcm.put(DataElement::new(PATIENT_AGE, VR::AS, PrimitiveValue::from("034Y")));
        dcm.put(DataElement::new(PATIENT_SEX, VR::CS, PrimitiveValue::from("F")));
        dcm.put(DataElement::new(STUDY_DATE, VR::DA, PrimitiveValue::from("20200101")));
        let header = SeriesHeader::from_dicom(&dcm).unwrap();
        assert_eq!(header.age.as_deref(), Some("034Y"));
        assert_eq!(header.sex.as_deref(), Some("F"));
        assert_eq!(header.study_date.as_deref(), Some("20200101"));
    }

    #[test]
    fn test_from_file_rejects_non_dicom() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not a dicom file").unwrap();
        assert!(SeriesHeader::from_file(&path).is_err());
    }
}
