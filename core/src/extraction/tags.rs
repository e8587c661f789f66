use dicom_core::Tag;
use dicom_object::InMemDicomObject;

// Study/Series Identification Tags
pub use dicom_dictionary_std::tags::{
    SERIES_DESCRIPTION, SERIES_NUMBER, STUDY_DATE, STUDY_INSTANCE_UID,
    STUDY_TIME,
};

// Patient Tags
pub use dicom_dictionary_std::tags::{PATIENT_AGE, PATIENT_ID, PATIENT_NAME, PATIENT_SEX};

// Reading stops here; series identity never needs pixel data
pub use dicom_dictionary_std::tags::PIXEL_DATA;

/// Helper to get string value from DICOM tag
///
/// Returns `None` if the tag is not present, cannot be converted to string,
/// or is blank
pub fn get_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Helper to get integer value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to i32
pub fn get_int_value(dcm: &InMemDicomObject, tag: Tag) -> Option<i32> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<i32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::{DataElement, PrimitiveValue, VR};

    #[test]
    fn test_tag_values() {
        assert_eq!(SERIES_NUMBER, Tag(0x0020, 0x0011));
        assert_eq!(SERIES_DESCRIPTION, Tag(0x0008, 0x103E));
        assert_eq!(STUDY_INSTANCE_UID, Tag(0x0020, 0x000D));
        assert_eq!(PATIENT_NAME, Tag(0x0010, 0x0010));
        assert_eq!(PIXEL_DATA, Tag(0x7FE0, 0x0010));
    }

    #[test]
    fn test_blank_string_is_none() {
        let mut dcm = InMemDicomObject::new_empty();
        dcm.put(DataElement::new(
            SERIES_DESCRIPTION,
            VR::LO,
            PrimitiveValue::from("  "),
        ));
        assert_eq!(get_string_value(&dcm, SERIES_DESCRIPTION), None);
        assert_eq!(get_string_value(&dcm, PATIENT_NAME), None);
    }

    #[test]
    fn test_int_value() {
        let mut dcm = InMemDicomObject::new_empty();
        dcm.put(DataElement::new(SERIES_NUMBER, VR::IS, PrimitiveValue::from("7")));
        assert_eq!(get_int_value(&dcm, SERIES_NUMBER), Some(7));
    }
}
