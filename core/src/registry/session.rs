use super::record::SeriesRecord;
use std::collections::{HashMap, HashSet};

struct StudyOrder<'a> {
    study_id: &'a str,
    earliest: Option<(&'a str, &'a str)>,
    first_seen: usize,
}

/// Numbers each subject's studies as sessions 1, 2, ...
///
/// Studies are ordered by their earliest `(date, time)`; undated studies come
/// after dated ones, and ties keep the order in which studies were first
/// encountered. Every record of a study gets the same session.
///
/// Returns the number of subjects with more than one session.
pub fn assign_sessions(records: &mut [SeriesRecord]) -> usize {
    let sessions = rank_studies(records);

    let mut multi_session = HashSet::new();
    for record in records.iter_mut() {
        let session = sessions[&(record.subject.clone(), record.study_id.clone())];
        record.session = Some(session);
        if session > 1 {
            multi_session.insert(record.subject.clone());
        }
    }

    if !multi_session.is_empty() {
        log::warn!(
            "Session numbers for {} subject(s) assume studies sort chronologically by date; \
             they are not checked against acquisition times",
            multi_session.len()
        );
    }
    multi_session.len()
}

fn rank_studies(records: &[SeriesRecord]) -> HashMap<(String, String), u32> {
    let mut by_subject: Vec<(&str, Vec<StudyOrder>)> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let position = match by_subject.iter().position(|(s, _)| *s == record.subject) {
            Some(position) => position,
            None => {
                by_subject.push((record.subject.as_str(), Vec::new()));
                by_subject.len() - 1
            }
        };
        let studies = &mut by_subject[position].1;

        let key = record.study_time_key();
        match studies.iter_mut().find(|s| s.study_id == record.study_id) {
            Some(study) => {
                if let Some(key) = key {
                    if study.earliest.map_or(true, |current| key < current) {
                        study.earliest = Some(key);
                    }
                }
            }
            None => studies.push(StudyOrder {
                study_id: record.study_id.as_str(),
                earliest: key,
                first_seen: index,
            }),
        }
    }

    let mut sessions = HashMap::new();
    for (subject, mut studies) in by_subject {
        studies.sort_by(|a, b| {
            a.earliest
                .is_none()
                .cmp(&b.earliest.is_none())
                .then_with(|| a.earliest.cmp(&b.earliest))
                .then_with(|| a.first_seen.cmp(&b.first_seen))
        });
        for (rank, study) in studies.iter().enumerate() {
            sessions.insert(
                (subject.to_string(), study.study_id.to_string()),
                rank as u32 + 1,
            );
        }
    }
    sessions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str, study: &str, ordinal: u32, date: Option<&str>) -> SeriesRecord {
        let record = SeriesRecord::new(
            format!("/raw/{}/Series_{}", study, ordinal),
            subject,
            study,
            ordinal,
            "bold",
        );
        match date {
            Some(date) => record.with_date(date),
            None => record,
        }
    }

    #[test]
    fn test_sessions_follow_dates_not_disk_order() {
        // Later study encountered first
        let mut records = vec![
            record("A1", "study-b", 1, Some("20200301")),
            record("A1", "study-b", 2, Some("20200301")),
            record("A1", "study-a", 1, Some("20200101")),
            record("A1", "study-a", 2, Some("20200101")),
        ];

        assert_eq!(assign_sessions(&mut records), 1);
        let sessions: Vec<_> = records.iter().map(|r| r.session).collect();
        assert_eq!(sessions, [Some(2), Some(2), Some(1), Some(1)]);
    }

    #[test]
    fn test_sessions_are_per_subject() {
        let mut records = vec![
            record("A1", "a-late", 1, Some("20200301")),
            record("B2", "b-only", 1, Some("20190101")),
            record("A1", "a-early", 1, Some("20200101")),
        ];

        assign_sessions(&mut records);
        assert_eq!(records[0].session, Some(2));
        assert_eq!(records[1].session, Some(1));
        assert_eq!(records[2].session, Some(1));
    }

    #[test]
    fn test_equal_dates_keep_first_encounter() {
        let mut records = vec![
            record("A1", "second-name", 1, Some("20200101")),
            record("A1", "first-name", 1, Some("20200101")),
        ];

        assign_sessions(&mut records);
        assert_eq!(records[0].session, Some(1));
        assert_eq!(records[1].session, Some(2));
    }

    #[test]
    fn test_time_breaks_same_day_ties() {
        let mut records = vec![
            record("A1", "pm", 1, Some("20200101")).with_time("1400"),
            record("A1", "am", 1, Some("20200101")).with_time("0900"),
        ];

        assign_sessions(&mut records);
        assert_eq!(records[0].session, Some(2));
        assert_eq!(records[1].session, Some(1));
    }

    #[test]
    fn test_undated_studies_sort_last() {
        let mut records = vec![
            record("A1", "undated", 1, None),
            record("A1", "dated", 1, Some("20200101")),
        ];

        assign_sessions(&mut records);
        assert_eq!(records[0].session, Some(2));
        assert_eq!(records[1].session, Some(1));
    }

    #[test]
    fn test_single_study_subjects_get_session_one() {
        let mut records = vec![record("A1", "only", 1, Some("20200101"))];
        assert_eq!(assign_sessions(&mut records), 0);
        assert_eq!(records[0].session, Some(1));
    }
}
