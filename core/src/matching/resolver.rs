use super::policy::DuplicatePolicy;
use crate::registry::SeriesRecord;
use crate::report::{Report, Warning};
use crate::types::{EntityKey, EntityOverlay, EntityValue, MappingRule, Placeholder, RuleSet};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

/// One series selected by a rule
#[derive(Debug, Clone)]
pub struct MatchedSeries<'a> {
    pub record: &'a SeriesRecord,

    /// Path of the series relative to the selection's input root
    pub relative_path: PathBuf,

    /// Run number assigned by auto-run
    pub run: Option<u32>,
}

impl<'a> MatchedSeries<'a> {
    /// Resolves the rule's deferred entities for this series only
    pub fn overlay<'r>(&self, rule: &'r MappingRule) -> EntityOverlay<'r> {
        let chain = rule.chain();
        let mut overlay = EntityOverlay::new(chain);

        if let (Some(EntityValue::Deferred(Placeholder::Session)), Some(session)) =
            (chain.get(EntityKey::Ses), self.record.session)
        {
            overlay = overlay.with_value(EntityKey::Ses, session.to_string());
        }
        if let (Some(EntityValue::Deferred(Placeholder::Run)), Some(run)) =
            (chain.get(EntityKey::Run), self.run)
        {
            overlay = overlay.with_value(EntityKey::Run, format_run(run));
        }
        overlay
    }

    /// Output directory and file stem this series converts to
    pub fn output_target(&self, rule: &MappingRule) -> (String, String) {
        let overlay = self.overlay(rule);
        (
            overlay.output_dir(&self.record.subject, rule.datatype()),
            overlay.file_stem(&self.record.subject, rule.suffix()),
        )
    }
}

/// Zero-padded run label
pub fn format_run(run: u32) -> String {
    format!("{:02}", run)
}

/// Series selected by one rule
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub rule: &'a MappingRule,

    /// Common ancestor of every selected series' parent directory
    pub input_root: PathBuf,

    pub matches: Vec<MatchedSeries<'a>>,
}

impl Selection<'_> {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Whether any selected series carries a session number
    pub fn has_sessions(&self) -> bool {
        self.matches.iter().any(|m| m.record.session.is_some())
    }
}

/// Selects the series a rule converts
///
/// Returns `None`, after reporting a [`Warning::NoMatch`], when nothing is
/// selected. Duplicates of one description within a study are reported
/// whenever the rule has no ordinal index, and then handled per `policy`.
pub fn resolve<'a>(
    rule: &'a MappingRule,
    records: &'a [SeriesRecord],
    policy: DuplicatePolicy,
    report: &mut Report,
) -> Option<Selection<'a>> {
    let candidates: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| rule.matches(&record.description))
        .map(|(i, _)| i)
        .collect();

    let selected = match rule.ordinal_index() {
        Some(index) => select_ordinal(records, &candidates, index),
        None => apply_duplicate_policy(records, &candidates, policy, report),
    };

    if selected.is_empty() {
        report.warn(Warning::NoMatch {
            rule: rule.description().to_string(),
            search: rule.search().to_string(),
        });
        return None;
    }

    let runs = if rule.auto_run() {
        number_runs(records, &selected)
    } else {
        HashMap::new()
    };

    let input_root = common_ancestor(selected.iter().map(|&i| records[i].path.as_path()));
    if input_root.as_os_str().is_empty() {
        log::warn!(
            "Rule {} selected series with no common input directory, using full paths",
            rule.description()
        );
    }
    let matches = selected
        .into_iter()
        .map(|i| {
            let record = &records[i];
            MatchedSeries {
                record,
                relative_path: record
                    .path
                    .strip_prefix(&input_root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| record.path.clone()),
                run: runs.get(&i).copied(),
            }
        })
        .collect();

    log::debug!(
        "Rule {} selected series under {}",
        rule.description(),
        input_root.display()
    );
    Some(Selection {
        rule,
        input_root,
        matches,
    })
}

/// Resolves every rule in declaration order, skipping rules without matches
pub fn resolve_all<'a>(
    rules: &'a RuleSet,
    records: &'a [SeriesRecord],
    policy: DuplicatePolicy,
    report: &mut Report,
) -> Vec<Selection<'a>> {
    rules
        .iter()
        .filter_map(|rule| resolve(rule, records, policy, report))
        .collect()
}

/// Groups of more than one record sharing `(description, study_id)`, in
/// order of first encounter
pub fn find_duplicates(records: &[SeriesRecord]) -> Vec<Vec<&SeriesRecord>> {
    duplicate_groups(records, 0..records.len())
        .into_iter()
        .map(|group| group.into_iter().map(|i| &records[i]).collect())
        .collect()
}

fn duplicate_groups(
    records: &[SeriesRecord],
    indices: impl IntoIterator<Item = usize>,
) -> Vec<Vec<usize>> {
    group_by_key(indices, |i| {
        (records[i].description.as_str(), records[i].study_id.as_str())
    })
    .into_iter()
    .filter(|group| group.len() > 1)
    .collect()
}

/// Picks the `index`-th (1-based) series by ordinal from every study
fn select_ordinal(records: &[SeriesRecord], candidates: &[usize], index: usize) -> Vec<usize> {
    group_by_key(candidates.iter().copied(), |i| records[i].study_id.as_str())
        .into_iter()
        .filter_map(|mut study| {
            study.sort_by_key(|&i| records[i].ordinal);
            study.get(index - 1).copied()
        })
        .collect()
}

fn apply_duplicate_policy(
    records: &[SeriesRecord],
    candidates: &[usize],
    policy: DuplicatePolicy,
    report: &mut Report,
) -> Vec<usize> {
    let mut dropped: HashSet<usize> = HashSet::new();

    for group in duplicate_groups(records, candidates.iter().copied()) {
        let first = &records[group[0]];
        report.warn(Warning::DuplicateSeries {
            description: first.description.clone(),
            study_id: first.study_id.clone(),
            count: group.len(),
        });

        match policy {
            DuplicatePolicy::ConvertAll => {}
            DuplicatePolicy::FirstOnly => {
                let keep = group.iter().copied().min_by_key(|&i| records[i].ordinal);
                dropped.extend(group.into_iter().filter(|&i| Some(i) != keep));
            }
            DuplicatePolicy::Skip => dropped.extend(group),
        }
    }

    candidates
        .iter()
        .copied()
        .filter(|i| !dropped.contains(i))
        .collect()
}

/// Numbers each (subject, study)'s selected series 1, 2, ... by ordinal
fn number_runs(records: &[SeriesRecord], selected: &[usize]) -> HashMap<usize, u32> {
    let mut runs = HashMap::new();
    for mut group in group_by_key(selected.iter().copied(), |i| {
        (records[i].subject.as_str(), records[i].study_id.as_str())
    }) {
        group.sort_by_key(|&i| records[i].ordinal);
        for (run, i) in group.into_iter().enumerate() {
            runs.insert(i, run as u32 + 1);
        }
    }
    runs
}

/// Groups record indices by key, preserving first-encounter order
fn group_by_key<K, F>(indices: impl IntoIterator<Item = usize>, key: F) -> Vec<Vec<usize>>
where
    K: PartialEq,
    F: Fn(usize) -> K,
{
    let mut keys: Vec<K> = Vec::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in indices {
        let k = key(i);
        match keys.iter().position(|existing| *existing == k) {
            Some(position) => groups[position].push(i),
            None => {
                keys.push(k);
                groups.push(vec![i]);
            }
        }
    }
    groups
}

/// Longest common ancestor of the parent directories of `paths`
///
/// A series at `/raw/A1_20200101/Series_1_t1` alone yields
/// `/raw/A1_20200101`, so its relative path is never empty.
pub fn common_ancestor<'p>(paths: impl IntoIterator<Item = &'p Path>) -> PathBuf {
    let mut common: Option<Vec<Component<'p>>> = None;

    for path in paths {
        let parent = path.parent().unwrap_or(path);
        let components: Vec<Component<'p>> = parent.components().collect();
        common = Some(match common {
            None => components,
            Some(current) => current
                .into_iter()
                .zip(components)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }

    common
        .map(|components| components.into_iter().collect())
        .unwrap_or_default()
}
