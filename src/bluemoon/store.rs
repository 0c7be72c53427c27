use crate::bluemoon::dataset::Dataset;
use crate::bluemoon::day::{Day, SerializedDay, key_for, parse_key};
use crate::bluemoon::util::now_epoch_secs;
use crate::bluemoon::warn::{self, WarnEvent};
use crate::error::{BluemoonError, BluemoonErrorCode};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub day: String,
    pub days_affected: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreMeta {
    pub serialize_fields: BTreeSet<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// On-disk shape of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreDocument {
    pub days: BTreeMap<String, SerializedDay>,
    pub experiments: Map<String, Value>,
    pub meta: StoreMeta,
    pub changelog: Vec<ChangelogEntry>,
}

#[derive(Debug)]
pub struct AllData {
    pub dataset: Dataset,
    meta: StoreMeta,
    experiments: Map<String, Value>,
    changelog: Vec<ChangelogEntry>,
    today: NaiveDate,
}

fn corrupt_backup_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("bluemoon.json");
    Ok(path.with_file_name(format!("{name}.corrupt-{}", now_epoch_secs()?)))
}

#[cfg(unix)]
fn new_store_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_store_permissions() -> Option<fs::Permissions> {
    None
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

impl AllData {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            dataset: Dataset::new(today),
            meta: StoreMeta::default(),
            experiments: Map::new(),
            changelog: Vec::new(),
            today,
        }
    }

    /// Rebuild from a parsed document. Days are merged additively, so a
    /// document listing the same date twice accumulates its records.
    pub fn from_document(doc: StoreDocument, today: NaiveDate) -> Result<Self, BluemoonError> {
        let mut dataset = Dataset::new(today);
        for (key, stored) in doc.days {
            let day = Day::from_parts(parse_key(&key)?, stored.data, stored.cumulative);
            dataset.add(day, false);
        }
        Ok(Self {
            dataset,
            meta: doc.meta,
            experiments: doc.experiments,
            changelog: doc.changelog,
            today,
        })
    }

    /// Strict load; errors on a missing or malformed file.
    pub fn load(path: &Path, today: NaiveDate) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let doc: StoreDocument = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        let all = Self::from_document(doc, today)
            .with_context(|| format!("invalid day in {}", path.display()))?;
        Ok(all)
    }

    /// Load the store at `path`, replacing it with a fresh empty store when
    /// it is missing or unreadable. A corrupt file is moved aside first.
    pub fn build(path: &Path, today: NaiveDate) -> Result<Self> {
        match Self::load(path, today) {
            Ok(all) => Ok(all),
            Err(err) => {
                let store = path.display().to_string();
                let existed = path.exists();
                warn::emit(WarnEvent {
                    code: BluemoonErrorCode::E002StoreCorrupt.as_str(),
                    stage: "store-load",
                    action: "create-fresh-store",
                    store: &store,
                    reason: if existed { "unreadable" } else { "missing" },
                    err: &format!("{err:#}"),
                    ..WarnEvent::default()
                });
                if existed {
                    let backup = corrupt_backup_path(path)?;
                    fs::rename(path, &backup).with_context(|| {
                        format!("failed to move {} to {}", path.display(), backup.display())
                    })?;
                }

                let fresh = Self::new(today);
                fresh.save(path, 2)?;
                Ok(fresh)
            }
        }
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    pub fn experiments(&self) -> &Map<String, Value> {
        &self.experiments
    }

    pub fn changelog(&self) -> &[ChangelogEntry] {
        &self.changelog
    }

    pub fn serialize_fields(&self) -> &BTreeSet<String> {
        &self.meta.serialize_fields
    }

    pub fn set_serializable_field(&mut self, name: impl Into<String>) {
        self.meta.serialize_fields.insert(name.into());
    }

    /// Merge `incoming` into the canonical dataset and return how many days
    /// it affected. A changelog entry is written only when something changed
    /// and a description was given.
    pub fn update(&mut self, incoming: Dataset, description: Option<&str>) -> usize {
        let days_affected = self.dataset.update(incoming);
        if let Some(description) = description
            && !days_affected.is_empty()
        {
            self.changelog.push(ChangelogEntry {
                day: key_for(self.today),
                days_affected: days_affected.clone(),
                description: description.to_string(),
            });
        }
        days_affected.len()
    }

    /// Document with every day filtered through `whitelist`.
    pub fn document_with(&self, whitelist: Option<&BTreeSet<String>>) -> StoreDocument {
        StoreDocument {
            days: self
                .dataset
                .days()
                .iter()
                .map(|(key, day)| (key.clone(), day.serialize(whitelist)))
                .collect(),
            experiments: self.experiments.clone(),
            meta: self.meta.clone(),
            changelog: self.changelog.clone(),
        }
    }

    /// Document filtered by the store's own `serialize_fields`.
    pub fn as_document(&self) -> StoreDocument {
        self.document_with(Some(&self.meta.serialize_fields))
    }

    /// Write the whole document next to `path` and rename it into place.
    /// An `indent` of zero writes compact JSON. An existing store keeps its
    /// mode; a new one is created 0644 on unix instead of the temp file's 0600.
    pub fn save(&self, path: &Path, indent: usize) -> Result<()> {
        let doc = self.as_document();
        let mut buf = Vec::new();
        if indent == 0 {
            serde_json::to_writer(&mut buf, &doc)?;
        } else {
            let pad = vec![b' '; indent];
            let formatter = serde_json::ser::PrettyFormatter::with_indent(&pad);
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            doc.serialize(&mut ser)?;
        }
        buf.push(b'\n');

        let dir = parent_dir(path);
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(&buf)
            .with_context(|| format!("failed to write {}", tmp.path().display()))?;
        let permissions = match fs::metadata(path) {
            Ok(meta) => Some(meta.permissions()),
            Err(_) => new_store_permissions(),
        };
        if let Some(permissions) = permissions {
            tmp.as_file()
                .set_permissions(permissions)
                .with_context(|| format!("failed to set permissions on {}", tmp.path().display()))?;
        }
        tmp.persist(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluemoon::almanac::MeanAlmanac;
    use serde_json::json;
    use tempfile::tempdir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 15).expect("date")
    }

    fn toggl_day(key: &str, records: &[Value]) -> Day {
        let mut d = Day::parse(key, &MeanAlmanac).expect("valid day");
        for record in records {
            d.add_record("*toggl", record.clone());
        }
        d
    }

    fn incoming(days: Vec<Day>) -> Dataset {
        let mut ds = Dataset::new(today());
        for d in days {
            ds.add(d, false);
        }
        ds.set_ready(true);
        ds
    }

    #[test]
    fn changelog_is_suppressed_without_changes_or_description() {
        let mut all = AllData::new(today());
        let build = || incoming(vec![toggl_day("2020-12-04", &[json!({"n": 1})])]);

        assert_eq!(all.update(build(), None), 1);
        assert!(all.changelog().is_empty());

        assert_eq!(all.update(build(), Some("again")), 0);
        assert!(all.changelog().is_empty());
    }

    #[test]
    fn changelog_entry_lists_affected_days() {
        let mut all = AllData::new(today());
        let ds = incoming(vec![
            toggl_day("2020-12-04", &[json!({"n": 1})]),
            toggl_day("2020-12-05", &[json!({"n": 2})]),
        ]);

        assert_eq!(all.update(ds, Some(".add store.json")), 2);

        assert_eq!(
            all.changelog(),
            &[ChangelogEntry {
                day: "2021-01-15".to_string(),
                days_affected: vec!["2020-12-04".to_string(), "2020-12-05".to_string()],
                description: ".add store.json".to_string(),
            }]
        );
    }

    #[test]
    fn accumulated_records_survive_a_second_merge() {
        let mut all = AllData::new(today());
        let first = incoming(vec![toggl_day(
            "2020-12-04",
            &[json!({"n": 1}), json!({"n": 2})],
        )]);
        assert_eq!(all.update(first, Some("first")), 1);

        let mut second = Dataset::new(today());
        let stored = all.dataset.get("2020-12-04").cloned().expect("stored day");
        second.add(stored, false);
        second.add(toggl_day("2020-12-04", &[json!({"n": 3})]), false);
        second.set_ready(true);
        assert_eq!(all.update(second, Some("second")), 1);

        assert_eq!(all.dataset.get("2020-12-04").expect("day").records("*toggl").len(), 3);
        assert_eq!(all.changelog().len(), 2);
    }

    #[test]
    fn loading_accumulates_duplicate_dates() {
        let doc: StoreDocument = serde_json::from_value(json!({
            "days": {
                "2020-12-04": {"data": {"worklog": 8}, "cumulative": {"*toggl": [{"n": 1}]}},
                "2020-12-4": {"data": {"worklog": 6}, "cumulative": {"*toggl": [{"n": 2}]}}
            },
            "meta": {"serialize_fields": ["*toggl"], "owner": "me"}
        }))
        .expect("doc");

        let all = AllData::from_document(doc, today()).expect("valid doc");

        assert_eq!(all.dataset.len(), 1);
        assert_eq!(all.dataset.count_cumulative_entries("*toggl"), 2);
        assert!(all.serialize_fields().contains("*toggl"));
        assert_eq!(all.meta().extra.get("owner"), Some(&json!("me")));
    }

    #[test]
    fn invalid_day_keys_are_rejected() {
        let doc: StoreDocument =
            serde_json::from_value(json!({"days": {"someday": {}}})).expect("doc");
        assert!(matches!(
            AllData::from_document(doc, today()),
            Err(BluemoonError::InvalidDate(_))
        ));
    }

    #[test]
    fn document_applies_serialize_fields() {
        let mut all = AllData::new(today());
        let mut d = toggl_day("2020-12-04", &[json!({"n": 1})]);
        d.set_value("worklog", 8);
        all.update(incoming(vec![d]), None);

        let full = all.as_document();
        assert!(full.days["2020-12-04"].data.contains_key("moon"));

        all.set_serializable_field("worklog");
        let filtered = all.as_document();
        let day = &filtered.days["2020-12-04"];
        assert_eq!(day.data.keys().collect::<Vec<_>>(), vec!["worklog"]);
        assert!(day.cumulative.is_empty());

        let value = serde_json::to_value(&filtered).expect("json");
        assert_eq!(value["meta"]["serialize_fields"], json!(["worklog"]));
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("nested").join("store.json");
        let mut all = AllData::new(today());
        all.update(
            incoming(vec![toggl_day("2020-12-04", &[json!({"n": 1})])]),
            Some("seed"),
        );
        all.save(&path, 4).expect("save");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\n    \"changelog\""));

        let loaded = AllData::load(&path, today()).expect("load");
        assert_eq!(loaded.as_document(), all.as_document());
    }

    #[test]
    fn experiments_and_meta_pass_through_unchanged() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("store.json");
        let experiments = json!({
            "e1": {"k": [1, 2], "note": "caffeine after 2pm", "on": true},
            "e2": {"window": {"from": "2020-12-01", "to": null}}
        });
        fs::write(
            &path,
            json!({
                "days": {"2020-12-04": {"data": {"worklog": 8}}},
                "experiments": experiments,
                "meta": {"owner": "me", "serialize_fields": []}
            })
            .to_string(),
        )
        .expect("write");

        AllData::load(&path, today())
            .expect("load")
            .save(&path, 0)
            .expect("save");

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(written["experiments"], experiments);
        assert_eq!(
            serde_json::to_string(&written["experiments"]).expect("json"),
            serde_json::to_string(&experiments).expect("json")
        );
        assert_eq!(written["meta"]["owner"], json!("me"));
    }

    #[test]
    fn reloaded_store_ignores_a_repeated_merge() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("store.json");
        let build = || {
            incoming(vec![
                toggl_day("2020-12-04", &[json!({"n": 1})]),
                toggl_day("2020-12-05", &[json!({"n": 2})]),
            ])
        };

        let mut all = AllData::build(&path, today()).expect("build");
        assert_eq!(all.update(build(), Some("first")), 2);
        all.save(&path, 4).expect("save");

        let mut reloaded = AllData::build(&path, today()).expect("rebuild");
        assert_eq!(reloaded.update(build(), Some("second")), 0);
        reloaded.save(&path, 4).expect("save");

        let last = AllData::load(&path, today()).expect("load");
        assert_eq!(last.changelog().len(), 1);
        assert_eq!(last.dataset.count_cumulative_entries("*toggl"), 2);
    }

    #[cfg(unix)]
    #[test]
    fn save_sets_new_store_mode_and_keeps_an_existing_one() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("store.json");
        let all = AllData::new(today());
        let mode = |p: &Path| fs::metadata(p).expect("metadata").permissions().mode() & 0o777;

        all.save(&path, 2).expect("save");
        assert_eq!(mode(path.as_path()), 0o644);

        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).expect("chmod");
        all.save(&path, 2).expect("save again");
        assert_eq!(mode(path.as_path()), 0o640);
    }

    #[test]
    fn build_creates_a_missing_store() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("store.json");

        let all = AllData::build(&path, today()).expect("build");

        assert!(all.dataset.is_empty());
        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(written["days"], json!({}));
        assert_eq!(written["changelog"], json!([]));
    }

    #[test]
    fn build_replaces_a_corrupt_store_and_keeps_a_backup() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("store.json");
        fs::write(&path, "{ not json").expect("write");

        let all = AllData::build(&path, today()).expect("build");

        assert!(all.changelog().is_empty());
        let backups: Vec<_> = fs::read_dir(tmp.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert!(AllData::load(&path, today()).is_ok());
    }

    #[test]
    fn empty_object_is_a_valid_store() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("store.json");
        fs::write(&path, "{}").expect("write");
        let all = AllData::load(&path, today()).expect("load");
        assert!(all.dataset.is_empty());
        assert!(all.serialize_fields().is_empty());
    }
}
