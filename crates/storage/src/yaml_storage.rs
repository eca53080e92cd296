//! YAML file storage implementation.
//!
//! Stores the four tracker documents as YAML files under one root directory.
//! Files are rewritten in full on every save; there is no atomic replace.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};
use vice_core::yaml::{self, Document};
use vice_core::{ChecklistEntriesLog, ChecklistSchema, DecodeMode, EntryLog, Schema};

use super::{Result, Storage, StorageError};

/// File names and load behavior for [`YamlStorage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Habit definitions
    pub habits_file: String,

    /// Daily entries
    pub entries_file: String,

    /// Checklist templates
    pub checklists_file: String,

    /// Checklist completions
    pub checklist_entries_file: String,

    /// Write the schema back when loading generated new habit IDs
    pub persist_generated_ids: bool,

    /// How entry values are interpreted on load
    pub decode_mode: DecodeMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            habits_file: "habits.yml".to_string(),
            entries_file: "entries.yml".to_string(),
            checklists_file: "checklists.yml".to_string(),
            checklist_entries_file: "checklist_entries.yml".to_string(),
            persist_generated_ids: true,
            decode_mode: DecodeMode::Heuristic,
        }
    }
}

/// File-based YAML storage backend.
pub struct YamlStorage {
    root: PathBuf,
    config: StorageConfig,
}

impl YamlStorage {
    /// Create storage with the default file names, creating `root` if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(root, StorageConfig::default()).await
    }

    /// Create storage with explicit configuration.
    pub async fn with_config(root: impl AsRef<Path>, config: StorageConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root, config })
    }

    /// Active configuration.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    async fn read_document<T: Document>(&self, file: &str) -> Result<T> {
        match read_yaml(&self.path(file)).await? {
            Some(text) => yaml::from_yaml(&text).map_err(|e| StorageError::from_codec(file, e)),
            None => {
                debug!(file, kind = T::NAME, "file missing, using empty document");
                Ok(T::empty())
            }
        }
    }

    async fn write_document<T: Document>(&self, file: &str, doc: &T) -> Result<()> {
        let text = yaml::to_yaml(doc).map_err(|e| StorageError::from_codec(file, e))?;
        fs::write(self.path(file), text.as_bytes()).await?;
        info!(file, kind = T::NAME, "saved");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for YamlStorage {
    async fn load_schema(&self) -> Result<Schema> {
        let file = &self.config.habits_file;
        let schema: Schema = self.read_document(file).await?;
        let normalized = schema
            .normalize()
            .map_err(|e| StorageError::invalid(file, e))?;

        if normalized.id_generated && self.config.persist_generated_ids {
            info!(file = %file, "persisting generated habit IDs");
            self.write_document(file, &normalized.value).await?;
        }
        Ok(normalized.value)
    }

    async fn save_schema(&mut self, schema: &Schema) -> Result<()> {
        self.write_document(&self.config.habits_file, schema).await
    }

    async fn load_entries(&self) -> Result<EntryLog> {
        let file = &self.config.entries_file;
        let text = match read_yaml(&self.path(file)).await? {
            Some(text) => text,
            None => {
                debug!(file = %file, "file missing, using empty document");
                return Ok(EntryLog::empty());
            }
        };

        let schema = match self.config.decode_mode {
            DecodeMode::SchemaTyped => Some(self.load_schema().await?),
            DecodeMode::Heuristic => None,
        };
        let decoded = yaml::decode_entry_log(&text, self.config.decode_mode, schema.as_ref())
            .map_err(|e| StorageError::from_codec(file, e))?;
        if decoded.upgraded > 0 {
            info!(
                file = %file,
                upgraded = decoded.upgraded,
                "loaded legacy entries; next save rewrites them"
            );
        }

        decoded
            .value
            .validate()
            .map_err(|e| StorageError::invalid(file, e))?;
        Ok(decoded.value)
    }

    async fn save_entries(&mut self, log: &EntryLog) -> Result<()> {
        self.write_document(&self.config.entries_file, log).await
    }

    async fn load_checklists(&self) -> Result<ChecklistSchema> {
        let file = &self.config.checklists_file;
        let checklists: ChecklistSchema = self.read_document(file).await?;
        let normalized = checklists
            .normalize()
            .map_err(|e| StorageError::invalid(file, e))?;

        if normalized.id_generated && self.config.persist_generated_ids {
            info!(file = %file, "persisting generated checklist IDs");
            self.write_document(file, &normalized.value).await?;
        }
        Ok(normalized.value)
    }

    async fn save_checklists(&mut self, checklists: &ChecklistSchema) -> Result<()> {
        self.write_document(&self.config.checklists_file, checklists).await
    }

    async fn load_checklist_entries(&self) -> Result<ChecklistEntriesLog> {
        let file = &self.config.checklist_entries_file;
        let log: ChecklistEntriesLog = self.read_document(file).await?;
        log.validate().map_err(|e| StorageError::invalid(file, e))?;
        Ok(log)
    }

    async fn save_checklist_entries(&mut self, log: &ChecklistEntriesLog) -> Result<()> {
        self.write_document(&self.config.checklist_entries_file, log).await
    }

    async fn check_references(&self) -> Result<()> {
        let checklists = self.load_checklists().await?;
        let schema = self.load_schema().await?;

        schema
            .normalize_with_checklists(&checklists)
            .map_err(|e| StorageError::invalid(&self.config.habits_file, e))?;
        self.load_checklist_entries()
            .await?
            .validate_against(&checklists)
            .map_err(|e| StorageError::invalid(&self.config.checklist_entries_file, e))?;
        Ok(())
    }
}

async fn read_yaml(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vice_core::{
        Checklist, ChecklistEntry, Condition, Criteria, DayEntry, EntryValue, FieldKind,
        FieldType, FixedClock, Habit, HabitEntry, HabitType, ScoringType,
    };

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap())
    }

    const SCHEMA_WITHOUT_IDS: &str = r#"
version: "1.0"
created_date: "2024-01-01"
habits:
  - title: Morning Meditation
    habit_type: simple
    field_type:
      type: boolean
    scoring_type: manual
  - title: Mood
    habit_type: informational
    field_type:
      type: text
"#;

    #[tokio::test]
    async fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = YamlStorage::new(dir.path()).await.unwrap();

        assert!(storage.load_schema().await.unwrap().habits.is_empty());
        assert!(storage.load_entries().await.unwrap().entries.is_empty());
        assert!(storage.load_checklists().await.unwrap().checklists.is_empty());
        assert_eq!(storage.load_checklist_entries().await.unwrap().version, "1.0");
        // Nothing was generated, so nothing was written.
        assert!(!dir.path().join("habits.yml").exists());
    }

    #[tokio::test]
    async fn test_generated_ids_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("habits.yml"), SCHEMA_WITHOUT_IDS).unwrap();
        let storage = YamlStorage::new(dir.path()).await.unwrap();

        let schema = storage.load_schema().await.unwrap();
        assert_eq!(schema.habits[0].id, "morning_meditation");
        assert_eq!(schema.habits[1].position, 2);

        let written = std::fs::read_to_string(dir.path().join("habits.yml")).unwrap();
        assert!(written.contains("id: morning_meditation"));
        assert!(written.contains("id: mood"));
    }

    #[tokio::test]
    async fn test_generated_ids_kept_in_memory_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("habits.yml"), SCHEMA_WITHOUT_IDS).unwrap();
        let config = StorageConfig {
            persist_generated_ids: false,
            ..Default::default()
        };
        let storage = YamlStorage::with_config(dir.path(), config).await.unwrap();

        assert_eq!(storage.load_schema().await.unwrap().habits[0].id, "morning_meditation");
        let on_disk = std::fs::read_to_string(dir.path().join("habits.yml")).unwrap();
        assert_eq!(on_disk, SCHEMA_WITHOUT_IDS);
    }

    #[tokio::test]
    async fn test_save_schema_writes_normalized_form() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = YamlStorage::new(dir.path()).await.unwrap();

        let mut schema = Schema::empty();
        schema.habits.push(
            Habit::new("Evening Walk", HabitType::Simple, FieldType::new(FieldKind::Boolean))
                .with_scoring(ScoringType::Manual),
        );
        storage.save_schema(&schema).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("habits.yml")).unwrap();
        assert!(written.contains("id: evening_walk"), "{written}");
        assert!(written.contains("position: 1"), "{written}");
        assert!(!written.contains("position: 0"), "{written}");
    }

    #[tokio::test]
    async fn test_entries_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = YamlStorage::new(dir.path()).await.unwrap();

        let mut day = DayEntry::new("2024-03-10");
        day.add_habit_entry(HabitEntry::boolean("morning_meditation", true, &clock()))
            .unwrap();
        day.add_habit_entry(HabitEntry::value_only("mood", "calm".into(), &clock()))
            .unwrap();
        let mut log = EntryLog::new("1.0");
        log.add_day_entry(day).unwrap();

        storage.save_entries(&log).await.unwrap();
        assert_eq!(storage.load_entries().await.unwrap(), log);
    }

    #[tokio::test]
    async fn test_invalid_save_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = YamlStorage::new(dir.path()).await.unwrap();

        let mut entry = HabitEntry::skipped("run", &clock());
        entry.value = Some(EntryValue::Bool(true));
        let log = EntryLog {
            version: "1.0".into(),
            entries: vec![DayEntry {
                date: "2024-03-10".into(),
                habits: vec![entry],
            }],
        };

        let err = storage.save_entries(&log).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error in entries.yml: day entry at index 0: goal entry at index 0: skipped entries cannot have values"
        );
        assert!(!dir.path().join("entries.yml").exists());
    }

    #[tokio::test]
    async fn test_legacy_entries_upgraded_on_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("entries.yml"),
            "version: \"1.0\"\nentries:\n  - date: \"2024-01-01\"\n    goals:\n      - goal_id: run\n        completed: true\n        created_at: 1704094200\n",
        )
        .unwrap();
        let mut storage = YamlStorage::new(dir.path()).await.unwrap();

        let log = storage.load_entries().await.unwrap();
        assert!(log.entries[0].habit_entry("run").unwrap().is_completed());

        storage.save_entries(&log).await.unwrap();
        let written = std::fs::read_to_string(dir.path().join("entries.yml")).unwrap();
        assert!(written.contains("habit_id: run"));
        assert!(written.contains("status: completed"));
        assert!(!written.contains("goals:"));
    }

    #[tokio::test]
    async fn test_schema_typed_decoding() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("habits.yml"), SCHEMA_WITHOUT_IDS).unwrap();
        std::fs::write(
            dir.path().join("entries.yml"),
            "version: \"1.0\"\nentries:\n  - date: \"2024-01-01\"\n    habits:\n      - habit_id: mood\n        value: \"7.5\"\n        status: completed\n        created_at: \"2024-01-01 21:00:00\"\n",
        )
        .unwrap();

        let heuristic = YamlStorage::new(dir.path()).await.unwrap();
        assert_eq!(
            heuristic.load_entries().await.unwrap().entries[0].habits[0].value,
            Some(EntryValue::Float(7.5))
        );

        let config = StorageConfig {
            decode_mode: DecodeMode::SchemaTyped,
            ..Default::default()
        };
        let typed = YamlStorage::with_config(dir.path(), config).await.unwrap();
        assert_eq!(
            typed.load_entries().await.unwrap().entries[0].habits[0].value,
            Some(EntryValue::Text("7.5".into()))
        );
    }

    #[tokio::test]
    async fn test_check_references() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = YamlStorage::new(dir.path()).await.unwrap();

        let mut morning =
            Checklist::new("Morning", vec!["# Body".into(), "stretch".into()], &clock());
        morning.id = "morning".into();
        let mut checklists = ChecklistSchema::empty();
        checklists.checklists.push(morning.clone());
        storage.save_checklists(&checklists).await.unwrap();

        let mut schema = Schema::empty();
        schema.habits.push(
            Habit::new("Routine", HabitType::Checklist, FieldType::checklist("evening"))
                .with_id("routine")
                .with_scoring(ScoringType::Automatic)
                .with_criteria(Criteria::new(Condition::all_checklist_items())),
        );
        storage.save_schema(&schema).await.unwrap();

        let err = storage.check_references().await.unwrap_err();
        assert!(err
            .to_string()
            .ends_with("habit at index 0: references non-existent checklist 'evening'"));

        schema.habits[0].field_type = FieldType::checklist("morning");
        storage.save_schema(&schema).await.unwrap();

        let mut entries = ChecklistEntriesLog::new("1.0");
        let mut entry = ChecklistEntry::new("morning");
        entry.set_item(&morning, "stretch", true, &clock()).unwrap();
        entries.record("2024-03-10", entry).unwrap();
        storage.save_checklist_entries(&entries).await.unwrap();

        storage.check_references().await.unwrap();
        assert_eq!(storage.load_checklist_entries().await.unwrap(), entries);
    }

    #[tokio::test]
    async fn test_malformed_file_is_yaml_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("checklists.yml"), "checklists: [unclosed").unwrap();
        let storage = YamlStorage::new(dir.path()).await.unwrap();
        assert!(matches!(
            storage.load_checklists().await,
            Err(StorageError::Yaml(_))
        ));
    }

    #[test]
    fn test_config_from_yaml() {
        let config: StorageConfig =
            serde_yaml::from_str("entries_file: log.yml\ndecode_mode: schema_typed\n").unwrap();
        assert_eq!(config.entries_file, "log.yml");
        assert_eq!(config.habits_file, "habits.yml");
        assert_eq!(config.decode_mode, DecodeMode::SchemaTyped);
        assert!(config.persist_generated_ids);
    }
}
