use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{CollegeProfile, ComparisonRecord};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    my_college: Option<CollegeProfile>,
    competitors: Vec<CollegeProfile>,
    comparisons: Vec<ComparisonRecord>,
}

/// JSON-file-backed store for college records and comparison results,
/// keyed by college identifier. Writes are last-write-wins per id.
pub struct CollegeStore {
    path: PathBuf,
    data: StoreData,
}

impl CollegeStore {
    /// Open the store at `path`; a missing file starts an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse store file: {}", path.display()))?
        } else {
            StoreData::default()
        };

        Ok(Self { path, data })
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write store file: {}", self.path.display()))?;
        Ok(())
    }

    pub fn set_my_college(&mut self, college: CollegeProfile) {
        self.data.my_college = Some(college);
    }

    pub fn my_college(&self) -> Option<&CollegeProfile> {
        self.data.my_college.as_ref()
    }

    /// Insert or replace a competitor by its `id`.
    pub fn add_competitor(&mut self, college: CollegeProfile) {
        match self.data.competitors.iter_mut().find(|c| c.id == college.id) {
            Some(existing) => {
                debug!("Replacing stored competitor {}", college.id);
                *existing = college;
            }
            None => self.data.competitors.push(college),
        }
    }

    pub fn competitors(&self) -> &[CollegeProfile] {
        &self.data.competitors
    }

    pub fn get_competitor(&self, id: &str) -> Option<&CollegeProfile> {
        self.data.competitors.iter().find(|c| c.id == id)
    }

    /// Record a comparison result, superseding any previous record for the
    /// same competitor.
    pub fn save_comparison(&mut self, record: ComparisonRecord) {
        self.data
            .comparisons
            .retain(|r| r.competitor_id != record.competitor_id);
        self.data.comparisons.push(record);
    }

    pub fn comparisons(&self) -> &[ComparisonRecord] {
        &self.data.comparisons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::CollegeCompetitionLevel;
    use chrono::Utc;

    fn college(id: &str) -> CollegeProfile {
        CollegeProfile {
            id: id.to_string(),
            name: id.to_string(),
            ..CollegeProfile::default()
        }
    }

    fn temp_store_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("college_store_test_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let path = temp_store_path("missing");
        let store = CollegeStore::open(&path).unwrap();
        assert!(store.my_college().is_none());
        assert!(store.competitors().is_empty());
    }

    #[test]
    fn test_roundtrip_and_upsert() {
        let path = temp_store_path("roundtrip");
        let _ = fs::remove_file(&path);

        let mut store = CollegeStore::open(&path).unwrap();
        store.set_my_college(college("home"));
        store.add_competitor(college("rival"));

        let mut updated = college("rival");
        updated.name = "Rival College".to_string();
        store.add_competitor(updated);
        store.save().unwrap();

        let reopened = CollegeStore::open(&path).unwrap();
        assert_eq!(reopened.competitors().len(), 1);
        assert_eq!(reopened.get_competitor("rival").unwrap().name, "Rival College");
        assert_eq!(reopened.my_college().unwrap().id, "home");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_comparison_last_write_wins() {
        let path = temp_store_path("comparisons");
        let _ = fs::remove_file(&path);

        let record = |score: f64| ComparisonRecord {
            competitor_id: "rival".to_string(),
            competitor_name: "Rival".to_string(),
            similarity_score: score,
            competition_level: CollegeCompetitionLevel::Medium,
            analysis: String::new(),
            created: Utc::now(),
        };

        let mut store = CollegeStore::open(&path).unwrap();
        store.save_comparison(record(0.4));
        store.save_comparison(record(0.8));

        assert_eq!(store.comparisons().len(), 1);
        assert_eq!(store.comparisons()[0].similarity_score, 0.8);
    }
}
