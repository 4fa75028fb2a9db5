use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::{AnalyzerConfig, CollegeCompetitionLevel};
use crate::matcher::MatcherConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Competitor websites to scrape before analysis.
    pub competitor_urls: Vec<String>,
    pub data_file: String,
    pub output_directory: Option<String>,
    /// The home college whose catalog is being defended.
    pub college: CollegeProfile,
    #[serde(default)]
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            competitor_urls: vec![
                "https://www.example.com/college1".to_string(),
                "https://www.example.com/college2".to_string(),
            ],
            data_file: "college_data.json".to_string(),
            output_directory: Some("output".to_string()),
            college: CollegeProfile {
                id: "my_college".to_string(),
                name: "North Notts College".to_string(),
                location: "Worksop, UK".to_string(),
                programs: vec![
                    "Computer Science".to_string(),
                    "Engineering".to_string(),
                    "Business".to_string(),
                    "Mathematics".to_string(),
                    "Data Science".to_string(),
                ],
                ..CollegeProfile::default()
            },
            scraping: ScrapingConfig::default(),
            matcher: MatcherConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

/// A college and its catalog. Numeric metrics may be unknown; an absent
/// metric is never treated as zero. Program strings are kept verbatim,
/// matching operates on a normalized derived form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollegeProfile {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub tuition: Option<f64>,
    #[serde(default)]
    pub enrollment: Option<u32>,
    #[serde(default)]
    pub acceptance_rate: Option<f64>,
    #[serde(default)]
    pub avg_gpa: Option<f64>,
    #[serde(default)]
    pub avg_sat: Option<f64>,
    #[serde(default)]
    pub avg_act: Option<f64>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Persisted outcome of one college-level comparison. Written once per
/// analysis run and superseded (not merged) when the analysis re-runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub competitor_id: String,
    pub competitor_name: String,
    pub similarity_score: f64,
    pub competition_level: CollegeCompetitionLevel,
    pub analysis: String,
    pub created: DateTime<Utc>,
}

/// Normalize a program name for matching: trimmed and lower-cased.
pub fn normalize_program(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Derive a filesystem/store-safe identifier from a college name.
pub fn slug_id(name: &str) -> String {
    let re = regex::Regex::new(r"[^a-z0-9_]+").unwrap();
    re.replace_all(&name.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}
