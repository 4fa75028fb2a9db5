use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::matcher::overlap_ratio;
use crate::models::{normalize_program, CollegeProfile, ComparisonRecord};

/// Weights and thresholds for college-level comparison. Passed to the
/// analyzer at construction so callers (and tests) can vary the policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub program_weight: f64,
    pub academic_weight: f64,
    pub enrollment_weight: f64,
    /// Program overlap below this forces the overall score to 0.0.
    pub overlap_gate: f64,
    pub high_overlap: f64,
    pub high_score: f64,
    pub medium_overlap: f64,
    pub medium_score: f64,
    pub low_overlap: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            program_weight: 0.70,
            academic_weight: 0.20,
            enrollment_weight: 0.10,
            overlap_gate: 0.1,
            high_overlap: 0.6,
            high_score: 0.65,
            medium_overlap: 0.3,
            medium_score: 0.45,
            low_overlap: 0.1,
        }
    }
}

/// Four-tier level for whole-college comparison. Distinct policy from the
/// five-tier course-level classifier; the two share no thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollegeCompetitionLevel {
    None,
    Low,
    Medium,
    High,
}

impl CollegeCompetitionLevel {
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
            Self::None => 0,
        }
    }
}

impl fmt::Display for CollegeCompetitionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::None => "NONE",
        };
        f.write_str(name)
    }
}

const ACADEMIC_METRICS: [&str; 4] = ["avg_gpa", "avg_sat", "avg_act", "acceptance_rate"];

/// Compares two whole college profiles: program overlap is primary,
/// academic metrics secondary, enrollment tertiary.
pub struct CompetitionAnalyzer {
    config: AnalyzerConfig,
}

impl CompetitionAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Compare the home college with a competitor.
    ///
    /// Returns (similarity_score, competition_level, analysis_text).
    pub fn compare_colleges(
        &self,
        home: &CollegeProfile,
        competitor: &CollegeProfile,
    ) -> (f64, CollegeCompetitionLevel, String) {
        let similarity_score = self.calculate_similarity(home, competitor);
        let competition_level = self.determine_competition_level(similarity_score, home, competitor);
        let analysis = self.generate_analysis(home, competitor, similarity_score, competition_level);

        (similarity_score, competition_level, analysis)
    }

    /// Weighted similarity in [0, 1]. Program overlap is a necessary
    /// condition: below the gate the score is 0.0 regardless of metrics.
    fn calculate_similarity(&self, home: &CollegeProfile, competitor: &CollegeProfile) -> f64 {
        let program_similarity = self.program_overlap(home, competitor);

        if program_similarity < self.config.overlap_gate {
            return 0.0;
        }

        let academic_similarity = self.academic_similarity(home, competitor);
        let enrollment_similarity = metric_similarity(
            home.enrollment.map(f64::from),
            competitor.enrollment.map(f64::from),
        );

        program_similarity * self.config.program_weight
            + academic_similarity * self.config.academic_weight
            + enrollment_similarity * self.config.enrollment_weight
    }

    /// Jaccard index over the normalized program sets, neutral 0.5 when
    /// either catalog is empty.
    pub fn program_overlap(&self, home: &CollegeProfile, competitor: &CollegeProfile) -> f64 {
        overlap_ratio(&program_set(home), &program_set(competitor))
    }

    /// Mean metric similarity over the academic metrics present in both
    /// profiles; neutral 0.5 when no metric pair is available.
    fn academic_similarity(&self, home: &CollegeProfile, competitor: &CollegeProfile) -> f64 {
        let mut valid_scores = Vec::new();

        for metric in ACADEMIC_METRICS {
            let (v1, v2) = (academic_metric(home, metric), academic_metric(competitor, metric));
            if let (Some(v1), Some(v2)) = (v1, v2) {
                valid_scores.push(metric_similarity(Some(v1), Some(v2)));
            }
        }

        if valid_scores.is_empty() {
            0.5
        } else {
            valid_scores.iter().sum::<f64>() / valid_scores.len() as f64
        }
    }

    /// Classification uses program overlap and overall score jointly, not
    /// the score alone.
    fn determine_competition_level(
        &self,
        similarity_score: f64,
        home: &CollegeProfile,
        competitor: &CollegeProfile,
    ) -> CollegeCompetitionLevel {
        let program_overlap = self.program_overlap(home, competitor);

        if program_overlap > self.config.high_overlap && similarity_score > self.config.high_score {
            CollegeCompetitionLevel::High
        } else if program_overlap > self.config.medium_overlap
            && similarity_score > self.config.medium_score
        {
            CollegeCompetitionLevel::Medium
        } else if program_overlap > self.config.low_overlap {
            CollegeCompetitionLevel::Low
        } else {
            CollegeCompetitionLevel::None
        }
    }

    fn generate_analysis(
        &self,
        home: &CollegeProfile,
        competitor: &CollegeProfile,
        similarity_score: f64,
        competition_level: CollegeCompetitionLevel,
    ) -> String {
        let mut analysis = format!(
            "Competition Analysis:\n\
            - Similarity Score: {:.1}%\n\
            - Competition Level: {}\n\n\
            My College: {}\n\
            Competitor: {}\n\n\
            Academic Metrics Comparison:\n\
            - Acceptance Rate: {} vs {}\n\
            - Avg GPA: {} vs {}\n\
            - Avg SAT: {} vs {}\n\
            - Avg ACT: {} vs {}\n\n\
            Size & Cost:\n\
            - Enrollment: {} vs {}\n\
            - Tuition: {} vs {}\n\n\
            Location:\n\
            - {} vs {}\n\n\
            Key Insights:\n",
            similarity_score * 100.0,
            competition_level,
            home.name,
            competitor.name,
            fmt_metric(home.acceptance_rate),
            fmt_metric(competitor.acceptance_rate),
            fmt_metric(home.avg_gpa),
            fmt_metric(competitor.avg_gpa),
            fmt_metric(home.avg_sat),
            fmt_metric(competitor.avg_sat),
            fmt_metric(home.avg_act),
            fmt_metric(competitor.avg_act),
            fmt_count(home.enrollment),
            fmt_count(competitor.enrollment),
            fmt_metric(home.tuition),
            fmt_metric(competitor.tuition),
            home.location,
            competitor.location,
        );

        match competition_level {
            CollegeCompetitionLevel::High => {
                analysis.push_str("- This college is a direct competitor with similar metrics\n");
                analysis.push_str("- Target similar student demographics and marketing strategies\n");
            }
            CollegeCompetitionLevel::Medium => {
                analysis.push_str("- This college has some overlapping characteristics\n");
                analysis.push_str("- Monitor their programs and offerings\n");
            }
            _ => {
                analysis.push_str("- Limited direct competition\n");
                analysis.push_str("- Different positioning in the market\n");
            }
        }

        let home_programs = program_set(home);
        let competitor_programs = program_set(competitor);
        let shared: Vec<&String> = home_programs.intersection(&competitor_programs).collect();
        let unique_to_competitor: Vec<&String> =
            competitor_programs.difference(&home_programs).collect();

        if !shared.is_empty() {
            let mut names: Vec<&str> = shared.iter().map(|s| s.as_str()).collect();
            names.sort_unstable();
            analysis.push_str(&format!(
                "\n=== SHARED PROGRAMS ===\n{}\n",
                names[..names.len().min(5)].join(", ")
            ));
        }

        if !unique_to_competitor.is_empty() {
            let mut names: Vec<&str> = unique_to_competitor.iter().map(|s| s.as_str()).collect();
            names.sort_unstable();
            analysis.push_str(&format!(
                "\n=== THEIR UNIQUE PROGRAMS ===\n{}\n",
                names[..names.len().min(5)].join(", ")
            ));
        }

        let overlap_pct = if competitor_programs.is_empty() {
            0.0
        } else {
            shared.len() as f64 / competitor_programs.len() as f64 * 100.0
        };
        analysis.push_str(&format!(
            "\nProgram Overlap: {:.1}% of their programs\n",
            overlap_pct
        ));

        if competition_level == CollegeCompetitionLevel::None {
            analysis.push_str("\n⚠️  No significant program overlap - Not a direct competitor\n");
        }

        analysis
    }

    /// Rank comparison records by competition level, then similarity score,
    /// both descending.
    pub fn rank_competitors(&self, mut comparisons: Vec<ComparisonRecord>) -> Vec<ComparisonRecord> {
        comparisons.sort_by(|a, b| {
            b.competition_level
                .rank()
                .cmp(&a.competition_level.rank())
                .then_with(|| {
                    b.similarity_score
                        .partial_cmp(&a.similarity_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });
        comparisons
    }
}

impl Default for CompetitionAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

fn program_set(college: &CollegeProfile) -> HashSet<String> {
    college
        .programs
        .iter()
        .map(|p| normalize_program(p))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Similarity of two optional metric values in [0, 1]. Either side absent
/// is "unknown" and scores a neutral 0.5; both exactly zero are identical.
fn metric_similarity(v1: Option<f64>, v2: Option<f64>) -> f64 {
    let (v1, v2) = match (v1, v2) {
        (Some(v1), Some(v2)) => (v1, v2),
        _ => return 0.5,
    };

    if v1 == 0.0 && v2 == 0.0 {
        return 1.0;
    }

    let max_val = v1.abs().max(v2.abs());
    if max_val == 0.0 {
        return 1.0;
    }

    let difference = (v1 - v2).abs() / max_val;
    (1.0 - difference).max(0.0)
}

fn academic_metric(college: &CollegeProfile, metric: &str) -> Option<f64> {
    match metric {
        "avg_gpa" => college.avg_gpa,
        "avg_sat" => college.avg_sat,
        "avg_act" => college.avg_act,
        "acceptance_rate" => college.acceptance_rate,
        _ => None,
    }
}

fn fmt_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "N/A".to_string(),
    }
}

fn fmt_count(value: Option<u32>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(id: &str, programs: &[&str]) -> CollegeProfile {
        CollegeProfile {
            id: id.to_string(),
            name: id.to_string(),
            programs: programs.iter().map(|s| s.to_string()).collect(),
            ..CollegeProfile::default()
        }
    }

    #[test]
    fn test_metric_similarity_neutral_when_absent() {
        assert_eq!(metric_similarity(None, Some(3.5)), 0.5);
        assert_eq!(metric_similarity(Some(3.5), None), 0.5);
        assert_eq!(metric_similarity(None, None), 0.5);
    }

    #[test]
    fn test_metric_similarity_identical_and_zero() {
        assert_eq!(metric_similarity(Some(0.0), Some(0.0)), 1.0);
        assert_eq!(metric_similarity(Some(1400.0), Some(1400.0)), 1.0);
    }

    #[test]
    fn test_metric_similarity_clamped() {
        // 100 vs -100: difference 200, max 100 -> clamps at 0
        assert_eq!(metric_similarity(Some(100.0), Some(-100.0)), 0.0);
        assert!((metric_similarity(Some(1000.0), Some(1500.0)) - (1.0 - 500.0 / 1500.0)).abs() < 1e-9);
    }

    #[test]
    fn test_gate_forces_zero_score_and_none_level() {
        let analyzer = CompetitionAnalyzer::default();
        let mut home = profile("home", &["law", "medicine", "nursing", "dentistry", "pharmacy"]);
        let mut competitor = profile("comp", &["welding", "plumbing", "carpentry", "masonry"]);
        // Perfectly similar metrics must not rescue a gated comparison.
        home.avg_gpa = Some(3.5);
        competitor.avg_gpa = Some(3.5);
        home.enrollment = Some(10_000);
        competitor.enrollment = Some(10_000);

        assert!(analyzer.program_overlap(&home, &competitor) < 0.1);
        let (score, level, _) = analyzer.compare_colleges(&home, &competitor);
        assert_eq!(score, 0.0);
        assert_eq!(level, CollegeCompetitionLevel::None);
    }

    #[test]
    fn test_empty_programs_are_neutral_medium() {
        // Both catalogs empty: overlap 0.5, no metrics anywhere -> overall
        // 0.5*0.7 + 0.5*0.2 + 0.5*0.1 = 0.5 -> MEDIUM.
        let analyzer = CompetitionAnalyzer::default();
        let home = profile("home", &[]);
        let competitor = profile("comp", &[]);
        let (score, level, _) = analyzer.compare_colleges(&home, &competitor);
        assert!((score - 0.5).abs() < 1e-9);
        assert_eq!(level, CollegeCompetitionLevel::Medium);
    }

    #[test]
    fn test_identical_colleges_rank_high() {
        let analyzer = CompetitionAnalyzer::default();
        let mut home = profile("home", &["Computer Science", "Business", "Engineering"]);
        home.avg_gpa = Some(3.4);
        home.avg_sat = Some(1300.0);
        home.enrollment = Some(8_000);
        let competitor = CollegeProfile {
            id: "comp".to_string(),
            name: "comp".to_string(),
            ..home.clone()
        };

        let (score, level, _) = analyzer.compare_colleges(&home, &competitor);
        assert!(score > 0.9);
        assert_eq!(level, CollegeCompetitionLevel::High);
    }

    #[test]
    fn test_program_overlap_normalizes_names() {
        let analyzer = CompetitionAnalyzer::default();
        let home = profile("home", &["Computer Science", "Law"]);
        let competitor = profile("comp", &["  computer science ", "LAW"]);
        assert!((analyzer.program_overlap(&home, &competitor) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_academic_similarity_skips_missing_pairs() {
        let analyzer = CompetitionAnalyzer::default();
        let mut home = profile("home", &["law"]);
        let mut competitor = profile("comp", &["law"]);
        // Only GPA is present on both sides; SAT is one-sided and must not count.
        home.avg_gpa = Some(3.0);
        competitor.avg_gpa = Some(3.0);
        home.avg_sat = Some(1200.0);

        assert_eq!(analyzer.academic_similarity(&home, &competitor), 1.0);
    }

    #[test]
    fn test_rank_competitors_by_level_then_score() {
        let analyzer = CompetitionAnalyzer::default();
        let record = |id: &str, score: f64, level: CollegeCompetitionLevel| ComparisonRecord {
            competitor_id: id.to_string(),
            competitor_name: id.to_string(),
            similarity_score: score,
            competition_level: level,
            analysis: String::new(),
            created: Utc::now(),
        };

        let ranked = analyzer.rank_competitors(vec![
            record("a", 0.9, CollegeCompetitionLevel::Medium),
            record("b", 0.5, CollegeCompetitionLevel::High),
            record("c", 0.6, CollegeCompetitionLevel::Medium),
            record("d", 0.2, CollegeCompetitionLevel::Low),
        ]);

        let order: Vec<&str> = ranked.iter().map(|r| r.competitor_id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c", "d"]);
    }
}
