use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::models::normalize_program;

/// Tie-break rule applied when more than one home program clears the
/// close-match threshold for the same competitor program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// First home program in list order that clears the threshold.
    FirstQualifying,
    /// Home program with the highest ratio; earlier program wins on ties.
    BestMatch,
}

/// Thresholds and weights for course-level matching. Passed to the matcher
/// at construction so callers (and tests) can vary the policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Token overlap ratio must strictly exceed this for a close match.
    pub close_match_threshold: f64,
    /// Weight of an exact match relative to a close match in the score.
    pub exact_match_weight: f64,
    pub very_high_score: f64,
    pub high_score: f64,
    pub medium_score: f64,
    pub low_score: f64,
    pub tie_break: TieBreak,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            close_match_threshold: 0.4,
            exact_match_weight: 2.0,
            very_high_score: 0.7,
            high_score: 0.5,
            medium_score: 0.3,
            low_score: 0.1,
            tie_break: TieBreak::FirstQualifying,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseCompetitionLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl CourseCompetitionLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryHigh => "🔴 VERY HIGH - Direct course competitor",
            Self::High => "🟠 HIGH - Significant course overlap",
            Self::Medium => "🟡 MEDIUM - Some course overlap",
            Self::Low => "🟢 LOW - Minimal course overlap",
            Self::VeryLow => "⚪ VERY LOW - Few to no overlapping courses",
        }
    }
}

impl fmt::Display for CourseCompetitionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of matching one competitor's course list against the home college.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub exact_matches: Vec<String>,
    /// (competitor_program, home_program) pairs; each competitor program
    /// maps to at most one home program.
    pub close_matches: Vec<(String, String)>,
    pub unique_to_competitor: Vec<String>,
    pub unique_to_home: Vec<String>,
    pub competition_score: f64,
    pub competition_level: CourseCompetitionLevel,
    /// Normalized (deduplicated) competitor course count used for scoring.
    pub total_courses: usize,
}

/// Normalize a program list: lower-case, trim, drop blanks, collapse
/// duplicates. First-seen order is preserved because close-match detection
/// is order-dependent.
pub fn normalize(programs: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for program in programs {
        let normalized = normalize_program(program);
        if normalized.is_empty() {
            continue;
        }
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }
    out
}

/// Jaccard index over two normalized program sets, with a neutral 0.5
/// default when either side is empty ("unknown", not "no overlap").
pub fn overlap_ratio(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.5;
    }
    let overlap = a.intersection(b).count();
    let total = a.union(b).count();
    overlap as f64 / total as f64
}

fn tokenize(name: &str) -> HashSet<&str> {
    name.split_whitespace().collect()
}

fn token_overlap_ratio(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let total = a.union(b).count();
    if total == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / total as f64
}

/// Course-level matching engine.
pub struct CourseMatcher {
    config: MatcherConfig,
}

impl CourseMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Competitor course names also present in the home list
    /// (case-insensitive, inputs pre-normalized). Deduplicated,
    /// first-seen order.
    pub fn find_exact_matches(&self, home: &[String], competitor: &[String]) -> Vec<String> {
        let home_set: HashSet<&String> = home.iter().collect();
        let mut seen = HashSet::new();
        competitor
            .iter()
            .filter(|course| home_set.contains(course) && seen.insert(course.as_str()))
            .cloned()
            .collect()
    }

    /// Near-duplicate course names by whitespace-token overlap. Entries in
    /// `exclude` (already exact-matched) are removed from both sides first.
    /// Each competitor course pairs with at most one home course, chosen by
    /// the configured tie-break; with `FirstQualifying` the scan stops at
    /// the first home course whose ratio clears the threshold, so output
    /// depends on home-list order.
    pub fn find_close_matches(
        &self,
        home: &[String],
        competitor: &[String],
        exclude: &HashSet<String>,
    ) -> Vec<(String, String)> {
        let home_tokens: Vec<(&String, HashSet<&str>)> = home
            .iter()
            .filter(|course| !exclude.contains(*course))
            .map(|course| (course, tokenize(course)))
            .collect();

        let mut seen = HashSet::new();
        let mut pairs = Vec::new();

        for comp_course in competitor {
            if exclude.contains(comp_course) {
                continue;
            }
            let comp_tokens = tokenize(comp_course);

            let partner = match self.config.tie_break {
                TieBreak::FirstQualifying => home_tokens
                    .iter()
                    .find(|(_, tokens)| {
                        token_overlap_ratio(&comp_tokens, tokens) > self.config.close_match_threshold
                    })
                    .map(|(course, _)| *course),
                TieBreak::BestMatch => {
                    let mut best: Option<(&String, f64)> = None;
                    for (course, tokens) in &home_tokens {
                        let ratio = token_overlap_ratio(&comp_tokens, tokens);
                        if ratio > self.config.close_match_threshold
                            && best.map_or(true, |(_, b)| ratio > b)
                        {
                            best = Some((*course, ratio));
                        }
                    }
                    best.map(|(course, _)| course)
                }
            };

            if let Some(home_course) = partner {
                let pair = (comp_course.clone(), home_course.clone());
                if seen.insert(pair.clone()) {
                    pairs.push(pair);
                }
            }
        }

        pairs
    }

    /// Competition score in [0, 1]; exact matches weigh double close
    /// matches, capped at 1.0. Zero competitor courses scores 0.0.
    pub fn score(&self, exact_count: usize, close_count: usize, competitor_total: usize) -> f64 {
        if competitor_total == 0 {
            return 0.0;
        }
        let weighted = exact_count as f64 * self.config.exact_match_weight + close_count as f64;
        (weighted / competitor_total as f64).min(1.0)
    }

    pub fn classify(&self, score: f64) -> CourseCompetitionLevel {
        if score >= self.config.very_high_score {
            CourseCompetitionLevel::VeryHigh
        } else if score >= self.config.high_score {
            CourseCompetitionLevel::High
        } else if score >= self.config.medium_score {
            CourseCompetitionLevel::Medium
        } else if score >= self.config.low_score {
            CourseCompetitionLevel::Low
        } else {
            CourseCompetitionLevel::VeryLow
        }
    }

    /// Full course-level comparison of two raw program lists. Pure function
    /// of its inputs; originals are never mutated.
    pub fn match_competitor(&self, home_programs: &[String], competitor_programs: &[String]) -> MatchResult {
        let home = normalize(home_programs);
        let competitor = normalize(competitor_programs);

        let exact_matches = self.find_exact_matches(&home, &competitor);
        let exclude: HashSet<String> = exact_matches.iter().cloned().collect();
        let close_matches = self.find_close_matches(&home, &competitor, &exclude);

        let close_competitor: HashSet<&String> = close_matches.iter().map(|(c, _)| c).collect();
        let close_home: HashSet<&String> = close_matches.iter().map(|(_, h)| h).collect();

        let unique_to_competitor: Vec<String> = competitor
            .iter()
            .filter(|course| !exclude.contains(*course) && !close_competitor.contains(course))
            .cloned()
            .collect();
        let unique_to_home: Vec<String> = home
            .iter()
            .filter(|course| !exclude.contains(*course) && !close_home.contains(course))
            .cloned()
            .collect();

        let competition_score = self.score(exact_matches.len(), close_matches.len(), competitor.len());

        MatchResult {
            competition_level: self.classify(competition_score),
            total_courses: competitor.len(),
            exact_matches,
            close_matches,
            unique_to_competitor,
            unique_to_home,
            competition_score,
        }
    }
}

impl Default for CourseMatcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}
