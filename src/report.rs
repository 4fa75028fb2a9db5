use serde::{Deserialize, Serialize};

use crate::matcher::{normalize, CourseCompetitionLevel, CourseMatcher};
use crate::models::CollegeProfile;

/// How many unique-course examples each competitor entry carries.
const UNIQUE_COURSE_LIMIT: usize = 10;
/// How many competitors the summary ranks.
const TOP_COMPETITOR_LIMIT: usize = 5;

/// Complete course-competition report. This structure is the JSON wire
/// format consumed by exporters and must round-trip losslessly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionReport {
    pub your_college: YourCollege,
    pub competitors: Vec<CompetitorEntry>,
    pub summary: Summary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YourCollege {
    pub id: String,
    pub name: String,
    pub location: String,
    pub total_courses: usize,
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorEntry {
    pub name: String,
    pub url: Option<String>,
    pub total_courses: usize,
    pub exact_matches: Vec<String>,
    pub exact_match_count: usize,
    pub close_matches: Vec<(String, String)>,
    pub close_match_count: usize,
    pub unique_to_competitor: Vec<String>,
    pub unique_to_yours: Vec<String>,
    pub competition_level: CourseCompetitionLevel,
    pub competition_score: f64,
    pub match_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_competitors_analyzed: usize,
    pub very_high_competition: usize,
    pub high_competition: usize,
    pub medium_competition: usize,
    pub low_competition: usize,
    pub average_match_percentage: f64,
    pub biggest_competitors: Vec<TopCompetitor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopCompetitor {
    pub name: String,
    pub score: f64,
    pub matches: usize,
}

/// Match every competitor catalog against the home college and aggregate
/// the results. Pure function of its inputs; re-running on unchanged data
/// produces an identical report.
pub fn build_report(
    home: &CollegeProfile,
    competitors: &[CollegeProfile],
    matcher: &CourseMatcher,
) -> CompetitionReport {
    let home_courses = normalize(&home.programs);

    let mut entries = Vec::new();
    for competitor in competitors {
        let result = matcher.match_competitor(&home.programs, &competitor.programs);

        let match_percentage = if result.total_courses > 0 {
            result.exact_matches.len() as f64 / result.total_courses as f64 * 100.0
        } else {
            0.0
        };

        let mut unique_to_competitor = result.unique_to_competitor;
        unique_to_competitor.truncate(UNIQUE_COURSE_LIMIT);
        let mut unique_to_yours = result.unique_to_home;
        unique_to_yours.truncate(UNIQUE_COURSE_LIMIT);

        entries.push(CompetitorEntry {
            name: competitor.name.clone(),
            url: competitor.source_url.clone(),
            total_courses: result.total_courses,
            exact_match_count: result.exact_matches.len(),
            exact_matches: result.exact_matches,
            close_match_count: result.close_matches.len(),
            close_matches: result.close_matches,
            unique_to_competitor,
            unique_to_yours,
            competition_level: result.competition_level,
            competition_score: result.competition_score,
            match_percentage,
        });
    }

    let summary = generate_summary(&entries, matcher);

    CompetitionReport {
        your_college: YourCollege {
            id: home.id.clone(),
            name: home.name.clone(),
            location: home.location.clone(),
            total_courses: home_courses.len(),
            courses: home_courses,
        },
        competitors: entries,
        summary,
    }
}

/// Summary statistics over the per-competitor entries. Buckets use the
/// matcher's score thresholds; the bottom bucket absorbs everything below
/// the medium boundary. Zero-course competitors enter the average as 0%.
fn generate_summary(entries: &[CompetitorEntry], matcher: &CourseMatcher) -> Summary {
    if entries.is_empty() {
        return Summary {
            total_competitors_analyzed: 0,
            very_high_competition: 0,
            high_competition: 0,
            medium_competition: 0,
            low_competition: 0,
            average_match_percentage: 0.0,
            biggest_competitors: Vec::new(),
        };
    }

    let config = matcher.config();
    let count_in = |low: f64, high: Option<f64>| {
        entries
            .iter()
            .filter(|e| e.competition_score >= low && high.map_or(true, |h| e.competition_score < h))
            .count()
    };

    let total_match_pct: f64 = entries.iter().map(|e| e.match_percentage).sum();

    // Stable sort keeps input order for equal scores.
    let mut ranked: Vec<&CompetitorEntry> = entries.iter().collect();
    ranked.sort_by(|a, b| {
        b.competition_score
            .partial_cmp(&a.competition_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Summary {
        total_competitors_analyzed: entries.len(),
        very_high_competition: count_in(config.very_high_score, None),
        high_competition: count_in(config.high_score, Some(config.very_high_score)),
        medium_competition: count_in(config.medium_score, Some(config.high_score)),
        low_competition: entries
            .iter()
            .filter(|e| e.competition_score < config.medium_score)
            .count(),
        average_match_percentage: total_match_pct / entries.len() as f64,
        biggest_competitors: ranked
            .iter()
            .take(TOP_COMPETITOR_LIMIT)
            .map(|e| TopCompetitor {
                name: e.name.clone(),
                score: e.competition_score,
                matches: e.exact_match_count,
            })
            .collect(),
    }
}

/// Render the report as the terminal/text artifact.
pub fn render_text(report: &CompetitionReport) -> String {
    let mut content = String::new();
    let rule = "=".repeat(80);

    content.push_str(&format!("{}\nCOURSE COMPETITION ANALYSIS REPORT\n{}\n\n", rule, rule));

    content.push_str(&format!("YOUR COLLEGE: {}\n", report.your_college.name));
    content.push_str(&format!("Location: {}\n", report.your_college.location));
    content.push_str(&format!("Total Courses Offered: {}\n", report.your_college.total_courses));
    content.push_str(&format!(
        "Courses: {}\n",
        report.your_college.courses[..report.your_college.courses.len().min(5)].join(", ")
    ));
    if report.your_college.courses.len() > 5 {
        content.push_str(&format!(
            "         ... and {} more\n",
            report.your_college.courses.len() - 5
        ));
    }

    content.push_str(&format!("\n{}\nCOMPETITIVE LANDSCAPE SUMMARY\n{}\n\n", rule, rule));
    let summary = &report.summary;
    content.push_str(&format!(
        "Total Competitors Analyzed: {}\n",
        summary.total_competitors_analyzed
    ));
    content.push_str(&format!("  🔴 Very High Competition: {}\n", summary.very_high_competition));
    content.push_str(&format!("  🟠 High Competition: {}\n", summary.high_competition));
    content.push_str(&format!("  🟡 Medium Competition: {}\n", summary.medium_competition));
    content.push_str(&format!("  🟢 Low Competition: {}\n", summary.low_competition));
    content.push_str(&format!(
        "\nAverage Course Overlap: {:.1}%\n",
        summary.average_match_percentage
    ));

    if !summary.biggest_competitors.is_empty() {
        content.push_str("\nTOP COMPETITORS:\n");
        for (i, comp) in summary.biggest_competitors.iter().enumerate() {
            content.push_str(&format!("\n{}. {}\n", i + 1, comp.name));
            content.push_str(&format!("   Competition Score: {:.1}%\n", comp.score * 100.0));
            content.push_str(&format!("   Course Matches: {} exact matches\n", comp.matches));
        }
    }

    content.push_str(&format!("\n{}\nDETAILED COMPETITOR ANALYSIS\n{}\n", rule, rule));

    for competitor in &report.competitors {
        content.push_str(&format!("\n📍 {}\n", competitor.name));
        if let Some(url) = &competitor.url {
            content.push_str(&format!("   Website: {}\n", url));
        }
        content.push_str(&format!("   Total Courses: {}\n", competitor.total_courses));
        content.push_str(&format!("   Competition Level: {}\n", competitor.competition_level));
        content.push_str(&format!("   Match Score: {:.1}%\n", competitor.match_percentage));

        if !competitor.exact_matches.is_empty() {
            content.push_str(&format!(
                "\n   🎯 EXACT COURSE MATCHES ({}):\n",
                competitor.exact_match_count
            ));
            for course in competitor.exact_matches.iter().take(5) {
                content.push_str(&format!("      • {}\n", course));
            }
            if competitor.exact_matches.len() > 5 {
                content.push_str(&format!(
                    "      ... and {} more\n",
                    competitor.exact_matches.len() - 5
                ));
            }
        }

        if !competitor.close_matches.is_empty() {
            content.push_str(&format!(
                "\n   ≈ SIMILAR COURSES ({}):\n",
                competitor.close_match_count
            ));
            for (their_course, our_course) in competitor.close_matches.iter().take(3) {
                content.push_str(&format!("      • {} ≈ {}\n", their_course, our_course));
            }
        }

        if !competitor.unique_to_competitor.is_empty() {
            content.push_str(&format!(
                "\n   ⭐ THEIR UNIQUE COURSES ({} shown):\n",
                competitor.unique_to_competitor.len()
            ));
            for course in competitor.unique_to_competitor.iter().take(3) {
                content.push_str(&format!("      • {}\n", course));
            }
        }

        if !competitor.unique_to_yours.is_empty() {
            content.push_str(&format!(
                "\n   💡 YOUR UNIQUE ADVANTAGE ({} courses):\n",
                competitor.unique_to_yours.len()
            ));
            for course in competitor.unique_to_yours.iter().take(3) {
                content.push_str(&format!("      • {}\n", course));
            }
        }
    }

    content.push_str(&format!("\n{}\n", rule));
    content
}
