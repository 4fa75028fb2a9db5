//! End-to-end tests for the competition analysis pipeline: CSV import,
//! course matching, college-level comparison, report aggregation and the
//! JSON wire format.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use college_competition_analyzer::analyzer::{CollegeCompetitionLevel, CompetitionAnalyzer};
use college_competition_analyzer::importer::import_from_csv;
use college_competition_analyzer::matcher::{CourseCompetitionLevel, CourseMatcher};
use college_competition_analyzer::models::CollegeProfile;
use college_competition_analyzer::report::{build_report, CompetitionReport};
use college_competition_analyzer::store::CollegeStore;

fn college(name: &str, programs: &[&str]) -> CollegeProfile {
    CollegeProfile {
        id: name.to_lowercase().replace(' ', "_"),
        name: name.to_string(),
        location: "Testville".to_string(),
        programs: programs.iter().map(|s| s.to_string()).collect(),
        ..CollegeProfile::default()
    }
}

fn temp_path(name: &str, ext: &str) -> PathBuf {
    std::env::temp_dir().join(format!("integration_{}_{}.{}", name, std::process::id(), ext))
}

#[test]
fn course_pipeline_exact_match_scenario() {
    // Home vs a competitor sharing one course, case-insensitively.
    let home = college("Home", &["Computer Science", "Business", "Engineering"]);
    let competitor = college("Rival", &["computer science", "law", "medicine"]);
    let matcher = CourseMatcher::default();

    let report = build_report(&home, &[competitor], &matcher);
    let entry = &report.competitors[0];

    assert_eq!(entry.exact_matches, vec!["computer science".to_string()]);
    assert_eq!(entry.exact_match_count, 1);
    assert!((entry.match_percentage - 100.0 / 3.0).abs() < 0.1);
}

#[test]
fn course_pipeline_token_threshold_scenarios() {
    let matcher = CourseMatcher::default();

    // "Software Engineering" vs "Software Development": ratio 1/3, below 0.4.
    let result = matcher.match_competitor(
        &["Software Engineering".to_string()],
        &["Software Development".to_string()],
    );
    assert!(result.close_matches.is_empty());

    // "Software Eng" against a two-entry home list: still 1/3, still below.
    let result = matcher.match_competitor(
        &["Software Engineering".to_string(), "Data Science".to_string()],
        &["Software Eng".to_string()],
    );
    assert!(result.close_matches.is_empty());
}

#[test]
fn course_pipeline_zero_course_competitor() {
    let home = college("Home", &["Law"]);
    let competitor = college("Empty", &[]);
    let matcher = CourseMatcher::default();

    let report = build_report(&home, &[competitor], &matcher);
    let entry = &report.competitors[0];

    assert_eq!(entry.competition_score, 0.0);
    assert_eq!(entry.match_percentage, 0.0);
    assert_eq!(entry.competition_level, CourseCompetitionLevel::VeryLow);
}

#[test]
fn course_pipeline_is_idempotent() {
    let home = college("Home", &["Computer Science", "Data Science", "Business"]);
    let competitors = vec![
        college("Rival A", &["computer science", "Applied Data Science"]),
        college("Rival B", &["Philosophy", "History"]),
    ];
    let matcher = CourseMatcher::default();

    let first = build_report(&home, &competitors, &matcher);
    let second = build_report(&home, &competitors, &matcher);

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn college_comparison_empty_catalogs_are_neutral() {
    // Both catalogs empty and no metrics: every component is the neutral
    // 0.5, overall 0.5, which classifies as MEDIUM.
    let analyzer = CompetitionAnalyzer::default();
    let (score, level, _) = analyzer.compare_colleges(&college("Home", &[]), &college("Rival", &[]));

    assert!((score - 0.5).abs() < 1e-9);
    assert_eq!(level, CollegeCompetitionLevel::Medium);
}

#[test]
fn college_comparison_gate_overrides_metrics() {
    let mut home = college("Home", &["law", "medicine", "nursing", "dentistry"]);
    let mut competitor = college("Rival", &["welding", "plumbing", "carpentry"]);
    home.avg_sat = Some(1300.0);
    competitor.avg_sat = Some(1300.0);
    home.enrollment = Some(9_000);
    competitor.enrollment = Some(9_000);

    let analyzer = CompetitionAnalyzer::default();
    let (score, level, analysis) = analyzer.compare_colleges(&home, &competitor);

    assert_eq!(score, 0.0);
    assert_eq!(level, CollegeCompetitionLevel::None);
    assert!(analysis.contains("Not a direct competitor"));
}

#[test]
fn csv_import_feeds_matching_pipeline() {
    let csv_path = temp_path("pipeline", "csv");
    let store_path = temp_path("pipeline_store", "json");
    let _ = fs::remove_file(&store_path);
    fs::write(
        &csv_path,
        "name,location,programs,enrollment\n\
         Rival College,Springfield,\"Computer Science, Law\",4000\n\
         Far College,Shelbyville,\"Welding; Plumbing\",1000\n",
    )
    .unwrap();

    let mut store = CollegeStore::open(&store_path).unwrap();
    let imported = import_from_csv(csv_path.to_str().unwrap(), &HashMap::new(), &mut store).unwrap();
    assert_eq!(imported, 2);
    store.save().unwrap();

    let home = college("Home", &["Computer Science", "Business"]);
    let matcher = CourseMatcher::default();
    let report = build_report(&home, store.competitors(), &matcher);

    assert_eq!(report.summary.total_competitors_analyzed, 2);
    let rival = report
        .competitors
        .iter()
        .find(|c| c.name == "Rival College")
        .unwrap();
    assert_eq!(rival.exact_matches, vec!["computer science".to_string()]);

    let _ = fs::remove_file(&csv_path);
    let _ = fs::remove_file(&store_path);
}

#[test]
fn report_wire_format_round_trips() {
    let home = college("Home", &["Computer Science", "Data Science", "Business"]);
    let competitors = vec![
        college("Rival", &["computer science", "Applied Data Science", "Philosophy"]),
        college("Empty", &[]),
    ];
    let matcher = CourseMatcher::default();
    let report = build_report(&home, &competitors, &matcher);

    let json = serde_json::to_string_pretty(&report).unwrap();
    let parsed: CompetitionReport = serde_json::from_str(&json).unwrap();
    let rewritten = serde_json::to_string_pretty(&parsed).unwrap();
    assert_eq!(json, rewritten);

    // Field spellings are part of the wire contract.
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value.get("your_college").is_some());
    assert!(value["summary"].get("biggest_competitors").is_some());
    let first = &value["competitors"][0];
    for field in [
        "name",
        "url",
        "total_courses",
        "exact_matches",
        "exact_match_count",
        "close_matches",
        "close_match_count",
        "unique_to_competitor",
        "unique_to_yours",
        "competition_level",
        "competition_score",
        "match_percentage",
    ] {
        assert!(first.get(field).is_some(), "missing field {}", field);
    }
    assert_eq!(first["competition_level"], "VERY_HIGH");
}
