use anyhow::Result;
use chrono::Utc;
use clap::{Arg, ArgAction, Command};
use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use college_competition_analyzer::analyzer::{CollegeCompetitionLevel, CompetitionAnalyzer};
use college_competition_analyzer::geo::{self, GeoMapper, MapMarker};
use college_competition_analyzer::importer;
use college_competition_analyzer::matcher::CourseMatcher;
use college_competition_analyzer::models::{slug_id, ComparisonRecord, Config};
use college_competition_analyzer::report::{self, CompetitionReport};
use college_competition_analyzer::scraper::CollegeScraper;
use college_competition_analyzer::store::CollegeStore;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("college-competition-analyzer")
        .version("1.0")
        .about("Analyzes course overlap and competition between colleges")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("import-csv")
                .long("import-csv")
                .value_name("FILE")
                .help("Import competitors from a CSV file (standard column headers) before analysis"),
        )
        .arg(
            Arg::new("offline")
                .long("offline")
                .action(ArgAction::SetTrue)
                .help("Skip scraping and geocoding, analyze stored data only"),
        )
        .get_matches();

    let config_file = matches.get_one::<String>("config").unwrap();

    // Load or create configuration
    let config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        let default_config = Config::default();
        default_config.save_to_file(config_file)?;
        println!(
            "⚠️  Please edit {} and describe your college, then run the program again.",
            config_file
        );
        return Ok(());
    };

    if config.college.name.is_empty() {
        println!("❌ Error: college.name is empty in configuration file");
        println!("   Please edit {} and describe your college", config_file);
        return Ok(());
    }

    let offline = matches.get_flag("offline");
    let output_dir = config.output_directory.as_deref().unwrap_or("output");
    fs::create_dir_all(output_dir)?;
    clean_output_directory(output_dir)?;

    println!("🎓 Analyzing competition for: {}", config.college.name);
    println!("📄 Output directory: {} (cleaned)", output_dir);

    let mut store = CollegeStore::open(&config.data_file)?;
    let mut home = config.college.clone();
    if home.id.is_empty() {
        home.id = slug_id(&home.name);
    }
    store.set_my_college(home.clone());

    // Optional CSV import
    if let Some(csv_file) = matches.get_one::<String>("import-csv") {
        println!("📥 Importing competitors from: {}", csv_file);
        let imported = importer::import_from_csv(csv_file, &HashMap::new(), &mut store)?;
        println!("   ✅ Imported {} competitor(s)", imported);
    }

    // Scrape configured competitor websites
    if !offline && !config.competitor_urls.is_empty() {
        let scraper = CollegeScraper::new(&config.scraping);
        for url in &config.competitor_urls {
            println!("🌐 Scraping: {}", url);
            match scraper.scrape_url(url).await {
                Ok(profile) => {
                    println!(
                        "   ✅ Found {} program(s) at {}",
                        profile.programs.len(),
                        profile.name
                    );
                    store.add_competitor(profile);
                }
                Err(e) => {
                    println!("   ❌ Could not scrape {}: {}", url, e);
                }
            }
        }
    }

    if store.competitors().is_empty() {
        println!("❌ No competitor colleges available. Import a CSV or configure competitor_urls.");
        return Ok(());
    }

    // Course-level matching report
    println!("\n🔄 Matching courses against {} competitor(s)...", store.competitors().len());
    let matcher = CourseMatcher::new(config.matcher.clone());
    let competition_report = report::build_report(&home, store.competitors(), &matcher);

    generate_text_report(&competition_report, output_dir)?;
    generate_json_report(&competition_report, output_dir)?;
    generate_competitors_csv(&competition_report, output_dir)?;

    // College-level comparison, persisted per competitor
    println!("🏫 Comparing college profiles...");
    let analyzer = CompetitionAnalyzer::new(config.analyzer.clone());
    for competitor in store.competitors().to_vec() {
        let (score, level, analysis) = analyzer.compare_colleges(&home, &competitor);

        if level == CollegeCompetitionLevel::None {
            println!("   ⊘ Skipped {} - No program overlap", competitor.name);
            continue;
        }

        store.save_comparison(ComparisonRecord {
            competitor_id: competitor.id.clone(),
            competitor_name: competitor.name.clone(),
            similarity_score: score,
            competition_level: level,
            analysis,
            created: Utc::now(),
        });
    }
    store.save()?;

    let ranked = analyzer.rank_competitors(store.comparisons().to_vec());

    // Geographic map
    if !offline {
        println!("🗺️  Building geographic competition map...");
        if let Err(e) = generate_map(&config, &mut store, output_dir).await {
            warn!("Map generation failed: {}", e);
        }
        store.save()?;
    }

    print_summary(&competition_report, &ranked);

    println!("\n✅ Analysis complete!");
    println!("📂 Reports written to: {}", output_dir);
    Ok(())
}

fn generate_text_report(report: &CompetitionReport, output_dir: &str) -> Result<()> {
    let content = report::render_text(report);
    fs::write(Path::new(output_dir).join("competition_report.txt"), content)?;
    Ok(())
}

fn generate_json_report(report: &CompetitionReport, output_dir: &str) -> Result<()> {
    let content = serde_json::to_string_pretty(report)?;
    fs::write(Path::new(output_dir).join("competition_report.json"), content)?;
    Ok(())
}

fn generate_competitors_csv(report: &CompetitionReport, output_dir: &str) -> Result<()> {
    use csv::Writer;

    let csv_path = Path::new(output_dir).join("competitors.csv");
    let mut writer = Writer::from_path(csv_path)?;

    writer.write_record(&[
        "Name",
        "URL",
        "Total Courses",
        "Exact Matches",
        "Close Matches",
        "Competition Level",
        "Competition Score",
        "Match Percentage",
    ])?;

    for competitor in &report.competitors {
        writer.write_record(&[
            &competitor.name,
            &competitor.url.clone().unwrap_or_default(),
            &competitor.total_courses.to_string(),
            &competitor.exact_match_count.to_string(),
            &competitor.close_match_count.to_string(),
            &competitor.competition_level.label().to_string(),
            &format!("{:.3}", competitor.competition_score),
            &format!("{:.1}", competitor.match_percentage),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Geocode the home college and every ranked competitor, then write the
/// Leaflet map. Stored coordinates are reused; new ones are written back.
async fn generate_map(config: &Config, store: &mut CollegeStore, output_dir: &str) -> Result<()> {
    let mut mapper = GeoMapper::new(&config.scraping.user_agent);

    let home = store
        .my_college()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Home college not stored"))?;

    let home_coords = match (home.latitude, home.longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => mapper.get_coordinates(&home.location).await,
    };
    let Some(home_coords) = home_coords else {
        println!("   ⚠️  Could not locate {}, skipping map", home.location);
        return Ok(());
    };

    let levels: HashMap<String, (CollegeCompetitionLevel, f64)> = store
        .comparisons()
        .iter()
        .map(|r| (r.competitor_id.clone(), (r.competition_level, r.similarity_score)))
        .collect();

    let mut markers = Vec::new();
    for competitor in store.competitors().to_vec() {
        let Some((level, score)) = levels.get(&competitor.id).copied() else {
            continue;
        };

        let coords = match (competitor.latitude, competitor.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => {
                let coords = mapper.get_coordinates(&competitor.location).await;
                if let Some((lat, lon)) = coords {
                    let mut updated = competitor.clone();
                    updated.latitude = Some(lat);
                    updated.longitude = Some(lon);
                    store.add_competitor(updated);
                }
                coords
            }
        };

        if let Some(coordinates) = coords {
            markers.push(MapMarker {
                name: competitor.name.clone(),
                coordinates,
                level,
                score,
            });
        }
    }

    let html = geo::render_map_html(&home.name, home_coords, &markers);
    fs::write(Path::new(output_dir).join("competition_map.html"), html)?;
    println!("   ✅ Mapped {} competitor(s)", markers.len());
    Ok(())
}

fn print_summary(report: &CompetitionReport, ranked: &[ComparisonRecord]) {
    println!("\n📊 SUMMARY");
    println!("==========\n");

    let summary = &report.summary;
    println!("Total Competitors Analyzed: {}", summary.total_competitors_analyzed);
    println!("  🔴 Very High Competition: {}", summary.very_high_competition);
    println!("  🟠 High Competition: {}", summary.high_competition);
    println!("  🟡 Medium Competition: {}", summary.medium_competition);
    println!("  🟢 Low Competition: {}", summary.low_competition);
    println!("\nAverage Course Overlap: {:.1}%", summary.average_match_percentage);

    if !summary.biggest_competitors.is_empty() {
        println!("\n🏆 Biggest course competitors:");
        for (i, comp) in summary.biggest_competitors.iter().enumerate() {
            println!(
                "   {}. {} - score {:.1}% ({} exact matches)",
                i + 1,
                comp.name,
                comp.score * 100.0,
                comp.matches
            );
        }
    }

    if !ranked.is_empty() {
        println!("\n🏫 College-level ranking:");
        for (i, record) in ranked.iter().enumerate() {
            println!(
                "   {}. {} - {} (similarity {:.1}%)",
                i + 1,
                record.competitor_name,
                record.competition_level,
                record.similarity_score * 100.0
            );
        }
    }
}

// Clean up previous results from output directory
fn clean_output_directory(output_dir: &str) -> Result<()> {
    let output_path = Path::new(output_dir);

    if !output_path.exists() {
        return Ok(());
    }

    let items_to_clean = [
        "competition_report.txt",
        "competition_report.json",
        "competitors.csv",
        "competition_map.html",
    ];

    for item in &items_to_clean {
        let item_path = output_path.join(item);
        if item_path.exists() {
            fs::remove_file(&item_path)?;
        }
    }

    Ok(())
}
