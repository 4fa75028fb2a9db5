use anyhow::{Context, Result};
use log::{info, warn};
use scraper::{Html, Selector};
use std::fs;
use std::time::Duration;

use crate::models::{slug_id, CollegeProfile, ScrapingConfig};

/// Words that mark a text fragment as a plausible program name.
const PROGRAM_KEYWORDS: [&str; 22] = [
    "engineering",
    "science",
    "sciences",
    "business",
    "management",
    "computing",
    "technology",
    "mathematics",
    "studies",
    "design",
    "nursing",
    "health",
    "education",
    "law",
    "medicine",
    "arts",
    "accounting",
    "economics",
    "psychology",
    "marketing",
    "biology",
    "chemistry",
];

const MAX_PROGRAMS_PER_PAGE: usize = 200;

pub struct CollegeScraper {
    client: reqwest::Client,
    max_retries: u32,
    timeout: Duration,
}

impl CollegeScraper {
    pub fn new(config: &ScrapingConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            max_retries: config.max_retries.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Fetch a competitor page and extract a best-effort profile. Retries
    /// transient failures up to the configured limit.
    pub async fn scrape_url(&self, url: &str) -> Result<CollegeProfile> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.fetch(url).await {
                Ok(content) => {
                    let profile = self.parse_html(&content, Some(url));
                    info!(
                        "Scraped {}: {} program(s) found",
                        profile.name,
                        profile.programs.len()
                    );
                    return Ok(profile);
                }
                Err(e) => {
                    warn!("Attempt {}/{} failed for {}: {}", attempt, self.max_retries, url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Failed to scrape {}", url)))
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "HTTP request failed with status: {}",
                response.status()
            ));
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {}", url))
    }

    /// Parse a saved HTML file instead of a live page.
    pub fn scrape_file(&self, file_path: &str) -> Result<CollegeProfile> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read file: {}", file_path))?;

        Ok(self.parse_html(&content, None))
    }

    fn parse_html(&self, content: &str, url: Option<&str>) -> CollegeProfile {
        let document = Html::parse_document(content);

        let name = self
            .extract_name(&document)
            .or_else(|| url.and_then(domain_of))
            .unwrap_or_else(|| "Unknown College".to_string());

        let programs = self.extract_programs(&document);

        CollegeProfile {
            id: slug_id(&name),
            name,
            programs,
            source_url: url.map(|u| u.to_string()),
            ..CollegeProfile::default()
        }
    }

    fn extract_name(&self, document: &Html) -> Option<String> {
        let h1_selector = Selector::parse("h1").unwrap();
        if let Some(element) = document.select(&h1_selector).next() {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }

        let meta_selector =
            Selector::parse("meta[property='og:site_name'], meta[property='og:title']").unwrap();
        if let Some(element) = document.select(&meta_selector).next() {
            if let Some(content) = element.value().attr("content") {
                let content = content.trim();
                if !content.is_empty() {
                    return Some(content.to_string());
                }
            }
        }

        let title_selector = Selector::parse("title").unwrap();
        document
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Collect program-looking text from list items, links and table cells.
    fn extract_programs(&self, document: &Html) -> Vec<String> {
        let selector = Selector::parse("li, a, td, h2, h3").unwrap();
        let mut programs = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for element in document.select(&selector) {
            let text = element.text().collect::<String>();
            let text = text.trim();

            if !looks_like_program(text) {
                continue;
            }
            if seen.insert(text.to_lowercase()) {
                programs.push(text.to_string());
            }
            if programs.len() >= MAX_PROGRAMS_PER_PAGE {
                break;
            }
        }

        programs
    }
}

fn looks_like_program(text: &str) -> bool {
    if text.len() < 3 || text.len() > 80 {
        return false;
    }
    // Program names are short phrases, not sentences or nav breadcrumbs.
    if text.split_whitespace().count() > 8 || text.contains('\n') {
        return false;
    }

    let lower = text.to_lowercase();
    PROGRAM_KEYWORDS.iter().any(|keyword| {
        lower
            .split_whitespace()
            .any(|word| word.trim_matches(|c: char| !c.is_alphanumeric()) == *keyword)
    })
}

fn domain_of(url: &str) -> Option<String> {
    let re = regex::Regex::new(r"^https?://(?:www\.)?([^/]+)").unwrap();
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
