pub mod lexical;
pub mod page;

use std::time::Duration;

use anyhow::Result;
use scraper::Html;
use serde::Serialize;
use tracing::{info, warn};

use lexical::UrlStats;
use page::{FetchedPage, LineStats, MarkupStats};

/// Column names in the order the classifier was trained on.
pub const FEATURE_NAMES: [&str; 8] = [
    "LineOfCode",
    "LargestLineLength",
    "URLLength",
    "NoOfImage",
    "NoOfExternalRef",
    "SpecialCharRatioURL",
    "LetterRatioInURL",
    "DomainLength",
];

/// The 8 classifier inputs for one URL, serialized under the training column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureVector {
    pub line_of_code: usize,
    pub largest_line_length: usize,
    #[serde(rename = "URLLength")]
    pub url_length: usize,
    pub no_of_image: usize,
    pub no_of_external_ref: usize,
    #[serde(rename = "SpecialCharRatioURL")]
    pub special_char_ratio_url: f64,
    #[serde(rename = "LetterRatioInURL")]
    pub letter_ratio_in_url: f64,
    pub domain_length: usize,
}

impl FeatureVector {
    /// Build the vector for a normalized URL and, if the fetch succeeded, its page.
    pub fn compute(url: &str, page: Option<&FetchedPage>) -> Self {
        let url_stats = UrlStats::from_url(url);

        let lines = page
            .map(|p| LineStats::from_body(&p.body))
            .unwrap_or_default();

        let parsed = page.map(|p| Html::parse_document(&String::from_utf8_lossy(&p.body)));
        let markup = match &parsed {
            Some(doc) => MarkupStats::from_document(doc, lexical::netloc(url)),
            None => MarkupStats::default(),
        };

        FeatureVector {
            line_of_code: lines.line_count,
            largest_line_length: lines.largest_line,
            url_length: url_stats.length,
            no_of_image: markup.images,
            no_of_external_ref: markup.external_refs,
            special_char_ratio_url: url_stats.special_char_ratio,
            letter_ratio_in_url: url_stats.letter_ratio,
            domain_length: url_stats.domain_length,
        }
    }

    /// Fixed-order numeric row for the classifier.
    pub fn to_row(&self) -> [f64; 8] {
        [
            self.line_of_code as f64,
            self.largest_line_length as f64,
            self.url_length as f64,
            self.no_of_image as f64,
            self.no_of_external_ref as f64,
            self.special_char_ratio_url,
            self.letter_ratio_in_url,
            self.domain_length as f64,
        ]
    }
}

/// Fetches a URL once and turns it into a [`FeatureVector`].
#[derive(Clone)]
pub struct FeatureExtractor {
    client: reqwest::Client,
}

impl FeatureExtractor {
    pub fn new(timeout: Option<Duration>, user_agent: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua);
        }
        Ok(FeatureExtractor {
            client: builder.build()?,
        })
    }

    pub async fn extract(&self, raw_url: &str) -> FeatureVector {
        let url = lexical::normalize(raw_url);
        let page = self.fetch(&url).await;
        let features = FeatureVector::compute(&url, page.as_ref());
        info!("Extracted features for {}: {:?}", url, features.to_row());
        features
    }

    /// Single GET attempt. Error statuses still count as a fetched page.
    async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                return None;
            }
        };
        match response.bytes().await {
            Ok(body) => Some(FetchedPage {
                body: body.to_vec(),
            }),
            Err(e) => {
                warn!("Reading body failed for {}: {}", url, e);
                None
            }
        }
    }
}
