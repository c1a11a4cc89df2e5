use crate::score::ScoreWeights;
use lumen_scanner::CrawlConfig;

/// Everything a scan session needs to know besides its collaborators.
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub crawl: CrawlConfig,
    pub weights: ScoreWeights,
}

impl ScanConfig {
    pub fn with_crawl(mut self, crawl: CrawlConfig) -> Self {
        self.crawl = crawl;
        self
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }
}
