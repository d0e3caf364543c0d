pub mod feature_extractor;
pub mod merger;
pub mod report_assembler;
pub mod score_composer;

pub use feature_extractor::FeatureExtractor;
pub use merger::{MergeOutcome, RecordMerger};
pub use report_assembler::ReportAssembler;
pub use score_composer::{
    Adjustment, FactorWeight, RiskScorer, ScoreComposer, ScoreResult, ScoredFeatureSet,
    WeightTable,
};
