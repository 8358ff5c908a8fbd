pub mod config;
pub mod domain;
pub mod errors;
pub mod pipeline;
pub mod rules;
pub mod segmentation;
pub mod taxonomy;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig};
pub use domain::customer::{CustomerId, Gender, Sentiment, StoreId, TransactionRecord};
pub use domain::interaction::Interaction;
pub use domain::item::{LineItem, ResolutionSource, ResolvedCategory};
pub use domain::persona::{
    ConfidenceLevel, EngagementTier, LoyaltyTier, PersonaAssignment, TimePreference, ValueTier,
};
pub use errors::{ApplicationError, DomainError};
pub use pipeline::{BatchInput, BatchOutput, BatchRunner, ClassifiedItem};
pub use rules::{
    ClassificationRule, MatchWeights, RuleCatalog, RuleEngine, RuleMatchResult, TimeConstraint,
    FALLBACK_LABEL,
};
pub use segmentation::{
    extract_profile, BehavioralSegment, CompositeWeights, CustomerBehaviorProfile, DecisionRow,
    DecisionTable, PopulationBounds, QuintileAssigner, SegmentationEngine, SynthesisContext,
};
pub use taxonomy::{
    normalize_key, BrandMapping, CategoryRef, CoverageStats, SkuMapping, TaxonomyDictionary,
};
