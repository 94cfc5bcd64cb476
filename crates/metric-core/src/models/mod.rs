//! Data model shared by every crate in the engine.

pub mod average;
pub mod entity;
pub mod entity_set;
pub mod field;
pub mod market;
pub mod measure;
pub mod quota;
pub mod response;
pub mod results;
pub mod significance;
pub mod subset;

pub use average::{
    AverageDescriptor, CalculationPeriod, DateRange, MakeUpTo, TotalisationPeriodUnit,
    WeightAcross,
};
pub use entity::{
    DataTarget, EntityInstance, EntityType, EntityValue, EntityValueCombination, TargetInstances,
};
pub use entity_set::{EntitySetConfiguration, EntitySetId};
pub use field::{DataAccessModel, ResponseFieldDescriptor};
pub use market::{AverageType, EntityMeanMap, EntityMeanMapping, MainQuestionType};
pub use measure::{CalculationType, FieldOperation, MeasureDefinition, ValueSet};
pub use quota::{QuotaCell, ReferenceWeightings, WeightingValue};
pub use response::{AnswerRow, AnswerValue, EntityIds, ResponseHeader, ResponseId, ResponseRecord};
pub use results::{EntityWeightedDailyResults, WeightedDailyResult};
pub use significance::{SigConfidenceLevel, Significance};
pub use subset::{Subset, SubsetId};
