//! Declarative API types served by the controller

pub mod cdq;
pub mod conditions;

pub use cdq::{
    ComponentDescriptor, ComponentDetectionQuery, ComponentDetectionQuerySpec,
    ComponentDetectionQueryStatus, ComponentSource, GitSource, RUN_LOCAL_ANNOTATION,
};
pub use conditions::{CdqCondition, ConditionStatus, TerminalOutcome};
