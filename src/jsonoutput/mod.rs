//! Change-summary tree for infrastructure plan output.
//!
//! Resource URNs are split into segments, folded into a tree of nodes and
//! rendered with box-drawing glyphs and aligned status columns.

mod builder;
mod report;
mod tree;
mod types;

pub use builder::PrefixSource;
pub use report::{PlanReport, PlanReportError, RenderedPlan};
