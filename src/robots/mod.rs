//! Robots.txt handling module
//!
//! [`ParsedRobots`] evaluates robots.txt content; [`ComplianceGuard`] fetches it
//! once per origin, caches the resulting policy for the lifetime of the guard
//! and turns it into a [`ComplianceDecision`] per URL.

mod guard;
mod parser;

pub use guard::{ComplianceDecision, ComplianceGuard};
pub use parser::ParsedRobots;
