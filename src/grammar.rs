//! PCFG estimation (`bare`), flat chart parsing (`chart`, `parse`), and the
//! `.rules`/`.lexicon` line format (`rule`) shared by both directions.

pub mod bare;
pub mod chart;
pub mod parse;
pub mod rule;
