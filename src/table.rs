//! Table I/O side of the annotator, split across focused submodules:
//! - `tsv`: tab-separated table model (parse/serialize)
//! - `variant`: identifier normalization and unique-key extraction
//! - `merge`: left join of frequency records onto rows

pub mod merge;
pub mod tsv;
pub mod variant;
