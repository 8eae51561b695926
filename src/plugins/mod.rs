//! Command domains: skills, scoring, changesets, commits, changelogs,
//! releases and the plugin marketplace.

pub mod changelog;
pub mod changeset;
pub mod commits;
pub mod marketplace;
pub mod release;
pub mod score;
pub mod skill;
