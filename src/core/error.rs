use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkillpackError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Version error: {0}")]
    SemverError(#[from] semver::Error),
    #[error("Frontmatter error: {0}")]
    FrontmatterError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("`{tool} {args}` failed: {stderr}")]
    ToolError {
        tool: String,
        args: String,
        stderr: String,
    },
}
