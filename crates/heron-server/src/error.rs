use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing configuration: set the {env_var} environment variable")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a settings field path like `backend.api_key` to the environment
/// variable that supplies it (`HERON_BACKEND__API_KEY`).
pub fn to_env_var(field: &str) -> String {
    format!("HERON_{}", field.replace('.', "__").to_uppercase())
}
