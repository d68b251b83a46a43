//! Configuration resolution for agents.
//!
//! Resolution is two-phase: a source (a settings file or an explicit key/value
//! set) is parsed and validated into an immutable [`Configuration`], and only
//! then is an agent built from it. Resolution reads the source and the process
//! environment; it never touches the network.
//!
//! # File format
//!
//! TOML (`.toml`) or YAML (`.yaml`, `.yml`):
//!
//! ```toml
//! provider = "azure"
//! model = "gpt-4o"
//!
//! [params]
//! temperature = 0.2
//! max_tokens = 1024
//!
//! [azure]
//! api_key = "${AZURE_OPENAI_API_KEY}"
//! resource_name = "my-resource"
//! api_version = "2024-02-01"
//! ```
//!
//! `${VAR}` placeholders in string values are replaced from the environment.

use regex::Regex;
use relay_abstraction::GenerationParams;
use relay_models::{AzureSettings, ClientConfig, ProviderKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use crate::error::ConfigurationError;

/// Environment variable holding the OpenAI API key when none is configured.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable holding the Azure OpenAI API key when none is configured.
pub const AZURE_OPENAI_API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";

/// Where a configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A TOML or YAML settings file.
    File(PathBuf),
    /// Flat key/value pairs, e.g. `provider`, `model`, `azure.resource_name`.
    Values(BTreeMap<String, String>),
}

impl ConfigSource {
    /// Builds a `Values` source from any iterator of pairs.
    pub fn values<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Values(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Raw settings as they appear in a file, before placeholders and defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    #[serde(default)]
    params: RawParams,
    azure: Option<RawAzure>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParams {
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_tokens: Option<u32>,
    #[serde(alias = "stop_sequences")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAzure {
    api_key: Option<String>,
    resource_name: Option<String>,
    base_url: Option<String>,
    #[serde(alias = "azure_deployment")]
    deployment: Option<String>,
    api_version: Option<String>,
    #[serde(default, alias = "use_default_azure_credential")]
    use_default_credential: bool,
}

/// Fully resolved agent configuration. Immutable once built.
#[derive(Clone, PartialEq)]
pub struct Configuration {
    provider: ProviderKind,
    model: String,
    endpoint: Option<String>,
    api_key: Option<String>,
    params: GenerationParams,
    azure: Option<AzureSettings>,
    timeout: Option<Duration>,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("params", &self.params)
            .field("azure", &self.azure.as_ref().map(|a| (&a.resource_name, &a.base_url)))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Configuration {
    /// Starts building a configuration from explicit values.
    pub fn builder(provider: ProviderKind, model: impl Into<String>) -> ConfigurationBuilder {
        ConfigurationBuilder::new(provider, model)
    }

    /// Resolves a configuration from a source, reading placeholders and
    /// credential fallbacks from the process environment.
    pub fn resolve(source: &ConfigSource) -> Result<Self, ConfigurationError> {
        Self::resolve_with_env(source, &|name| std::env::var(name).ok())
    }

    /// Resolves a configuration using `env` instead of the process environment.
    pub fn resolve_with_env(
        source: &ConfigSource,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let raw = match source {
            ConfigSource::File(path) => RawConfig::from_file(path)?,
            ConfigSource::Values(values) => RawConfig::from_values(values)?,
        };
        raw.resolve(env)
    }

    /// Resolves a configuration from a settings file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        Self::resolve(&ConfigSource::File(path.as_ref().to_path_buf()))
    }

    /// Provider this configuration targets.
    pub const fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Model name (for Azure, the deployment).
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Endpoint override, if any.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Whether the provider needs a credential at all.
    pub const fn requires_credential(&self) -> bool {
        self.provider.requires_credential()
    }

    /// Whether a credential is configured for a provider that needs one.
    pub fn has_credential(&self) -> bool {
        self.requires_credential()
            && (self.api_key.is_some()
                || self
                    .azure
                    .as_ref()
                    .is_some_and(|a| a.api_key.is_some() || a.use_default_credential))
    }

    /// Generation parameters sent with every prompt.
    pub const fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Azure settings, when the provider is Azure.
    pub const fn azure(&self) -> Option<&AzureSettings> {
        self.azure.as_ref()
    }

    /// Per-request timeout override.
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Client settings handed to `ClientFactory`.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.provider, self.model.clone());
        config.api_key.clone_from(&self.api_key);
        config.base_url.clone_from(&self.endpoint);
        config.timeout = self.timeout;
        if let Some(azure) = &self.azure {
            config = config.with_azure(azure.clone());
        }
        config
    }
}

/// Builder for [`Configuration`]; `build` runs every validation.
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    provider: ProviderKind,
    model: String,
    endpoint: Option<String>,
    api_key: Option<String>,
    params: GenerationParams,
    azure: Option<AzureSettings>,
    timeout: Option<Duration>,
}

impl ConfigurationBuilder {
    fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            endpoint: None,
            api_key: None,
            params: GenerationParams::default(),
            azure: None,
            timeout: None,
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the endpoint override.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Replaces the generation parameters.
    #[must_use]
    pub fn params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Sets the Azure section.
    #[must_use]
    pub fn azure(mut self, azure: AzureSettings) -> Self {
        self.azure = Some(azure);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates and freezes the configuration.
    pub fn build(self) -> Result<Configuration, ConfigurationError> {
        reject_placeholder("model", Some(&self.model))?;
        reject_placeholder("endpoint", self.endpoint.as_ref())?;
        reject_placeholder("api_key", self.api_key.as_ref())?;

        if let Some(endpoint) = &self.endpoint {
            check_absolute_url("endpoint", endpoint)?;
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(ConfigurationError::InvalidValue {
                field: "timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        self.params.validate()?;

        let azure = match self.provider {
            ProviderKind::Azure => {
                let mut azure = self.azure.unwrap_or_default();
                if azure.api_key.is_none() {
                    azure.api_key.clone_from(&self.api_key);
                }
                if azure.base_url.is_none() {
                    azure.base_url.clone_from(&self.endpoint);
                }
                reject_placeholder("azure.api_key", azure.api_key.as_ref())?;
                reject_placeholder("azure.base_url", azure.base_url.as_ref())?;
                reject_placeholder("azure.resource_name", azure.resource_name.as_ref())?;
                reject_placeholder("azure.deployment", azure.deployment.as_ref())?;

                let model = Some(self.model.as_str()).filter(|m| !m.trim().is_empty());
                azure.resolve(model)?;
                Some(azure)
            }
            ProviderKind::OpenAi => {
                if self.model.trim().is_empty() {
                    return Err(ConfigurationError::MissingField("model".to_string()));
                }
                if self.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
                    return Err(ConfigurationError::MissingField("api_key".to_string()));
                }
                None
            }
            ProviderKind::Mock => {
                if self.model.trim().is_empty() {
                    return Err(ConfigurationError::MissingField("model".to_string()));
                }
                None
            }
        };

        let model = match (&azure, self.model.trim().is_empty()) {
            (Some(azure), true) => azure.deployment.clone().unwrap_or_default(),
            _ => self.model,
        };

        Ok(Configuration {
            provider: self.provider,
            model,
            endpoint: self.endpoint,
            api_key: self.api_key,
            params: self.params,
            azure,
            timeout: self.timeout,
        })
    }
}

/// Endpoints must at least look like `scheme://host`.
fn check_absolute_url(field: &str, value: &str) -> Result<(), ConfigurationError> {
    let has_scheme = value.split_once("://").is_some_and(|(scheme, rest)| {
        !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric()) && !rest.is_empty()
    });
    if has_scheme {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{value}' is not an absolute URL"),
        })
    }
}

fn reject_placeholder(field: &str, value: Option<&String>) -> Result<(), ConfigurationError> {
    match value.and_then(|v| find_placeholder(v)) {
        Some(variable) => Err(ConfigurationError::UnresolvedPlaceholder {
            field: field.to_string(),
            variable: variable.to_string(),
        }),
        None => Ok(()),
    }
}

/// Matches `${VAR}`, allowing whitespace around the variable name.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}").expect("placeholder regex should be valid")
});

/// Returns the variable name of the first `${VAR}` placeholder in `value`.
fn find_placeholder(value: &str) -> Option<&str> {
    PLACEHOLDER.captures(value).and_then(|caps| caps.get(1)).map(|name| name.as_str())
}

/// Replaces every `${VAR}` in `value` using `env`.
fn interpolate(
    field: &str,
    value: &str,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<String, ConfigurationError> {
    if value.matches("${").count() != PLACEHOLDER.find_iter(value).count() {
        return Err(ConfigurationError::InvalidValue {
            field: field.to_string(),
            reason: format!("malformed '${{' placeholder in '{value}'"),
        });
    }

    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(value) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let variable = name.as_str();
        let resolved = env(variable).ok_or_else(|| ConfigurationError::UnresolvedPlaceholder {
            field: field.to_string(),
            variable: variable.to_string(),
        })?;
        out.push_str(&value[last..whole.start()]);
        out.push_str(&resolved);
        last = whole.end();
    }

    out.push_str(&value[last..]);
    Ok(out)
}

fn interpolate_opt(
    field: &str,
    value: Option<String>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<String>, ConfigurationError> {
    value.map(|v| interpolate(field, &v, env)).transpose()
}

fn parse_value<T: FromStr>(field: &str, value: &str) -> Result<T, ConfigurationError>
where
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigurationError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigurationError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigurationError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected boolean-like value, got: {other}"),
        }),
    }
}

impl RawConfig {
    fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let path_display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Read {
            path: path_display.clone(),
            reason: e.to_string(),
        })?;

        let extension =
            path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).unwrap_or_default();

        debug!(path = %path_display, format = %extension, "Parsing configuration file");

        match extension.as_str() {
            "toml" => toml::from_str(&content)
                .map_err(|e| ConfigurationError::Parse { path: path_display, reason: e.to_string() }),
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| ConfigurationError::Parse { path: path_display, reason: e.to_string() }),
            other => Err(ConfigurationError::Parse {
                path: path_display,
                reason: format!("unsupported configuration format '{other}' (expected toml, yaml or yml)"),
            }),
        }
    }

    fn from_values(values: &BTreeMap<String, String>) -> Result<Self, ConfigurationError> {
        let mut raw = Self::default();
        let mut azure = RawAzure::default();
        let mut has_azure = false;

        for (key, value) in values {
            let value = value.clone();
            match key.as_str() {
                "provider" => raw.provider = Some(value),
                "model" => raw.model = Some(value),
                "endpoint" | "base_url" => raw.endpoint = Some(value),
                "api_key" => raw.api_key = Some(value),
                "timeout_secs" => raw.timeout_secs = Some(parse_value(key, &value)?),
                "temperature" => raw.params.temperature = Some(parse_value(key, &value)?),
                "top_p" => raw.params.top_p = Some(parse_value(key, &value)?),
                "max_tokens" => raw.params.max_tokens = Some(parse_value(key, &value)?),
                "stop" => {
                    raw.params.stop = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect(),
                    );
                }
                azure_key if azure_key.starts_with("azure.") => {
                    has_azure = true;
                    match &azure_key["azure.".len()..] {
                        "api_key" => azure.api_key = Some(value),
                        "resource_name" => azure.resource_name = Some(value),
                        "base_url" => azure.base_url = Some(value),
                        "deployment" | "azure_deployment" => azure.deployment = Some(value),
                        "api_version" => azure.api_version = Some(value),
                        "use_default_credential" | "use_default_azure_credential" => {
                            azure.use_default_credential = parse_bool(key, &value)?;
                        }
                        _ => {
                            return Err(ConfigurationError::InvalidValue {
                                field: key.clone(),
                                reason: "unknown configuration key".to_string(),
                            });
                        }
                    }
                }
                _ => {
                    return Err(ConfigurationError::InvalidValue {
                        field: key.clone(),
                        reason: "unknown configuration key".to_string(),
                    });
                }
            }
        }

        if has_azure {
            raw.azure = Some(azure);
        }
        Ok(raw)
    }

    fn resolve(self, env: &dyn Fn(&str) -> Option<String>) -> Result<Configuration, ConfigurationError> {
        let provider_name = interpolate_opt("provider", self.provider, env)?
            .ok_or_else(|| ConfigurationError::MissingField("provider".to_string()))?;
        let provider = ProviderKind::from_str(&provider_name)?;

        let model = interpolate_opt("model", self.model, env)?.unwrap_or_default();
        let endpoint = interpolate_opt("endpoint", self.endpoint, env)?;
        let mut api_key = interpolate_opt("api_key", self.api_key, env)?;

        let defaults = GenerationParams::default();
        let params = GenerationParams {
            temperature: self.params.temperature.or(defaults.temperature),
            top_p: self.params.top_p.or(defaults.top_p),
            max_tokens: self.params.max_tokens.or(defaults.max_tokens),
            stop_sequences: self.params.stop.or(defaults.stop_sequences),
        };

        let azure = match self.azure {
            Some(raw) => Some(AzureSettings {
                api_key: interpolate_opt("azure.api_key", raw.api_key, env)?,
                resource_name: interpolate_opt("azure.resource_name", raw.resource_name, env)?,
                base_url: interpolate_opt("azure.base_url", raw.base_url, env)?,
                deployment: interpolate_opt("azure.deployment", raw.deployment, env)?,
                api_version: interpolate_opt("azure.api_version", raw.api_version, env)?,
                use_default_credential: raw.use_default_credential,
            }),
            None => None,
        };

        match provider {
            ProviderKind::OpenAi if api_key.is_none() => {
                api_key = env(OPENAI_API_KEY_ENV);
            }
            ProviderKind::Azure => {
                let needs_key = azure
                    .as_ref()
                    .is_none_or(|a| a.api_key.is_none() && !a.use_default_credential);
                if api_key.is_none() && needs_key {
                    api_key = env(AZURE_OPENAI_API_KEY_ENV);
                }
            }
            _ => {}
        }

        let mut builder = Configuration::builder(provider, model).params(params);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint(endpoint);
        }
        if let Some(api_key) = api_key {
            builder = builder.api_key(api_key);
        }
        if let Some(azure) = azure {
            builder = builder.azure(azure);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let config = builder.build()?;
        debug!(
            provider = %config.provider(),
            model = %config.model(),
            has_credential = config.has_credential(),
            "Configuration resolved"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| map.get(name).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_builder_mock_defaults() {
        let config = Configuration::builder(ProviderKind::Mock, "mock-model").build().unwrap();
        assert_eq!(config.provider(), ProviderKind::Mock);
        assert_eq!(config.model(), "mock-model");
        assert_eq!(config.params(), &GenerationParams::default());
        assert!(!config.has_credential());
    }

    #[test]
    fn test_mock_key_is_not_a_credential() {
        let config =
            Configuration::builder(ProviderKind::Mock, "mock-model").api_key("unused").build().unwrap();
        assert!(!config.requires_credential());
        assert!(!config.has_credential());

        let config =
            Configuration::builder(ProviderKind::OpenAi, "gpt-4o").api_key("sk-1").build().unwrap();
        assert!(config.requires_credential());
        assert!(config.has_credential());
    }

    #[test]
    fn test_builder_openai_requires_api_key() {
        let err = Configuration::builder(ProviderKind::OpenAi, "gpt-4o").build().unwrap_err();
        assert_eq!(err, ConfigurationError::MissingField("api_key".to_string()));
    }

    #[test]
    fn test_builder_rejects_unresolved_placeholder() {
        let err = Configuration::builder(ProviderKind::OpenAi, "gpt-4o")
            .api_key("${OPENAI_API_KEY}")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnresolvedPlaceholder {
                field: "api_key".to_string(),
                variable: "OPENAI_API_KEY".to_string(),
            }
        );
    }

    #[test]
    fn test_builder_rejects_relative_endpoint() {
        let err = Configuration::builder(ProviderKind::OpenAi, "gpt-4o")
            .api_key("k")
            .endpoint("localhost:8000")
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some("endpoint"));
    }

    #[test]
    fn test_builder_rejects_invalid_params() {
        let err = Configuration::builder(ProviderKind::Mock, "m")
            .params(GenerationParams { top_p: Some(3.0), ..GenerationParams::default() })
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some("params.top_p"));
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let err = Configuration::builder(ProviderKind::Mock, "m")
            .timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some("timeout_secs"));
    }

    #[test]
    fn test_azure_model_falls_back_to_deployment() {
        let azure = AzureSettings {
            api_key: Some("k".to_string()),
            resource_name: Some("res".to_string()),
            deployment: Some("prod-deployment".to_string()),
            ..AzureSettings::default()
        };
        let config =
            Configuration::builder(ProviderKind::Azure, "").azure(azure).build().unwrap();
        assert_eq!(config.model(), "prod-deployment");
        assert!(config.has_credential());
    }

    #[test]
    fn test_azure_missing_endpoint_names_field() {
        let azure = AzureSettings { api_key: Some("k".to_string()), ..AzureSettings::default() };
        let err =
            Configuration::builder(ProviderKind::Azure, "gpt-4o").azure(azure).build().unwrap_err();
        assert_eq!(err, ConfigurationError::MissingField("azure.resource_name".to_string()));
    }

    #[test]
    fn test_values_source_openai() {
        let source = ConfigSource::values([
            ("provider", "openai"),
            ("model", "gpt-4o-mini"),
            ("api_key", "sk-test"),
            ("temperature", "0.3"),
            ("stop", "END, STOP"),
        ]);
        let config = Configuration::resolve_with_env(&source, &no_env).unwrap();
        assert_eq!(config.provider(), ProviderKind::OpenAi);
        assert_eq!(config.params().temperature, Some(0.3));
        assert_eq!(config.params().max_tokens, Some(512));
        assert_eq!(
            config.params().stop_sequences,
            Some(vec!["END".to_string(), "STOP".to_string()])
        );
    }

    #[test]
    fn test_values_source_unknown_key() {
        let source = ConfigSource::values([("provider", "mock"), ("modle", "x")]);
        let err = Configuration::resolve_with_env(&source, &no_env).unwrap_err();
        assert_eq!(err.field(), Some("modle"));
    }

    #[test]
    fn test_values_source_bad_number() {
        let source = ConfigSource::values([("provider", "mock"), ("model", "m"), ("max_tokens", "lots")]);
        let err = Configuration::resolve_with_env(&source, &no_env).unwrap_err();
        assert_eq!(err.field(), Some("max_tokens"));
    }

    #[test]
    fn test_missing_provider() {
        let source = ConfigSource::values([("model", "m")]);
        let err = Configuration::resolve_with_env(&source, &no_env).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingField("provider".to_string()));
    }

    #[test]
    fn test_unsupported_provider() {
        let source = ConfigSource::values([("provider", "palm"), ("model", "m")]);
        let err = Configuration::resolve_with_env(&source, &no_env).unwrap_err();
        assert_eq!(err, ConfigurationError::UnsupportedProvider("palm".to_string()));
    }

    #[test]
    fn test_openai_key_falls_back_to_env() {
        let source = ConfigSource::values([("provider", "openai"), ("model", "gpt-4o")]);
        let env = env_from(&[(OPENAI_API_KEY_ENV, "sk-env")]);
        let config = Configuration::resolve_with_env(&source, &env).unwrap();
        assert_eq!(config.client_config().api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn test_placeholder_interpolation() {
        let source = ConfigSource::values([
            ("provider", "openai"),
            ("model", "gpt-4o"),
            ("api_key", "${MY_KEY}"),
            ("endpoint", "http://${HOST}:8000/v1"),
        ]);
        let env = env_from(&[("MY_KEY", "sk-123"), ("HOST", "localhost")]);
        let config = Configuration::resolve_with_env(&source, &env).unwrap();
        assert_eq!(config.endpoint(), Some("http://localhost:8000/v1"));
        assert_eq!(config.client_config().api_key.as_deref(), Some("sk-123"));
    }

    #[test]
    fn test_unset_placeholder_is_reported() {
        let source = ConfigSource::values([
            ("provider", "openai"),
            ("model", "gpt-4o"),
            ("api_key", "${MISSING_KEY}"),
        ]);
        let err = Configuration::resolve_with_env(&source, &no_env).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnresolvedPlaceholder {
                field: "api_key".to_string(),
                variable: "MISSING_KEY".to_string(),
            }
        );
    }

    #[test]
    fn test_unterminated_placeholder() {
        let err = interpolate("api_key", "${OOPS", &no_env).unwrap_err();
        assert_eq!(err.field(), Some("api_key"));
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }

    #[test]
    fn test_padded_placeholder_resolves_trimmed_name() {
        let env = env_from(&[("MY_KEY", "sk-123")]);
        assert_eq!(interpolate("api_key", "${ MY_KEY }", &env).unwrap(), "sk-123");
        assert_eq!(find_placeholder("prefix-${ MY_KEY }"), Some("MY_KEY"));
    }

    #[test]
    fn test_padded_placeholder_reports_same_name_everywhere() {
        let expected = ConfigurationError::UnresolvedPlaceholder {
            field: "api_key".to_string(),
            variable: "MISSING_KEY".to_string(),
        };

        let from_env = interpolate("api_key", "${ MISSING_KEY }", &no_env).unwrap_err();
        assert_eq!(from_env, expected);

        let from_builder = Configuration::builder(ProviderKind::OpenAi, "gpt-4o")
            .api_key("${ MISSING_KEY }")
            .build()
            .unwrap_err();
        assert_eq!(from_builder, expected);
    }

    #[test]
    fn test_multiple_placeholders_in_one_value() {
        let env = env_from(&[("HOST", "localhost"), ("PORT", "8000")]);
        let value = interpolate("endpoint", "http://${HOST}:${PORT}/v1", &env).unwrap();
        assert_eq!(value, "http://localhost:8000/v1");
    }

    #[test]
    fn test_malformed_placeholder_among_valid_ones() {
        let env = env_from(&[("HOST", "localhost")]);
        let err = interpolate("endpoint", "http://${HOST}/${1BAD}", &env).unwrap_err();
        assert_eq!(err.field(), Some("endpoint"));
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }

    #[test]
    fn test_azure_values_source_default_credential() {
        let source = ConfigSource::values([
            ("provider", "azure"),
            ("azure.deployment", "test-deployment"),
            ("azure.base_url", "https://mydemo.openai.azure.com/"),
            ("azure.use_default_azure_credential", "true"),
        ]);
        let config = Configuration::resolve_with_env(&source, &no_env).unwrap();
        assert_eq!(config.model(), "test-deployment");
        assert!(config.azure().unwrap().use_default_credential);
        assert_eq!(config.client_config().azure.api_key, None);
    }

    #[test]
    fn test_azure_key_falls_back_to_env() {
        let source = ConfigSource::values([
            ("provider", "azure"),
            ("model", "gpt-4o"),
            ("azure.resource_name", "res"),
        ]);
        let env = env_from(&[(AZURE_OPENAI_API_KEY_ENV, "az-key")]);
        let config = Configuration::resolve_with_env(&source, &env).unwrap();
        assert_eq!(config.azure().unwrap().api_key.as_deref(), Some("az-key"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config =
            Configuration::builder(ProviderKind::OpenAi, "gpt-4o").api_key("sk-secret").build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_client_config_carries_settings() {
        let config = Configuration::builder(ProviderKind::OpenAi, "gpt-4o")
            .api_key("k")
            .endpoint("http://localhost:1234/v1")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let client = config.client_config();
        assert_eq!(client.provider, ProviderKind::OpenAi);
        assert_eq!(client.model_id, "gpt-4o");
        assert_eq!(client.base_url.as_deref(), Some("http://localhost:1234/v1"));
        assert_eq!(client.timeout, Some(Duration::from_secs(5)));
    }
}
