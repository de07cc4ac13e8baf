//! Deployment target detection and logical endpoint resolution.
//!
//! Both serverless conventions front the same upstream logic; resolution only
//! picks the path. Everything here is a pure function of an
//! [`EnvironmentSnapshot`], so the same snapshot always resolves the same way.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Netlify,
    Vercel,
    Local,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Netlify => "netlify",
            Self::Vercel => "vercel",
            Self::Local => "local",
        })
    }
}

const NETLIFY_VARS: &[&str] = &["NETLIFY", "NETLIFY_DEV", "NETLIFY_SITE_ID"];
const VERCEL_VARS: &[&str] = &["VERCEL", "VERCEL_ENV", "VERCEL_URL"];

/// Environment signals captured once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentSnapshot {
    pub hostname: Option<String>,
    pub vars: HashMap<String, String>,
}

impl EnvironmentSnapshot {
    pub fn new(hostname: Option<&str>) -> Self {
        Self {
            hostname: hostname.map(|h| h.to_string()),
            vars: HashMap::new(),
        }
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    /// Capture the platform variables of the current process. `base_url`
    /// stands in for the browser hostname when running outside one.
    pub fn from_process(base_url: Option<&str>) -> Self {
        let vars = NETLIFY_VARS
            .iter()
            .chain(VERCEL_VARS)
            .filter_map(|name| std::env::var(name).ok().map(|v| (name.to_string(), v)))
            .collect();

        Self {
            hostname: base_url.and_then(hostname_of),
            vars,
        }
    }

    fn has_var(&self, names: &[&str]) -> bool {
        names
            .iter()
            .any(|name| self.vars.get(*name).is_some_and(|v| !v.trim().is_empty()))
    }
}

fn hostname_of(url: &str) -> Option<String> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
    let host = host.split(':').next().unwrap_or_default();
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// Hostname patterns first, then platform environment variables, else local.
pub fn detect_platform(env: &EnvironmentSnapshot) -> Platform {
    if let Some(host) = env.hostname.as_deref().map(str::to_lowercase) {
        if host.ends_with(".netlify.app") || host.ends_with(".netlify.com") {
            return Platform::Netlify;
        }
        if host.ends_with(".vercel.app") {
            return Platform::Vercel;
        }
    }

    if env.has_var(NETLIFY_VARS) {
        Platform::Netlify
    } else if env.has_var(VERCEL_VARS) {
        Platform::Vercel
    } else {
        Platform::Local
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResolver {
    platform: Platform,
    base_url: Option<String>,
}

impl EndpointResolver {
    pub fn new(platform: Platform, base_url: Option<String>) -> Self {
        Self {
            platform,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    pub fn detect(env: &EnvironmentSnapshot, base_url: Option<String>) -> Self {
        let platform = detect_platform(env);
        tracing::debug!(platform = %platform, "Detected deployment platform");
        Self::new(platform, base_url)
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Logical function name to physical path, e.g. `gemini` to
    /// `/.netlify/functions/gemini` or `/api/gemini`.
    pub fn resolve_endpoint(&self, logical_name: &str) -> String {
        let name = logical_name.trim().trim_matches('/');
        match self.platform {
            Platform::Netlify => format!("/.netlify/functions/{}", name),
            Platform::Vercel | Platform::Local => format!("/api/{}", name),
        }
    }

    /// Absolute URL when a base URL is configured, the bare path otherwise.
    pub fn resolve_url(&self, logical_name: &str) -> String {
        let path = self.resolve_endpoint(logical_name);
        match &self.base_url {
            Some(base) => format!("{}{}", base, path),
            None => path,
        }
    }
}
