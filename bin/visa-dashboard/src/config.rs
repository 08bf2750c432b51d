// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;
use vista::{BluecardLayout, SchengenLayout, Variant};

pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub sessions: SessionConfig,
    pub schengen: SchengenLayout,
    pub bluecard: BluecardLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8050,
            debug: false,
            body_limit_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Falls back to the variant's own source file when unset.
    pub path: Option<PathBuf>,
    pub variant: Variant,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            variant: Variant::Schengen,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_sessions: 256 }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub data: Option<PathBuf>,
    pub variant: Option<Variant>,
}

impl DashboardConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid dashboard configuration")
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if overrides.debug {
            self.server.debug = true;
        }
        if let Some(path) = overrides.data {
            self.data.path = Some(path);
        }
        if let Some(variant) = overrides.variant {
            self.data.variant = variant;
        }
    }

    /// `http_addr` (the `VD_HTTP_ADDR` value) replaces host and port.
    pub fn bind_addr(&self, http_addr: Option<&str>) -> Result<SocketAddr> {
        let addr = match http_addr {
            Some(addr) => addr.to_string(),
            None => format!("{}:{}", self.server.host, self.server.port),
        };
        addr.parse()
            .with_context(|| format!("invalid listen address '{addr}'"))
    }

    pub fn data_path(&self) -> PathBuf {
        self.data
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.data.variant.default_data_path()))
    }

    pub fn default_filter(&self) -> &'static str {
        if self.server.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// `--config`, then `VD_CONFIG`, then the default path.
pub fn resolve_config_path(cli: Option<PathBuf>, env: Option<String>) -> PathBuf {
    cli.or_else(|| env.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
