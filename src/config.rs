//! Configuração do report-relay carregada a partir de `report-relay.toml`.
//!
//! A struct [`RelayConfig`] contém todos os parâmetros configuráveis,
//! agrupados em `[service]`, `[export]` e `[delivery]`.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `REPORT_SERVICE_PASSWORD` e `DELIVERY_PASSWORD`
//! têm precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::guard::RetryConfig;
use crate::service::ReportFilter;

/// Nome padrão do arquivo de configuração, relativo ao diretório atual.
pub const DEFAULT_CONFIG_FILE: &str = "report-relay.toml";

/// Configuração de nível superior carregada de `report-relay.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Conexão com o serviço remoto de relatórios.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// URL base da API, sem o caminho dos endpoints.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Parâmetros da exportação e da paginação.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Delimitador das linhas retornadas e gravadas.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Grava a linha de cabeçalho no início do arquivo.
    #[serde(default = "default_true")]
    pub file_has_headers: bool,

    /// Formato chrono (strftime) usado no nome do arquivo exportado.
    #[serde(default = "default_date_format")]
    pub export_file_date_format: String,

    #[serde(default = "default_staging_directory")]
    pub staging_directory: PathBuf,

    #[serde(default = "default_logging_directory")]
    pub logging_directory: PathBuf,

    /// Linhas por página na leitura paginada.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Retentativas para chamadas que alteram dados (3 = até 4 tentativas).
    #[serde(default = "default_write_retries")]
    pub write_retries: u32,

    /// Retentativas para cada página lida (4 = até 5 tentativas).
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    /// Cria um job `Completed` quando nenhum relatório tem dados.
    #[serde(default)]
    pub record_empty_runs: bool,

    /// Nome do host gravado no job; se ausente, vem do ambiente.
    #[serde(default)]
    pub host_label: Option<String>,

    /// Filtros repassados a todos os relatórios.
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            file_has_headers: true,
            export_file_date_format: default_date_format(),
            staging_directory: default_staging_directory(),
            logging_directory: default_logging_directory(),
            page_size: default_page_size(),
            write_retries: default_write_retries(),
            read_retries: default_read_retries(),
            record_empty_runs: false,
            host_label: None,
            filters: Vec::new(),
        }
    }
}

/// Destino remoto dos arquivos exportados.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Diretório remoto onde os arquivos são gravados.
    #[serde(default)]
    pub remote_path: String,

    /// Remove a cópia local depois de um upload bem-sucedido.
    #[serde(default)]
    pub remove_after_upload: bool,
}

impl DeliveryConfig {
    /// A entrega só acontece com url, usuário e senha preenchidos.
    pub fn is_configured(&self) -> bool {
        [&self.url, &self.user, &self.password]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

// Valor padrão para a URL base do serviço.
fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

// Valor padrão para o delimitador: vírgula.
fn default_delimiter() -> String {
    ",".to_string()
}

fn default_true() -> bool {
    true
}

// Valor padrão para o formato de data no nome do arquivo.
fn default_date_format() -> String {
    "%Y%m%d_%H%M%S".to_string()
}

fn default_staging_directory() -> PathBuf {
    PathBuf::from("staging")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("logs")
}

// Valor padrão para o tamanho de página: 10000 linhas.
fn default_page_size() -> u32 {
    10_000
}

fn default_write_retries() -> u32 {
    RetryConfig::default().write_retries
}

fn default_read_retries() -> u32 {
    RetryConfig::default().read_retries
}

impl RelayConfig {
    /// Carrega a configuração de `path`.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<RelayConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Rejeita valores que o arquivo aceita mas a exportação não.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.export.page_size > 0,
            "export.page_size must be at least 1"
        );
        Ok(())
    }

    /// Aplica as variáveis de ambiente, que têm precedência sobre o arquivo.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(password) = lookup("REPORT_SERVICE_PASSWORD").filter(|v| !v.is_empty()) {
            self.service.password = password;
        }
        if let Some(password) = lookup("DELIVERY_PASSWORD").filter(|v| !v.is_empty()) {
            self.delivery.password = Some(password);
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            write_retries: self.export.write_retries,
            read_retries: self.export.read_retries,
        }
    }

    /// Nome do host gravado nos jobs.
    pub fn host_label(&self) -> String {
        self.export
            .host_label
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .or_else(|| std::env::var("COMPUTERNAME").ok())
            .unwrap_or_else(|| "unknown-host".to_string())
    }
}
