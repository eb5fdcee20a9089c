//! Interface de linha de comando do report-relay baseada em clap.
//!
//! Define a struct [`Cli`] com as flags de execução de um lote
//! (--report-ids, --type, --config, --page-size, --verbose).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::report::parse_report_ids;

/// report-relay: exporta relatórios do serviço de análise para arquivos
/// delimitados e registra cada execução como um job remoto.
#[derive(Debug, Parser)]
#[command(name = "report-relay", version, about)]
pub struct Cli {
    /// Habilita saída detalhada (verbose).
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,

    /// IDs dos relatórios a exportar, separados por vírgula.
    #[arg(long, short = 'r', value_name = "ID,ID,...")]
    pub report_ids: Option<String>,

    /// Tipo de processamento a executar.
    #[arg(long = "type", short = 't', value_enum, default_value_t = ProcessType::All)]
    pub process_type: ProcessType,

    /// Caminho do arquivo de configuração TOML.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Sobrescreve o tamanho de página configurado.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: Option<u32>,
}

/// Tipos de processamento aceitos em `--type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProcessType {
    /// Todos os tipos disponíveis.
    All,
    /// Exportação de relatórios.
    ReportExport,
}

impl ProcessType {
    pub fn includes_report_export(self) -> bool {
        matches!(self, ProcessType::All | ProcessType::ReportExport)
    }
}

impl Cli {
    /// IDs informados em `--report-ids`, sem entradas vazias.
    pub fn report_ids(&self) -> Vec<String> {
        self.report_ids
            .as_deref()
            .map(parse_report_ids)
            .unwrap_or_default()
    }
}
