//! Interface de terminal do report-relay: spinner e saída colorida.
//!
//! Usa `indicatif` para o spinner de progresso e `console` para as cores.
//! O [`BatchProgress`] acompanha a execução de um lote de relatórios.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::job::JobStatus;
use crate::pipeline::{DeliveryOutcome, RunSummary, UnitOutcome, UnitReport};

/// Indicador visual de progresso para um lote de exportações.
pub struct BatchProgress {
    pb: ProgressBar,
    total: usize,
    done: usize,
    green: Style,
    red: Style,
    yellow: Style,
}

impl BatchProgress {
    /// Inicia o spinner para `total` unidades.
    pub fn start(total: usize) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(format!("Exporting 0/{total} reports"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            total,
            done: 0,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Imprime uma linha com o resultado de uma unidade e avança o contador.
    pub fn unit_done(&mut self, report: &UnitReport) {
        self.done += 1;
        self.pb.println(unit_line(report, &self.green, &self.red, &self.yellow));
        self.pb
            .set_message(format!("Exporting {}/{} reports", self.done, self.total));
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

fn unit_line(report: &UnitReport, green: &Style, red: &Style, yellow: &Style) -> String {
    let (mark, text) = match &report.outcome {
        UnitOutcome::Exported => match report.status {
            Some(JobStatus::CompletedWithErrors) => (
                yellow.apply_to("!"),
                format!("{}: completed with errors", report.label),
            ),
            _ => (
                green.apply_to("✓"),
                format!("{}: {} rows", report.label, report.counters.total_records),
            ),
        },
        UnitOutcome::NothingToExport => (
            yellow.apply_to("-"),
            format!("{}: nothing to export", report.label),
        ),
        UnitOutcome::Failed(reason) => (red.apply_to("✗"), format!("{}: {reason}", report.label)),
    };

    match &report.delivery {
        DeliveryOutcome::Failed(reason) => format!("  {mark} {text} (upload failed: {reason})"),
        DeliveryOutcome::Delivered => format!("  {mark} {text} (uploaded)"),
        _ => format!("  {mark} {text}"),
    }
}

/// Imprime o resumo do lote em JSON com um título colorido.
pub fn print_summary(summary: &RunSummary) {
    let title = if summary.failed() > 0 {
        Style::new().red().bold()
    } else {
        Style::new().green().bold()
    };
    println!();
    println!(
        "{}",
        title.apply_to(format!(
            "─── {} exported, {} failed ───",
            summary.exported(),
            summary.failed()
        ))
    );
    println!(
        "{}",
        serde_json::to_string_pretty(summary).unwrap_or_default()
    );
}
