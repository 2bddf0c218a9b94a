use colored::Colorize;
use fhirpipe_core::{SinkComparison, Verdict};
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Prints the comparison table and one pass/fail line per sink.
pub fn print_report(verdict: &Verdict) {
    println!("{}", render_table(verdict));
    for sink in &verdict.sinks {
        let line = sink_line(sink);
        if sink.passed() {
            print_success(&line);
        } else {
            print_error(&line);
        }
    }
}

pub fn render_table(verdict: &Verdict) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Resource", "Sink", "OpenMRS", "Sink count", "Status"]);
    for sink in &verdict.sinks {
        for r in &sink.results {
            builder.push_record([
                r.resource_type.to_string(),
                sink.source.to_string(),
                r.expected.to_string(),
                r.actual.to_string(),
                if r.matched { "ok" } else { "MISMATCH" }.to_string(),
            ]);
        }
    }
    builder.build().with(Style::rounded()).to_string()
}

/// `PARQUET SINK success`, or `FHIR SINK failure: Encounter 39 vs 40`.
pub fn sink_line(sink: &SinkComparison) -> String {
    let label = sink.source.sink_label();
    if sink.passed() {
        return format!("{label} success");
    }
    let details: Vec<String> = sink
        .mismatches()
        .map(|r| format!("{} {} vs {}", r.resource_type, r.actual, r.expected))
        .collect();
    format!("{label} failure: {}", details.join(", "))
}
