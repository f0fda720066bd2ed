use crate::libs::align::backtrace::Side;
use crate::libs::align::config::{AlignConfig, Normalization};
use crate::libs::align::{AlignReport, Outcome};
use crate::libs::fragtree::FragTree;
use std::io::Write;

/// Receives one report per aligned tree pair.
pub trait ResultSink {
    fn accept(
        &mut self,
        name1: &str,
        name2: &str,
        left: &FragTree,
        right: &FragTree,
        report: &AlignReport,
    ) -> anyhow::Result<()>;
}

/// Tab separated rows, the correspondence tree as `#` lines below its row.
pub struct TsvSink<W: Write> {
    writer: W,
    columns: Vec<Normalization>,
    plike: bool,
    pull_ups: bool,
    backtrace: bool,
    header_written: bool,
}

impl<W: Write> TsvSink<W> {
    pub fn new(writer: W, config: &AlignConfig) -> Self {
        Self {
            writer,
            columns: config.normalization.variants(),
            plike: config.plike_runs > 0,
            pull_ups: config.pull_ups,
            backtrace: config.backtrace,
            header_written: false,
        }
    }

    pub fn header(&self) -> String {
        let mut fields = vec!["Tree1", "Tree2", "Score"];
        fields.extend(self.columns.iter().map(|c| c.header()));
        if self.plike {
            fields.push("PLike");
        }
        if self.pull_ups {
            fields.push("PullUps");
        }
        fields.join("\t")
    }

    pub fn row(&self, name1: &str, name2: &str, report: &AlignReport) -> String {
        let mut fields = vec![name1.to_string(), name2.to_string()];
        match report.outcome {
            Outcome::Aligned(score) => fields.push(format!("{}", score)),
            Outcome::BelowThreshold => fields.push("NA".to_string()),
        }
        for kind in &self.columns {
            let value = report
                .normalized
                .iter()
                .find(|n| n.kind == *kind)
                .and_then(|n| n.value);
            fields.push(fmt_value(value));
        }
        if self.plike {
            fields.push(fmt_value(report.plike));
        }
        if self.pull_ups {
            fields.push(report.improved_pull_ups.to_string());
        }
        fields.join("\t")
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "NA".to_string(),
    }
}

impl<W: Write> ResultSink for TsvSink<W> {
    fn accept(
        &mut self,
        name1: &str,
        name2: &str,
        left: &FragTree,
        right: &FragTree,
        report: &AlignReport,
    ) -> anyhow::Result<()> {
        if !self.header_written {
            writeln!(self.writer, "{}", self.header())?;
            self.header_written = true;
        }
        writeln!(self.writer, "{}", self.row(name1, name2, report))?;

        if let Some(pull_up) = &report.pull_up {
            let (side, tree) = match pull_up.side {
                Side::Left => ("left", name1),
                Side::Right => ("right", name2),
            };
            writeln!(
                self.writer,
                "# pull-up: node {} of {} tree {} moved above node {}",
                pull_up.node, side, tree, pull_up.former_parent
            )?;
        }

        if self.backtrace {
            if let Some(alignment) = &report.alignment {
                // labels come from the restructured tree when a pull-up won
                let (left, right) = match &report.pull_up {
                    Some(p) if p.side == Side::Left => (&p.tree, right),
                    Some(p) => (left, &p.tree),
                    None => (left, right),
                };
                for line in alignment.render(left, right) {
                    writeln!(self.writer, "# {}", line)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::align::normalize::NormalizedScore;

    fn report(outcome: Outcome) -> AlignReport {
        AlignReport {
            outcome,
            normalized: vec![
                NormalizedScore {
                    kind: Normalization::TreeSizeArithmetic,
                    value: Some(12.5),
                },
                NormalizedScore {
                    kind: Normalization::PValue,
                    value: None,
                },
            ],
            plike: Some(0.25),
            pull_up: None,
            improved_pull_ups: 2,
            alignment: None,
        }
    }

    #[test]
    fn test_tsv_sink_rows() {
        let config = AlignConfig {
            normalization: Normalization::All,
            plike_runs: 4,
            pull_ups: true,
            ..AlignConfig::default()
        };
        let tree = FragTree::from_newick("(CO)root;").unwrap();
        let mut sink = TsvSink::new(vec![], &config);
        sink.accept("a", "b", &tree, &tree, &report(Outcome::Aligned(30.0)))
            .unwrap();
        sink.accept("a", "c", &tree, &tree, &report(Outcome::BelowThreshold))
            .unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Tree1\tTree2\tScore\tSelfArith\tSelfGeo\tTreeArith\tTreeGeo\tSelfMin\tPValue\tPLike\tPullUps"
        );
        assert_eq!(lines[1], "a\tb\t30\tNA\tNA\t12.5000\tNA\tNA\tNA\t0.2500\t2");
        assert!(lines[2].starts_with("a\tc\tNA\t"));
    }

    #[test]
    fn test_tsv_sink_plain() {
        let tree = FragTree::from_newick("(CO)root;").unwrap();
        let mut sink = TsvSink::new(vec![], &AlignConfig::default());
        sink.accept("x", "y", &tree, &tree, &report(Outcome::Aligned(-4.5)))
            .unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "Tree1\tTree2\tScore\nx\ty\t-4.5\n");
    }
}
