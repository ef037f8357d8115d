// Rendering of finished resource graphs

use crate::crawl::CrawlSummary;
use crate::map::{RelationEdge, ResourceGraph, ResourceNode};
use serde::Serialize;
use std::io::{self, Write};

const PRIMARY_COLOR: &str = "#1C366B";
const SECONDARY_COLOR: &str = "#1DACE8";
const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    Dot,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "dot" | "graphviz" => Some(ReportFormat::Dot),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

/// Consumes a finished graph.
pub trait GraphSink {
    fn render(&mut self, graph: &ResourceGraph) -> io::Result<()>;
}

/// Writes the graph to any [`Write`] in the chosen format.
pub struct WriterSink<W: Write> {
    writer: W,
    format: ReportFormat,
    summary: Option<CrawlSummary>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self {
            writer,
            format,
            summary: None,
        }
    }

    /// Include run details (text, json and markdown formats).
    pub fn with_summary(mut self, summary: CrawlSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> GraphSink for WriterSink<W> {
    fn render(&mut self, graph: &ResourceGraph) -> io::Result<()> {
        let report =
            render_graph(self.format, graph, self.summary.as_ref()).map_err(io::Error::other)?;
        self.writer.write_all(report.as_bytes())?;
        self.writer.flush()
    }
}

/// Render the graph in the requested [`ReportFormat`].
pub fn render_graph(
    format: ReportFormat,
    graph: &ResourceGraph,
    summary: Option<&CrawlSummary>,
) -> serde_json::Result<String> {
    match format {
        ReportFormat::Text => Ok(graph_to_text(graph, summary)),
        ReportFormat::Json => graph_to_json(graph, summary),
        ReportFormat::Dot => Ok(graph_to_dot(graph)),
        ReportFormat::Markdown => Ok(graph_to_markdown(graph, summary)),
    }
}

#[derive(Serialize)]
struct GraphReport<'a> {
    nodes: Vec<&'a ResourceNode>,
    edges: Vec<RelationEdge<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a CrawlSummary>,
}

pub fn graph_to_json(
    graph: &ResourceGraph,
    summary: Option<&CrawlSummary>,
) -> serde_json::Result<String> {
    let report = GraphReport {
        nodes: graph.nodes().collect(),
        edges: graph.edges().collect(),
        summary,
    };
    let mut json = serde_json::to_string_pretty(&report)?;
    json.push('\n');
    Ok(json)
}

fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

fn node_color(node: &ResourceNode) -> &'static str {
    if node.primary_version {
        PRIMARY_COLOR
    } else {
        SECONDARY_COLOR
    }
}

/// Convert the resource graph to Graphviz dot format. Layout is left to
/// Graphviz.
pub fn graph_to_dot(graph: &ResourceGraph) -> String {
    let mut out = String::from("digraph resources {\n");
    out.push_str("    node [style=filled, fontcolor=white, fontsize=10]\n");
    for (i, node) in graph.nodes().enumerate() {
        out.push_str(&format!(
            "    {} [label=\"{}\", fillcolor=\"{}\"]\n",
            i,
            escape_label(&node.name),
            node_color(node)
        ));
    }
    for edge in graph.edges() {
        let (Some(source), Some(destination)) = (
            graph.position(edge.source),
            graph.position(edge.destination),
        ) else {
            continue;
        };
        out.push_str(&format!(
            "    {} -> {} [label=\"{}\"]\n",
            source,
            destination,
            escape_label(edge.relation)
        ));
    }
    out.push_str("}\n");
    out
}

pub fn graph_to_text(graph: &ResourceGraph, summary: Option<&CrawlSummary>) -> String {
    let mut report = String::new();
    report.push_str(DIVIDER);
    report.push_str("\n\n# Summary:\n");
    if let Some(summary) = summary {
        report.push_str(&format!("  Root: {}\n", summary.root));
        report.push_str(&format!("  Paths expanded: {}\n", summary.visited.len()));
    }
    report.push_str(&format!("  Resource types: {}\n", graph.node_count()));
    report.push_str(&format!("  Relations: {}\n", graph.edge_count()));
    if let Some(summary) = summary {
        report.push_str(&format!("  Paths without links: {}\n", summary.leaves.len()));
        report.push_str(&format!("  Failed fetches: {}\n", summary.failures.len()));
        report.push_str(&format!("  Skipped links: {}\n", summary.skipped.len()));
        let elapsed = summary.finished_at - summary.started_at;
        report.push_str(&format!(
            "  Duration: {:.2}s\n",
            elapsed.num_milliseconds() as f64 / 1000.0
        ));
    }
    report.push('\n');
    report.push_str(DIVIDER);
    report.push_str("\n\n## Resources\n");
    for node in graph.nodes() {
        if node.primary_version {
            report.push_str(&format!("  {}\n", node.name));
        } else {
            report.push_str(&format!("  {} (other version)\n", node.name));
        }
    }

    report.push_str("\n## Relations\n");
    for edge in graph.edges() {
        report.push_str(&format!(
            "  {} -> {}  {}\n",
            edge.source, edge.destination, edge.relation
        ));
    }

    if let Some(summary) = summary {
        if !summary.failures.is_empty() {
            report.push_str("\n## Failed fetches\n");
            for failure in &summary.failures {
                report.push_str(&format!("  {}  {}\n", failure.path, failure.reason));
            }
        }
        if !summary.skipped.is_empty() {
            report.push_str("\n## Skipped links\n");
            for skipped in &summary.skipped {
                report.push_str(&format!(
                    "  {} (from {})  {}\n",
                    skipped.href, skipped.source, skipped.reason
                ));
            }
        }
    }

    report
}

pub fn graph_to_markdown(graph: &ResourceGraph, summary: Option<&CrawlSummary>) -> String {
    let mut md = String::from("# Resource Map\n\n");
    if let Some(summary) = summary {
        md.push_str(&format!("**Root:** `{}`\n\n", summary.root));
        md.push_str(&format!(
            "**Crawled:** {}\n\n",
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        md.push_str(&format!(
            "**Paths expanded:** {}\n\n",
            summary.visited.len()
        ));
    }

    md.push_str(&format!("## Resources ({})\n\n", graph.node_count()));
    md.push_str("| Resource | Primary version |\n");
    md.push_str("|----------|-----------------|\n");
    for node in graph.nodes() {
        md.push_str(&format!(
            "| {} | {} |\n",
            escape_cell(&node.name),
            if node.primary_version { "yes" } else { "no" }
        ));
    }

    md.push_str(&format!("\n## Relations ({})\n\n", graph.edge_count()));
    md.push_str("| Source | Destination | Relation |\n");
    md.push_str("|--------|-------------|----------|\n");
    for edge in graph.edges() {
        md.push_str(&format!(
            "| {} | {} | `{}` |\n",
            escape_cell(edge.source),
            escape_cell(edge.destination),
            escape_cell(edge.relation)
        ));
    }

    if let Some(summary) = summary
        && !summary.failures.is_empty()
    {
        md.push_str("\n## Failed fetches\n\n");
        for failure in &summary.failures {
            md.push_str(&format!("- `{}`: {}\n", failure.path, failure.reason));
        }
    }

    md
}
