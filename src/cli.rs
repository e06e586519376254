use crate::config::load_config;
use crate::graph::ReportGraph;
use crate::layout::compute_report;
use crate::render::{render_paginated, render_workbook};
use crate::source::{
    Snapshot, build_identity_graph, build_network_graph, build_security_graph,
};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cstate", version, about = "Cloud account state reports (iam, network, sg)")]
pub struct Args {
    /// Report family to render
    #[arg(short = 'r', long = "report", value_enum)]
    pub report: ReportKind,

    /// Account snapshot file (JSON)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output file. Defaults to the report name with the format extension.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "xlsx")]
    pub format: OutputFormat,

    /// Config JSON file (layout and page overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ReportKind {
    Iam,
    Network,
    Sg,
}

impl ReportKind {
    fn name(self) -> &'static str {
        match self {
            ReportKind::Iam => "iam",
            ReportKind::Network => "network",
            ReportKind::Sg => "sg",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Xlsx,
    Pdf,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Pdf => "pdf",
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let snapshot = Snapshot::load(&args.input)?;

    let graph = match args.report {
        ReportKind::Iam => {
            ReportGraph::Identity(build_identity_graph(&snapshot).into_result()?)
        }
        ReportKind::Network => {
            ReportGraph::Network(build_network_graph(&snapshot).into_result()?)
        }
        ReportKind::Sg => {
            ReportGraph::Security(build_security_graph(&snapshot).into_result()?)
        }
    };

    let document = compute_report(&graph, &config);
    let output = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!("{}.{}", args.report.name(), args.format.extension()))
    });
    match args.format {
        OutputFormat::Xlsx => render_workbook(&document, &output)?,
        OutputFormat::Pdf => render_paginated(&document, &config, &output)?,
    }
    Ok(())
}
