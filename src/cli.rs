use crate::config::load_config;
use crate::ir::Diagram;
use crate::layout::{BoxCache, LayoutOptions, Waypoints, compute_layout};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::parser::{ConnectionMode, parse_diagram};
use crate::render::{render_svg, write_output_png, write_output_svg};
use crate::resolve::{resolve_connections, simulate_path};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "flowlink", version, about = "Resolve and route node-link editor diagrams")]
pub struct Args {
    /// Input diagram document (.json5/.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for json/svg if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, routing, viewport, render)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Connectivity to use when the document carries both a graph and a train
    #[arg(short = 'm', long = "mode", value_enum)]
    pub mode: Option<ModeArg>,

    /// Disable a node before resolving (repeatable)
    #[arg(long = "disable", value_name = "ID")]
    pub disable: Vec<String>,

    /// Emit waypoint/insert handles on every edge
    #[arg(long = "lineControls")]
    pub line_controls: bool,

    /// Print the simulated path through the enabled nodes instead of rendering
    #[arg(long = "simulate")]
    pub simulate: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Graph,
    Train,
}

impl From<ModeArg> for ConnectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Graph => ConnectionMode::Graph,
            ModeArg::Train => ConnectionMode::Train,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let mut document = parse_diagram(&input)?;
    let source = document.source(args.mode.map(ConnectionMode::from))?;
    apply_disabled(&mut document.diagram, &args.disable)?;

    for issue in document
        .diagram
        .validate()
        .into_iter()
        .chain(source.validate(&document.diagram))
    {
        eprintln!("warning: {issue}");
    }

    let connections = resolve_connections(&source, &document.diagram);

    if args.simulate {
        println!("{}", simulate_path(&document.diagram, &connections).join(" -> "));
        return Ok(());
    }

    let options = LayoutOptions {
        routing: config.routing.clone(),
        line_controls: args.line_controls,
    };
    let layout = compute_layout(
        &document.diagram,
        &connections,
        &BoxCache::new(),
        &Waypoints::new(),
        &options,
    );

    match args.output_format {
        OutputFormat::Json => match args.output.as_deref() {
            Some(path) => write_layout_dump(path, &layout)?,
            None => println!(
                "{}",
                serde_json::to_string_pretty(&LayoutDump::from_layout(&layout))?
            ),
        },
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &config.theme);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&layout, &config.theme);
            write_output_png(&svg, &output, &config.render, &config.theme)?;
        }
    }

    Ok(())
}

fn apply_disabled(diagram: &mut Diagram, ids: &[String]) -> Result<()> {
    for id in ids {
        let node = diagram
            .node_mut(id)
            .ok_or_else(|| anyhow::anyhow!("--disable names unknown node `{id}`"))?;
        node.enabled = false;
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
