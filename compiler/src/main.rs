use clap::Parser;
use std::path::{Path, PathBuf};

use neatc::diag::Diagnostic;
use neatc::document;
use neatc::lower::LowerOptions;
use neatc::pass::PassId;
use neatc::pipeline::{compute_provenance, run_pipeline, CompilationState};
use neatc::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    /// Lowered graph document (JSON)
    Lowered,
    /// Lowered graph in Graphviz DOT
    Dot,
    /// Graph document with synthesized pins, before lowering
    Pins,
    /// Eligible intent node catalog (JSON)
    Catalog,
    /// Provenance hashes (JSON)
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "neatc",
    version,
    about = "Neat node compiler: lowers intent nodes of a graph document to primitive nodes"
)]
struct Cli {
    /// Input graph document (.json); not needed for --emit catalog
    graph: Option<PathBuf>,

    /// Reflection library (.nrl, repeatable)
    #[arg(short = 'L', long = "library")]
    library: Vec<PathBuf>,

    /// Do not register the built-in prelude
    #[arg(long)]
    no_prelude: bool,

    /// Do not add the default finish step to Actor constructs
    #[arg(long)]
    no_default_finish: bool,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Lowered)]
    emit: EmitStage,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print passes, timing and expansion steps
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("neatc=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("neatc: error: {}", message);
    std::process::exit(2);
}

fn load_registry(cli: &Cli) -> Registry {
    let mut registry = if cli.no_prelude {
        Registry::new()
    } else {
        Registry::with_prelude()
    };
    for path in &cli.library {
        match registry.load_library(path) {
            Ok(n) => tracing::info!("loaded {} item(s) from {}", n, path.display()),
            Err(e) => fail(e),
        }
    }
    if let Err(e) = registry.link() {
        fail(e);
    }
    tracing::info!("{} type(s) registered", registry.len());
    registry
}

fn write_output(path: Option<&Path>, text: &str) {
    match path {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                fail(format!("{}: {}", path.display(), e));
            }
        }
        None => print!("{text}"),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(mut s) => {
            s.push('\n');
            s
        }
        Err(e) => fail(e),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = load_registry(&cli);
    let options = LowerOptions {
        default_finish: !cli.no_default_finish,
        ..LowerOptions::default()
    };

    // ── Catalog needs no graph ──
    if cli.emit == EmitStage::Catalog {
        let document = document::GraphDocument {
            name: String::new(),
            kind: Default::default(),
            host_class: None,
            nodes: Vec::new(),
            links: Vec::new(),
        };
        let mut state = CompilationState::new(document, registry, options);
        if run_pipeline(&mut state, PassId::Catalog, |_, _| {}).is_err() {
            std::process::exit(1);
        }
        let catalog = state.catalog.unwrap_or_default();
        write_output(cli.output.as_deref(), &to_json(&catalog));
        return;
    }

    // ── Read and parse the graph document ──
    let Some(graph_path) = cli.graph.as_deref() else {
        fail("a graph document is required for this --emit stage");
    };
    let text = match std::fs::read_to_string(graph_path) {
        Ok(s) => s,
        Err(e) => fail(format!("{}: {}", graph_path.display(), e)),
    };
    let doc = match document::parse(&text) {
        Ok(d) => d,
        Err(e) => fail(format!("{}: {}", graph_path.display(), e)),
    };

    let provenance = compute_provenance(&text, &registry);
    if cli.emit == EmitStage::BuildInfo {
        write_output(cli.output.as_deref(), &provenance.to_json());
        return;
    }

    let terminal = match cli.emit {
        EmitStage::Pins => PassId::Materialize,
        _ => PassId::Lower,
    };
    let mut state = CompilationState::new(doc, registry, options);
    state.provenance = Some(provenance);
    let result = run_pipeline(&mut state, terminal, |_, diags: &[Diagnostic]| {
        for d in diags {
            eprintln!("neatc: {}", d);
        }
    });
    if let Err(e) = result {
        tracing::debug!("stopped: {}", e);
        if let neatc::pipeline::PipelineError::Document { source, .. } = &e {
            eprintln!("neatc: error: {}", source);
        }
        std::process::exit(1);
    }

    let Some(graph) = state.graph.as_ref() else {
        fail("no graph produced");
    };
    let out = match cli.emit {
        EmitStage::Dot => neatc::dot::emit_dot(graph),
        _ => to_json(&document::save(graph)),
    };
    write_output(cli.output.as_deref(), &out);
}
