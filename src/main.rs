//! Element Templates CLI
//!
//! Usage:
//!   element-templates [OPTIONS] <DIAGRAM> <COMMAND>
//!
//! Commands:
//!   bind     Apply a template to an unbound element
//!   rebind   Switch an element from its current template to another
//!   unbind   Detach the template from an element
//!
//! The updated diagram is written to stdout as JSON.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use element_templates::{Diagram, EngineConfig, Reconciler, Template, TemplateCatalog, UnbindMode};

#[derive(Parser)]
#[command(name = "element-templates")]
#[command(about = "Apply and switch element templates on diagram elements")]
struct Cli {
    /// Diagram file (JSON)
    diagram: PathBuf,

    /// Templates file (JSON array)
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a template to an unbound element
    Bind {
        element: String,
        /// Template id
        template: String,
        /// Template version (latest when omitted)
        #[arg(long)]
        version: Option<u32>,
    },
    /// Switch an element from its current template to another
    Rebind {
        element: String,
        /// Currently applied template as id or id@version
        #[arg(long)]
        from: String,
        /// Target template id
        template: String,
        /// Target template version (latest when omitted)
        #[arg(long)]
        version: Option<u32>,
    },
    /// Detach the template from an element
    Unbind {
        element: String,
        /// Currently applied template as id or id@version
        #[arg(long)]
        from: String,
        /// Also remove every value the template binds
        #[arg(long)]
        remove: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Load config before logging so its filter can apply
    let config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let catalog = match &cli.templates {
        Some(path) => match TemplateCatalog::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                error!("{}", e);
                process::exit(1);
            }
        },
        None => TemplateCatalog::new(),
    };

    let mut diagram = match Diagram::from_file(&cli.diagram) {
        Ok(d) => d,
        Err(e) => {
            error!(path = %cli.diagram.display(), "{}", e);
            process::exit(1);
        }
    };

    if let Err(message) = run(&cli.command, &catalog, &mut diagram, config) {
        error!("{}", message);
        process::exit(1);
    }

    match diagram.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}

fn run(
    command: &Command,
    catalog: &TemplateCatalog,
    diagram: &mut Diagram,
    config: EngineConfig,
) -> Result<(), String> {
    let mut reconciler = Reconciler::new(config);

    match command {
        Command::Bind {
            element,
            template,
            version,
        } => {
            let template = find(catalog, template, *version)?;
            reconciler
                .bind(diagram, element, template)
                .map_err(|e| e.to_string())?;
        }
        Command::Rebind {
            element,
            from,
            template,
            version,
        } => {
            let current = find_ref(catalog, from)?;
            let template = find(catalog, template, *version)?;
            reconciler.adopt(element.clone(), current.clone());
            reconciler
                .rebind(diagram, element, template)
                .map_err(|e| e.to_string())?;
        }
        Command::Unbind {
            element,
            from,
            remove,
        } => {
            let current = find_ref(catalog, from)?;
            reconciler.adopt(element.clone(), current.clone());
            let mode = if *remove {
                UnbindMode::Remove
            } else {
                UnbindMode::Unlink
            };
            reconciler
                .unbind(diagram, element, mode)
                .map_err(|e| e.to_string())?;
        }
    }

    Ok(())
}

/// Look up a template by id, taking the latest version when none is given
fn find<'c>(
    catalog: &'c TemplateCatalog,
    id: &str,
    version: Option<u32>,
) -> Result<&'c Template, String> {
    match version {
        Some(_) => catalog.require(id, version).map_err(|e| e.to_string()),
        None => catalog
            .latest(id)
            .ok_or_else(|| format!("template not found: {}", id)),
    }
}

/// Look up a template reference of the form `id` or `id@version`
fn find_ref<'c>(catalog: &'c TemplateCatalog, reference: &str) -> Result<&'c Template, String> {
    match reference.rsplit_once('@') {
        Some((id, version)) => {
            let version: u32 = version
                .parse()
                .map_err(|_| format!("invalid template version in '{}'", reference))?;
            catalog.require(id, Some(version)).map_err(|e| e.to_string())
        }
        None => catalog.require(reference, None).map_err(|e| e.to_string()),
    }
}
