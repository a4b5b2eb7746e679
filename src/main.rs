use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use sysmlv2x::ConvertOptions;
use sysmlv2x::convert::{SysmlToScxml, find_state_machine};
use sysmlv2x::interpreter::{Interpreter, load_document, read_events};
use sysmlv2x::parser::load_model;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert SysMLv2 state machines to SCXML and run them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the SCXML for one state machine
    Convert {
        /// .sysml file, directory, .kpar archive or .bin snapshot
        #[arg(value_name = "INPUT")]
        input: Utf8PathBuf,
        /// State machine name (simple or qualified); optional if the model has one
        #[arg(short, long)]
        machine: Option<String>,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
        /// JSON file with conversion options
        #[arg(long)]
        config: Option<Utf8PathBuf>,
        /// Override the `datamodel` attribute
        #[arg(long)]
        datamodel: Option<String>,
    },
    /// List the state machines in a model
    List {
        #[arg(value_name = "INPUT")]
        input: Utf8PathBuf,
    },
    /// Print the parsed model as JSON or write a binary snapshot
    Dump {
        #[arg(value_name = "INPUT")]
        input: Utf8PathBuf,
        /// Write a binary snapshot to this path instead of printing JSON
        #[arg(long)]
        binary: Option<Utf8PathBuf>,
    },
    /// Run a state machine over a sequence of events (read from stdin if none given)
    Run {
        /// .scxml document, or any model input accepted by `convert`
        #[arg(value_name = "INPUT")]
        input: Utf8PathBuf,
        #[arg(short, long)]
        machine: Option<String>,
        /// Print each step as a JSON line
        #[arg(long)]
        json: bool,
        #[arg(value_name = "EVENT")]
        events: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SYSMLV2X_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Convert {
            input,
            machine,
            output,
            config,
            datamodel,
        } => {
            let mut options = match config {
                Some(path) => ConvertOptions::from_json_file(&path)?,
                None => ConvertOptions::default(),
            };
            if let Some(datamodel) = datamodel {
                options.datamodel = datamodel;
            }
            let model = load_model(&input)?;
            let machine_ref = find_state_machine(&model, machine.as_deref())?;
            let conv = SysmlToScxml::with_options(&model, &machine_ref, &options)
                .with_context(|| format!("Failed to convert {}", machine_ref.qualified_name()))?;
            let xml = conv.to_xml_string()?;
            match output {
                Some(path) => {
                    std::fs::write(path.as_std_path(), xml)
                        .with_context(|| format!("Failed to write {}", path))?;
                    tracing::info!(machine = conv.qualified_name(), output = %path, "SCXML written");
                }
                None => print!("{}", xml),
            }
        }
        Command::List { input } => {
            let model = load_model(&input)?;
            for machine in model.state_machines() {
                let body = &machine.machine.body;
                println!(
                    "{}\t{} states\t{} transitions",
                    machine.qualified_name(),
                    body.states.len(),
                    body.transitions.len()
                );
            }
        }
        Command::Dump { input, binary } => {
            let model = load_model(&input)?;
            match binary {
                Some(path) => model.save_to_binary(path.as_std_path())?,
                None => println!("{}", serde_json::to_string_pretty(&model)?),
            }
        }
        Command::Run {
            input,
            machine,
            json,
            events,
        } => {
            let document = load_document(&input, machine.as_deref())?;
            let mut interp = Interpreter::new(document)?;
            report_state(&interp, json);
            let events = if events.is_empty() {
                read_events(std::io::stdin().lock())?
            } else {
                events
            };
            for event in events.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
                let steps = interp
                    .send(event)
                    .map_err(|e| anyhow::anyhow!("[{}] {}", e.error_code(), e))?;
                if steps.is_empty() && !json {
                    println!("{}: ignored in {}", event, interp.current_state());
                }
                for step in &steps {
                    if json {
                        println!("{}", serde_json::to_string(step)?);
                    } else {
                        println!(
                            "{}: {} -> {}",
                            step.event.as_deref().unwrap_or("<eventless>"),
                            step.source,
                            step.target
                        );
                    }
                }
            }
            if !json {
                report_state(&interp, json);
            }
        }
    }
    Ok(())
}

fn report_state(interp: &Interpreter, json: bool) {
    if json {
        return;
    }
    let invokes = interp.active_invocations();
    if invokes.is_empty() {
        println!("state: {}", interp.current_state());
    } else {
        println!("state: {} (running {})", interp.current_state(), invokes.join(", "));
    }
}
