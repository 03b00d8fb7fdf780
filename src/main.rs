use std::cell::RefCell;
use std::rc::Rc;

use clap::Parser as CliParser;
use serde::Serialize;
use tokio::sync::watch;

use treesh::parser::{
    build_catalog, CommandSpec, CommandTree, ExecContext, Flag, Parser, ValueType,
};
use treesh::shell::{Output, OutputBuffer, Shell};

#[derive(CliParser)]
#[command(name = "treesh")]
#[command(about = "An interactive shell over a structured command catalog")]
#[command(version)]
struct Cli {
    /// Evaluate one line and exit
    #[arg(short = 'c')]
    line: Option<String>,

    /// With -c, print the result as JSON (value, color runs, error)
    #[arg(long)]
    json: bool,

    /// Diagnostic log file for the interactive shell
    #[arg(long, default_value = "/tmp/treesh.log")]
    log_file: String,

    /// Hostname shown in the prompt
    #[arg(long, default_value = "localhost")]
    hostname: String,

    /// Username shown in the prompt
    #[arg(long, default_value = "void")]
    username: String,
}

#[derive(Serialize)]
struct RunOut {
    object: String,
    len: usize,
}

#[derive(Serialize)]
struct EvalOut {
    value: String,
    output: Vec<String>,
    runs: Vec<RunOut>,
    error: Option<String>,
}

/// The built-in demo catalog; real embedders register their own.
fn demo_catalog() -> Result<Rc<CommandTree>, treesh::parser::CatalogError> {
    build_catalog(vec![CommandSpec::user(
        &["ip", "firewall"],
        "add",
        Rc::new(|ctx, flags, options| {
            let mut line = String::from("added firewall rule");
            for (name, value) in flags {
                line.push_str(&format!(" {}={}", name, value.as_string()));
            }
            if options.get("verbose").copied().unwrap_or(false) {
                line.push_str(" (verbose)");
            }
            ctx.buffer().borrow_mut().push(Output::plain(line));
            Ok(treesh::parser::Value::null())
        }),
    )
    .flag(Flag::new("network", ValueType::String).mandatory().at_position(1))
    .flag(Flag::new("area", ValueType::Number).mandatory().at_position(2))
    .flag(Flag::new("ar", ValueType::Number))
    .flag(Flag::new("netlork", ValueType::String))
    .option("verbose")])
}

fn run_line(catalog: Rc<CommandTree>, line: &str, json: bool) -> i32 {
    let buffer = Rc::new(RefCell::new(OutputBuffer::new()));
    let (_cancel, cancel_rx) = watch::channel(false);
    let mut parser = Parser::new(ExecContext::root(catalog, Rc::clone(&buffer), cancel_rx));

    let parsed = parser.parse_string(line);
    let (value, error) = match parsed.error {
        Some(e) => (None, Some(e.to_string())),
        None => match parser.exec() {
            Ok(v) => (Some(v), None),
            Err(e) => (None, Some(e.to_string())),
        },
    };

    let mut output = Vec::new();
    while let Some(out) = buffer.borrow_mut().pop() {
        if let Output::Plain(text) = out {
            output.push(text);
        }
    }

    if json {
        let out = EvalOut {
            value: value.as_ref().map(|v| v.as_string()).unwrap_or_default(),
            output,
            runs: parsed
                .runs
                .iter()
                .map(|r| RunOut {
                    object: format!("{:?}", r.object),
                    len: r.len,
                })
                .collect(),
            error: error.clone(),
        };
        match serde_json::to_string(&out) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("error: {e}"),
        }
    } else {
        for text in output {
            println!("{text}");
        }
        if let Some(v) = &value {
            if !v.is_null() {
                println!("{}", v.as_string());
            }
        }
        if let Some(e) = &error {
            eprintln!("error: {e}");
        }
    }

    if error.is_some() {
        1
    } else {
        0
    }
}

fn init_logging(path: &str) {
    let file = match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => file,
        Err(_) => return,
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let catalog = match demo_catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("catalog error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(line) = cli.line {
        std::process::exit(run_line(catalog, &line, cli.json));
    }

    init_logging(&cli.log_file);

    let shell = match Shell::new(catalog, &cli.hostname, &cli.username) {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("error: stdin is not a terminal ({e})");
            std::process::exit(1);
        }
    };
    shell.run().await;
}
