use dbmlsync::canonical::canonicalize;
use dbmlsync::flatten::flatten_tables;
use dbmlsync::parser::Parser;
use dbmlsync::render::CardRenderer;
use std::env;
use std::fs;
use std::process;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Cards,
}

impl Format {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "json" => Some(Self::Json),
            "cards" => Some(Self::Cards),
            _ => None,
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <input.dbml> [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  -o, --output <file>   Output file (default: stdout)");
        eprintln!("  -f, --format <fmt>    Output format: json, cards (default: json)");
        process::exit(1);
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut format = Format::Json;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    output_path = Some(args[i].clone());
                }
            }
            "-f" | "--format" => {
                i += 1;
                if i < args.len() {
                    format = Format::from_str(&args[i]).unwrap_or_else(|| {
                        eprintln!("Invalid format: {}", args[i]);
                        process::exit(1);
                    });
                }
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input = match fs::read_to_string(input_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", input_path, e);
            process::exit(1);
        }
    };

    let mut parser = match Parser::new(&input) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Lex error: {}", e);
            process::exit(1);
        }
    };

    let database = match parser.parse() {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            process::exit(1);
        }
    };

    let document = match canonicalize(&database) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Schema error: {}", e);
            process::exit(1);
        }
    };

    let output = match format {
        Format::Json => match serde_json::to_string_pretty(&document) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Failed to serialize document: {}", e);
                process::exit(1);
            }
        },
        Format::Cards => {
            let renderer = CardRenderer::default();
            flatten_tables(&document)
                .iter()
                .map(|t| renderer.render(t))
                .collect::<Vec<_>>()
                .join("\n")
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &output) {
                eprintln!("Failed to write {}: {}", path, e);
                process::exit(1);
            }
        }
        None => print!("{}", output),
    }
}
