use clap::Parser;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tw2css_core::config::Config;

const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];

#[derive(Parser)]
#[command(name = "tw2css", about = "Compile tw props and tw templates into css props")]
struct Cli {
    /// Input source file(s) or directory. Omit to read from stdin.
    #[arg()]
    input: Vec<PathBuf>,

    /// Output file (single input only) or directory (multiple inputs).
    /// Omit to write to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File extension for output files in directory mode (default: keep the input's).
    #[arg(long)]
    ext: Option<String>,

    /// Allow tw`...` outside the css prop.
    #[arg(long)]
    allow_style_prop: bool,

    /// Do not add data-tw debug attributes.
    #[arg(long)]
    no_debug_prop: bool,

    /// Report failing props as diagnostics and keep going.
    #[arg(long)]
    continue_on_error: bool,

    /// Only rewrite tw props in files that import the style builder.
    #[arg(long)]
    require_import: bool,

    /// Log every rewrite decision.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &cli.config {
        Some(path) => {
            let toml_str = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading config {}: {e}", path.display());
                std::process::exit(1);
            });
            Config::from_toml(&toml_str).unwrap_or_else(|e| {
                eprintln!("Error parsing config: {e}");
                std::process::exit(1);
            })
        }
        None => Config::default(),
    };
    if cli.allow_style_prop {
        config.options.allow_style_prop = true;
    }
    if cli.no_debug_prop {
        config.debug.enabled = false;
    }
    if cli.continue_on_error {
        config.options.continue_on_error = true;
    }
    if cli.require_import {
        config.options.require_import = true;
    }

    if cli.input.is_empty() {
        // Stdin mode
        let mut input = String::new();
        io::stdin().read_to_string(&mut input).unwrap_or_else(|e| {
            eprintln!("Error reading stdin: {e}");
            std::process::exit(1);
        });
        let result = transform_or_exit(&input, &config, "<stdin>");
        write_output(&result, cli.output.as_deref());
    } else {
        let files = collect_source_files(&cli.input);
        if files.is_empty() {
            eprintln!("No .js, .jsx, .ts or .tsx files found");
            std::process::exit(1);
        }

        if files.len() == 1 {
            let input = read_file(&files[0]);
            let result = transform_or_exit(&input, &config, &files[0].display().to_string());
            write_output(&result, cli.output.as_deref());
        } else {
            let out_dir = cli.output.unwrap_or_else(|| {
                eprintln!("Multiple input files require --output directory");
                std::process::exit(1);
            });
            std::fs::create_dir_all(&out_dir).unwrap_or_else(|e| {
                eprintln!("Error creating output directory: {e}");
                std::process::exit(1);
            });
            for file in &files {
                let input = read_file(file);
                let result = transform_or_exit(&input, &config, &file.display().to_string());
                let out_path = out_dir.join(output_name(file, cli.ext.as_deref()));
                std::fs::write(&out_path, &result).unwrap_or_else(|e| {
                    eprintln!("Error writing {}: {e}", out_path.display());
                    std::process::exit(1);
                });
                eprintln!("{} -> {}", file.display(), out_path.display());
            }
        }
    }
}

fn transform_or_exit(input: &str, config: &Config, source: &str) -> String {
    let output = tw2css_core::transform(input, config).unwrap_or_else(|e| {
        eprintln!("{source}:{e}");
        std::process::exit(1);
    });
    for diagnostic in &output.diagnostics {
        eprintln!("{source}:{}:{}: {}", diagnostic.line, diagnostic.column, diagnostic.message);
    }
    output.code
}

fn output_name(file: &Path, ext: Option<&str>) -> PathBuf {
    let name = PathBuf::from(file.file_name().unwrap_or_default());
    match ext {
        Some(ext) => name.with_extension(ext),
        None => name,
    }
}

fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", path.display());
        std::process::exit(1);
    })
}

fn write_output(content: &str, output: Option<&Path>) {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            std::fs::write(path, content).unwrap_or_else(|e| {
                eprintln!("Error writing {}: {e}", path.display());
                std::process::exit(1);
            });
        }
        None => {
            io::stdout().write_all(content.as_bytes()).unwrap_or_else(|e| {
                eprintln!("Error writing stdout: {e}");
                std::process::exit(1);
            });
        }
    }
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn collect_source_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            if let Ok(entries) = std::fs::read_dir(input) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if is_source_file(&path) {
                        files.push(path);
                    }
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    files
}
