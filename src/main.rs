//! wikitemplate CLI
//!
//! Usage:
//!   wikitemplate [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --config <FILE>    Parser configuration (TOML format)
//!       --strict           Reject unclosed or unmatched delimiters
//!       --max-depth <N>    Nesting limit for templates, links and arguments
//!   -t, --tree             Print the parsed node tree instead of templates
//!       --fixture          Use the fixed-output parser
//!   -v, --verbose          Increase log verbosity (repeatable)
//!   -h, --help             Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use wikitemplate::{parse_wikicode_with_config, Node, ParseConfig, Template, Wikicode};

#[derive(Parser)]
#[command(name = "wikitemplate")]
#[command(about = "Extract MediaWiki template invocations from wikitext")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Parser configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reject unclosed or unmatched delimiters
    #[arg(long)]
    strict: bool,

    /// Nesting limit for templates, links and arguments
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print the parsed node tree instead of the template list
    #[arg(short, long)]
    tree: bool,

    /// Use the fixed-output parser, which ignores the input
    #[arg(long)]
    fixture: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Error initializing logger: {}", e);
    }

    // Load config, then let flags override it
    let mut config = match &cli.config {
        Some(path) => match ParseConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ParseConfig::default(),
    };
    if cli.strict {
        config.strict = true;
    }
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }
    log::info!("using {:?}", config);

    // Read input
    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    if cli.fixture {
        print_templates(&wikitemplate::Parser::new().parse(&source));
        return;
    }

    match parse_wikicode_with_config(&source, &config) {
        Ok(code) if cli.tree => print_tree(&code, 0),
        Ok(code) => {
            let templates: Vec<Template> = code
                .filter_templates()
                .into_iter()
                .map(Template::from)
                .collect();
            print_templates(&templates);
        }
        Err(errors) => {
            for e in &errors {
                eprint!("{}", e.format(&source, &filename));
            }
            std::process::exit(1);
        }
    }
}

fn print_templates(templates: &[Template]) {
    for t in templates {
        println!("{}", t);
    }
}

fn print_tree(code: &Wikicode, depth: usize) {
    let indent = "  ".repeat(depth);
    for spanned in &code.nodes {
        let span = &spanned.span;
        match &spanned.node {
            Node::Text(s) => println!("{}text {:?} @{:?}", indent, s, span),
            Node::Comment(s) => println!("{}comment {:?} @{:?}", indent, s, span),
            Node::Entity(s) => println!("{}entity {} @{:?}", indent, s, span),
            Node::Template(t) => {
                println!("{}template @{:?}", indent, span);
                print_tree(&t.name, depth + 1);
                for param in &t.params {
                    if param.showkey {
                        println!("{}  param (named)", indent);
                        print_tree(&param.name, depth + 2);
                        println!("{}  =", indent);
                    } else {
                        println!("{}  param (positional)", indent);
                    }
                    print_tree(&param.value, depth + 2);
                }
            }
            Node::Argument(a) => {
                println!("{}argument @{:?}", indent, span);
                print_tree(&a.name, depth + 1);
                if let Some(default) = &a.default {
                    println!("{}  default", indent);
                    print_tree(default, depth + 2);
                }
            }
            Node::Wikilink(l) => {
                println!("{}wikilink @{:?}", indent, span);
                print_tree(&l.title, depth + 1);
                if let Some(text) = &l.text {
                    println!("{}  text", indent);
                    print_tree(text, depth + 2);
                }
            }
            Node::Heading(h) => {
                println!("{}heading level {} @{:?}", indent, h.level, span);
                print_tree(&h.title, depth + 1);
            }
        }
    }
}
