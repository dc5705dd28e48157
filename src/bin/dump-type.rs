use clap::Parser;
use hostbridge::{
    demo,
    types::{DescriptorCache, DescriptorSummary, DiscoveryPolicy},
};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Dump the properties, methods and indexers scripts see on a host class"
)]
struct Args {
    /// The class to dump (e.g. Document or demo.web.Element)
    type_name: String,
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
    /// Expose operations from every namespace, including core.runtime
    #[arg(long)]
    unblocked: bool,
}

fn main() -> ExitCode {
    hostbridge::init_tracing();
    let args = Args::parse();

    let Some(ty) = demo::find_class(&args.type_name) else {
        eprintln!("Type '{}' not found", args.type_name);
        println!("\nAvailable types:");
        for class in demo::classes() {
            println!("  {}", class.full_name());
        }
        return ExitCode::FAILURE;
    };

    let policy = if args.unblocked {
        DiscoveryPolicy::default().with_blocked_namespaces(Vec::<String>::new())
    } else {
        DiscoveryPolicy::default()
    };
    let summary = match DescriptorCache::new(policy).describe(&ty) {
        Ok(descriptor) => descriptor.summary(),
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_type_info(&summary);
    }
    ExitCode::SUCCESS
}

fn print_type_info(summary: &DescriptorSummary) {
    println!("Type: {}", summary.type_name);

    println!("\nProperties:");
    for prop in &summary.properties {
        let access = match (prop.readable, prop.writable) {
            (true, true) => "read/write",
            (true, false) => "read-only",
            (false, true) => "write-only",
            (false, false) => "none",
        };
        println!("  - {}: {} ({})", prop.name, prop.kind, access);
    }

    println!("\nMethods:");
    for method in &summary.methods {
        println!("  - {}", method.name);
        for overload in &method.overloads {
            println!("      {overload}");
        }
    }

    if !summary.static_constants.is_empty() {
        println!("\nStatic constants:");
        for name in &summary.static_constants {
            println!("  - {name}");
        }
    }

    println!("\nIndexers:");
    println!("  integer: {}", summary.integer_indexer);
    println!("  name: {}", summary.name_indexer);
}
