/// Rule Tracer - Shows the flow through Tokens → Diagnostics → Predicate
///
/// Usage: cargo run --bin trace_rule <schema> <expression> [caret]
///
/// The schema is a comma-separated list of `Name:Type` pairs, optionally
/// followed by `=Value|Value` to restrict allowed values.

use sieve_dsl::{EngineConfig, PropertyDescriptor, PropertyType, RuleEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: cargo run --bin trace_rule <schema> <expression> [caret]");
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --bin trace_rule \"Age:Integer,Name:String\" \"Age > 18 AND Name CONTAINS 'John'\"");
        std::process::exit(1);
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
    {
        eprintln!("❌ Failed to init subscriber: {}", e);
    }

    let expression = &args[2];
    let caret = match args.get(3).map(|s| s.parse::<usize>()) {
        None => expression.len(),
        Some(Ok(caret)) => caret,
        Some(Err(e)) => {
            eprintln!("❌ Invalid caret offset: {}", e);
            std::process::exit(1);
        }
    };

    let engine = match RuleEngine::new(EngineConfig::from_env()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = engine.set_target_type(parse_schema(&args[1])) {
        eprintln!("❌ Invalid schema: {}", e);
        std::process::exit(1);
    }

    println!("╔═══════════════════════════════════════════════════════════════");
    println!("║ RULE EXPRESSION TRACER");
    println!("╚═══════════════════════════════════════════════════════════════\n");

    println!("📝 INPUT:");
    println!("{}", expression);
    println!();

    let (tokens, report) = engine.validate_text(expression);

    println!("🔍 TOKENS:");
    println!("─────────────────────────────────────────────────────────────");
    for token in &tokens {
        let marker = if token.has_error() { "✗" } else { " " };
        println!(
            "{} [{:>3}..{:<3}] {:<20} {}",
            marker,
            token.span.start,
            token.span.end,
            token.kind.describe(),
            token.text
        );
    }
    println!();

    println!("🩺 DIAGNOSTICS:");
    println!("─────────────────────────────────────────────────────────────");
    if report.is_valid() {
        println!("✓ valid");
    }
    for diagnostic in &report.diagnostics {
        println!(
            "  {:?} at {} (len {}): {}",
            diagnostic.kind,
            diagnostic.position(),
            diagnostic.len(),
            diagnostic.message
        );
    }
    if !report.unknown_properties.is_empty() {
        println!("  unknown properties: {}", report.unknown_properties.join(", "));
    }
    println!();

    println!("💡 SUGGESTIONS AT {}:", caret);
    println!("─────────────────────────────────────────────────────────────");
    println!("{}", engine.suggest(&tokens, caret).join("  "));
    println!();

    println!("📐 FORMATTED:");
    println!("─────────────────────────────────────────────────────────────");
    println!("{}", engine.format(expression));
    println!();

    println!("⚙️  COMPILE:");
    println!("─────────────────────────────────────────────────────────────");
    match engine.compile(expression) {
        Ok(predicate) => {
            println!("✓ {}", predicate);
            if let Some(root) = predicate.root() {
                match serde_json::to_string_pretty(root) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("❌ Failed to render tree: {}", e),
                }
            }
        }
        Err(e) => {
            println!("❌ {}", e);
            std::process::exit(2);
        }
    }
}

fn parse_schema(declaration: &str) -> Vec<PropertyDescriptor> {
    declaration
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (decl, allowed) = match entry.split_once('=') {
                Some((decl, allowed)) => (decl, Some(allowed)),
                None => (entry, None),
            };
            let (name, ty) = decl.split_once(':').unwrap_or((decl, "String"));
            let property_type = ty.trim().parse().unwrap_or(PropertyType::String);
            let descriptor = PropertyDescriptor::new(name.trim(), property_type);
            match allowed {
                Some(values) => descriptor.with_allowed_values(values.split('|').map(str::trim)),
                None => descriptor,
            }
        })
        .collect()
}
