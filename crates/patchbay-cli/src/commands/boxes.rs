//! Box listing and description command.

use clap::Args;
use patchbay_core::{BoxCategory, Page, Polarity, prototype, prototypes_in_category};

#[derive(Args)]
pub struct BoxesArgs {
    /// Show sockets for a specific box, with optional creation arguments
    #[arg(value_name = "BOX")]
    text: Vec<String>,
}

const CATEGORIES: [BoxCategory; 5] = [
    BoxCategory::Math,
    BoxCategory::Signal,
    BoxCategory::Control,
    BoxCategory::Interface,
    BoxCategory::Utility,
];

pub fn run(args: BoxesArgs) -> anyhow::Result<()> {
    if args.text.is_empty() {
        list();
        return Ok(());
    }
    describe(&args.text.join(" "))
}

fn list() {
    println!("Available Boxes");
    println!("===============");
    for category in CATEGORIES {
        let boxes = prototypes_in_category(category);
        if boxes.is_empty() {
            continue;
        }
        println!();
        println!("{}:", category.name());
        for descriptor in boxes {
            println!("  {:10}  {}", descriptor.name, descriptor.description);
        }
    }
}

fn describe(text: &str) -> anyhow::Result<()> {
    let name = text.split_whitespace().next().unwrap_or_default();
    let descriptor = prototype(name).ok_or_else(|| anyhow::anyhow!("Unknown box: {name}"))?;
    let page = Page::new();
    let object = page
        .create_box_from_text(text)
        .ok_or_else(|| anyhow::anyhow!("Could not create `{text}`"))?;

    println!("{} ({})", descriptor.name, descriptor.category.name());
    println!("{}", descriptor.description);
    println!();
    println!("Inlets:");
    for (index, inlet) in object.inlets().iter().enumerate() {
        println!(
            "  {index}  {:8} {:5}  {}",
            inlet.kind().as_str(),
            match inlet.polarity() {
                Polarity::Hot => "hot",
                Polarity::Cold => "cold",
            },
            inlet.description()
        );
    }
    println!("Outlets:");
    for (index, outlet) in object.outlets().iter().enumerate() {
        println!(
            "  {index}  {:8}  {}",
            outlet.kind().as_str(),
            outlet.description()
        );
    }
    Ok(())
}
