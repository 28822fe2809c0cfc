//! Display the contents of a patch.

use clap::Args;

use super::load_page;

/// Print the boxes and links of a patch.
#[derive(Args)]
pub struct InfoArgs {
    /// Patch file, or the name of a patch in the user patches directory
    pub patch: String,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let page = load_page(&args.patch)?;
    let boxes = page.boxes();
    let links = page.links();

    println!("Patch: {}", args.patch);
    println!();
    println!("Boxes ({}):", boxes.len());
    for object in &boxes {
        let dsp = if object.is_dsp() { "~" } else { " " };
        println!(
            "  {:>4} {dsp} {:24}  {} in / {} out",
            object.id(),
            object.text(),
            object.inlet_count(),
            object.outlet_count()
        );
    }
    println!();
    println!("Links ({}):", links.len());
    for link in &links {
        let (Some(from), Some(to)) = (link.from(), link.to()) else {
            continue;
        };
        println!(
            "  {}:{} -> {}:{}",
            from.id(),
            link.outlet(),
            to.id(),
            link.inlet()
        );
    }
    Ok(())
}
