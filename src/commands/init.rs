use addonpm::AddonsFile;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(path: Option<PathBuf>) -> Result<()> {
    let project_dir = super::project_dir(path)?;

    if let Some(existing) = AddonsFile::find(&project_dir, None) {
        println!("✓ {} already exists", existing.display());
        println!();
        println!("To reinitialize, delete it and run 'addonpm init' again.");
        return Ok(());
    }

    let manifest_path = AddonsFile::write_template(&project_dir)?;

    println!("✓ Created {}", manifest_path.display());
    println!();
    println!("Next steps:");
    println!("  • Declare addons under \"addons\" in the manifest");
    println!("  • Install them: addonpm install");
    println!();

    Ok(())
}
