//! List commands implementation

use crate::backends;
use pocketprog_core::profile::ProfileSelector;
use pocketprog_core::tool::ToolConfig;

/// List all GPIO backends compiled in
pub fn list_backends() {
    println!("Supported GPIO backends:");
    println!();
    for b in backends::available_backends() {
        println!("  {:12} - {}", b.name, b.description);
        if !b.aliases.is_empty() {
            println!("  {:12}   aliases: {}", "", b.aliases.join(", "));
        }
    }
}

/// List profiles with the image each one uploads
pub fn list_profiles(selector: &ProfileSelector, tool: &ToolConfig) {
    println!("{} profiles (image root {}):", selector.len(), tool.image_root.display());
    println!();
    println!("{:>3}  {:<20} {:<20} {:<24} {}", "#", "Name", "Model", "File", "Image");
    println!("{}", "-".repeat(76));

    for (i, profile) in selector.profiles().iter().enumerate() {
        let image = tool.image_path(profile);
        let status = if image.is_file() { "ok" } else { "missing" };
        println!(
            "{:>3}  {:<20} {:<20} {:<24} {}",
            i, profile.name, profile.device_model, profile.filename, status
        );
    }
}
