use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use reposcribe_core::StatsSnapshot;
use std::path::Path;

const TOP_FILE_TYPES: usize = 3;

pub fn print_quick_stats(stats: &StatsSnapshot) {
    println!();
    println!("{}", " Quick Statistics ".blue().bold().underline());
    println!(
        "{:<20} {}",
        "Total Files:".green(),
        stats.total_files.to_string().cyan()
    );
    println!(
        "{:<20} {} ({:.1}%)",
        "Text Files:".green(),
        stats.text_files.to_string().cyan(),
        stats.text_files_percentage
    );
    println!(
        "{:<20} {}",
        "Repository Size:".green(),
        stats.repo_size_human.cyan()
    );
    println!("{:<20} {}", "Current Branch:".green(), stats.branch.cyan());

    let top = stats.top_file_types(TOP_FILE_TYPES);
    if top.is_empty() {
        println!("\n{}", "(No files selected)".yellow());
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("File Type").fg(Color::Green),
        Cell::new("Files").fg(Color::Green),
    ]);
    for (ext, count) in top {
        table.add_row(vec![
            Cell::new(ext).fg(Color::Cyan),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
}

pub fn print_completion(output_path: &Path) {
    println!();
    println!("{}", "Documentation generated successfully!".green().bold());
    println!(
        "{} {}",
        "Output file:".green(),
        output_path.display().to_string().blue()
    );
}
